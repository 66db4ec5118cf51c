use ninewatch_core::models::{MediaItem, NewMedia};
use ninewatch_core::query::{BrowseFilter, Predicate};
use ninewatch_core::types::{MediaKind, SortBy};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::DbError;

const MEDIA_COLUMNS: &str = "media.id, media.title, media.kind, media.description, \
     media.genres_json, media.poster_url, media.hero_url, media.trailer_url, media.rating, \
     media.release_year, media.featured, media.video_sources_json, media.seasons_json";

type MediaTuple = (
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    f64,
    i32,
    bool,
    String,
    String,
);

/// Insert a catalog record. Rejects records that break the movie/show shape.
pub async fn insert_media(pool: &SqlitePool, mut media: NewMedia) -> Result<MediaItem, DbError> {
    media.normalize()?;

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        "INSERT INTO media (id, title, title_folded, kind, description, genres_json, poster_url, \
         hero_url, trailer_url, rating, release_year, featured, video_sources_json, seasons_json, \
         created_ts) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&media.title)
    .bind(media.title.to_lowercase())
    .bind(media.kind.as_str())
    .bind(&media.description)
    .bind(serde_json::to_string(&media.genres)?)
    .bind(&media.poster_url)
    .bind(&media.hero_url)
    .bind(&media.trailer_url)
    .bind(media.rating)
    .bind(media.release_year)
    .bind(media.featured)
    .bind(serde_json::to_string(&media.video_sources)?)
    .bind(serde_json::to_string(&media.seasons)?)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(MediaItem {
        id,
        title: media.title,
        kind: media.kind,
        description: media.description,
        genres: media.genres,
        poster_url: media.poster_url,
        hero_url: media.hero_url,
        trailer_url: media.trailer_url,
        rating: media.rating,
        release_year: media.release_year,
        featured: media.featured,
        video_sources: media.video_sources,
        seasons: media.seasons,
    })
}

pub async fn get_media(pool: &SqlitePool, media_id: &str) -> Result<Option<MediaItem>, DbError> {
    let query = format!("SELECT {MEDIA_COLUMNS} FROM media WHERE media.id = ?");
    let row: Option<MediaTuple> = sqlx::query_as(&query)
        .bind(media_id)
        .fetch_optional(pool)
        .await?;

    row.map(row_to_media).transpose()
}

pub async fn media_exists(pool: &SqlitePool, media_id: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM media WHERE id = ?")
        .bind(media_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

pub async fn count_media(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM media")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Run a browse query. Returns the requested page and the total number of
/// matching records.
pub async fn browse(
    pool: &SqlitePool,
    filter: &BrowseFilter,
) -> Result<(Vec<MediaItem>, i64), DbError> {
    let items = find(pool, filter).await?;
    let total = count_matching(pool, filter).await?;
    Ok((items, total))
}

/// The requested page of matching records, without counting the rest.
pub async fn find(pool: &SqlitePool, filter: &BrowseFilter) -> Result<Vec<MediaItem>, DbError> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {MEDIA_COLUMNS} FROM media WHERE 1 = 1"
    ));
    for p in filter.predicates() {
        push_predicate(&mut qb, p);
    }
    qb.push(order_clause(filter.sort_by));
    qb.push(" LIMIT ")
        .push_bind(i64::from(filter.page.size))
        .push(" OFFSET ")
        .push_bind(filter.page.offset());

    let rows: Vec<MediaTuple> = qb.build_query_as().fetch_all(pool).await?;
    rows.into_iter().map(row_to_media).collect()
}

pub async fn count_matching(pool: &SqlitePool, filter: &BrowseFilter) -> Result<i64, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM media WHERE 1 = 1");
    for p in filter.predicates() {
        push_predicate(&mut qb, p);
    }
    let (total,): (i64,) = qb.build_query_as().fetch_one(pool).await?;
    Ok(total)
}

/// Append one predicate as an `AND` clause. Values are always bound.
fn push_predicate(qb: &mut QueryBuilder<'_, Sqlite>, predicate: Predicate) {
    match predicate {
        Predicate::HasGenre(genre) => {
            qb.push(
                " AND EXISTS (SELECT 1 FROM json_each(media.genres_json) \
                 WHERE json_each.value = ",
            )
            .push_bind(genre)
            .push(")");
        }
        Predicate::KindIs(kind) => {
            qb.push(" AND media.kind = ").push_bind(kind.as_str());
        }
        Predicate::ReleasedIn(year) => {
            qb.push(" AND media.release_year = ").push_bind(year);
        }
        // SQLite's lower() only folds ASCII, so both sides are folded in Rust.
        Predicate::TitleContains(needle) => {
            qb.push(" AND instr(media.title_folded, ")
                .push_bind(needle.to_lowercase())
                .push(") > 0");
        }
        Predicate::FeaturedIs(featured) => {
            qb.push(" AND media.featured = ").push_bind(featured);
        }
    }
}

// Ties fall back to insertion order so paging is stable.
fn order_clause(sort: Option<SortBy>) -> &'static str {
    match sort {
        None => " ORDER BY media.rowid",
        Some(SortBy::RatingDesc) => " ORDER BY media.rating DESC, media.rowid",
        Some(SortBy::YearDesc) => " ORDER BY media.release_year DESC, media.rowid",
        Some(SortBy::TitleAsc) => " ORDER BY media.title ASC, media.rowid",
    }
}

fn row_to_media(r: MediaTuple) -> Result<MediaItem, DbError> {
    let kind = MediaKind::parse(&r.2).ok_or_else(|| DbError::UnknownKind(r.2.clone()))?;
    Ok(MediaItem {
        id: r.0,
        title: r.1,
        kind,
        description: r.3,
        genres: serde_json::from_str(&r.4)?,
        poster_url: r.5,
        hero_url: r.6,
        trailer_url: r.7,
        rating: r.8,
        release_year: r.9,
        featured: r.10,
        video_sources: serde_json::from_str(&r.11)?,
        seasons: serde_json::from_str(&r.12)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ninewatch_core::models::{Episode, Season, VideoSource};
    use ninewatch_core::query::{BrowseParams, Page};

    async fn test_pool() -> SqlitePool {
        let pool = crate::connect(":memory:").await.unwrap();
        crate::migrate::run(&pool).await.unwrap();
        pool
    }

    fn movie(title: &str, year: i32, rating: f64, genres: &[&str]) -> NewMedia {
        NewMedia {
            title: title.to_string(),
            kind: MediaKind::Movie,
            description: format!("{title} description"),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            poster_url: format!("https://img.example/{year}.jpg"),
            hero_url: None,
            trailer_url: String::new(),
            rating,
            release_year: year,
            featured: false,
            video_sources: vec![VideoSource {
                quality: "1080p".into(),
                url: format!("https://cdn.example/{year}.mp4"),
            }],
            seasons: vec![],
        }
    }

    fn show(title: &str, year: i32, rating: f64, genres: &[&str]) -> NewMedia {
        NewMedia {
            kind: MediaKind::TvShow,
            video_sources: vec![],
            seasons: vec![Season {
                season_number: 1,
                episodes: vec![Episode {
                    episode_number: 1,
                    title: "Pilot".into(),
                    synopsis: None,
                    video_sources: vec![VideoSource {
                        quality: "720p".into(),
                        url: "https://cdn.example/pilot.m3u8".into(),
                    }],
                }],
            }],
            ..movie(title, year, rating, genres)
        }
    }

    fn filter(pairs: &[(&str, &str)]) -> BrowseFilter {
        let p = BrowseParams::from_pairs(pairs.iter().copied());
        BrowseFilter::from_params(&p)
    }

    #[tokio::test]
    async fn insert_and_get_round_trip_keeps_nested_data() {
        let pool = test_pool().await;
        let stored = insert_media(&pool, show("Dark", 2017, 8.7, &["Sci-Fi", "Drama"]))
            .await
            .unwrap();

        let loaded = get_media(&pool, &stored.id).await.unwrap().unwrap();
        assert_eq!(loaded, stored);
        assert_eq!(loaded.seasons[0].episodes[0].video_sources.len(), 1);
        assert!(media_exists(&pool, &stored.id).await.unwrap());
        assert!(get_media(&pool, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_rejects_movie_with_seasons() {
        let pool = test_pool().await;
        let mut bad = show("Broken", 2020, 5.0, &[]);
        bad.kind = MediaKind::Movie;
        let err = insert_media(&pool, bad).await.unwrap_err();
        assert!(matches!(err, DbError::Shape(_)));
        assert_eq!(count_media(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn filters_combine_with_and() {
        let pool = test_pool().await;
        insert_media(&pool, movie("It Follows", 2014, 6.8, &["Horror"])).await.unwrap();
        insert_media(&pool, show("The Haunting of Hill House", 2018, 8.6, &["Horror"]))
            .await
            .unwrap();
        insert_media(&pool, movie("Heat", 1995, 8.3, &["Crime", "Thriller"])).await.unwrap();

        let (items, total) = browse(&pool, &filter(&[("genre", "Horror"), ("type", "movie")]))
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].title, "It Follows");
        assert!(items.iter().all(|m| m.kind == MediaKind::Movie
            && m.genres.iter().any(|g| g == "Horror")));
    }

    #[tokio::test]
    async fn genre_match_is_exact_tag_not_substring() {
        let pool = test_pool().await;
        insert_media(&pool, movie("Alien", 1979, 8.5, &["Sci-Fi Horror"])).await.unwrap();
        let (items, total) = browse(&pool, &filter(&[("genre", "Horror")])).await.unwrap();
        assert_eq!(total, 0);
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn title_query_is_case_insensitive_substring() {
        let pool = test_pool().await;
        insert_media(&pool, movie("The Dark Knight", 2008, 9.0, &["Action"])).await.unwrap();
        insert_media(&pool, movie("Darkest Hour", 2017, 7.4, &["History"])).await.unwrap();
        insert_media(&pool, movie("Up", 2009, 8.3, &["Animation"])).await.unwrap();

        let (items, _) = browse(&pool, &filter(&[("query", "DARK")])).await.unwrap();
        let titles: Vec<&str> = items.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["The Dark Knight", "Darkest Hour"]);

        // Pattern characters are matched literally
        let (items, _) = browse(&pool, &filter(&[("query", "%")])).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn title_query_folds_non_ascii_case() {
        let pool = test_pool().await;
        insert_media(&pool, movie("Amélie", 2001, 8.3, &["Romance"])).await.unwrap();
        insert_media(&pool, movie("ÉLITE SQUAD", 2007, 8.0, &["Action"])).await.unwrap();
        insert_media(&pool, movie("Amelia", 2009, 5.8, &["Drama"])).await.unwrap();

        let (items, total) = browse(&pool, &filter(&[("query", "AMÉLIE")])).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].title, "Amélie");

        let (items, _) = browse(&pool, &filter(&[("query", "élite")])).await.unwrap();
        let titles: Vec<&str> = items.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["ÉLITE SQUAD"]);
    }

    #[tokio::test]
    async fn year_and_featured_filters() {
        let pool = test_pool().await;
        let mut featured = movie("Dune", 2021, 8.0, &["Sci-Fi"]);
        featured.featured = true;
        insert_media(&pool, featured).await.unwrap();
        insert_media(&pool, movie("Encanto", 2021, 7.2, &["Animation"])).await.unwrap();
        insert_media(&pool, movie("Tenet", 2020, 7.3, &["Action"])).await.unwrap();

        let (_, total) = browse(&pool, &filter(&[("year", "2021")])).await.unwrap();
        assert_eq!(total, 2);

        let (items, total) = browse(&pool, &filter(&[("featured", "true")])).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].title, "Dune");

        let (_, total) = browse(&pool, &filter(&[("featured", "false")])).await.unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn sort_orders() {
        let pool = test_pool().await;
        insert_media(&pool, movie("Casablanca", 1942, 8.5, &[])).await.unwrap();
        insert_media(&pool, movie("Arrival", 2016, 7.9, &[])).await.unwrap();
        insert_media(&pool, movie("Brazil", 1985, 7.9, &[])).await.unwrap();

        let titles = |items: Vec<MediaItem>| -> Vec<String> {
            items.into_iter().map(|m| m.title).collect()
        };

        let (items, _) = browse(&pool, &filter(&[])).await.unwrap();
        assert_eq!(titles(items), vec!["Casablanca", "Arrival", "Brazil"]);

        let (items, _) = browse(&pool, &filter(&[("sortBy", "rating_desc")])).await.unwrap();
        assert_eq!(titles(items), vec!["Casablanca", "Arrival", "Brazil"]);

        let (items, _) = browse(&pool, &filter(&[("sortBy", "year_desc")])).await.unwrap();
        assert_eq!(titles(items), vec!["Arrival", "Brazil", "Casablanca"]);

        let (items, _) = browse(&pool, &filter(&[("sortBy", "title_asc")])).await.unwrap();
        assert_eq!(titles(items), vec!["Arrival", "Brazil", "Casablanca"]);
    }

    #[tokio::test]
    async fn pagination_slices_in_order() {
        let pool = test_pool().await;
        for i in 1..=45 {
            insert_media(&pool, movie(&format!("Movie {i:02}"), 2000, 5.0, &[]))
                .await
                .unwrap();
        }

        let page_two = BrowseFilter {
            page: Page { number: 2, size: 20 },
            ..Default::default()
        };
        let (items, total) = browse(&pool, &page_two).await.unwrap();
        assert_eq!(total, 45);
        assert_eq!(items.len(), 20);
        assert_eq!(items[0].title, "Movie 21");
        assert_eq!(items[19].title, "Movie 40");
        assert_eq!(page_two.page.total_pages(total), 3);

        let page_three = BrowseFilter {
            page: Page { number: 3, size: 20 },
            ..Default::default()
        };
        let (items, _) = browse(&pool, &page_three).await.unwrap();
        assert_eq!(items.len(), 5);
    }
}
