use futures::future::try_join_all;
use ninewatch_core::models::{Collection, MediaItem};
use ninewatch_core::query::{BrowseFilter, Page};
use ninewatch_core::types::{MediaKind, SortBy};
use ninewatch_db::DbError;
use ninewatch_db::repo::media;
use serde::Serialize;
use sqlx::SqlitePool;

pub const COLLECTION_ITEM_LIMIT: u32 = 15;

/// One canned homepage row.
#[derive(Debug, Clone, Copy)]
pub struct CollectionDef {
    pub slug: &'static str,
    pub title: &'static str,
    pub kind: Option<MediaKind>,
    pub genre: Option<&'static str>,
    pub featured: Option<bool>,
    pub sort_by: Option<SortBy>,
}

impl CollectionDef {
    const fn new(slug: &'static str, title: &'static str) -> Self {
        Self {
            slug,
            title,
            kind: None,
            genre: None,
            featured: None,
            sort_by: None,
        }
    }

    const fn kind(mut self, kind: MediaKind) -> Self {
        self.kind = Some(kind);
        self
    }

    const fn genre(mut self, genre: &'static str) -> Self {
        self.genre = Some(genre);
        self
    }

    const fn featured(mut self) -> Self {
        self.featured = Some(true);
        self
    }

    const fn sorted(mut self, sort_by: SortBy) -> Self {
        self.sort_by = Some(sort_by);
        self
    }

    pub fn filter(&self) -> BrowseFilter {
        BrowseFilter {
            genre: self.genre.map(str::to_string),
            kind: self.kind,
            featured: self.featured,
            sort_by: self.sort_by,
            page: Page::first(COLLECTION_ITEM_LIMIT),
            ..BrowseFilter::default()
        }
    }
}

/// Homepage rows, in display order.
pub const HOMEPAGE_COLLECTIONS: &[CollectionDef] = &[
    CollectionDef::new("featured", "Featured").featured(),
    CollectionDef::new("popular-movies", "Popular Movies")
        .kind(MediaKind::Movie)
        .sorted(SortBy::RatingDesc),
    CollectionDef::new("popular-tv-shows", "Popular TV Shows")
        .kind(MediaKind::TvShow)
        .sorted(SortBy::RatingDesc),
    CollectionDef::new("new-releases", "New Releases").sorted(SortBy::YearDesc),
    CollectionDef::new("trending-now", "Trending Now 🔥").sorted(SortBy::RatingDesc),
    CollectionDef::new("recently-added", "Recently Added").sorted(SortBy::YearDesc),
    CollectionDef::new("hot-action-movies", "HOT Action Movies").genre("Action"),
    CollectionDef::new("critically-acclaimed-tv", "Critically Acclaimed TV")
        .kind(MediaKind::TvShow)
        .sorted(SortBy::RatingDesc),
    CollectionDef::new("sci-fi-worlds", "Sci-Fi Worlds").genre("Sci-Fi"),
    CollectionDef::new("midnight-horror-express", "Midnight Horror Express 🔪").genre("Horror"),
    CollectionDef::new("romantic-love", "Romantic Love ❤️").genre("Romance"),
    CollectionDef::new("thriller", "Thriller").genre("Thriller"),
    CollectionDef::new("african-movies", "African Movies").genre("African"),
    CollectionDef::new("nollywood", "Nollywood").genre("Nollywood"),
    CollectionDef::new("k-drama", "K-Drama").genre("K-Drama"),
    CollectionDef::new("black-shows", "Black Shows").genre("Black"),
    CollectionDef::new("documentary", "Documentary").genre("Documentary"),
    CollectionDef::new("animation", "Animation").genre("Animation"),
    CollectionDef::new("comedy", "Comedy").genre("Comedy"),
    CollectionDef::new("family", "Family").genre("Family"),
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowsePage {
    pub media: Vec<MediaItem>,
    pub total_pages: i64,
    pub current_page: u32,
}

pub async fn browse(db: &SqlitePool, filter: &BrowseFilter) -> Result<BrowsePage, DbError> {
    let (items, total) = media::browse(db, filter).await?;
    Ok(BrowsePage {
        media: items,
        total_pages: filter.page.total_pages(total),
        current_page: filter.page.number,
    })
}

pub async fn homepage_collections(db: &SqlitePool) -> Result<Vec<Collection>, DbError> {
    collections_from(db, HOMEPAGE_COLLECTIONS).await
}

/// Run every definition concurrently. Any failure fails the whole set.
/// Empty rows are dropped; the rest keep their table order.
pub async fn collections_from(
    db: &SqlitePool,
    defs: &[CollectionDef],
) -> Result<Vec<Collection>, DbError> {
    let rows = try_join_all(defs.iter().map(|def| async move {
        let items = media::find(db, &def.filter()).await?;
        Ok::<_, DbError>((def, items))
    }))
    .await?;

    Ok(rows
        .into_iter()
        .filter(|(_, items)| !items.is_empty())
        .map(|(def, items)| Collection {
            id: def.slug.to_string(),
            title: def.title.to_string(),
            slug: def.slug.to_string(),
            items,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ninewatch_core::models::NewMedia;
    use std::collections::HashSet;

    async fn setup() -> SqlitePool {
        let pool = ninewatch_db::connect(":memory:").await.unwrap();
        ninewatch_db::migrate::run(&pool).await.unwrap();
        pool
    }

    fn movie(title: &str, genres: &[&str], rating: f64, year: i32) -> NewMedia {
        NewMedia {
            title: title.into(),
            kind: MediaKind::Movie,
            description: String::new(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            poster_url: format!("https://img.test/{title}.jpg"),
            hero_url: None,
            trailer_url: String::new(),
            rating,
            release_year: year,
            featured: false,
            video_sources: vec![],
            seasons: vec![],
        }
    }

    #[test]
    fn homepage_table_is_complete_and_unique() {
        assert_eq!(HOMEPAGE_COLLECTIONS.len(), 20);
        let slugs: HashSet<_> = HOMEPAGE_COLLECTIONS.iter().map(|d| d.slug).collect();
        assert_eq!(slugs.len(), HOMEPAGE_COLLECTIONS.len());
        assert_eq!(HOMEPAGE_COLLECTIONS[0].slug, "featured");
    }

    #[test]
    fn collection_filter_is_capped() {
        let def = HOMEPAGE_COLLECTIONS[1];
        let filter = def.filter();
        assert_eq!(filter.page.size, COLLECTION_ITEM_LIMIT);
        assert_eq!(filter.page.number, 1);
        assert_eq!(filter.kind, Some(MediaKind::Movie));
        assert_eq!(filter.sort_by, Some(SortBy::RatingDesc));
    }

    #[tokio::test]
    async fn empty_collections_are_dropped_in_order() {
        let pool = setup().await;
        media::insert_media(&pool, movie("Heat", &["Action"], 8.3, 1995))
            .await
            .unwrap();
        media::insert_media(&pool, movie("Airplane!", &["Comedy"], 7.7, 1980))
            .await
            .unwrap();

        let collections = homepage_collections(&pool).await.unwrap();
        let slugs: Vec<&str> = collections.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(
            slugs,
            vec![
                "popular-movies",
                "new-releases",
                "trending-now",
                "recently-added",
                "hot-action-movies",
                "comedy",
            ]
        );
        assert_eq!(collections[0].items[0].title, "Heat");
    }

    #[tokio::test]
    async fn collection_items_are_capped() {
        let pool = setup().await;
        for i in 0..20 {
            media::insert_media(&pool, movie(&format!("Toy {i}"), &["Family"], 6.0, 2000 + i))
                .await
                .unwrap();
        }
        let defs = [CollectionDef::new("family", "Family").genre("Family")];
        let collections = collections_from(&pool, &defs).await.unwrap();
        assert_eq!(collections.len(), 1);
        assert_eq!(collections[0].items.len(), COLLECTION_ITEM_LIMIT as usize);
    }

    #[tokio::test]
    async fn browse_reports_pages() {
        let pool = setup().await;
        for i in 0..45 {
            media::insert_media(&pool, movie(&format!("M{i:02}"), &["Drama"], 5.0, 2001))
                .await
                .unwrap();
        }
        let filter = BrowseFilter {
            page: Page { number: 2, size: 20 },
            ..BrowseFilter::default()
        };
        let page = browse(&pool, &filter).await.unwrap();
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.media.len(), 20);
        assert_eq!(page.media[0].title, "M20");
    }
}
