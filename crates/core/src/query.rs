//! Catalog browse parameters.
//!
//! Raw query-string values are parsed leniently: anything missing, blank,
//! a sentinel (`All`, `0`) or malformed means "no filter" rather than an
//! error. The parsed [`BrowseFilter`] is then flattened into independent
//! [`Predicate`]s that the store ANDs together.

use crate::types::{MediaKind, SortBy};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Sentinel meaning "any value" for the genre and type filters.
const ALL: &str = "All";

/// Query string as received. Every field is kept as text so a bad value
/// can be ignored instead of failing extraction.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BrowseParams {
    pub genre: Option<String>,
    pub kind: Option<String>,
    pub year: Option<String>,
    pub query: Option<String>,
    pub sort_by: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub featured: Option<String>,
}

impl BrowseParams {
    /// Build from raw query-string pairs. The first occurrence of a key
    /// wins and unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "genre" => &mut params.genre,
                "type" => &mut params.kind,
                "year" => &mut params.year,
                "query" => &mut params.query,
                "sortBy" => &mut params.sort_by,
                "page" => &mut params.page,
                "limit" => &mut params.limit,
                "featured" => &mut params.featured,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        params
    }
}

/// 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Page {
    pub fn first(size: u32) -> Self {
        Self { number: 1, size }
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.number.saturating_sub(1)) * i64::from(self.size)
    }

    /// `ceil(total / size)`; zero when nothing matched.
    pub fn total_pages(&self, total: i64) -> i64 {
        if total <= 0 || self.size == 0 {
            return 0;
        }
        let size = i64::from(self.size);
        (total + size - 1) / size
    }
}

/// Parsed browse request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrowseFilter {
    /// Exact genre tag. `None` when absent, blank or `All`.
    pub genre: Option<String>,
    /// `None` when absent, `All` or not a known kind.
    pub kind: Option<MediaKind>,
    /// Exact release year. `None` when absent, zero, negative or non-numeric.
    pub year: Option<i32>,
    /// Case-insensitive title substring. `None` when absent or blank.
    pub query: Option<String>,
    /// `None` unless the raw value was literally `true` or `false`.
    pub featured: Option<bool>,
    /// `None` means insertion order.
    pub sort_by: Option<SortBy>,
    pub page: Page,
}

/// One independent condition of a browse query.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    HasGenre(String),
    KindIs(MediaKind),
    ReleasedIn(i32),
    TitleContains(String),
    FeaturedIs(bool),
}

impl BrowseFilter {
    pub fn from_params(params: &BrowseParams) -> Self {
        let genre = non_blank(params.genre.as_deref())
            .filter(|g| *g != ALL)
            .map(str::to_string);

        let kind = non_blank(params.kind.as_deref()).and_then(MediaKind::parse);

        let year = non_blank(params.year.as_deref())
            .and_then(|y| y.parse::<i32>().ok())
            .filter(|y| *y > 0);

        let query = non_blank(params.query.as_deref()).map(str::to_string);

        let featured = match non_blank(params.featured.as_deref()) {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        };

        let sort_by = non_blank(params.sort_by.as_deref()).and_then(SortBy::parse);

        let number = parse_positive(params.page.as_deref()).unwrap_or(1);
        let size = parse_positive(params.limit.as_deref())
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);

        Self {
            genre,
            kind,
            year,
            query,
            featured,
            sort_by,
            page: Page { number, size },
        }
    }

    pub fn predicates(&self) -> Vec<Predicate> {
        let mut out = Vec::new();
        if let Some(genre) = &self.genre {
            out.push(Predicate::HasGenre(genre.clone()));
        }
        if let Some(kind) = self.kind {
            out.push(Predicate::KindIs(kind));
        }
        if let Some(year) = self.year {
            out.push(Predicate::ReleasedIn(year));
        }
        if let Some(query) = &self.query {
            out.push(Predicate::TitleContains(query.clone()));
        }
        if let Some(featured) = self.featured {
            out.push(Predicate::FeaturedIs(featured));
        }
        out
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_positive(raw: Option<&str>) -> Option<u32> {
    non_blank(raw)
        .and_then(|s| s.parse::<u32>().ok())
        .filter(|n| *n > 0)
}
