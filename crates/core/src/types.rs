use serde::{Deserialize, Serialize};

/// Media kind stored in the `media.kind` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    #[serde(rename = "movie")]
    Movie,
    #[serde(rename = "tv-show")]
    TvShow,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::TvShow => "tv-show",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "movie" => Some(Self::Movie),
            "tv-show" => Some(Self::TvShow),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog sort order. At most one applies to a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    RatingDesc,
    YearDesc,
    TitleAsc,
}

impl SortBy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RatingDesc => "rating_desc",
            Self::YearDesc => "year_desc",
            Self::TitleAsc => "title_asc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rating_desc" => Some(Self::RatingDesc),
            "year_desc" => Some(Self::YearDesc),
            "title_asc" => Some(Self::TitleAsc),
            _ => None,
        }
    }
}

impl std::fmt::Display for SortBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
