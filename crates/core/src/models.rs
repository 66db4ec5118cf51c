use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::MediaKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSource {
    pub quality: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Episode {
    pub episode_number: i32,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    #[serde(default)]
    pub video_sources: Vec<VideoSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Season {
    pub season_number: i32,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

/// A catalogued movie or TV show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub description: String,
    pub genres: Vec<String>,
    pub poster_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hero_url: Option<String>,
    pub trailer_url: String,
    pub rating: f64,
    pub release_year: i32,
    pub featured: bool,
    pub video_sources: Vec<VideoSource>,
    pub seasons: Vec<Season>,
}

/// Catalog ingestion payload. Same shape as [`MediaItem`] minus the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMedia {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub poster_url: String,
    #[serde(default)]
    pub hero_url: Option<String>,
    #[serde(default)]
    pub trailer_url: String,
    #[serde(default)]
    pub rating: f64,
    pub release_year: i32,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub video_sources: Vec<VideoSource>,
    #[serde(default)]
    pub seasons: Vec<Season>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("a movie cannot have seasons")]
    MovieWithSeasons,
    #[error("a tv show carries video sources on its episodes, not on the show")]
    ShowWithVideoSources,
    #[error("season {0} appears more than once")]
    DuplicateSeason(i32),
    #[error("episode {episode} appears more than once in season {season}")]
    DuplicateEpisode { season: i32, episode: i32 },
}

impl NewMedia {
    /// Check the movie/show shape and put seasons in `season_number` order.
    ///
    /// Episode and video source order is left as given.
    pub fn normalize(&mut self) -> Result<(), ShapeError> {
        match self.kind {
            MediaKind::Movie if !self.seasons.is_empty() => {
                return Err(ShapeError::MovieWithSeasons);
            }
            MediaKind::TvShow if !self.video_sources.is_empty() => {
                return Err(ShapeError::ShowWithVideoSources);
            }
            _ => {}
        }

        self.seasons.sort_by_key(|s| s.season_number);
        for pair in self.seasons.windows(2) {
            if pair[0].season_number == pair[1].season_number {
                return Err(ShapeError::DuplicateSeason(pair[0].season_number));
            }
        }

        for season in &self.seasons {
            let mut seen = std::collections::HashSet::new();
            for ep in &season.episodes {
                if !seen.insert(ep.episode_number) {
                    return Err(ShapeError::DuplicateEpisode {
                        season: season.season_number,
                        episode: ep.episode_number,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Per-account progress checkpoint for one media item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchHistoryEntry {
    pub media_id: String,
    pub progress: f64,
    pub last_watched: DateTime<Utc>,
}

/// The few media fields shown next to a history entry on a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaSummary {
    pub id: String,
    pub title: String,
    pub poster_url: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
}

/// Named homepage grouping. Derived per request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collection {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub items: Vec<MediaItem>,
}
