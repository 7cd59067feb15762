//! Shared data models: catalog metadata and the payloads callers send.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogShow, RawStatus, SeasonStatus, ShowState, StatusSource};
use crate::permissions::CallerIdentity;

/// Longest overview echoed back before it is shortened.
const OVERVIEW_LIMIT: usize = 150;

/// Most genres echoed back.
const GENRE_LIMIT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn label(self) -> &'static str {
        match self {
            MediaType::Movie => "Movie",
            MediaType::Tv => "TV show",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub name: String,
}

/// Library entry attached to a catalog match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    /// Library id used for removal
    pub id: Option<u64>,
    pub status: Option<RawStatus>,
    pub status4k: Option<RawStatus>,
    pub media_url: Option<String>,
}

/// A catalog match as returned by the search and details endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    /// Catalog (TMDB) id
    #[serde(default)]
    pub id: u64,
    pub media_type: MediaType,
    pub title: Option<String>,
    pub name: Option<String>,
    pub release_date: Option<String>,
    pub first_air_date: Option<String>,
    pub vote_average: Option<f64>,
    pub overview: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    pub media_info: Option<MediaInfo>,
}

impl MediaMetadata {
    /// Movies carry a title, shows a name.
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("Unknown")
    }

    pub fn is_show(&self) -> bool {
        self.media_type == MediaType::Tv
    }

    /// Release year, or "Unknown".
    pub fn year(&self) -> String {
        let date = match self.release_date.as_deref().or(self.first_air_date.as_deref()) {
            Some(date) => date.trim(),
            None => return "Unknown".to_string(),
        };
        if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            return parsed.year().to_string();
        }
        match date.get(0..4) {
            Some(year) if year.chars().all(|c| c.is_ascii_digit()) => year.to_string(),
            _ => "Unknown".to_string(),
        }
    }

    /// Library status of the media as a whole.
    pub fn status(&self, is4k: bool) -> SeasonStatus {
        self.media_info
            .as_ref()
            .and_then(|info| if is4k { info.status4k.as_ref() } else { info.status.as_ref() })
            .map(|status| status.resolve(StatusSource::Media))
            .unwrap_or_default()
    }

    /// Library id, present once the media has been requested.
    pub fn library_id(&self) -> Option<u64> {
        self.media_info.as_ref().and_then(|info| info.id)
    }

    pub fn summary(&self, is4k: bool) -> MediaSummary {
        let overview = self.overview.as_deref().unwrap_or("").trim();
        let overview_short = if overview.chars().count() > OVERVIEW_LIMIT {
            let cut: String = overview.chars().take(OVERVIEW_LIMIT).collect();
            format!("{}...", cut.trim_end())
        } else {
            overview.to_string()
        };

        MediaSummary {
            title: self.display_title().to_string(),
            media_type: self.media_type,
            tmdb_id: self.id,
            year: self.year(),
            rating: self.vote_average.unwrap_or(0.0),
            overview_short,
            genres: self
                .genres
                .iter()
                .take(GENRE_LIMIT)
                .map(|g| g.name.clone())
                .collect(),
            status_text: self.status(is4k).as_text().to_string(),
            watch_url: self.media_info.as_ref().and_then(|info| info.media_url.clone()),
            requested_4k: is4k && self.media_type == MediaType::Movie,
        }
    }
}

/// Media fields echoed back in an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSummary {
    pub title: String,
    pub media_type: MediaType,
    pub tmdb_id: u64,
    pub year: String,
    pub rating: f64,
    pub overview_short: String,
    pub genres: Vec<String>,
    pub status_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_url: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub requested_4k: bool,
}

/// Result of the backend call the collaborator made on the core's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownstreamOutcome {
    /// The backend accepted the operation.
    Succeeded,
    /// The backend answered but refused or failed the operation.
    Failed { reason: String },
    /// The backend could not be reached.
    Unreachable { reason: String },
}

impl DownstreamOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self, DownstreamOutcome::Succeeded)
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            DownstreamOutcome::Succeeded => None,
            DownstreamOutcome::Failed { reason } | DownstreamOutcome::Unreachable { reason } => {
                Some(reason.as_str())
            }
        }
    }
}

/// Pick the show snapshot a caller supplied. The typed form wins over the
/// backend's raw season listing.
fn resolve_show(show_state: &Option<ShowState>, catalog_show: &Option<CatalogShow>) -> Option<ShowState> {
    show_state
        .clone()
        .or_else(|| catalog_show.clone().map(ShowState::from))
}

/// "Resolve media request" payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaRequestInput {
    #[serde(default)]
    pub title: String,
    pub season_text: Option<String>,
    #[serde(default)]
    pub is4k: bool,
    #[serde(default)]
    pub caller: CallerIdentity,
    pub show_state: Option<ShowState>,
    pub catalog_show: Option<CatalogShow>,
    pub media_metadata: Option<MediaMetadata>,
    pub downstream: Option<DownstreamOutcome>,
}

impl MediaRequestInput {
    pub fn show(&self) -> Option<ShowState> {
        resolve_show(&self.show_state, &self.catalog_show)
    }
}

/// Media status check payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusCheckInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub caller: CallerIdentity,
    pub show_state: Option<ShowState>,
    pub catalog_show: Option<CatalogShow>,
    pub media_metadata: Option<MediaMetadata>,
    /// Outcome of the catalog lookup
    pub lookup: Option<DownstreamOutcome>,
}

impl StatusCheckInput {
    pub fn show(&self) -> Option<ShowState> {
        resolve_show(&self.show_state, &self.catalog_show)
    }
}

/// Media removal payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemovalInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub caller: CallerIdentity,
    pub media_metadata: Option<MediaMetadata>,
    /// Outcome of the delete call, if one was made
    pub downstream: Option<DownstreamOutcome>,
}
