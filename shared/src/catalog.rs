//! Catalog snapshots: season status, show state, and the conversion from the
//! loosely typed data the request backend returns.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::season::{describe_seasons, MAX_SEASON_NUMBER};

/// Status of one season of a show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SeasonStatus {
    #[default]
    NotRequested,
    Pending,
    Processing,
    PartiallyAvailable,
    Available,
}

impl SeasonStatus {
    /// Map a backend media status code (`mediaInfo.status`, media seasons).
    pub fn from_media_status(code: i64) -> Self {
        match code {
            2 => SeasonStatus::Pending,
            3 => SeasonStatus::Processing,
            4 => SeasonStatus::PartiallyAvailable,
            5 => SeasonStatus::Available,
            // 1 unknown, 7 failed, anything else
            _ => SeasonStatus::NotRequested,
        }
    }

    /// Map a backend request status code (`request.status`, request seasons).
    pub fn from_request_status(code: i64) -> Self {
        match code {
            1 => SeasonStatus::Pending,
            2 => SeasonStatus::Processing,
            5 => SeasonStatus::Available,
            // 3 declined, 4 failed
            _ => SeasonStatus::NotRequested,
        }
    }

    /// Available or partially available.
    pub fn is_satisfied(self) -> bool {
        matches!(
            self,
            SeasonStatus::Available | SeasonStatus::PartiallyAvailable
        )
    }

    /// Pending approval or processing.
    pub fn is_in_progress(self) -> bool {
        matches!(self, SeasonStatus::Pending | SeasonStatus::Processing)
    }

    /// Anything other than not requested.
    pub fn is_tracked(self) -> bool {
        self != SeasonStatus::NotRequested
    }

    pub fn as_text(self) -> &'static str {
        match self {
            SeasonStatus::NotRequested => "Not Requested",
            SeasonStatus::Pending => "Pending Approval",
            SeasonStatus::Processing => "Processing/Downloading",
            SeasonStatus::PartiallyAvailable => "Partially Available",
            SeasonStatus::Available => "Available in Library",
        }
    }
}

impl FromStr for SeasonStatus {
    type Err = std::convert::Infallible;

    /// Unrecognized text maps to `NotRequested`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "pending" | "pending_approval" => SeasonStatus::Pending,
            "processing" | "approved" | "downloading" => SeasonStatus::Processing,
            "partially_available" | "partial" => SeasonStatus::PartiallyAvailable,
            "available" => SeasonStatus::Available,
            _ => SeasonStatus::NotRequested,
        };
        Ok(status)
    }
}

/// Which status table a numeric code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatusSource {
    /// Codes from the media endpoint.
    #[default]
    Media,
    /// Codes from the request endpoint.
    Request,
}

/// A status as the backend sends it: a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawStatus {
    Code(i64),
    Text(String),
}

impl RawStatus {
    pub fn resolve(&self, source: StatusSource) -> SeasonStatus {
        match (self, source) {
            (RawStatus::Code(code), StatusSource::Media) => SeasonStatus::from_media_status(*code),
            (RawStatus::Code(code), StatusSource::Request) => {
                SeasonStatus::from_request_status(*code)
            }
            (RawStatus::Text(text), _) => text.parse().unwrap_or_default(),
        }
    }
}

/// One season entry from the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSeason {
    pub season_number: Option<i64>,
    #[serde(default)]
    pub status: Option<RawStatus>,
}

/// Season data for a show as fetched by the catalog collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogShow {
    #[serde(default)]
    pub number_of_seasons: Option<u32>,
    #[serde(default)]
    pub seasons: Vec<RawSeason>,
    #[serde(default)]
    pub status_source: StatusSource,
}

/// Immutable snapshot of a show's seasons.
///
/// Season numbers above [`MAX_SEASON_NUMBER`] are dropped and the season
/// count is capped there.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ShowStateWire")]
pub struct ShowState {
    pub total_seasons: u32,
    pub seasons: BTreeMap<u32, SeasonStatus>,
}

/// `ShowState` as callers send it. Statuses may be unknown or null.
#[derive(Deserialize)]
struct ShowStateWire {
    #[serde(default)]
    total_seasons: u32,
    #[serde(default)]
    seasons: BTreeMap<u32, Option<RawStatus>>,
}

impl From<ShowStateWire> for ShowState {
    fn from(wire: ShowStateWire) -> Self {
        let seasons = wire.seasons.into_iter().map(|(season, status)| {
            let status = status
                .map(|s| s.resolve(StatusSource::Media))
                .unwrap_or_default();
            (season, status)
        });
        ShowState::new(wire.total_seasons, seasons)
    }
}

impl ShowState {
    pub fn new(total_seasons: u32, seasons: impl IntoIterator<Item = (u32, SeasonStatus)>) -> Self {
        let seasons: BTreeMap<u32, SeasonStatus> = seasons
            .into_iter()
            .filter(|(season, _)| (1..=MAX_SEASON_NUMBER).contains(season))
            .collect();

        let highest = seasons.keys().next_back().copied().unwrap_or(0);
        let total = total_seasons.max(highest);
        if total > MAX_SEASON_NUMBER {
            warn!(
                "Show reports {} seasons, capping at {}",
                total, MAX_SEASON_NUMBER
            );
        }

        Self {
            total_seasons: total.min(MAX_SEASON_NUMBER),
            seasons,
        }
    }

    /// Status of a season; unknown seasons are not requested.
    pub fn status(&self, season: u32) -> SeasonStatus {
        self.seasons.get(&season).copied().unwrap_or_default()
    }

    /// Season numbers `1..=total_seasons`.
    pub fn season_numbers(&self) -> impl Iterator<Item = u32> {
        1..=self.total_seasons
    }

    /// True when any season has been requested or is available.
    pub fn has_tracked_seasons(&self) -> bool {
        self.seasons.values().any(|status| status.is_tracked())
    }

    pub fn analysis(&self) -> SeasonAnalysis {
        SeasonAnalysis::of(self)
    }
}

impl From<CatalogShow> for ShowState {
    fn from(show: CatalogShow) -> Self {
        let mut seasons: BTreeMap<u32, SeasonStatus> = BTreeMap::new();

        for raw in show.seasons {
            let number = match raw.season_number.and_then(|n| u32::try_from(n).ok()) {
                Some(n) if (1..=MAX_SEASON_NUMBER).contains(&n) => n,
                _ => continue,
            };
            let status = raw
                .status
                .map(|s| s.resolve(show.status_source))
                .unwrap_or_default();

            // Several requests may cover the same season; keep the most advanced.
            let entry = seasons.entry(number).or_default();
            *entry = (*entry).max(status);
        }

        ShowState::new(show.number_of_seasons.unwrap_or(0), seasons)
    }
}

/// Summary of where each season of a show stands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonAnalysis {
    pub total_seasons: u32,
    pub available_seasons: BTreeSet<u32>,
    pub in_progress_seasons: BTreeSet<u32>,
    pub missing_seasons: BTreeSet<u32>,
    pub status_summary: String,
}

impl SeasonAnalysis {
    pub fn of(show: &ShowState) -> Self {
        let mut available_seasons = BTreeSet::new();
        let mut in_progress_seasons = BTreeSet::new();
        let mut missing_seasons = BTreeSet::new();

        for season in show.season_numbers() {
            let status = show.status(season);
            if status.is_satisfied() {
                available_seasons.insert(season);
            } else if status.is_in_progress() {
                in_progress_seasons.insert(season);
            } else {
                missing_seasons.insert(season);
            }
        }

        let mut parts = Vec::new();
        if !available_seasons.is_empty() {
            parts.push(status_clause(&available_seasons, "available"));
        }
        if !in_progress_seasons.is_empty() {
            parts.push(status_clause(&in_progress_seasons, "downloading or awaiting approval"));
        }
        let status_summary = if parts.is_empty() {
            "No seasons available yet".to_string()
        } else {
            parts.join("; ")
        };

        Self {
            total_seasons: show.total_seasons,
            available_seasons,
            in_progress_seasons,
            missing_seasons,
            status_summary,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing_seasons.is_empty()
    }
}

fn status_clause(seasons: &BTreeSet<u32>, state: &str) -> String {
    let verb = if seasons.len() == 1 { "is" } else { "are" };
    let mut described = describe_seasons(seasons);
    if let Some(first) = described.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    format!("{} {} {}", described, verb, state)
}
