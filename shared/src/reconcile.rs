//! Reconciles a parsed season expression against a show's current state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{SeasonStatus, ShowState};
use crate::season::SeasonExpression;

/// What to do with each season a request touched.
///
/// The four sets are pairwise disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDecision {
    /// Seasons to send to the backend.
    pub to_request: BTreeSet<u32>,
    /// Available or partially available.
    pub already_satisfied: BTreeSet<u32>,
    /// Pending or processing; never re-requested.
    pub already_pending: BTreeSet<u32>,
    /// Higher than the show's season count.
    pub out_of_range: BTreeSet<u32>,
    /// Nothing left to request and nothing out of range.
    pub is_noop: bool,
}

impl RequestDecision {
    /// Every season number the decision considered.
    pub fn considered(&self) -> BTreeSet<u32> {
        self.to_request
            .iter()
            .chain(&self.already_satisfied)
            .chain(&self.already_pending)
            .chain(&self.out_of_range)
            .copied()
            .collect()
    }

    fn partition(seasons: impl IntoIterator<Item = u32>, show: &ShowState) -> Self {
        let mut decision = RequestDecision::default();

        for season in seasons {
            if season > show.total_seasons {
                decision.out_of_range.insert(season);
                continue;
            }
            match show.status(season) {
                SeasonStatus::Available | SeasonStatus::PartiallyAvailable => {
                    decision.already_satisfied.insert(season);
                }
                SeasonStatus::Pending | SeasonStatus::Processing => {
                    decision.already_pending.insert(season);
                }
                SeasonStatus::NotRequested => {
                    decision.to_request.insert(season);
                }
            }
        }

        decision.is_noop = decision.to_request.is_empty() && decision.out_of_range.is_empty();
        decision
    }
}

/// Decide which seasons to request.
pub fn reconcile(expression: &SeasonExpression, show: &ShowState) -> RequestDecision {
    let decision = match expression {
        SeasonExpression::Unspecified => RequestDecision::partition([1], show),
        SeasonExpression::Explicit(seasons) => {
            RequestDecision::partition(seasons.iter().copied(), show)
        }
        SeasonExpression::AllSeasons => RequestDecision::partition(show.season_numbers(), show),
        SeasonExpression::RemainingSeasons => RequestDecision::partition(
            show.season_numbers()
                .filter(|season| !show.status(*season).is_tracked()),
            show,
        ),
        SeasonExpression::NextSeason => RequestDecision::partition(
            show.season_numbers()
                .find(|season| !show.status(*season).is_tracked()),
            show,
        ),
        // Surfaced by the envelope builder as a parse failure.
        SeasonExpression::Invalid(_) => RequestDecision::default(),
    };

    debug!(
        "Reconciled {} against {} seasons: request {:?}, satisfied {:?}, pending {:?}, out of range {:?}",
        expression,
        show.total_seasons,
        decision.to_request,
        decision.already_satisfied,
        decision.already_pending,
        decision.out_of_range
    );
    decision
}
