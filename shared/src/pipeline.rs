//! The caller-facing flows: request, status check, and removal.
//!
//! Each flow resolves the caller, authorizes the operation, runs the pure
//! engine over the snapshots the caller supplied, and returns one envelope.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::catalog::ShowState;
use crate::envelope::{self, EnvelopeInput, ResponseEnvelope};
use crate::models::{
    DownstreamOutcome, MediaMetadata, MediaRequestInput, MediaType, RemovalInput, StatusCheckInput,
};
use crate::permissions::{AuthDecision, OperationKind, PermissionGate, UserContext, UserMappings};
use crate::reconcile::{reconcile, RequestDecision};
use crate::season::{self, SeasonExpression};

/// A request that has been parsed, authorized, and reconciled, waiting for
/// the backend call.
#[derive(Debug, Clone)]
pub struct MediaRequestPlan {
    pub user: UserContext,
    pub auth: AuthDecision,
    /// Title with any season phrase removed
    pub title: String,
    pub expression: SeasonExpression,
    pub show: Option<ShowState>,
    pub decision: Option<RequestDecision>,
    pub media: Option<MediaMetadata>,
    pub is4k: bool,
}

impl MediaRequestPlan {
    /// True when the backend should be asked to add something.
    pub fn needs_backend_request(&self) -> bool {
        if !self.auth.is_allowed() || self.title.is_empty() || self.expression.is_invalid() {
            return false;
        }
        match (&self.media, &self.decision) {
            (Some(_), Some(decision)) => !decision.to_request.is_empty(),
            (Some(media), None) => {
                media.media_type == MediaType::Movie && !media.status(self.is4k).is_tracked()
            }
            (None, _) => false,
        }
    }

    /// Seasons the backend request should carry. Empty for movies.
    pub fn seasons_to_request(&self) -> BTreeSet<u32> {
        self.decision
            .as_ref()
            .map(|d| d.to_request.clone())
            .unwrap_or_default()
    }

    /// Turn the plan and the backend outcome into the caller's envelope.
    pub fn finish(self, outcome: Option<DownstreamOutcome>) -> ResponseEnvelope {
        if self.auth.is_allowed() && self.title.is_empty() {
            return ResponseEnvelope::missing_title(&self.user);
        }

        envelope::build(EnvelopeInput {
            title: &self.title,
            decision: self.decision.as_ref(),
            expression: Some(&self.expression),
            auth: &self.auth,
            media: self.media.as_ref(),
            show: self.show.as_ref(),
            user: &self.user,
            downstream: outcome.as_ref(),
            is4k: self.is4k,
        })
    }
}

/// Parse, authorize, and reconcile a request without finishing it.
pub fn plan_media_request(
    input: &MediaRequestInput,
    gate: &PermissionGate,
    mappings: &UserMappings,
) -> MediaRequestPlan {
    let user = UserContext::resolve(&input.caller, mappings);
    let auth = gate.authorize(&user, OperationKind::Write);

    let season_text = input.season_text.as_deref().map(str::trim).unwrap_or("");
    let (title, mut expression) = if season_text.is_empty() {
        season::extract_season_from_title(&input.title)
    } else {
        (input.title.trim().to_string(), season::parse(season_text))
    };

    let media = input.media_metadata.clone();
    let is_movie = media.as_ref().map(|m| m.media_type) == Some(MediaType::Movie);
    if is_movie {
        // Season phrases mean nothing for a movie.
        expression = SeasonExpression::Unspecified;
    }

    let mut show = input.show();
    let decision = match (&media, &expression) {
        (None, _) => None,
        (Some(_), _) if is_movie => None,
        (Some(_), SeasonExpression::Invalid(_)) => None,
        (Some(_), expression) => {
            if show.is_none() {
                show = assumed_show(expression);
            }
            show.as_ref().map(|show| reconcile(expression, show))
        }
    };

    info!(
        "Planned request for '{}' by {}: {} (allowed: {})",
        title,
        user.display_name,
        expression,
        auth.is_allowed()
    );

    MediaRequestPlan {
        user,
        auth,
        title,
        expression,
        show,
        decision,
        media,
        is4k: input.is4k,
    }
}

/// Without season data only explicit season numbers can be resolved; treat
/// the show as having exactly those seasons, none of them tracked.
fn assumed_show(expression: &SeasonExpression) -> Option<ShowState> {
    let highest = match expression {
        SeasonExpression::Unspecified => 1,
        SeasonExpression::Explicit(seasons) => *seasons.iter().next_back()?,
        _ => return None,
    };
    debug!("No show state supplied, assuming {} seasons", highest);
    Some(ShowState::new(highest, []))
}

/// Resolve a media request end to end.
pub fn resolve_media_request(
    input: &MediaRequestInput,
    gate: &PermissionGate,
    mappings: &UserMappings,
) -> ResponseEnvelope {
    plan_media_request(input, gate, mappings).finish(input.downstream.clone())
}

/// Report where a title stands in the library.
pub fn check_media_status(
    input: &StatusCheckInput,
    gate: &PermissionGate,
    mappings: &UserMappings,
) -> ResponseEnvelope {
    let user = UserContext::resolve(&input.caller, mappings);
    let title = input.title.trim();
    if title.is_empty() {
        return ResponseEnvelope::missing_title(&user);
    }

    let auth = gate.authorize(&user, OperationKind::Read);
    let show = input.show();
    envelope::build_status_report(
        title,
        &auth,
        input.media_metadata.as_ref(),
        show.as_ref(),
        &user,
        input.lookup.as_ref(),
    )
}

/// Report the outcome of removing a title from the library.
pub fn remove_media(
    input: &RemovalInput,
    gate: &PermissionGate,
    mappings: &UserMappings,
) -> ResponseEnvelope {
    let user = UserContext::resolve(&input.caller, mappings);
    let title = input.title.trim();
    if title.is_empty() {
        return ResponseEnvelope::missing_title(&user);
    }

    let auth = gate.authorize(&user, OperationKind::Write);
    envelope::build_removal_report(
        title,
        &auth,
        input.media_metadata.as_ref(),
        &user,
        input.downstream.as_ref(),
    )
}
