//! Response envelopes.
//!
//! Every core call ends in exactly one [`ResponseEnvelope`]. The action code
//! is chosen deterministically from the authorization result, the parsed
//! season expression, the catalog match, the reconciliation decision, and the
//! downstream outcome, in that order. Messages are self-contained so an
//! assistant can relay them without reading the other fields.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{SeasonAnalysis, ShowState};
use crate::models::{DownstreamOutcome, MediaMetadata, MediaSummary, MediaType};
use crate::permissions::{AuthDecision, UserContext};
use crate::reconcile::RequestDecision;
use crate::season::{describe_seasons, SeasonExpression};

/// Closed set of outcomes reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCode {
    FoundMedia,
    NotFound,
    MediaAddedSuccessfully,
    SeasonRequested,
    MediaAlreadyExistsFully,
    SeasonOutOfRange,
    InvalidSeasonExpression,
    AuthDenied,
    ConnectionError,
    MissingTitle,
    RemovalFailed,
    MediaRemoved,
    UnknownResult,
}

impl ActionCode {
    /// Actions that carry a primary result rather than errors.
    pub fn is_success(self) -> bool {
        matches!(
            self,
            ActionCode::FoundMedia
                | ActionCode::MediaAddedSuccessfully
                | ActionCode::SeasonRequested
                | ActionCode::MediaAlreadyExistsFully
                | ActionCode::MediaRemoved
        )
    }
}

/// Payload attached to success actions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrimaryResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaSummary>,
    pub requested_seasons: BTreeSet<u32>,
    pub already_satisfied: BTreeSet<u32>,
    pub already_pending: BTreeSet<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season_analysis: Option<SeasonAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_identity: Option<String>,
}

/// Follow-up guidance for the assistant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestions {
    pub items: Vec<String>,
}

/// Raw failure details attached to failure actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub reason: String,
    #[serde(skip_serializing_if = "BTreeSet::is_empty", default)]
    pub out_of_range: BTreeSet<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_seasons: Option<u32>,
}

impl ErrorDetails {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            out_of_range: BTreeSet::new(),
            total_seasons: None,
        }
    }
}

/// The single structured result of a core call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub action: ActionCode,
    pub message: String,
    pub user_context: UserContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_result: Option<PrimaryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Suggestions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorDetails>,
}

impl ResponseEnvelope {
    fn new(action: ActionCode, message: impl Into<String>, user: &UserContext) -> Self {
        Self {
            action,
            message: message.into(),
            user_context: user.clone(),
            primary_result: None,
            suggestions: None,
            errors: None,
        }
    }

    fn with_primary(mut self, primary: PrimaryResult) -> Self {
        self.primary_result = Some(primary);
        self
    }

    fn with_errors(mut self, errors: ErrorDetails) -> Self {
        self.errors = Some(errors);
        self
    }

    fn with_suggestions(mut self, items: Vec<String>) -> Self {
        if !items.is_empty() {
            self.suggestions = Some(Suggestions { items });
        }
        self
    }

    fn logged(self) -> Self {
        info!(
            "Responding with {:?} for {}: {}",
            self.action, self.user_context.display_name, self.message
        );
        self
    }

    /// Envelope for a call that arrived without a title.
    pub fn missing_title(user: &UserContext) -> Self {
        Self::new(
            ActionCode::MissingTitle,
            "Please provide a movie or TV show title.",
            user,
        )
        .with_errors(ErrorDetails::new("no title provided"))
        .logged()
    }

    /// Envelope for a payload that could not be decoded.
    pub fn rejected_payload(user: &UserContext, reason: &str) -> Self {
        Self::new(
            ActionCode::UnknownResult,
            format!("The request could not be understood: {}.", reason),
            user,
        )
        .with_errors(ErrorDetails::new(reason))
        .logged()
    }

    fn auth_denied(reason: &str, user: &UserContext) -> Self {
        Self::new(ActionCode::AuthDenied, reason, user)
            .with_errors(ErrorDetails::new(reason))
            .with_suggestions(vec![
                "Contact your system administrator to map your account to a media request user."
                    .to_string(),
            ])
            .logged()
    }

    fn not_found(title: &str, user: &UserContext) -> Self {
        Self::new(
            ActionCode::NotFound,
            format!("No movies or TV shows found matching '{}'.", title),
            user,
        )
        .with_errors(ErrorDetails::new("no catalog match"))
        .with_suggestions(vec![
            "Check the spelling or try the original release title.".to_string(),
        ])
        .logged()
    }

    fn connection_error(title: &str, reason: &str, user: &UserContext) -> Self {
        Self::new(
            ActionCode::ConnectionError,
            format!(
                "Couldn't complete the operation for '{}' because the media request service failed: {}.",
                title, reason
            ),
            user,
        )
        .with_errors(ErrorDetails::new(reason))
        .with_suggestions(vec![
            "Verify the media request server is running.".to_string(),
            "Check the server URL and API key configuration.".to_string(),
        ])
        .logged()
    }
}

/// Everything the builder looks at for a request call.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeInput<'a> {
    /// Title as the caller typed it, cleaned of season phrases
    pub title: &'a str,
    pub decision: Option<&'a RequestDecision>,
    pub expression: Option<&'a SeasonExpression>,
    pub auth: &'a AuthDecision,
    pub media: Option<&'a MediaMetadata>,
    /// Snapshot the decision was reconciled against
    pub show: Option<&'a ShowState>,
    pub user: &'a UserContext,
    pub downstream: Option<&'a DownstreamOutcome>,
    pub is4k: bool,
}

impl EnvelopeInput<'_> {
    fn display_title(&self) -> &str {
        self.media.map(MediaMetadata::display_title).unwrap_or(self.title)
    }

    fn is_movie(&self) -> bool {
        self.media.map(|m| m.media_type) == Some(MediaType::Movie)
    }

    fn downstream_failed(&self) -> bool {
        self.downstream.is_some_and(DownstreamOutcome::is_failure)
    }
}

/// Pick the action code for a request call. First matching rule wins.
pub fn select_action(input: &EnvelopeInput<'_>) -> ActionCode {
    if !input.auth.is_allowed() {
        return ActionCode::AuthDenied;
    }
    if input.expression.is_some_and(SeasonExpression::is_invalid) {
        return ActionCode::InvalidSeasonExpression;
    }
    if input.media.is_none() && !input.downstream_failed() {
        return ActionCode::NotFound;
    }

    match input.decision {
        Some(decision) if decision.is_noop => return ActionCode::MediaAlreadyExistsFully,
        Some(decision) if decision.to_request.is_empty() && !decision.out_of_range.is_empty() => {
            return ActionCode::SeasonOutOfRange
        }
        None if input.is_movie()
            && input.media.is_some_and(|m| m.status(input.is4k).is_tracked()) =>
        {
            return ActionCode::MediaAlreadyExistsFully
        }
        _ => {}
    }

    if input.downstream == Some(&DownstreamOutcome::Succeeded) {
        match input.decision {
            Some(decision) if !decision.to_request.is_empty() => {
                let had_tracked = input.show.is_some_and(ShowState::has_tracked_seasons);
                return if had_tracked {
                    ActionCode::SeasonRequested
                } else {
                    ActionCode::MediaAddedSuccessfully
                };
            }
            None if input.is_movie() => return ActionCode::MediaAddedSuccessfully,
            _ => {}
        }
    }

    if input.downstream_failed() {
        return ActionCode::ConnectionError;
    }
    ActionCode::UnknownResult
}

/// Assemble the envelope for a request call.
pub fn build(input: EnvelopeInput<'_>) -> ResponseEnvelope {
    let action = select_action(&input);
    let title = input.display_title();
    let user = input.user;

    match action {
        ActionCode::AuthDenied => {
            ResponseEnvelope::auth_denied(input.auth.denial_reason().unwrap_or_default(), user)
        }
        ActionCode::InvalidSeasonExpression => {
            let reason = match input.expression {
                Some(SeasonExpression::Invalid(reason)) => reason.as_str(),
                _ => crate::season::UNPARSEABLE,
            };
            ResponseEnvelope::new(
                action,
                format!(
                    "I couldn't tell which seasons of '{}' you want ({}). Try 'season 2', 'seasons 1 to 3', 'all seasons', 'remaining seasons' or 'next season'.",
                    title, reason
                ),
                user,
            )
            .with_errors(ErrorDetails::new(reason))
            .with_suggestions(vec![
                "Rephrase the season request with numbers, e.g. 'seasons 1 and 2'.".to_string(),
            ])
            .logged()
        }
        ActionCode::NotFound => ResponseEnvelope::not_found(title, user),
        ActionCode::MediaAlreadyExistsFully => already_exists(&input, title),
        ActionCode::SeasonOutOfRange => out_of_range(&input, title),
        ActionCode::MediaAddedSuccessfully | ActionCode::SeasonRequested => {
            requested(&input, action, title)
        }
        ActionCode::ConnectionError => {
            let reason = input
                .downstream
                .and_then(DownstreamOutcome::failure_reason)
                .unwrap_or("unknown failure");
            ResponseEnvelope::connection_error(title, reason, user)
        }
        _ => unknown_result(&input, title),
    }
}

fn primary_result(input: &EnvelopeInput<'_>) -> PrimaryResult {
    let decision = input.decision.cloned().unwrap_or_default();
    PrimaryResult {
        media: input.media.map(|m| m.summary(input.is4k)),
        requested_seasons: decision.to_request,
        already_satisfied: decision.already_satisfied,
        already_pending: decision.already_pending,
        season_analysis: input.show.map(ShowState::analysis),
        backend_identity: input.auth.backend_identity().map(String::from),
    }
}

/// "Seasons 1 and 2 are", "Season 3 is".
fn seasons_subject(seasons: &BTreeSet<u32>) -> String {
    let verb = if seasons.len() == 1 { "is" } else { "are" };
    format!("{} {}", capitalized(&describe_seasons(seasons)), verb)
}

fn capitalized(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Suggest the seasons that would still be missing, grouped by how many.
fn missing_seasons_suggestion(missing: &BTreeSet<u32>) -> Option<String> {
    let first = missing.iter().next()?;
    let last = missing.iter().next_back()?;
    let suggestion = match missing.len() {
        1 => format!("Request season {}", first),
        2 | 3 => format!(
            "Request seasons {}",
            missing.iter().map(u32::to_string).collect::<Vec<_>>().join(", ")
        ),
        n => format!("Request the remaining {} seasons ({}-{})", n, first, last),
    };
    Some(suggestion)
}

/// Seasons still not requested once this call's request goes through.
fn still_missing(input: &EnvelopeInput<'_>) -> BTreeSet<u32> {
    let requested = input.decision.map(|d| &d.to_request);
    input
        .show
        .map(|show| {
            show.analysis()
                .missing_seasons
                .into_iter()
                .filter(|s| requested.map_or(true, |r| !r.contains(s)))
                .collect()
        })
        .unwrap_or_default()
}

fn already_exists(input: &EnvelopeInput<'_>, title: &str) -> ResponseEnvelope {
    let mut suggestions = Vec::new();

    let message = match (input.decision, input.media) {
        (None, Some(media)) => {
            let mut message = format!(
                "{} '{}' is already in the media request system ({}).",
                media.media_type.label(),
                title,
                media.status(input.is4k).as_text()
            );
            if input.is4k {
                message.push_str(" The 4K version was checked.");
            }
            message
        }
        (Some(decision), _)
            if decision.considered().is_empty()
                && input.show.is_some_and(|show| show.total_seasons == 0) =>
        {
            format!(
                "The catalog lists no seasons for '{}' yet, so there is nothing to request.",
                title
            )
        }
        (Some(decision), _) => {
            let catalog_driven = input
                .expression
                .is_some_and(SeasonExpression::resolves_against_catalog);
            let summary = input
                .show
                .map(|show| show.analysis().status_summary)
                .unwrap_or_else(|| "no season details".to_string());

            if catalog_driven {
                format!(
                    "Every season of '{}' is already requested or available, so there is nothing left to request ({}).",
                    title, summary
                )
            } else {
                let mut parts = Vec::new();
                if !decision.already_satisfied.is_empty() {
                    parts.push(format!(
                        "{} already available",
                        seasons_subject(&decision.already_satisfied)
                    ));
                }
                if !decision.already_pending.is_empty() {
                    parts.push(format!(
                        "{} already requested and in progress",
                        seasons_subject(&decision.already_pending)
                    ));
                }
                if parts.is_empty() {
                    parts.push(summary);
                }
                format!("Nothing new to request for '{}': {}.", title, parts.join("; "))
            }
        }
        (None, None) => format!("'{}' already exists in the media request system.", title),
    };

    if let Some(suggestion) = missing_seasons_suggestion(&still_missing(input)) {
        suggestions.push(suggestion);
    }

    ResponseEnvelope::new(ActionCode::MediaAlreadyExistsFully, message, input.user)
        .with_primary(primary_result(input))
        .with_suggestions(suggestions)
        .logged()
}

fn out_of_range(input: &EnvelopeInput<'_>, title: &str) -> ResponseEnvelope {
    let decision = input.decision.cloned().unwrap_or_default();
    let total = input.show.map(|s| s.total_seasons).unwrap_or(0);

    let noun = if total == 1 { "season" } else { "seasons" };
    let verb = if decision.out_of_range.len() == 1 { "does" } else { "do" };
    let mut message = format!(
        "'{}' only has {} {}, so {} {} not exist.",
        title,
        total,
        noun,
        describe_seasons(&decision.out_of_range),
        verb
    );
    if !decision.already_satisfied.is_empty() {
        message.push_str(&format!(
            " {} already available.",
            seasons_subject(&decision.already_satisfied)
        ));
    }
    if !decision.already_pending.is_empty() {
        message.push_str(&format!(
            " {} already in progress.",
            seasons_subject(&decision.already_pending)
        ));
    }

    let mut suggestions = Vec::new();
    if total > 0 {
        suggestions.push(format!("Pick a season between 1 and {}", total));
    }
    if let Some(suggestion) = missing_seasons_suggestion(&still_missing(input)) {
        suggestions.push(suggestion);
    }

    ResponseEnvelope::new(ActionCode::SeasonOutOfRange, message, input.user)
        .with_errors(ErrorDetails {
            reason: "requested seasons exceed the show's season count".to_string(),
            out_of_range: decision.out_of_range,
            total_seasons: Some(total),
        })
        .with_suggestions(suggestions)
        .logged()
}

fn requested(input: &EnvelopeInput<'_>, action: ActionCode, title: &str) -> ResponseEnvelope {
    let mut suggestions = Vec::new();

    let message = match input.decision {
        Some(decision) => {
            let mut message = format!(
                "Requested {} of '{}'",
                describe_seasons(&decision.to_request),
                title
            );
            match input.expression {
                Some(SeasonExpression::Unspecified) | None => {
                    message.push_str(". No season was specified, so season 1 was requested.")
                }
                Some(SeasonExpression::AllSeasons) => message.push_str(" (all seasons)."),
                Some(SeasonExpression::RemainingSeasons) => {
                    message.push_str(" (the remaining seasons).")
                }
                Some(SeasonExpression::NextSeason) => message.push_str(" (the next season)."),
                Some(_) => message.push('.'),
            }
            if !decision.already_pending.is_empty() {
                let verb = if decision.already_pending.len() == 1 { "was" } else { "were" };
                message.push_str(&format!(
                    " {} already in progress and {} not requested again.",
                    seasons_subject(&decision.already_pending),
                    verb
                ));
            }
            if !decision.already_satisfied.is_empty() {
                message.push_str(&format!(
                    " {} already available.",
                    seasons_subject(&decision.already_satisfied)
                ));
                suggestions.push(format!(
                    "{} already available to watch.",
                    seasons_subject(&decision.already_satisfied)
                ));
            }
            if !decision.out_of_range.is_empty() {
                let verb = if decision.out_of_range.len() == 1 { "does" } else { "do" };
                message.push_str(&format!(
                    " {} {} not exist and {} skipped.",
                    capitalized(&describe_seasons(&decision.out_of_range)),
                    verb,
                    if decision.out_of_range.len() == 1 { "was" } else { "were" }
                ));
            }
            if let Some(suggestion) = missing_seasons_suggestion(&still_missing(input)) {
                suggestions.push(suggestion);
            }
            message
        }
        None if input.is4k => format!("'{}' was successfully requested in 4K quality.", title),
        None => format!("'{}' was successfully requested.", title),
    };

    suggestions.push(format!(
        "Ask for the status of '{}' to follow the download.",
        title
    ));

    ResponseEnvelope::new(action, message, input.user)
        .with_primary(primary_result(input))
        .with_suggestions(suggestions)
        .logged()
}

fn unknown_result(input: &EnvelopeInput<'_>, title: &str) -> ResponseEnvelope {
    let pending_request = input.decision.filter(|d| !d.to_request.is_empty());
    let (message, reason) = match (pending_request, input.downstream) {
        (Some(decision), None) => (
            format!(
                "{} of '{}' can be requested, but no result from the media request service was reported.",
                capitalized(&describe_seasons(&decision.to_request)),
                title
            ),
            "no downstream outcome reported",
        ),
        (None, None) if input.is_movie() => (
            format!(
                "'{}' can be requested, but no result from the media request service was reported.",
                title
            ),
            "no downstream outcome reported",
        ),
        (None, _) if input.media.is_some_and(MediaMetadata::is_show) && input.show.is_none() => (
            format!(
                "Season details for '{}' were not available, so the season request could not be resolved.",
                title
            ),
            "show state required to resolve season expression",
        ),
        _ => (
            format!(
                "The request for '{}' finished without a recognizable outcome.",
                title
            ),
            "no recognizable outcome",
        ),
    };

    ResponseEnvelope::new(ActionCode::UnknownResult, message, input.user)
        .with_errors(ErrorDetails::new(reason))
        .logged()
}

/// Envelope for a media status check.
pub fn build_status_report(
    title: &str,
    auth: &AuthDecision,
    media: Option<&MediaMetadata>,
    show: Option<&ShowState>,
    user: &UserContext,
    lookup: Option<&DownstreamOutcome>,
) -> ResponseEnvelope {
    if let Some(reason) = auth.denial_reason() {
        return ResponseEnvelope::auth_denied(reason, user);
    }
    if let Some(reason) = lookup.and_then(DownstreamOutcome::failure_reason) {
        return ResponseEnvelope::connection_error(title, reason, user);
    }
    let Some(media) = media else {
        return ResponseEnvelope::not_found(title, user);
    };

    let display = media.display_title();
    let analysis = show.filter(|_| media.is_show()).map(ShowState::analysis);
    let message = match &analysis {
        Some(analysis) => format!(
            "'{}' ({}) has {} {}: {}.",
            display,
            media.year(),
            analysis.total_seasons,
            if analysis.total_seasons == 1 { "season" } else { "seasons" },
            analysis.status_summary
        ),
        None => format!(
            "{} '{}' ({}) is {}.",
            media.media_type.label(),
            display,
            media.year(),
            media.status(false).as_text()
        ),
    };

    let mut suggestions = Vec::new();
    if let Some(suggestion) = analysis
        .as_ref()
        .and_then(|a| missing_seasons_suggestion(&a.missing_seasons))
    {
        suggestions.push(suggestion);
    }
    if !media.status(false).is_tracked() && analysis.is_none() {
        suggestions.push(format!("Request '{}' to add it to the library", display));
    }

    ResponseEnvelope::new(ActionCode::FoundMedia, message, user)
        .with_primary(PrimaryResult {
            media: Some(media.summary(false)),
            season_analysis: analysis,
            backend_identity: auth.backend_identity().map(String::from),
            ..Default::default()
        })
        .with_suggestions(suggestions)
        .logged()
}

/// Envelope for a media removal.
pub fn build_removal_report(
    title: &str,
    auth: &AuthDecision,
    media: Option<&MediaMetadata>,
    user: &UserContext,
    outcome: Option<&DownstreamOutcome>,
) -> ResponseEnvelope {
    if let Some(reason) = auth.denial_reason() {
        return ResponseEnvelope::auth_denied(reason, user);
    }
    if let Some(DownstreamOutcome::Unreachable { reason }) = outcome {
        return ResponseEnvelope::connection_error(title, reason, user);
    }
    let Some(media) = media else {
        return ResponseEnvelope::not_found(title, user);
    };
    let display = media.display_title();

    if media.library_id().is_none() {
        return ResponseEnvelope::new(
            ActionCode::RemovalFailed,
            format!(
                "'{}' is not in the library, so there is nothing to remove.",
                display
            ),
            user,
        )
        .with_errors(ErrorDetails::new("media has no library entry"))
        .logged();
    }

    match outcome {
        Some(DownstreamOutcome::Succeeded) => ResponseEnvelope::new(
            ActionCode::MediaRemoved,
            format!("'{}' was removed from the media request system.", display),
            user,
        )
        .with_primary(PrimaryResult {
            media: Some(media.summary(false)),
            backend_identity: auth.backend_identity().map(String::from),
            ..Default::default()
        })
        .logged(),
        Some(DownstreamOutcome::Failed { reason }) => ResponseEnvelope::new(
            ActionCode::RemovalFailed,
            format!("Removing '{}' failed: {}.", display, reason),
            user,
        )
        .with_errors(ErrorDetails::new(reason.as_str()))
        .with_suggestions(vec![
            "Check that your media request account is allowed to manage requests.".to_string(),
        ])
        .logged(),
        _ => ResponseEnvelope::new(
            ActionCode::UnknownResult,
            format!(
                "'{}' can be removed, but no result from the media request service was reported.",
                display
            ),
            user,
        )
        .with_errors(ErrorDetails::new("no downstream outcome reported"))
        .logged(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SeasonStatus;
    use crate::reconcile::reconcile;

    fn user() -> UserContext {
        UserContext {
            caller_id: "ha-alice".to_string(),
            display_name: "Alice".to_string(),
            is_admin: false,
            is_mapped: true,
            backend_identity: Some("7".to_string()),
        }
    }

    fn allowed() -> AuthDecision {
        AuthDecision::Allow {
            backend_identity: "7".to_string(),
        }
    }

    fn media(media_type: MediaType, status: Option<i64>) -> MediaMetadata {
        MediaMetadata {
            id: 1,
            media_type,
            title: Some("Severance".to_string()),
            name: None,
            release_date: Some("2022-02-18".to_string()),
            first_air_date: None,
            vote_average: Some(8.4),
            overview: None,
            genres: vec![],
            media_info: status.map(|code| crate::models::MediaInfo {
                id: Some(9),
                status: Some(crate::catalog::RawStatus::Code(code)),
                status4k: None,
                media_url: None,
            }),
        }
    }

    struct Case {
        media: Option<MediaMetadata>,
        show: Option<ShowState>,
        expression: Option<SeasonExpression>,
        decision: Option<RequestDecision>,
        auth: AuthDecision,
        downstream: Option<DownstreamOutcome>,
        is4k: bool,
    }

    impl Case {
        fn show(show: ShowState, expression: SeasonExpression) -> Self {
            let decision = reconcile(&expression, &show);
            Self {
                media: Some(media(MediaType::Tv, Some(4))),
                show: Some(show),
                expression: Some(expression),
                decision: Some(decision),
                auth: allowed(),
                downstream: Some(DownstreamOutcome::Succeeded),
                is4k: false,
            }
        }

        fn movie(status: Option<i64>) -> Self {
            Self {
                media: Some(media(MediaType::Movie, status)),
                show: None,
                expression: None,
                decision: None,
                auth: allowed(),
                downstream: Some(DownstreamOutcome::Succeeded),
                is4k: false,
            }
        }

        fn build(&self, user: &UserContext) -> ResponseEnvelope {
            build(EnvelopeInput {
                title: "severance",
                decision: self.decision.as_ref(),
                expression: self.expression.as_ref(),
                auth: &self.auth,
                media: self.media.as_ref(),
                show: self.show.as_ref(),
                user,
                downstream: self.downstream.as_ref(),
                is4k: self.is4k,
            })
        }
    }

    fn twelve_seasons_first_processing() -> ShowState {
        ShowState::new(12, [(1, SeasonStatus::Processing)])
    }

    #[test]
    fn test_auth_denied_wins() {
        let mut case = Case::show(twelve_seasons_first_processing(), SeasonExpression::Unspecified);
        case.auth = AuthDecision::Deny {
            reason: "not registered".to_string(),
        };
        case.expression = Some(SeasonExpression::Invalid("x".to_string()));

        let envelope = case.build(&user());
        assert_eq!(envelope.action, ActionCode::AuthDenied);
        assert_eq!(envelope.message, "not registered");
        assert_eq!(envelope.errors.unwrap().reason, "not registered");
        assert!(envelope.primary_result.is_none());
    }

    #[test]
    fn test_invalid_expression() {
        let mut case = Case::show(twelve_seasons_first_processing(), SeasonExpression::Unspecified);
        case.expression = Some(SeasonExpression::Invalid("range start 5 is greater than range end 2".to_string()));

        let envelope = case.build(&user());
        assert_eq!(envelope.action, ActionCode::InvalidSeasonExpression);
        assert!(envelope.message.contains("range start 5"));
        assert!(envelope.suggestions.is_some());
    }

    #[test]
    fn test_not_found() {
        let mut case = Case::movie(None);
        case.media = None;
        let envelope = case.build(&user());
        assert_eq!(envelope.action, ActionCode::NotFound);
        assert!(envelope.message.contains("'severance'"));
    }

    #[test]
    fn test_lookup_failure_is_connection_error() {
        let mut case = Case::movie(None);
        case.media = None;
        case.downstream = Some(DownstreamOutcome::Unreachable {
            reason: "connection refused".to_string(),
        });
        let envelope = case.build(&user());
        assert_eq!(envelope.action, ActionCode::ConnectionError);
        assert_eq!(envelope.errors.unwrap().reason, "connection refused");
    }

    #[test]
    fn test_remaining_seasons_enumerated() {
        let case = Case::show(twelve_seasons_first_processing(), SeasonExpression::RemainingSeasons);
        let envelope = case.build(&user());

        assert_eq!(envelope.action, ActionCode::SeasonRequested);
        assert!(envelope
            .message
            .starts_with("Requested seasons 2, 3, 4, 5, 6, 7, 8, 9, 10, 11 and 12 of 'Severance'"));
        let primary = envelope.primary_result.unwrap();
        assert_eq!(primary.requested_seasons, (2..=12).collect::<BTreeSet<u32>>());
        assert_eq!(primary.backend_identity.as_deref(), Some("7"));
        assert!(envelope.errors.is_none());
    }

    #[test]
    fn test_fresh_show_is_media_added() {
        let case = Case::show(ShowState::new(3, []), SeasonExpression::Unspecified);
        let envelope = case.build(&user());
        assert_eq!(envelope.action, ActionCode::MediaAddedSuccessfully);
        assert!(envelope.message.contains("season 1 was requested"));
        let suggestions = envelope.suggestions.unwrap().items;
        assert!(suggestions.contains(&"Request seasons 2, 3".to_string()));
    }

    #[test]
    fn test_already_available_suggestion() {
        let show = ShowState::new(
            8,
            [(1, SeasonStatus::Available), (2, SeasonStatus::Available)],
        );
        let case = Case::show(show, SeasonExpression::explicit([1, 2, 3]));
        let envelope = case.build(&user());

        assert_eq!(envelope.action, ActionCode::SeasonRequested);
        let suggestions = envelope.suggestions.unwrap().items;
        assert!(suggestions.contains(&"Seasons 1 and 2 are already available to watch.".to_string()));
        assert!(suggestions.contains(&"Request the remaining 5 seasons (4-8)".to_string()));
    }

    #[test]
    fn test_noop_remaining_states_fully_requested() {
        let show = ShowState::new(2, [(1, SeasonStatus::Available), (2, SeasonStatus::Pending)]);
        let case = Case::show(show, SeasonExpression::RemainingSeasons);
        let envelope = case.build(&user());

        assert_eq!(envelope.action, ActionCode::MediaAlreadyExistsFully);
        assert!(envelope.message.contains("already requested or available"));
        assert!(envelope.primary_result.is_some());
    }

    #[test]
    fn test_show_without_seasons_says_so() {
        for expression in [SeasonExpression::RemainingSeasons, SeasonExpression::AllSeasons] {
            let envelope = Case::show(ShowState::new(0, []), expression).build(&user());
            assert_eq!(envelope.action, ActionCode::MediaAlreadyExistsFully);
            assert_eq!(
                envelope.message,
                "The catalog lists no seasons for 'Severance' yet, so there is nothing to request."
            );
            assert!(!envelope.message.contains("Every season"));
        }
    }

    #[test]
    fn test_explicit_pending_reported() {
        let case = Case::show(
            twelve_seasons_first_processing(),
            SeasonExpression::explicit([1]),
        );
        let envelope = case.build(&user());
        assert_eq!(envelope.action, ActionCode::MediaAlreadyExistsFully);
        assert!(envelope
            .message
            .contains("Season 1 is already requested and in progress"));
    }

    #[test]
    fn test_out_of_range() {
        let case = Case::show(
            twelve_seasons_first_processing(),
            SeasonExpression::explicit([99]),
        );
        let envelope = case.build(&user());

        assert_eq!(envelope.action, ActionCode::SeasonOutOfRange);
        assert!(envelope.message.contains("only has 12 seasons, so season 99 does not exist"));
        let errors = envelope.errors.unwrap();
        assert_eq!(errors.out_of_range, BTreeSet::from([99]));
        assert_eq!(errors.total_seasons, Some(12));
    }

    #[test]
    fn test_downstream_failure_after_decision() {
        let mut case = Case::show(ShowState::new(3, []), SeasonExpression::AllSeasons);
        case.downstream = Some(DownstreamOutcome::Failed {
            reason: "HTTP 500".to_string(),
        });
        let envelope = case.build(&user());
        assert_eq!(envelope.action, ActionCode::ConnectionError);
    }

    #[test]
    fn test_no_outcome_is_unknown_result() {
        let mut case = Case::show(ShowState::new(3, []), SeasonExpression::NextSeason);
        case.downstream = None;
        let envelope = case.build(&user());
        assert_eq!(envelope.action, ActionCode::UnknownResult);
        assert!(envelope.message.starts_with("Season 1 of 'Severance' can be requested"));
    }

    #[test]
    fn test_movie_paths() {
        let mut case = Case::movie(None);
        case.is4k = true;
        let envelope = case.build(&user());
        assert_eq!(envelope.action, ActionCode::MediaAddedSuccessfully);
        assert!(envelope.message.contains("4K"));
        assert!(envelope.primary_result.unwrap().media.unwrap().requested_4k);

        let envelope = Case::movie(Some(5)).build(&user());
        assert_eq!(envelope.action, ActionCode::MediaAlreadyExistsFully);
        assert!(envelope.message.contains("Available in Library"));
    }

    #[test]
    fn test_envelope_json_shape() {
        let case = Case::show(ShowState::new(3, []), SeasonExpression::Unspecified);
        let json = serde_json::to_value(case.build(&user())).unwrap();

        assert_eq!(json["action"], "media_added_successfully");
        assert_eq!(json["user_context"]["caller_id"], "ha-alice");
        assert_eq!(json["primary_result"]["requested_seasons"], serde_json::json!([1]));
        assert!(json.get("errors").is_none());
    }

    #[test]
    fn test_status_report() {
        let show = ShowState::new(3, [(1, SeasonStatus::Available)]);
        let media = media(MediaType::Tv, Some(4));
        let envelope = build_status_report("severance", &allowed(), Some(&media), Some(&show), &user(), None);

        assert_eq!(envelope.action, ActionCode::FoundMedia);
        assert_eq!(
            envelope.message,
            "'Severance' (2022) has 3 seasons: Season 1 is available."
        );
        assert_eq!(envelope.suggestions.unwrap().items, vec!["Request seasons 2, 3"]);

        let envelope = build_status_report("nothing", &allowed(), None, None, &user(), None);
        assert_eq!(envelope.action, ActionCode::NotFound);
    }

    #[test]
    fn test_removal_report() {
        let tracked = media(MediaType::Movie, Some(5));
        let untracked = media(MediaType::Movie, None);

        let envelope = build_removal_report(
            "severance",
            &allowed(),
            Some(&tracked),
            &user(),
            Some(&DownstreamOutcome::Succeeded),
        );
        assert_eq!(envelope.action, ActionCode::MediaRemoved);

        let envelope = build_removal_report(
            "severance",
            &allowed(),
            Some(&tracked),
            &user(),
            Some(&DownstreamOutcome::Failed {
                reason: "empty response".to_string(),
            }),
        );
        assert_eq!(envelope.action, ActionCode::RemovalFailed);

        let envelope = build_removal_report("severance", &allowed(), Some(&untracked), &user(), None);
        assert_eq!(envelope.action, ActionCode::RemovalFailed);
        assert!(envelope.message.contains("not in the library"));
    }
}
