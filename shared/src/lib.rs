//! Shared library for the media request bridge.
//!
//! Turns a natural-language media request into a structured decision: which
//! seasons to ask the backend for, whether the caller may ask at all, and the
//! envelope the assistant reads back.

pub mod catalog;
pub mod config;
pub mod envelope;
pub mod error;
pub mod models;
pub mod permissions;
pub mod pipeline;
pub mod reconcile;
pub mod season;

pub use catalog::{CatalogShow, SeasonAnalysis, SeasonStatus, ShowState};
pub use config::Config;
pub use envelope::{ActionCode, ResponseEnvelope};
pub use error::{Error, Result};
pub use models::{DownstreamOutcome, MediaMetadata, MediaRequestInput, RemovalInput, StatusCheckInput};
pub use permissions::{AuthDecision, CallerIdentity, OperationKind, PermissionGate, UserContext, UserMappings};
pub use pipeline::{check_media_status, plan_media_request, remove_media, resolve_media_request, MediaRequestPlan};
pub use reconcile::{reconcile, RequestDecision};
pub use season::{extract_season_from_title, SeasonExpression};
