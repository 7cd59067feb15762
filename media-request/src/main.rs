//! Media Request Lambda - Resolves natural-language media requests.
//!
//! The caller (an assistant integration) performs the catalog lookups and
//! backend calls; this function decides what to request and whether the
//! caller may, and returns the response envelope.

use std::sync::Arc;

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use shared::{
    check_media_status, remove_media, resolve_media_request, CallerIdentity, Config,
    MediaRequestInput, PermissionGate, RemovalInput, ResponseEnvelope, StatusCheckInput,
    UserContext, UserMappings,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Incoming event, selected by its `operation` field.
#[derive(Debug)]
enum MediaOperation {
    Request(MediaRequestInput),
    Status(StatusCheckInput),
    Remove(RemovalInput),
}

impl MediaOperation {
    fn name(&self) -> &'static str {
        match self {
            MediaOperation::Request(_) => "request",
            MediaOperation::Status(_) => "status",
            MediaOperation::Remove(_) => "remove",
        }
    }
}

/// Application state shared across invocations
struct AppState {
    gate: PermissionGate,
    mappings: UserMappings,
}

impl AppState {
    fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        info!(
            "Loaded {} user mappings, default backend identity {}",
            config.user_mappings.len(),
            config.default_backend_identity
        );

        Ok(Self {
            gate: config.gate(),
            mappings: config.user_mappings,
        })
    }

    fn dispatch(&self, operation: &MediaOperation) -> ResponseEnvelope {
        match operation {
            MediaOperation::Request(input) => resolve_media_request(input, &self.gate, &self.mappings),
            MediaOperation::Status(input) => check_media_status(input, &self.gate, &self.mappings),
            MediaOperation::Remove(input) => remove_media(input, &self.gate, &self.mappings),
        }
    }
}

fn decode(payload: Value) -> shared::Result<MediaOperation> {
    let operation = payload
        .get("operation")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| shared::Error::Validation("payload has no operation".to_string()))?;

    match operation.as_str() {
        "request" => Ok(MediaOperation::Request(serde_json::from_value(payload)?)),
        "status" => Ok(MediaOperation::Status(serde_json::from_value(payload)?)),
        "remove" => Ok(MediaOperation::Remove(serde_json::from_value(payload)?)),
        other => Err(shared::Error::Validation(format!(
            "unknown operation '{}'",
            other
        ))),
    }
}

async fn handler(state: Arc<AppState>, event: LambdaEvent<Value>) -> Result<Value, Error> {
    let (payload, _context) = event.into_parts();

    let caller = payload
        .get("caller")
        .cloned()
        .and_then(|caller| serde_json::from_value::<CallerIdentity>(caller).ok());

    let envelope = match decode(payload) {
        Ok(operation) => {
            info!("Handling {} operation", operation.name());
            state.dispatch(&operation)
        }
        Err(e) => {
            warn!("Rejected payload: {}", e);
            match caller {
                Some(caller) => ResponseEnvelope::rejected_payload(
                    &UserContext::resolve(&caller, &state.mappings),
                    &e.to_string(),
                ),
                None => return Err(e.into()),
            }
        }
    };

    Ok(serde_json::to_value(envelope)?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new()?);

    lambda_runtime::run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}
