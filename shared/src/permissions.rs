//! Caller identity, user mapping, and the permission gate.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Explanation given to unmapped callers attempting a write.
pub const NOT_REGISTERED: &str =
    "Sorry, you're not registered to make media requests through this system. \
     Your account needs to be mapped to a media request user by an administrator.";

/// Explanation given to non-admin callers attempting an admin operation.
pub const ADMIN_REQUIRED: &str =
    "Sorry, this operation is restricted to administrators of the media request system.";

/// Identity of the caller as supplied by the assistant host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Stable caller id
    pub id: String,
    /// Full name
    pub name: Option<String>,
    /// Display name
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_owner: bool,
}

impl CallerIdentity {
    /// Human friendly name with an (Owner)/(Admin) suffix.
    pub fn friendly_name(&self) -> String {
        let non_empty = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        let name = non_empty(&self.name)
            .or_else(|| non_empty(&self.display_name))
            .or_else(|| non_empty(&self.username))
            .or_else(|| {
                non_empty(&self.email)
                    .and_then(|email| email.split('@').next().map(String::from))
                    .filter(|local| !local.is_empty())
            })
            .unwrap_or_else(|| {
                let skip = self.id.chars().count().saturating_sub(8);
                let short_id: String = self.id.chars().skip(skip).collect();
                format!("User {}", short_id)
            });

        if self.is_owner {
            format!("{} (Owner)", name)
        } else if self.is_admin {
            format!("{} (Admin)", name)
        } else {
            name
        }
    }
}

/// Immutable mapping from caller ids to backend identities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserMappings(HashMap<String, String>);

impl UserMappings {
    pub fn new(mappings: impl IntoIterator<Item = (String, String)>) -> Self {
        Self(mappings.into_iter().collect())
    }

    /// Backend identity mapped to a caller id.
    pub fn backend_identity(&self, caller_id: &str) -> Option<&str> {
        self.0.get(caller_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Per-call user context, echoed back in every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub caller_id: String,
    pub display_name: String,
    pub is_admin: bool,
    pub is_mapped: bool,
    pub backend_identity: Option<String>,
}

impl UserContext {
    /// Build the context for one call from the caller and the mapping table.
    pub fn resolve(caller: &CallerIdentity, mappings: &UserMappings) -> Self {
        let backend_identity = mappings.backend_identity(&caller.id).map(String::from);
        Self {
            caller_id: caller.id.clone(),
            display_name: caller.friendly_name(),
            is_admin: caller.is_admin || caller.is_owner,
            is_mapped: backend_identity.is_some(),
            backend_identity,
        }
    }
}

/// Kind of operation a caller wants to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Read,
    Write,
    AdminOnly,
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AuthDecision {
    /// Proceed, acting as this backend identity.
    Allow { backend_identity: String },
    /// Refuse, with a caller-facing explanation.
    Deny { reason: String },
}

impl AuthDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthDecision::Allow { .. })
    }

    pub fn backend_identity(&self) -> Option<&str> {
        match self {
            AuthDecision::Allow { backend_identity } => Some(backend_identity.as_str()),
            AuthDecision::Deny { .. } => None,
        }
    }

    pub fn denial_reason(&self) -> Option<&str> {
        match self {
            AuthDecision::Allow { .. } => None,
            AuthDecision::Deny { reason } => Some(reason.as_str()),
        }
    }
}

/// Decides whether a caller may perform an operation and as whom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionGate {
    default_backend_identity: String,
}

impl PermissionGate {
    /// `default_backend_identity` is the system account used for reads.
    pub fn new(default_backend_identity: impl Into<String>) -> Self {
        Self {
            default_backend_identity: default_backend_identity.into(),
        }
    }

    pub fn default_backend_identity(&self) -> &str {
        &self.default_backend_identity
    }

    pub fn authorize(&self, user: &UserContext, operation: OperationKind) -> AuthDecision {
        let mapped = user
            .backend_identity
            .as_deref()
            .filter(|_| user.is_mapped);

        let decision = match (operation, mapped) {
            (OperationKind::Read, Some(identity)) => allow(identity),
            (OperationKind::Read, None) => allow(&self.default_backend_identity),
            (OperationKind::Write, Some(identity)) => allow(identity),
            (OperationKind::Write, None) => deny(NOT_REGISTERED),
            (OperationKind::AdminOnly, Some(identity)) if user.is_admin => allow(identity),
            (OperationKind::AdminOnly, Some(_)) => deny(ADMIN_REQUIRED),
            (OperationKind::AdminOnly, None) => deny(NOT_REGISTERED),
        };

        match &decision {
            AuthDecision::Allow { backend_identity } => info!(
                "Authorized {:?} for {} as backend user {}",
                operation, user.display_name, backend_identity
            ),
            AuthDecision::Deny { .. } => warn!(
                "Denied {:?} for {} (caller {}, mapped: {})",
                operation, user.display_name, user.caller_id, user.is_mapped
            ),
        }
        decision
    }
}

fn allow(identity: &str) -> AuthDecision {
    AuthDecision::Allow {
        backend_identity: identity.to_string(),
    }
}

fn deny(reason: &str) -> AuthDecision {
    AuthDecision::Deny {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mappings() -> UserMappings {
        UserMappings::new([("ha-alice".to_string(), "7".to_string())])
    }

    fn caller(id: &str, is_admin: bool) -> CallerIdentity {
        CallerIdentity {
            id: id.to_string(),
            name: Some("Alice".to_string()),
            is_admin,
            ..Default::default()
        }
    }

    #[test]
    fn test_friendly_name_fallbacks() {
        let mut caller = CallerIdentity {
            id: "0123456789abcdef".to_string(),
            ..Default::default()
        };
        assert_eq!(caller.friendly_name(), "User 89abcdef");

        caller.email = Some("sam@example.com".to_string());
        assert_eq!(caller.friendly_name(), "sam");

        caller.username = Some("samuel".to_string());
        caller.is_admin = true;
        assert_eq!(caller.friendly_name(), "samuel (Admin)");

        caller.display_name = Some("Sam".to_string());
        caller.is_owner = true;
        assert_eq!(caller.friendly_name(), "Sam (Owner)");
    }

    #[test]
    fn test_resolve_user_context() {
        let user = UserContext::resolve(&caller("ha-alice", false), &mappings());
        assert!(user.is_mapped);
        assert_eq!(user.backend_identity.as_deref(), Some("7"));
        assert_eq!(user.display_name, "Alice");

        let user = UserContext::resolve(&caller("ha-bob", true), &mappings());
        assert!(!user.is_mapped);
        assert!(user.is_admin);
        assert_eq!(user.backend_identity, None);
    }

    #[test]
    fn test_policy_table() {
        let gate = PermissionGate::new("1");
        let mapped = UserContext::resolve(&caller("ha-alice", false), &mappings());
        let unmapped = UserContext::resolve(&caller("ha-bob", false), &mappings());

        assert_eq!(gate.authorize(&mapped, OperationKind::Read).backend_identity(), Some("7"));
        assert_eq!(gate.authorize(&unmapped, OperationKind::Read).backend_identity(), Some("1"));
        assert_eq!(gate.authorize(&mapped, OperationKind::Write).backend_identity(), Some("7"));

        let denied = gate.authorize(&unmapped, OperationKind::Write);
        assert!(!denied.is_allowed());
        assert!(denied
            .denial_reason()
            .unwrap()
            .contains("not registered to make media requests"));

        assert_eq!(
            gate.authorize(&mapped, OperationKind::AdminOnly).denial_reason(),
            Some(ADMIN_REQUIRED)
        );
    }

    #[test]
    fn test_admin_only() {
        let gate = PermissionGate::new("1");
        let admin = UserContext::resolve(&caller("ha-alice", true), &mappings());
        let unmapped_admin = UserContext::resolve(&caller("ha-carol", true), &mappings());

        assert!(gate.authorize(&admin, OperationKind::AdminOnly).is_allowed());
        assert!(!gate.authorize(&unmapped_admin, OperationKind::AdminOnly).is_allowed());
    }

    #[test]
    fn test_mappings_deserialize_from_object() {
        let mappings: UserMappings = serde_json::from_str(r#"{"ha-alice": "7"}"#).unwrap();
        assert_eq!(mappings.backend_identity("ha-alice"), Some("7"));
        assert_eq!(mappings.len(), 1);
    }
}
