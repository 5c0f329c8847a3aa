//! Identifiers for cadence entities.
//!
//! Step, stage, plan, scenario, tenant and request identifiers are opaque
//! strings validated once at construction. Run identifiers are UUIDs.

use crate::error::{CoreError, CoreResult};
use crate::hash::Hash;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest accepted identifier, in characters
pub const MAX_ID_LEN: usize = 128;

/// Validate a raw identifier and return its owned form
///
/// # Errors
///
/// Returns error if the identifier is empty, too long, or contains
/// whitespace or control characters
pub fn validate_label(kind: &str, raw: &str) -> CoreResult<String> {
    if raw.is_empty() {
        return Err(CoreError::InvalidId {
            reason: format!("{} must not be empty", kind),
        });
    }
    if raw.chars().count() > MAX_ID_LEN {
        return Err(CoreError::InvalidId {
            reason: format!("{} longer than {} characters", kind, MAX_ID_LEN),
        });
    }
    if let Some(bad) = raw.chars().find(|c| c.is_whitespace() || c.is_control()) {
        return Err(CoreError::InvalidId {
            reason: format!("{} `{}` contains forbidden character {:?}", kind, raw, bad),
        });
    }
    Ok(raw.to_string())
}

macro_rules! label_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Create a validated identifier
            ///
            /// # Errors
            ///
            /// Returns error if the identifier fails validation
            pub fn new(raw: impl AsRef<str>) -> CoreResult<Self> {
                validate_label($kind, raw.as_ref()).map(Self)
            }

            /// Get as string slice
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume into the inner string
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                validate_label($kind, &value)?;
                Ok(Self(value))
            }
        }

        impl TryFrom<&str> for $name {
            type Error = CoreError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl std::str::FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

label_id!(
    /// Step identifier - a node in the scheduling graph
    StepId,
    "step id"
);

label_id!(
    /// Stage identifier - one plugin in a processing chain
    StageId,
    "stage id"
);

label_id!(
    /// Plan identifier - one scheduling decision
    PlanId,
    "plan id"
);

label_id!(
    /// Scenario identifier - the source of a step set
    ScenarioId,
    "scenario id"
);

label_id!(
    /// Tenant identifier
    TenantId,
    "tenant id"
);

label_id!(
    /// Request identifier - correlates one chain execution with its caller
    RequestId,
    "request id"
);

impl PlanId {
    /// Derive a plan identifier from a digest of the scheduling decision
    #[must_use]
    pub fn from_digest(digest: &Hash) -> Self {
        Self(format!("plan-{}", digest.short_hex(16)))
    }
}

/// Run identifier - identifies a single chain execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random RunId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from UUID bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Get as UUID
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "run_{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_id_accepts_plain_names() {
        let id = StepId::new("drain-primary").unwrap();
        assert_eq!(id.as_str(), "drain-primary");
        assert_eq!(id.to_string(), "drain-primary");
    }

    #[test]
    fn test_label_id_rejects_empty() {
        assert!(StepId::new("").is_err());
        assert!(StageId::new("").is_err());
    }

    #[test]
    fn test_label_id_rejects_whitespace() {
        let err = PlanId::new("plan one").unwrap_err();
        assert!(matches!(err, CoreError::InvalidId { .. }));
        assert!(TenantId::new(" tenant").is_err());
        assert!(RequestId::new("req\n1").is_err());
    }

    #[test]
    fn test_label_id_rejects_too_long() {
        let long = "x".repeat(MAX_ID_LEN + 1);
        assert!(ScenarioId::new(&long).is_err());
        assert!(ScenarioId::new("x".repeat(MAX_ID_LEN)).is_ok());
    }

    #[test]
    fn test_label_id_serde_validates() {
        let id: StepId = serde_json::from_str("\"restore-db\"").unwrap();
        assert_eq!(id.as_str(), "restore-db");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"restore-db\"");

        let bad: Result<StepId, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_label_id_ord_is_lexical() {
        let a = StepId::new("a").unwrap();
        let b = StepId::new("b").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_plan_id_from_digest() {
        let digest = Hash::compute(b"scenario");
        let a = PlanId::from_digest(&digest);
        assert!(a.as_str().starts_with("plan-"));
        assert_eq!(a.as_str().len(), "plan-".len() + 16);
        assert_eq!(a, PlanId::from_digest(&digest));
    }

    #[test]
    fn test_run_id_display() {
        let id = RunId::new();
        assert!(id.to_string().starts_with("run_"));
        assert_ne!(id, RunId::new());
    }

    #[test]
    fn test_run_id_from_bytes() {
        let id = RunId::from_bytes([7u8; 16]);
        assert_eq!(id.as_uuid().as_bytes(), &[7u8; 16]);
    }
}
