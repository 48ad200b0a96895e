use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An append-only record of a mutation that reached the API boundary.
///
/// Every successful create or update writes exactly one entry. The core only
/// emits these; it never reads them back for its own computations, so the
/// log can be swapped for an external collaborator without touching scoring
/// or views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: Uuid,
    pub entity_type: EntityKind,
    pub entity_id: Uuid,
    pub action: ActivityAction,
    /// Who performed the mutation. Falls back to `"System"` when the request
    /// carried no actor.
    pub actor: String,
    /// Opaque payload: the request body for updates, a short summary for
    /// creations.
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// The entity kinds that emit activity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Feature,
    Okr,
    Sprint,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Okr => "okr",
            Self::Sprint => "sprint",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "feature" => Some(Self::Feature),
            "okr" => Some(Self::Okr),
            "sprint" => Some(Self::Sprint),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityAction {
    Created,
    Updated,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            _ => None,
        }
    }
}

/// Input for recording an activity entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogActivityInput {
    pub entity_type: EntityKind,
    pub entity_id: Uuid,
    pub action: ActivityAction,
    /// `None` falls back to `"System"`.
    pub actor: Option<String>,
    pub details: serde_json::Value,
}
