use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A time-boxed iteration.
///
/// Sprints do not hold their features; assignment lives on the feature side
/// (`Feature::sprint_id`) and the member list is derived by filtering on
/// read. `velocity` records the completed unit count and is meaningful once
/// the sprint reaches `Completed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sprint {
    pub id: Uuid,
    pub name: String,
    pub start_date: DateTime<Utc>,
    /// Must not precede `start_date`; the store rejects inverted ranges.
    pub end_date: DateTime<Utc>,
    pub status: SprintStatus,
    /// Planned unit count for the iteration.
    pub capacity: i64,
    /// Completed unit count, recorded when the sprint closes.
    pub velocity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The lifecycle stage of a sprint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SprintStatus {
    Planning,
    Active,
    Completed,
}

impl SprintStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "planning" => Some(Self::Planning),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Input for creating a new sprint. Status defaults to `Planning`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSprintInput {
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: Option<SprintStatus>,
    #[serde(default)]
    pub capacity: i64,
    #[serde(default)]
    pub velocity: i64,
}

/// Input for updating an existing sprint. All fields are optional for
/// partial updates; the merged date range is re-validated. Absent fields
/// are skipped on serialization so a re-serialized patch stays sparse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSprintInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SprintStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub velocity: Option<i64>,
}
