use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An objective or key-result.
///
/// OKRs form a two-level hierarchy: objectives stand alone, key-results
/// reference their objective through `parent_id`. `progress` is derived from
/// `current_value` / `target_value` as a clamped integer percentage and is
/// recomputed by the store whenever either value changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Okr {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub kind: OkrKind,
    /// For key-results, the owning objective. Always `None` on objectives.
    pub parent_id: Option<Uuid>,
    pub target_value: f64,
    pub current_value: f64,
    /// Derived: `min(100, round(current / target * 100))`, 0 when target <= 0.
    pub progress: i64,
    pub quarter: Option<String>,
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The two levels of the OKR hierarchy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OkrKind {
    Objective,
    KeyResult,
}

impl OkrKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Objective => "objective",
            Self::KeyResult => "key-result",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "objective" => Some(Self::Objective),
            "key-result" => Some(Self::KeyResult),
            _ => None,
        }
    }
}

/// Input for creating a new OKR.
///
/// Key-results must name an existing objective as `parent_id`; the store
/// rejects anything else. A `parent_id` supplied for an objective is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOkrInput {
    pub title: String,
    pub description: Option<String>,
    pub kind: OkrKind,
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub target_value: f64,
    #[serde(default)]
    pub current_value: f64,
    pub quarter: Option<String>,
    pub owner: Option<String>,
}

/// Input for updating an existing OKR. All fields are optional for partial
/// updates; `kind` and `parent_id` are fixed at creation. Absent fields are
/// skipped on serialization so a re-serialized patch stays sparse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOkrInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl UpdateOkrInput {
    /// True when the patch touches a progress input, which forces the store
    /// to recompute `progress`.
    pub fn touches_progress_inputs(&self) -> bool {
        self.current_value.is_some() || self.target_value.is_some()
    }
}

/// An objective with its key-results nested, used for tree responses.
///
/// The objective's fields are flattened into the JSON response, with an
/// additional `key_results` array. Built by scanning `parent_id` on read;
/// nothing is stored on the objective itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveNode {
    #[serde(flatten)]
    pub okr: Okr,
    pub key_results: Vec<Okr>,
}
