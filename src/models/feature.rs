use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// A roadmap item with its RICE prioritization inputs.
///
/// `rice_score` is derived from reach, impact, confidence, and effort. The
/// store recomputes it on every mutation that touches one of those inputs;
/// callers can never set it directly. The four inputs use a 1–10 scale by
/// convention, which is not enforced here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: FeatureStatus,
    pub priority: FeaturePriority,
    pub reach: f64,
    pub impact: f64,
    pub confidence: f64,
    pub effort: f64,
    /// Derived: `reach * impact * confidence / effort`, 0 when effort <= 0.
    pub rice_score: f64,
    /// OKRs this feature contributes to. The many-to-many link lives here;
    /// OKRs hold no back-references.
    pub okr_ids: Vec<Uuid>,
    /// Sprint assignment, at most one at a time. `None` means backlog.
    pub sprint_id: Option<Uuid>,
    pub tags: Vec<String>,
    /// Used as the activity actor when present.
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Feature {
    /// A feature is active while it is still in play: neither completed nor
    /// archived. Aggregate views use this as their base set.
    pub fn is_active(&self) -> bool {
        !matches!(
            self.status,
            FeatureStatus::Completed | FeatureStatus::Archived
        )
    }
}

/// Where a feature sits in its delivery lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureStatus {
    Backlog,
    Planned,
    InProgress,
    Completed,
    Archived,
}

impl FeatureStatus {
    pub const ALL: [FeatureStatus; 5] = [
        Self::Backlog,
        Self::Planned,
        Self::InProgress,
        Self::Completed,
        Self::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Planned => "planned",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "backlog" => Some(Self::Backlog),
            "planned" => Some(Self::Planned),
            "in-progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Editorial priority label, independent of the computed RICE score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FeaturePriority {
    Critical,
    High,
    Medium,
    Low,
}

impl FeaturePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Input for creating a new feature.
///
/// The RICE inputs are required; everything else falls back to a sensible
/// default (`backlog`, `medium`, no links).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFeatureInput {
    pub title: String,
    pub description: Option<String>,
    /// Initial status. Defaults to `Backlog`.
    pub status: Option<FeatureStatus>,
    /// Initial priority label. Defaults to `Medium`.
    pub priority: Option<FeaturePriority>,
    pub reach: f64,
    pub impact: f64,
    pub confidence: f64,
    pub effort: f64,
    #[serde(default)]
    pub okr_ids: Vec<Uuid>,
    pub sprint_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub owner: Option<String>,
}

/// Input for updating an existing feature. All fields are optional for
/// partial updates.
///
/// `sprint_id` distinguishes "field absent" from "explicit null": sending
/// `"sprint_id": null` moves the feature back to the backlog, while leaving
/// the field out keeps the current assignment.
///
/// Absent fields are also skipped on serialization, so a re-serialized patch
/// (e.g. as an activity payload) carries exactly what the caller sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFeatureInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<FeatureStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<FeaturePriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reach: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub okr_ids: Option<Vec<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint_id: Option<Option<Uuid>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl UpdateFeatureInput {
    /// True when the patch touches any RICE input, which forces the store to
    /// recompute `rice_score`.
    pub fn touches_rice_inputs(&self) -> bool {
        self.reach.is_some()
            || self.impact.is_some()
            || self.confidence.is_some()
            || self.effort.is_some()
    }
}

// Maps a present-but-null JSON field to Some(None) instead of None, so
// partial updates can clear the sprint assignment.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Compact feature projection used by list and dashboard responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub id: Uuid,
    pub title: String,
    pub status: FeatureStatus,
    pub priority: FeaturePriority,
    pub rice_score: f64,
}

impl From<&Feature> for FeatureSummary {
    fn from(f: &Feature) -> Self {
        Self {
            id: f.id,
            title: f.title.clone(),
            status: f.status,
            priority: f.priority,
            rice_score: f.rice_score,
        }
    }
}

impl From<Feature> for FeatureSummary {
    fn from(f: Feature) -> Self {
        Self::from(&f)
    }
}
