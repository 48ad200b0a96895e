//! Read-side aggregates for the dashboard.
//!
//! Every function here is a pure derivation over store snapshots: no
//! mutation, no caching, recomputed on each query. Most aggregates start
//! from the active-feature base set ([`Feature::is_active`]); the handful
//! that use a different base set say so.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Feature, FeatureStatus, FeatureSummary, Okr, OkrKind, Sprint, SprintStatus,
};

/// Impact at or above this counts as high-impact in the priority matrix.
pub const MATRIX_IMPACT_THRESHOLD: f64 = 7.0;
/// Effort at or below this counts as low-effort in the priority matrix.
pub const MATRIX_EFFORT_THRESHOLD: f64 = 4.0;
/// How many features the RICE ranking returns.
pub const RANKING_LIMIT: usize = 10;

/// Active features partitioned into the four impact/effort quadrants.
///
/// The partition is exhaustive and disjoint: every active feature lands in
/// exactly one bucket, boundary values included.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriorityMatrix {
    /// High impact, low effort.
    pub quick_wins: Vec<FeatureSummary>,
    /// High impact, high effort.
    pub major_projects: Vec<FeatureSummary>,
    /// Low impact, low effort.
    pub fill_ins: Vec<FeatureSummary>,
    /// Low impact, high effort.
    pub time_wasters: Vec<FeatureSummary>,
}

pub fn priority_matrix(features: &[Feature]) -> PriorityMatrix {
    let mut matrix = PriorityMatrix::default();
    for feature in features.iter().filter(|f| f.is_active()) {
        let high_impact = feature.impact >= MATRIX_IMPACT_THRESHOLD;
        let low_effort = feature.effort <= MATRIX_EFFORT_THRESHOLD;
        let bucket = match (high_impact, low_effort) {
            (true, true) => &mut matrix.quick_wins,
            (true, false) => &mut matrix.major_projects,
            (false, true) => &mut matrix.fill_ins,
            (false, false) => &mut matrix.time_wasters,
        };
        bucket.push(feature.into());
    }
    matrix
}

/// How well the active roadmap lines up with stated objectives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkrAlignment {
    /// Active features linked to at least one OKR.
    pub aligned: usize,
    pub unaligned: usize,
    pub total_active: usize,
    /// `aligned / total_active` as a percentage, 0 when there are no active
    /// features.
    pub alignment_rate: f64,
    pub per_objective: Vec<ObjectiveFeatureCount>,
}

/// Feature count for one objective. Key-results are not enumerated here,
/// though features linked to a key-result's id still count toward that
/// key-result, not its parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectiveFeatureCount {
    pub okr_id: Uuid,
    pub title: String,
    pub feature_count: usize,
}

pub fn okr_alignment(features: &[Feature], okrs: &[Okr]) -> OkrAlignment {
    let active: Vec<&Feature> = features.iter().filter(|f| f.is_active()).collect();
    let aligned = active.iter().filter(|f| !f.okr_ids.is_empty()).count();
    let total_active = active.len();
    let alignment_rate = if total_active > 0 {
        aligned as f64 / total_active as f64 * 100.0
    } else {
        0.0
    };

    let per_objective = okrs
        .iter()
        .filter(|o| o.kind == OkrKind::Objective)
        .map(|objective| ObjectiveFeatureCount {
            okr_id: objective.id,
            title: objective.title.clone(),
            feature_count: features
                .iter()
                .filter(|f| f.okr_ids.contains(&objective.id))
                .count(),
        })
        .collect();

    OkrAlignment {
        aligned,
        unaligned: total_active - aligned,
        total_active,
        alignment_rate,
        per_objective,
    }
}

/// Feature count for one status value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
    pub status: FeatureStatus,
    pub count: usize,
}

/// Counts per status over all features, zero-count statuses omitted.
pub fn status_distribution(features: &[Feature]) -> Vec<StatusCount> {
    FeatureStatus::ALL
        .iter()
        .filter_map(|&status| {
            let count = features.iter().filter(|f| f.status == status).count();
            (count > 0).then_some(StatusCount { status, count })
        })
        .collect()
}

/// One sprint's worth of the velocity series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VelocityPoint {
    pub sprint_id: Uuid,
    pub name: String,
    /// Planned capacity for the iteration.
    pub planned: i64,
    /// The completed figure: a live count of completed features while the
    /// sprint is in flight, the recorded velocity once the sprint itself is
    /// completed.
    pub completed: i64,
    /// Recorded velocity as stored, regardless of lifecycle stage.
    pub velocity: i64,
}

pub fn velocity_series(sprints: &[Sprint], features: &[Feature]) -> Vec<VelocityPoint> {
    sprints
        .iter()
        .map(|sprint| {
            let completed_in_sprint = features
                .iter()
                .filter(|f| f.sprint_id == Some(sprint.id) && f.status == FeatureStatus::Completed)
                .count() as i64;
            // A closed sprint reports what was recorded at close, not the
            // live count; the two can legitimately differ and must not be
            // unified.
            let completed = if sprint.status == SprintStatus::Completed {
                sprint.velocity
            } else {
                completed_in_sprint
            };
            VelocityPoint {
                sprint_id: sprint.id,
                name: sprint.name.clone(),
                planned: sprint.capacity,
                completed,
                velocity: sprint.velocity,
            }
        })
        .collect()
}

/// Top features by RICE score: non-archived, descending, capped at
/// [`RANKING_LIMIT`]. The sort is stable, so ties keep creation order.
pub fn rice_ranking(features: &[Feature]) -> Vec<FeatureSummary> {
    let mut ranked: Vec<&Feature> = features
        .iter()
        .filter(|f| f.status != FeatureStatus::Archived)
        .collect();
    ranked.sort_by(|a, b| b.rice_score.total_cmp(&a.rice_score));
    ranked.into_iter().take(RANKING_LIMIT).map(Into::into).collect()
}

/// Mean RICE inputs across active features, 0 when there are none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiceBreakdown {
    pub reach: f64,
    pub impact: f64,
    pub confidence: f64,
    pub effort: f64,
}

pub fn rice_breakdown(features: &[Feature]) -> RiceBreakdown {
    let active: Vec<&Feature> = features.iter().filter(|f| f.is_active()).collect();
    RiceBreakdown {
        reach: mean(active.iter().map(|f| f.reach)),
        impact: mean(active.iter().map(|f| f.impact)),
        confidence: mean(active.iter().map(|f| f.confidence)),
        effort: mean(active.iter().map(|f| f.effort)),
    }
}

/// Headline numbers for the dashboard cards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Features currently in flight: planned or in-progress. Narrower than
    /// the active-feature filter, which also counts backlog items.
    pub active_features: usize,
    pub completed_features: usize,
    pub total_features: usize,
    /// Mean RICE score across the in-flight set.
    pub avg_rice_score: f64,
    pub total_okrs: usize,
    pub avg_okr_progress: f64,
    /// Completed share of all features, as a percentage.
    pub completion_rate: f64,
}

pub fn dashboard_stats(features: &[Feature], okrs: &[Okr]) -> DashboardStats {
    let in_flight: Vec<&Feature> = features
        .iter()
        .filter(|f| matches!(f.status, FeatureStatus::Planned | FeatureStatus::InProgress))
        .collect();
    let completed = features
        .iter()
        .filter(|f| f.status == FeatureStatus::Completed)
        .count();
    let completion_rate = if features.is_empty() {
        0.0
    } else {
        completed as f64 / features.len() as f64 * 100.0
    };

    DashboardStats {
        active_features: in_flight.len(),
        completed_features: completed,
        total_features: features.len(),
        avg_rice_score: mean(in_flight.iter().map(|f| f.rice_score)),
        total_okrs: okrs.len(),
        avg_okr_progress: mean(okrs.iter().map(|o| o.progress as f64)),
        completion_rate,
    }
}

/// Active features with no sprint assignment, highest RICE score first.
pub fn backlog(features: &[Feature]) -> Vec<FeatureSummary> {
    let mut items: Vec<&Feature> = features
        .iter()
        .filter(|f| f.sprint_id.is_none() && f.is_active())
        .collect();
    items.sort_by(|a, b| b.rice_score.total_cmp(&a.rice_score));
    items.into_iter().map(Into::into).collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count > 0 {
        sum / count as f64
    } else {
        0.0
    }
}
