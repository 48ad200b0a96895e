use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::Database;
use crate::models::*;
use crate::views;

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
/// The full error is logged server-side for debugging, but clients only
/// see a generic message to avoid leaking internal details.
///
/// Invariant violations (key-result parentage, sprint date ordering) carry
/// messages that are safe to expose and come back as BAD_REQUEST.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    let msg = e.to_string();

    if msg.contains("objective") || msg.contains("precede") {
        tracing::warn!("Validation error: {}", msg);
        return (StatusCode::BAD_REQUEST, msg);
    }

    tracing::error!("Internal error: {}", msg);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

/// Record an activity entry for a boundary mutation. Activity is
/// fire-and-forget: failures are logged and never fail the request that
/// triggered them.
fn record_activity(db: &Database, input: LogActivityInput) {
    if let Err(e) = db.log_activity(input) {
        tracing::warn!("Failed to record activity: {}", e);
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Features
// ============================================================

pub async fn list_features(
    State(db): State<Database>,
) -> Result<Json<Vec<Feature>>, (StatusCode, String)> {
    db.get_all_features().map(Json).map_err(internal_error)
}

pub async fn get_feature(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Feature>, (StatusCode, String)> {
    db.get_feature(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Feature not found".to_string()))
}

pub async fn create_feature(
    State(db): State<Database>,
    Json(input): Json<CreateFeatureInput>,
) -> Result<(StatusCode, Json<Feature>), (StatusCode, String)> {
    let actor = input.owner.clone();
    let feature = db.create_feature(input).map_err(internal_error)?;

    record_activity(
        &db,
        LogActivityInput {
            entity_type: EntityKind::Feature,
            entity_id: feature.id,
            action: ActivityAction::Created,
            actor,
            details: serde_json::json!({ "title": feature.title }),
        },
    );

    Ok((StatusCode::CREATED, Json(feature)))
}

pub async fn update_feature(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateFeatureInput>,
) -> Result<Json<Feature>, (StatusCode, String)> {
    let actor = input.owner.clone();
    let details = serde_json::to_value(&input).unwrap_or(serde_json::Value::Null);

    let feature = db
        .update_feature(id, input)
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "Feature not found".to_string()))?;

    record_activity(
        &db,
        LogActivityInput {
            entity_type: EntityKind::Feature,
            entity_id: feature.id,
            action: ActivityAction::Updated,
            actor,
            details,
        },
    );

    Ok(Json(feature))
}

pub async fn delete_feature(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if db.delete_feature(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Feature not found".to_string()))
    }
}

pub async fn rice_ranking(
    State(db): State<Database>,
) -> Result<Json<Vec<FeatureSummary>>, (StatusCode, String)> {
    let features = db.get_all_features().map_err(internal_error)?;
    Ok(Json(views::rice_ranking(&features)))
}

pub async fn backlog(
    State(db): State<Database>,
) -> Result<Json<Vec<FeatureSummary>>, (StatusCode, String)> {
    let features = db.get_all_features().map_err(internal_error)?;
    Ok(Json(views::backlog(&features)))
}

// ============================================================
// OKRs
// ============================================================

pub async fn list_okrs(
    State(db): State<Database>,
) -> Result<Json<Vec<Okr>>, (StatusCode, String)> {
    db.get_all_okrs().map(Json).map_err(internal_error)
}

pub async fn get_okr(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Okr>, (StatusCode, String)> {
    db.get_okr(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "OKR not found".to_string()))
}

pub async fn create_okr(
    State(db): State<Database>,
    Json(input): Json<CreateOkrInput>,
) -> Result<(StatusCode, Json<Okr>), (StatusCode, String)> {
    let actor = input.owner.clone();
    let okr = db.create_okr(input).map_err(internal_error)?;

    record_activity(
        &db,
        LogActivityInput {
            entity_type: EntityKind::Okr,
            entity_id: okr.id,
            action: ActivityAction::Created,
            actor,
            details: serde_json::json!({ "title": okr.title }),
        },
    );

    Ok((StatusCode::CREATED, Json(okr)))
}

pub async fn update_okr(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateOkrInput>,
) -> Result<Json<Okr>, (StatusCode, String)> {
    let actor = input.owner.clone();
    let details = serde_json::to_value(&input).unwrap_or(serde_json::Value::Null);

    let okr = db
        .update_okr(id, input)
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "OKR not found".to_string()))?;

    record_activity(
        &db,
        LogActivityInput {
            entity_type: EntityKind::Okr,
            entity_id: okr.id,
            action: ActivityAction::Updated,
            actor,
            details,
        },
    );

    Ok(Json(okr))
}

pub async fn objective_tree(
    State(db): State<Database>,
) -> Result<Json<Vec<ObjectiveNode>>, (StatusCode, String)> {
    db.get_objective_tree().map(Json).map_err(internal_error)
}

// ============================================================
// Sprints
// ============================================================

pub async fn list_sprints(
    State(db): State<Database>,
) -> Result<Json<Vec<Sprint>>, (StatusCode, String)> {
    db.get_all_sprints().map(Json).map_err(internal_error)
}

pub async fn get_sprint(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
) -> Result<Json<Sprint>, (StatusCode, String)> {
    db.get_sprint(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Sprint not found".to_string()))
}

pub async fn create_sprint(
    State(db): State<Database>,
    Json(input): Json<CreateSprintInput>,
) -> Result<(StatusCode, Json<Sprint>), (StatusCode, String)> {
    let sprint = db.create_sprint(input).map_err(internal_error)?;

    record_activity(
        &db,
        LogActivityInput {
            entity_type: EntityKind::Sprint,
            entity_id: sprint.id,
            action: ActivityAction::Created,
            actor: None,
            details: serde_json::json!({ "name": sprint.name }),
        },
    );

    Ok((StatusCode::CREATED, Json(sprint)))
}

pub async fn update_sprint(
    State(db): State<Database>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateSprintInput>,
) -> Result<Json<Sprint>, (StatusCode, String)> {
    let details = serde_json::to_value(&input).unwrap_or(serde_json::Value::Null);

    let sprint = db
        .update_sprint(id, input)
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "Sprint not found".to_string()))?;

    record_activity(
        &db,
        LogActivityInput {
            entity_type: EntityKind::Sprint,
            entity_id: sprint.id,
            action: ActivityAction::Updated,
            actor: None,
            details,
        },
    );

    Ok(Json(sprint))
}

/// Features assigned to a sprint, derived by live scan; the sprint itself
/// stores no member list.
pub async fn list_sprint_features(
    State(db): State<Database>,
    Path(sprint_id): Path<Uuid>,
) -> Result<Json<Vec<Feature>>, (StatusCode, String)> {
    db.get_sprint(sprint_id)
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "Sprint not found".to_string()))?;

    db.get_sprint_features(sprint_id)
        .map(Json)
        .map_err(internal_error)
}

// ============================================================
// Activity
// ============================================================

/// Query parameters for reading the activity log of one entity.
#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub entity_type: EntityKind,
    pub entity_id: Uuid,
}

pub async fn list_activity(
    State(db): State<Database>,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityLog>>, (StatusCode, String)> {
    db.get_activity(query.entity_type, query.entity_id)
        .map(Json)
        .map_err(internal_error)
}

// ============================================================
// Dashboard
// ============================================================

pub async fn dashboard_stats(
    State(db): State<Database>,
) -> Result<Json<views::DashboardStats>, (StatusCode, String)> {
    let features = db.get_all_features().map_err(internal_error)?;
    let okrs = db.get_all_okrs().map_err(internal_error)?;
    Ok(Json(views::dashboard_stats(&features, &okrs)))
}

pub async fn priority_matrix(
    State(db): State<Database>,
) -> Result<Json<views::PriorityMatrix>, (StatusCode, String)> {
    let features = db.get_all_features().map_err(internal_error)?;
    Ok(Json(views::priority_matrix(&features)))
}

pub async fn okr_alignment(
    State(db): State<Database>,
) -> Result<Json<views::OkrAlignment>, (StatusCode, String)> {
    let features = db.get_all_features().map_err(internal_error)?;
    let okrs = db.get_all_okrs().map_err(internal_error)?;
    Ok(Json(views::okr_alignment(&features, &okrs)))
}

pub async fn status_distribution(
    State(db): State<Database>,
) -> Result<Json<Vec<views::StatusCount>>, (StatusCode, String)> {
    let features = db.get_all_features().map_err(internal_error)?;
    Ok(Json(views::status_distribution(&features)))
}

pub async fn velocity_series(
    State(db): State<Database>,
) -> Result<Json<Vec<views::VelocityPoint>>, (StatusCode, String)> {
    let sprints = db.get_all_sprints().map_err(internal_error)?;
    let features = db.get_all_features().map_err(internal_error)?;
    Ok(Json(views::velocity_series(&sprints, &features)))
}

pub async fn rice_breakdown(
    State(db): State<Database>,
) -> Result<Json<views::RiceBreakdown>, (StatusCode, String)> {
    let features = db.get_all_features().map_err(internal_error)?;
    Ok(Json(views::rice_breakdown(&features)))
}
