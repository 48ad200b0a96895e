mod schema;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use uuid::Uuid;

use crate::models::*;
use crate::scoring;

/// Invariant violations the store refuses to persist. These surface at the
/// API boundary as client errors rather than generic failures.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Key result parent must be an existing objective")]
    KeyResultParent,
    #[error("Sprint end date must not precede its start date")]
    SprintDates,
}

/// The entity store. Owns all Feature, OKR, Sprint, and activity rows behind
/// a single serialized connection; reads hand out snapshots, and every
/// mutation recomputes the derived fields its inputs feed.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn open_default() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "riceboard")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        let db_path = dirs.data_dir().join("riceboard.db");
        Self::open(db_path)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().expect("database lock poisoned");
        schema::run_migrations(&conn)
    }

    // ============================================================
    // Feature operations
    // ============================================================

    /// All features in creation order. Views that break ties "by input
    /// order" rely on this ordering being stable.
    pub fn get_all_features(&self) -> Result<Vec<Feature>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, title, description, status, priority, reach, impact, confidence, effort,
                    rice_score, okr_ids, sprint_id, tags, owner, created_at, updated_at
             FROM features ORDER BY created_at",
        )?;

        let features = stmt
            .query_map([], map_feature_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(features)
    }

    pub fn get_feature(&self, id: Uuid) -> Result<Option<Feature>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, title, description, status, priority, reach, impact, confidence, effort,
                    rice_score, okr_ids, sprint_id, tags, owner, created_at, updated_at
             FROM features WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(map_feature_row(row)?)),
            None => Ok(None),
        }
    }

    /// Features assigned to a sprint, derived by filtering on `sprint_id`.
    /// Sprints never store a member list, so deleted features simply stop
    /// appearing here.
    pub fn get_sprint_features(&self, sprint_id: Uuid) -> Result<Vec<Feature>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, title, description, status, priority, reach, impact, confidence, effort,
                    rice_score, okr_ids, sprint_id, tags, owner, created_at, updated_at
             FROM features WHERE sprint_id = ? ORDER BY created_at",
        )?;

        let features = stmt
            .query_map([sprint_id.to_string()], map_feature_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(features)
    }

    pub fn create_feature(&self, input: CreateFeatureInput) -> Result<Feature> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let status = input.status.unwrap_or(FeatureStatus::Backlog);
        let priority = input.priority.unwrap_or(FeaturePriority::Medium);
        let rice_score =
            scoring::rice_score(input.reach, input.impact, input.confidence, input.effort);

        conn.execute(
            "INSERT INTO features (id, title, description, status, priority, reach, impact,
                                   confidence, effort, rice_score, okr_ids, sprint_id, tags,
                                   owner, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.title,
                &input.description,
                status.as_str(),
                priority.as_str(),
                input.reach,
                input.impact,
                input.confidence,
                input.effort,
                rice_score,
                serde_json::to_string(&input.okr_ids)?,
                input.sprint_id.map(|u| u.to_string()),
                serde_json::to_string(&input.tags)?,
                &input.owner,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Feature {
            id,
            title: input.title,
            description: input.description,
            status,
            priority,
            reach: input.reach,
            impact: input.impact,
            confidence: input.confidence,
            effort: input.effort,
            rice_score,
            okr_ids: input.okr_ids,
            sprint_id: input.sprint_id,
            tags: input.tags,
            owner: input.owner,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_feature(&self, id: Uuid, input: UpdateFeatureInput) -> Result<Option<Feature>> {
        let Some(existing) = self.get_feature(id)? else {
            return Ok(None);
        };

        let recompute = input.touches_rice_inputs();

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let title = input.title.unwrap_or(existing.title);
        let description = input.description.or(existing.description);
        let status = input.status.unwrap_or(existing.status);
        let priority = input.priority.unwrap_or(existing.priority);
        let reach = input.reach.unwrap_or(existing.reach);
        let impact = input.impact.unwrap_or(existing.impact);
        let confidence = input.confidence.unwrap_or(existing.confidence);
        let effort = input.effort.unwrap_or(existing.effort);
        let okr_ids = input.okr_ids.unwrap_or(existing.okr_ids);
        // Some(None) is an explicit null: unassign from the sprint.
        let sprint_id = match input.sprint_id {
            Some(explicit) => explicit,
            None => existing.sprint_id,
        };
        let tags = input.tags.unwrap_or(existing.tags);
        let owner = input.owner.or(existing.owner);

        // A patch that never mentions a RICE input must leave the stored
        // score bit-for-bit untouched.
        let rice_score = if recompute {
            scoring::rice_score(reach, impact, confidence, effort)
        } else {
            existing.rice_score
        };

        conn.execute(
            "UPDATE features SET title = ?, description = ?, status = ?, priority = ?, reach = ?,
                                 impact = ?, confidence = ?, effort = ?, rice_score = ?,
                                 okr_ids = ?, sprint_id = ?, tags = ?, owner = ?, updated_at = ?
             WHERE id = ?",
            (
                &title,
                &description,
                status.as_str(),
                priority.as_str(),
                reach,
                impact,
                confidence,
                effort,
                rice_score,
                serde_json::to_string(&okr_ids)?,
                sprint_id.map(|u| u.to_string()),
                serde_json::to_string(&tags)?,
                &owner,
                now.to_rfc3339(),
                id.to_string(),
            ),
        )?;

        Ok(Some(Feature {
            id,
            title,
            description,
            status,
            priority,
            reach,
            impact,
            confidence,
            effort,
            rice_score,
            okr_ids,
            sprint_id,
            tags,
            owner,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    pub fn delete_feature(&self, id: Uuid) -> Result<bool> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let rows = conn.execute("DELETE FROM features WHERE id = ?", [id.to_string()])?;
        Ok(rows > 0)
    }

    // ============================================================
    // OKR operations
    // ============================================================

    pub fn get_all_okrs(&self) -> Result<Vec<Okr>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, title, description, kind, parent_id, target_value, current_value,
                    progress, quarter, owner, created_at, updated_at
             FROM okrs ORDER BY created_at",
        )?;

        let okrs = stmt
            .query_map([], map_okr_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(okrs)
    }

    pub fn get_okr(&self, id: Uuid) -> Result<Option<Okr>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, title, description, kind, parent_id, target_value, current_value,
                    progress, quarter, owner, created_at, updated_at
             FROM okrs WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(map_okr_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn create_okr(&self, input: CreateOkrInput) -> Result<Okr> {
        // Key-results must hang off an existing objective; objectives never
        // carry a parent, whatever the caller sent.
        let parent_id = match input.kind {
            OkrKind::Objective => None,
            OkrKind::KeyResult => {
                let parent_id = input.parent_id.ok_or(ValidationError::KeyResultParent)?;
                match self.get_okr(parent_id)? {
                    Some(parent) if parent.kind == OkrKind::Objective => Some(parent_id),
                    _ => return Err(ValidationError::KeyResultParent.into()),
                }
            }
        };

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let progress = scoring::okr_progress(input.current_value, input.target_value);

        conn.execute(
            "INSERT INTO okrs (id, title, description, kind, parent_id, target_value,
                               current_value, progress, quarter, owner, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.title,
                &input.description,
                input.kind.as_str(),
                parent_id.map(|u| u.to_string()),
                input.target_value,
                input.current_value,
                progress,
                &input.quarter,
                &input.owner,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Okr {
            id,
            title: input.title,
            description: input.description,
            kind: input.kind,
            parent_id,
            target_value: input.target_value,
            current_value: input.current_value,
            progress,
            quarter: input.quarter,
            owner: input.owner,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_okr(&self, id: Uuid, input: UpdateOkrInput) -> Result<Option<Okr>> {
        let Some(existing) = self.get_okr(id)? else {
            return Ok(None);
        };

        let recompute = input.touches_progress_inputs();

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let title = input.title.unwrap_or(existing.title);
        let description = input.description.or(existing.description);
        let target_value = input.target_value.unwrap_or(existing.target_value);
        let current_value = input.current_value.unwrap_or(existing.current_value);
        let quarter = input.quarter.or(existing.quarter);
        let owner = input.owner.or(existing.owner);

        let progress = if recompute {
            scoring::okr_progress(current_value, target_value)
        } else {
            existing.progress
        };

        conn.execute(
            "UPDATE okrs SET title = ?, description = ?, target_value = ?, current_value = ?,
                             progress = ?, quarter = ?, owner = ?, updated_at = ?
             WHERE id = ?",
            (
                &title,
                &description,
                target_value,
                current_value,
                progress,
                &quarter,
                &owner,
                now.to_rfc3339(),
                id.to_string(),
            ),
        )?;

        Ok(Some(Okr {
            id,
            title,
            description,
            kind: existing.kind,
            parent_id: existing.parent_id,
            target_value,
            current_value,
            progress,
            quarter,
            owner,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    /// Objectives with their key-results nested, grouped by `parent_id` on
    /// read.
    pub fn get_objective_tree(&self) -> Result<Vec<ObjectiveNode>> {
        let okrs = self.get_all_okrs()?;

        let mut objectives = Vec::new();
        let mut key_results: HashMap<Uuid, Vec<Okr>> = HashMap::new();
        for okr in okrs {
            match okr.kind {
                OkrKind::Objective => objectives.push(okr),
                OkrKind::KeyResult => {
                    if let Some(parent_id) = okr.parent_id {
                        key_results.entry(parent_id).or_default().push(okr);
                    }
                }
            }
        }

        Ok(objectives
            .into_iter()
            .map(|okr| {
                let children = key_results.remove(&okr.id).unwrap_or_default();
                ObjectiveNode {
                    okr,
                    key_results: children,
                }
            })
            .collect())
    }

    // ============================================================
    // Sprint operations
    // ============================================================

    pub fn get_all_sprints(&self) -> Result<Vec<Sprint>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, start_date, end_date, status, capacity, velocity,
                    created_at, updated_at
             FROM sprints ORDER BY start_date",
        )?;

        let sprints = stmt
            .query_map([], map_sprint_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sprints)
    }

    pub fn get_sprint(&self, id: Uuid) -> Result<Option<Sprint>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, start_date, end_date, status, capacity, velocity,
                    created_at, updated_at
             FROM sprints WHERE id = ?",
        )?;

        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(map_sprint_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn create_sprint(&self, input: CreateSprintInput) -> Result<Sprint> {
        if input.end_date < input.start_date {
            return Err(ValidationError::SprintDates.into());
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let status = input.status.unwrap_or(SprintStatus::Planning);

        conn.execute(
            "INSERT INTO sprints (id, name, start_date, end_date, status, capacity, velocity,
                                  created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                &input.name,
                input.start_date.to_rfc3339(),
                input.end_date.to_rfc3339(),
                status.as_str(),
                input.capacity,
                input.velocity,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ),
        )?;

        Ok(Sprint {
            id,
            name: input.name,
            start_date: input.start_date,
            end_date: input.end_date,
            status,
            capacity: input.capacity,
            velocity: input.velocity,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update_sprint(&self, id: Uuid, input: UpdateSprintInput) -> Result<Option<Sprint>> {
        let Some(existing) = self.get_sprint(id)? else {
            return Ok(None);
        };

        let start_date = input.start_date.unwrap_or(existing.start_date);
        let end_date = input.end_date.unwrap_or(existing.end_date);
        // The merged range must stay valid, whichever side the patch moved.
        if end_date < start_date {
            return Err(ValidationError::SprintDates.into());
        }

        let conn = self.conn.lock().expect("database lock poisoned");
        let now = Utc::now();
        let name = input.name.unwrap_or(existing.name);
        let status = input.status.unwrap_or(existing.status);
        let capacity = input.capacity.unwrap_or(existing.capacity);
        let velocity = input.velocity.unwrap_or(existing.velocity);

        conn.execute(
            "UPDATE sprints SET name = ?, start_date = ?, end_date = ?, status = ?, capacity = ?,
                                velocity = ?, updated_at = ?
             WHERE id = ?",
            (
                &name,
                start_date.to_rfc3339(),
                end_date.to_rfc3339(),
                status.as_str(),
                capacity,
                velocity,
                now.to_rfc3339(),
                id.to_string(),
            ),
        )?;

        Ok(Some(Sprint {
            id,
            name,
            start_date,
            end_date,
            status,
            capacity,
            velocity,
            created_at: existing.created_at,
            updated_at: now,
        }))
    }

    // ============================================================
    // Activity log operations
    // ============================================================

    pub fn log_activity(&self, input: LogActivityInput) -> Result<ActivityLog> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let id = Uuid::new_v4();
        let now = Utc::now();
        let actor = input.actor.unwrap_or_else(|| "System".to_string());

        conn.execute(
            "INSERT INTO activity_log (id, entity_type, entity_id, action, actor, details,
                                       created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                id.to_string(),
                input.entity_type.as_str(),
                input.entity_id.to_string(),
                input.action.as_str(),
                &actor,
                serde_json::to_string(&input.details)?,
                now.to_rfc3339(),
            ),
        )?;

        Ok(ActivityLog {
            id,
            entity_type: input.entity_type,
            entity_id: input.entity_id,
            action: input.action,
            actor,
            details: input.details,
            created_at: now,
        })
    }

    pub fn get_activity(&self, entity_type: EntityKind, entity_id: Uuid) -> Result<Vec<ActivityLog>> {
        let conn = self.conn.lock().expect("database lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, entity_type, entity_id, action, actor, details, created_at
             FROM activity_log WHERE entity_type = ? AND entity_id = ?
             ORDER BY created_at DESC",
        )?;

        let entries = stmt
            .query_map(
                (entity_type.as_str(), entity_id.to_string()),
                |row| {
                    Ok(ActivityLog {
                        id: parse_uuid(row.get::<_, String>(0)?),
                        entity_type: EntityKind::from_str(&row.get::<_, String>(1)?)
                            .unwrap_or(EntityKind::Feature),
                        entity_id: parse_uuid(row.get::<_, String>(2)?),
                        action: ActivityAction::from_str(&row.get::<_, String>(3)?)
                            .unwrap_or(ActivityAction::Created),
                        actor: row.get(4)?,
                        details: serde_json::from_str(&row.get::<_, String>(5)?)
                            .unwrap_or_default(),
                        created_at: parse_datetime(row.get::<_, String>(6)?),
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entries)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

fn map_feature_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Feature> {
    Ok(Feature {
        id: parse_uuid(row.get::<_, String>(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        status: FeatureStatus::from_str(&row.get::<_, String>(3)?)
            .unwrap_or(FeatureStatus::Backlog),
        priority: FeaturePriority::from_str(&row.get::<_, String>(4)?)
            .unwrap_or(FeaturePriority::Medium),
        reach: row.get(5)?,
        impact: row.get(6)?,
        confidence: row.get(7)?,
        effort: row.get(8)?,
        rice_score: row.get(9)?,
        okr_ids: parse_json_list(row.get::<_, String>(10)?),
        sprint_id: row.get::<_, Option<String>>(11)?.map(parse_uuid),
        tags: parse_json_list(row.get::<_, String>(12)?),
        owner: row.get(13)?,
        created_at: parse_datetime(row.get::<_, String>(14)?),
        updated_at: parse_datetime(row.get::<_, String>(15)?),
    })
}

fn map_okr_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Okr> {
    Ok(Okr {
        id: parse_uuid(row.get::<_, String>(0)?),
        title: row.get(1)?,
        description: row.get(2)?,
        kind: OkrKind::from_str(&row.get::<_, String>(3)?).unwrap_or(OkrKind::Objective),
        parent_id: row.get::<_, Option<String>>(4)?.map(parse_uuid),
        target_value: row.get(5)?,
        current_value: row.get(6)?,
        progress: row.get(7)?,
        quarter: row.get(8)?,
        owner: row.get(9)?,
        created_at: parse_datetime(row.get::<_, String>(10)?),
        updated_at: parse_datetime(row.get::<_, String>(11)?),
    })
}

fn map_sprint_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Sprint> {
    Ok(Sprint {
        id: parse_uuid(row.get::<_, String>(0)?),
        name: row.get(1)?,
        start_date: parse_datetime(row.get::<_, String>(2)?),
        end_date: parse_datetime(row.get::<_, String>(3)?),
        status: SprintStatus::from_str(&row.get::<_, String>(4)?)
            .unwrap_or(SprintStatus::Planning),
        capacity: row.get(5)?,
        velocity: row.get(6)?,
        created_at: parse_datetime(row.get::<_, String>(7)?),
        updated_at: parse_datetime(row.get::<_, String>(8)?),
    })
}

fn parse_uuid(s: String) -> Uuid {
    Uuid::parse_str(&s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_datetime(s: String) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_json_list<T: serde::de::DeserializeOwned>(s: String) -> Vec<T> {
    serde_json::from_str(&s).unwrap_or_default()
}
