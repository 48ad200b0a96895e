use riceboard::db::Database;
use riceboard::models::*;
use speculate2::speculate;
use uuid::Uuid;

fn feature_input(title: &str) -> CreateFeatureInput {
    CreateFeatureInput {
        title: title.to_string(),
        description: None,
        status: None,
        priority: None,
        reach: 5.0,
        impact: 5.0,
        confidence: 5.0,
        effort: 5.0,
        okr_ids: Vec::new(),
        sprint_id: None,
        tags: Vec::new(),
        owner: None,
    }
}

fn objective_input(title: &str, target: f64, current: f64) -> CreateOkrInput {
    CreateOkrInput {
        title: title.to_string(),
        description: None,
        kind: OkrKind::Objective,
        parent_id: None,
        target_value: target,
        current_value: current,
        quarter: Some("Q3 2026".to_string()),
        owner: None,
    }
}

fn sprint_input(name: &str) -> CreateSprintInput {
    CreateSprintInput {
        name: name.to_string(),
        start_date: "2026-08-03T00:00:00Z".parse().expect("valid date"),
        end_date: "2026-08-14T00:00:00Z".parse().expect("valid date"),
        status: None,
        capacity: 10,
        velocity: 0,
    }
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
    }

    describe "features" {
        describe "create_feature" {
            it "computes the rice score from its inputs" {
                let mut input = feature_input("Search revamp");
                input.reach = 8.0;
                input.impact = 9.0;
                input.confidence = 7.0;
                input.effort = 4.0;

                let feature = db.create_feature(input).expect("Failed to create feature");

                assert_eq!(feature.rice_score, 126.0);
            }

            it "scores zero when effort is zero" {
                let mut input = feature_input("Free lunch");
                input.effort = 0.0;

                let feature = db.create_feature(input).expect("Failed to create feature");

                assert_eq!(feature.rice_score, 0.0);
            }

            it "defaults status and priority" {
                let feature = db.create_feature(feature_input("Defaults")).expect("Failed to create feature");

                assert_eq!(feature.status, FeatureStatus::Backlog);
                assert_eq!(feature.priority, FeaturePriority::Medium);
                assert!(feature.okr_ids.is_empty());
                assert!(feature.sprint_id.is_none());
            }

            it "assigns unique ids" {
                let a = db.create_feature(feature_input("A")).expect("Failed to create");
                let b = db.create_feature(feature_input("B")).expect("Failed to create");

                assert_ne!(a.id, b.id);
            }
        }

        describe "update_feature" {
            it "recomputes the score when a rice input changes" {
                let mut input = feature_input("Scored");
                input.reach = 8.0;
                input.impact = 9.0;
                input.confidence = 7.0;
                input.effort = 4.0;
                let created = db.create_feature(input).expect("Failed to create");
                assert_eq!(created.rice_score, 126.0);

                let updated = db.update_feature(created.id, UpdateFeatureInput {
                    effort: Some(0.0),
                    ..Default::default()
                }).expect("Update failed").expect("Feature missing");

                assert_eq!(updated.rice_score, 0.0);
            }

            it "leaves the score untouched when only the title changes" {
                let mut input = feature_input("Before");
                input.reach = 3.0;
                input.impact = 7.0;
                input.confidence = 9.0;
                input.effort = 7.0;
                let created = db.create_feature(input).expect("Failed to create");

                let updated = db.update_feature(created.id, UpdateFeatureInput {
                    title: Some("After".to_string()),
                    ..Default::default()
                }).expect("Update failed").expect("Feature missing");

                assert_eq!(updated.title, "After");
                assert_eq!(updated.rice_score.to_bits(), created.rice_score.to_bits());
            }

            it "applies an empty patch as a timestamp-only change" {
                let created = db.create_feature(feature_input("Idle")).expect("Failed to create");

                let updated = db.update_feature(created.id, UpdateFeatureInput::default())
                    .expect("Update failed")
                    .expect("Feature missing");

                assert_eq!(updated.title, created.title);
                assert_eq!(updated.status, created.status);
                assert_eq!(updated.rice_score.to_bits(), created.rice_score.to_bits());
                assert_eq!(updated.okr_ids, created.okr_ids);
                assert_eq!(updated.sprint_id, created.sprint_id);
                assert_eq!(updated.created_at, created.created_at);
                assert!(updated.updated_at >= created.updated_at);
            }

            it "returns None for a missing id" {
                let result = db.update_feature(Uuid::new_v4(), UpdateFeatureInput::default())
                    .expect("Update failed");
                assert!(result.is_none());
            }

            it "assigns and clears the sprint through the explicit-null patch" {
                let sprint = db.create_sprint(sprint_input("Sprint 1")).expect("Failed to create sprint");
                let feature = db.create_feature(feature_input("Assignable")).expect("Failed to create");

                let assigned = db.update_feature(feature.id, UpdateFeatureInput {
                    sprint_id: Some(Some(sprint.id)),
                    ..Default::default()
                }).expect("Update failed").expect("Feature missing");
                assert_eq!(assigned.sprint_id, Some(sprint.id));

                let cleared = db.update_feature(feature.id, UpdateFeatureInput {
                    sprint_id: Some(None),
                    ..Default::default()
                }).expect("Update failed").expect("Feature missing");
                assert!(cleared.sprint_id.is_none());
            }
        }

        describe "delete_feature" {
            it "removes the feature" {
                let feature = db.create_feature(feature_input("Doomed")).expect("Failed to create");

                assert!(db.delete_feature(feature.id).expect("Delete failed"));
                assert!(db.get_feature(feature.id).expect("Query failed").is_none());
            }

            it "returns false for a missing id" {
                assert!(!db.delete_feature(Uuid::new_v4()).expect("Delete failed"));
            }

            it "drops the feature from sprint membership without touching the sprint" {
                let sprint = db.create_sprint(sprint_input("Sprint 1")).expect("Failed to create sprint");
                let mut input = feature_input("Member");
                input.sprint_id = Some(sprint.id);
                let feature = db.create_feature(input).expect("Failed to create");

                assert_eq!(db.get_sprint_features(sprint.id).expect("Query failed").len(), 1);

                db.delete_feature(feature.id).expect("Delete failed");

                // Membership is derived by scan, so nothing dangles.
                assert!(db.get_sprint_features(sprint.id).expect("Query failed").is_empty());
                assert!(db.get_sprint(sprint.id).expect("Query failed").is_some());
            }
        }

        describe "get_all_features" {
            it "returns features in creation order" {
                db.create_feature(feature_input("First")).expect("Failed to create");
                db.create_feature(feature_input("Second")).expect("Failed to create");
                db.create_feature(feature_input("Third")).expect("Failed to create");

                let titles: Vec<String> = db.get_all_features().expect("Query failed")
                    .into_iter().map(|f| f.title).collect();
                assert_eq!(titles, vec!["First", "Second", "Third"]);
            }
        }
    }

    describe "okrs" {
        describe "create_okr" {
            it "derives progress from current and target" {
                let okr = db.create_okr(objective_input("Revenue", 200.0, 50.0))
                    .expect("Failed to create OKR");
                assert_eq!(okr.progress, 25);
            }

            it "clamps progress at one hundred" {
                let okr = db.create_okr(objective_input("Overachieved", 100.0, 150.0))
                    .expect("Failed to create OKR");
                assert_eq!(okr.progress, 100);
            }

            it "derives zero progress for a zero target" {
                let okr = db.create_okr(objective_input("Aspirational", 0.0, 5.0))
                    .expect("Failed to create OKR");
                assert_eq!(okr.progress, 0);
            }

            it "ignores a parent supplied for an objective" {
                let mut input = objective_input("Standalone", 100.0, 0.0);
                input.parent_id = Some(Uuid::new_v4());

                let okr = db.create_okr(input).expect("Failed to create OKR");
                assert!(okr.parent_id.is_none());
            }

            it "accepts a key result under an existing objective" {
                let objective = db.create_okr(objective_input("Parent", 100.0, 0.0))
                    .expect("Failed to create objective");

                let mut input = objective_input("Child", 10.0, 2.0);
                input.kind = OkrKind::KeyResult;
                input.parent_id = Some(objective.id);

                let kr = db.create_okr(input).expect("Failed to create key result");
                assert_eq!(kr.parent_id, Some(objective.id));
                assert_eq!(kr.progress, 20);
            }

            it "rejects a key result without a parent" {
                let mut input = objective_input("Orphan", 10.0, 0.0);
                input.kind = OkrKind::KeyResult;

                let err = db.create_okr(input).expect_err("Should have been rejected");
                assert!(err.to_string().contains("objective"));
            }

            it "rejects a key result whose parent is another key result" {
                let objective = db.create_okr(objective_input("Root", 100.0, 0.0))
                    .expect("Failed to create objective");
                let mut first = objective_input("KR", 10.0, 0.0);
                first.kind = OkrKind::KeyResult;
                first.parent_id = Some(objective.id);
                let kr = db.create_okr(first).expect("Failed to create key result");

                let mut nested = objective_input("Nested", 10.0, 0.0);
                nested.kind = OkrKind::KeyResult;
                nested.parent_id = Some(kr.id);

                let err = db.create_okr(nested).expect_err("Should have been rejected");
                assert!(err.to_string().contains("objective"));
            }
        }

        describe "update_okr" {
            it "recomputes progress when current value changes" {
                let okr = db.create_okr(objective_input("Revenue", 200.0, 50.0))
                    .expect("Failed to create OKR");
                assert_eq!(okr.progress, 25);

                let updated = db.update_okr(okr.id, UpdateOkrInput {
                    current_value: Some(250.0),
                    ..Default::default()
                }).expect("Update failed").expect("OKR missing");

                // Clamped, not 125.
                assert_eq!(updated.progress, 100);
            }

            it "leaves progress untouched when only the title changes" {
                let okr = db.create_okr(objective_input("Named", 100.0, 33.0))
                    .expect("Failed to create OKR");

                let updated = db.update_okr(okr.id, UpdateOkrInput {
                    title: Some("Renamed".to_string()),
                    ..Default::default()
                }).expect("Update failed").expect("OKR missing");

                assert_eq!(updated.progress, okr.progress);
            }

            it "returns None for a missing id" {
                let result = db.update_okr(Uuid::new_v4(), UpdateOkrInput::default())
                    .expect("Update failed");
                assert!(result.is_none());
            }
        }

        describe "get_objective_tree" {
            it "nests key results under their objective" {
                let objective = db.create_okr(objective_input("Growth", 100.0, 0.0))
                    .expect("Failed to create objective");
                let mut kr = objective_input("Ten deals", 10.0, 4.0);
                kr.kind = OkrKind::KeyResult;
                kr.parent_id = Some(objective.id);
                db.create_okr(kr).expect("Failed to create key result");

                let tree = db.get_objective_tree().expect("Query failed");
                assert_eq!(tree.len(), 1);
                assert_eq!(tree[0].okr.id, objective.id);
                assert_eq!(tree[0].key_results.len(), 1);
                assert_eq!(tree[0].key_results[0].title, "Ten deals");
            }
        }
    }

    describe "sprints" {
        describe "create_sprint" {
            it "creates a sprint with planning as the default status" {
                let sprint = db.create_sprint(sprint_input("Sprint 1")).expect("Failed to create");
                assert_eq!(sprint.status, SprintStatus::Planning);
                assert_eq!(sprint.capacity, 10);
            }

            it "rejects an end date before the start date" {
                let mut input = sprint_input("Backwards");
                input.end_date = "2026-08-01T00:00:00Z".parse().expect("valid date");

                let err = db.create_sprint(input).expect_err("Should have been rejected");
                assert!(err.to_string().contains("precede"));
            }
        }

        describe "update_sprint" {
            it "records velocity when the sprint completes" {
                let sprint = db.create_sprint(sprint_input("Sprint 1")).expect("Failed to create");

                let updated = db.update_sprint(sprint.id, UpdateSprintInput {
                    status: Some(SprintStatus::Completed),
                    velocity: Some(8),
                    ..Default::default()
                }).expect("Update failed").expect("Sprint missing");

                assert_eq!(updated.status, SprintStatus::Completed);
                assert_eq!(updated.velocity, 8);
            }

            it "rejects a patch that inverts the merged date range" {
                let sprint = db.create_sprint(sprint_input("Sprint 1")).expect("Failed to create");

                let err = db.update_sprint(sprint.id, UpdateSprintInput {
                    end_date: Some("2026-07-01T00:00:00Z".parse().expect("valid date")),
                    ..Default::default()
                }).expect_err("Should have been rejected");
                assert!(err.to_string().contains("precede"));
            }

            it "returns None for a missing id" {
                let result = db.update_sprint(Uuid::new_v4(), UpdateSprintInput::default())
                    .expect("Update failed");
                assert!(result.is_none());
            }
        }
    }

    describe "activity" {
        it "falls back to the System actor" {
            let feature = db.create_feature(feature_input("Logged")).expect("Failed to create");

            let entry = db.log_activity(LogActivityInput {
                entity_type: EntityKind::Feature,
                entity_id: feature.id,
                action: ActivityAction::Created,
                actor: None,
                details: serde_json::json!({ "title": "Logged" }),
            }).expect("Failed to log");

            assert_eq!(entry.actor, "System");
        }

        it "filters entries by entity and returns newest first" {
            let feature = db.create_feature(feature_input("Busy")).expect("Failed to create");
            let other = db.create_feature(feature_input("Quiet")).expect("Failed to create");

            db.log_activity(LogActivityInput {
                entity_type: EntityKind::Feature,
                entity_id: feature.id,
                action: ActivityAction::Created,
                actor: Some("pm".to_string()),
                details: serde_json::Value::Null,
            }).expect("Failed to log");
            db.log_activity(LogActivityInput {
                entity_type: EntityKind::Feature,
                entity_id: feature.id,
                action: ActivityAction::Updated,
                actor: Some("pm".to_string()),
                details: serde_json::json!({ "impact": 9.0 }),
            }).expect("Failed to log");

            let entries = db.get_activity(EntityKind::Feature, feature.id).expect("Query failed");
            assert_eq!(entries.len(), 2);
            assert_eq!(entries[0].action, ActivityAction::Updated);
            assert_eq!(entries[1].action, ActivityAction::Created);

            assert!(db.get_activity(EntityKind::Feature, other.id).expect("Query failed").is_empty());
        }
    }

    describe "storage" {
        it "persists entities across reopen" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("roadmap.db");

            {
                let disk = Database::open(path.clone()).expect("Failed to open database");
                disk.migrate().expect("Failed to migrate");
                disk.create_feature(feature_input("Durable")).expect("Failed to create");
            }

            let reopened = Database::open(path).expect("Failed to reopen database");
            reopened.migrate().expect("Failed to migrate");
            let features = reopened.get_all_features().expect("Query failed");
            assert_eq!(features.len(), 1);
            assert_eq!(features[0].title, "Durable");
        }
    }
}
