mod common;

use assert_matches::assert_matches;
use assetforge_cloud::{ObjectStore, Tier};
use assetforge_core::category::AssetCategory;
use assetforge_core::references::ReferenceSpec;
use assetforge_core::storage_keys::PNG_CONTENT_TYPE;
use assetforge_db::models::audit::AuditQuery;
use assetforge_db::models::generated_asset::CreateGeneratedAsset;
use assetforge_db::models::status::{AssetStatus, QueueStatus};
use assetforge_db::store::{AssetRepository, AuditRepository, GenerationQueueRepository};
use assetforge_events::AssetEvent;
use assetforge_imaging::mock::{sprite_png, MockGenerator};
use assetforge_pipeline::{GenerateRequest, PipelineError, PipelineTrigger, RegenerateOverrides};
use common::{active_rows, wait_for_pipeline, Harness, ACTOR};
use serde_json::json;

#[tokio::test]
async fn approving_a_new_variant_moves_the_active_flag_and_runs_the_pipeline() {
    let h = Harness::new();
    let v1 = h.seed_approved(AssetCategory::BuildingSprite, "restaurant").await;
    let v2 = h.seed(AssetCategory::BuildingSprite, "restaurant").await;
    assert_eq!(v2.variant, 2);
    let mut rx = h.subscribe();

    let outcome = h.forge.approval.approve(v2.id, ACTOR).await.unwrap();

    assert_eq!(outcome.pipeline, PipelineTrigger::Started);
    assert_eq!(outcome.asset.status(), AssetStatus::Approved);
    assert!(outcome.asset.is_active);
    assert_eq!(outcome.asset.approved_by.as_deref(), Some(ACTOR));
    assert!(!h.asset(v1.id).await.is_active);

    let event = wait_for_pipeline(&mut rx, v2.id).await;
    assert_matches!(event, AssetEvent::PipelineCompleted { .. });
    assert_eq!(h.resizer.urls().len(), 1);
    assert!(h.asset(v1.id).await.pipeline_status().is_none());
}

#[tokio::test]
async fn approve_requires_a_finished_generation() {
    let h = Harness::new();
    let pending = h
        .store
        .create_asset(&CreateGeneratedAsset::new(
            AssetCategory::BuildingRef,
            "restaurant",
            "prompt".into(),
        ))
        .await
        .unwrap();

    let err = h.forge.approval.approve(pending.id, ACTOR).await.unwrap_err();

    assert_matches!(
        err,
        PipelineError::InvalidTransition { ref from, action: "approve" } if from == "pending"
    );
    assert_eq!(h.asset(pending.id).await.status(), AssetStatus::Pending);
}

#[tokio::test]
async fn approve_unknown_asset_is_not_found() {
    let h = Harness::new();
    let err = h.forge.approval.approve(9999, ACTOR).await.unwrap_err();
    assert_matches!(err, PipelineError::NotFound { entity: "generated_asset", .. });
}

#[tokio::test]
async fn reject_with_feedback_rewrites_the_prompt() {
    let h = Harness::new();
    let asset = h.seed(AssetCategory::BuildingRef, "restaurant").await;

    let (rejected, rejection) = h
        .forge
        .approval
        .reject(asset.id, "door too small", true, ACTOR)
        .await
        .unwrap();

    assert_eq!(rejected.status(), AssetStatus::Rejected);
    assert!(rejected.current_prompt.contains("door too small"));
    assert!(rejected.current_prompt.starts_with(&asset.base_prompt));
    assert_eq!(rejected.prompt_version, asset.prompt_version + 1);
    assert_eq!(rejected.rejection_count, 1);
    assert!(!rejected.is_active);

    assert_eq!(rejection.reason, "door too small");
    assert_eq!(rejection.prompt_snapshot, asset.current_prompt);
    assert_eq!(rejection.storage_key_snapshot, asset.private_key);

    let rejections = h.forge.approval.list_rejections(asset.id).await.unwrap();
    assert_eq!(rejections.len(), 1);
}

#[tokio::test]
async fn reject_without_feedback_keeps_the_prompt() {
    let h = Harness::new();
    let asset = h.seed(AssetCategory::BuildingRef, "restaurant").await;

    let (rejected, _) = h
        .forge
        .approval
        .reject(asset.id, "  too dark  ", false, ACTOR)
        .await
        .unwrap();

    assert_eq!(rejected.current_prompt, asset.current_prompt);
    assert_eq!(rejected.prompt_version, asset.prompt_version);
    let rejections = h.forge.approval.list_rejections(asset.id).await.unwrap();
    assert_eq!(rejections[0].reason, "too dark");
}

#[tokio::test]
async fn reject_needs_a_reason() {
    let h = Harness::new();
    let asset = h.seed(AssetCategory::BuildingRef, "restaurant").await;

    let err = h
        .forge
        .approval
        .reject(asset.id, "   ", true, ACTOR)
        .await
        .unwrap_err();

    assert_matches!(err, PipelineError::Validation(_));
    assert_eq!(h.asset(asset.id).await.status(), AssetStatus::Completed);
    assert!(h.forge.approval.list_rejections(asset.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn approved_versions_can_be_rejected() {
    let h = Harness::new();
    let asset = h.seed_approved(AssetCategory::Scene, "office").await;

    let (rejected, _) = h
        .forge
        .approval
        .reject(asset.id, "wrong lighting", false, ACTOR)
        .await
        .unwrap();

    assert_eq!(rejected.status(), AssetStatus::Rejected);
    assert!(!rejected.is_active);
}

#[tokio::test]
async fn regenerate_a_rejected_version_creates_the_next_variant() {
    let h = Harness::new();
    h.objects
        .put(
            Tier::Private,
            &ReferenceSpec::library_object_key("awning.png"),
            sprite_png(16, 16, 0),
            PNG_CONTENT_TYPE,
        )
        .await
        .unwrap();
    let parent = h.seed_approved(AssetCategory::BuildingRef, "restaurant").await;

    let mut last = None;
    for _ in 0..3 {
        let mut request = GenerateRequest::new(AssetCategory::BuildingSprite, "restaurant");
        request.references = vec![ReferenceSpec::Library {
            key: "awning.png".into(),
        }];
        last = Some(h.forge.orchestrator.generate(request, ACTOR).await.unwrap());
    }
    let v3 = last.unwrap();
    assert_eq!(v3.variant, 3);
    h.forge
        .approval
        .reject(v3.id, "roof is flat", true, ACTOR)
        .await
        .unwrap();

    let v4 = h
        .forge
        .approval
        .regenerate(v3.id, RegenerateOverrides::default(), ACTOR)
        .await
        .unwrap();

    assert_eq!(v4.variant, 4);
    assert_eq!(v4.status(), AssetStatus::Completed);
    assert_eq!(v4.parent_asset_id, Some(parent.id));
    assert_eq!(v4.references.0, h.asset(v3.id).await.references.0);
    assert!(v4.current_prompt.contains("roof is flat"));
    assert_eq!(v4.rejection_count, 1);
    assert_eq!(h.asset(v3.id).await.status(), AssetStatus::Rejected);
}

#[tokio::test]
async fn regenerate_overrides_prompt_and_merges_settings() {
    let h = Harness::new();
    let mut request = GenerateRequest::new(AssetCategory::EffectRef, "fire");
    request.settings = json!({ "temperature": 0.4, "aspect_ratio": "1:1" });
    let source = h.forge.orchestrator.generate(request, ACTOR).await.unwrap();

    let overrides = RegenerateOverrides {
        prompt: Some("Blue flames".into()),
        settings: Some(json!({ "temperature": 0.9 })),
        references: None,
    };
    let next = h
        .forge
        .approval
        .regenerate(source.id, overrides, ACTOR)
        .await
        .unwrap();

    assert_eq!(next.current_prompt, "Blue flames");
    assert_eq!(next.prompt_version, source.prompt_version + 1);
    assert_eq!(next.generation_settings["temperature"], 0.9);
    assert_eq!(next.generation_settings["aspect_ratio"], "1:1");
    assert_eq!(h.generator.calls()[1].prompt, "Blue flames");
}

#[tokio::test]
async fn regenerate_moves_a_review_source_back_to_completed() {
    let h = Harness::new();
    let source = h.seed(AssetCategory::BuildingRef, "restaurant").await;
    h.store
        .set_asset_status(source.id, AssetStatus::Review)
        .await
        .unwrap();

    h.forge
        .approval
        .regenerate(source.id, RegenerateOverrides::default(), ACTOR)
        .await
        .unwrap();

    assert_eq!(h.asset(source.id).await.status(), AssetStatus::Completed);
    let audit = h
        .store
        .list_audit(&AuditQuery {
            entity_id: Some(source.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(audit[0].action, "superseded_for_review");
    assert_eq!(audit[0].actor, ACTOR);
    assert_eq!(audit[0].details["previous_status"], "review");
}

#[tokio::test]
async fn regenerate_leaves_an_approved_source_active() {
    let h = Harness::new();
    let source = h.seed_approved(AssetCategory::BuildingRef, "restaurant").await;

    let next = h
        .forge
        .approval
        .regenerate(source.id, RegenerateOverrides::default(), ACTOR)
        .await
        .unwrap();

    let source = h.asset(source.id).await;
    assert_eq!(source.status(), AssetStatus::Approved);
    assert!(source.is_active);
    assert!(!next.is_active);
}

#[tokio::test]
async fn failed_regeneration_marks_only_the_new_row() {
    let h = Harness::with_generator(MockGenerator::failing("upstream 503"));
    let source = h.seed(AssetCategory::BuildingRef, "restaurant").await;

    let next = h
        .forge
        .approval
        .regenerate(source.id, RegenerateOverrides::default(), ACTOR)
        .await
        .unwrap();

    assert_eq!(next.status(), AssetStatus::Failed);
    assert_eq!(next.variant, 2);
    assert_eq!(h.asset(source.id).await.status(), AssetStatus::Completed);
}

#[tokio::test]
async fn failed_regeneration_leaves_a_review_source_in_review() {
    let h = Harness::with_generator(MockGenerator::failing("upstream 503"));
    let source = h.seed(AssetCategory::BuildingRef, "restaurant").await;
    h.store
        .set_asset_status(source.id, AssetStatus::Review)
        .await
        .unwrap();

    let next = h
        .forge
        .approval
        .regenerate(source.id, RegenerateOverrides::default(), ACTOR)
        .await
        .unwrap();

    assert_eq!(next.status(), AssetStatus::Failed);
    let source = h.asset(source.id).await;
    assert_eq!(source.status(), AssetStatus::Review);
    assert!(source.error_message.is_none());
    let audit = h
        .store
        .list_audit(&AuditQuery {
            entity_id: Some(source.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(audit.iter().all(|e| e.action != "superseded_for_review"));
}

#[tokio::test]
async fn regenerate_refuses_in_flight_sources() {
    let h = Harness::new();
    let pending = h
        .store
        .create_asset(&CreateGeneratedAsset::new(
            AssetCategory::BuildingRef,
            "restaurant",
            "prompt".into(),
        ))
        .await
        .unwrap();

    let err = h
        .forge
        .approval
        .regenerate(pending.id, RegenerateOverrides::default(), ACTOR)
        .await
        .unwrap_err();

    assert_matches!(err, PipelineError::InvalidTransition { action: "regenerate", .. });
    assert_eq!(h.all_assets().await.len(), 1);
}

#[tokio::test]
async fn set_active_rolls_back_to_an_older_approved_variant() {
    let h = Harness::new();
    let v1 = h.seed_approved(AssetCategory::Scene, "office").await;
    let v2 = h.seed_approved(AssetCategory::Scene, "office").await;
    assert!(!h.asset(v1.id).await.is_active);

    let active = h.forge.approval.set_active(v1.id, ACTOR).await.unwrap();

    assert!(active.is_active);
    assert!(!h.asset(v2.id).await.is_active);
    assert_eq!(h.asset(v2.id).await.status(), AssetStatus::Approved);
}

#[tokio::test]
async fn set_active_requires_an_approved_version() {
    let h = Harness::new();
    let draft = h.seed(AssetCategory::Scene, "office").await;

    let err = h.forge.approval.set_active(draft.id, ACTOR).await.unwrap_err();

    assert_matches!(err, PipelineError::InvalidTransition { action: "activate", .. });
}

#[tokio::test]
async fn at_most_one_version_is_active() {
    let h = Harness::new();
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(h.seed(AssetCategory::Scene, "office").await.id);
    }
    for id in &ids {
        h.forge.approval.approve(*id, ACTOR).await.unwrap();
    }
    h.forge.approval.set_active(ids[1], ACTOR).await.unwrap();
    h.forge.approval.reject(ids[1], "no", false, ACTOR).await.unwrap();

    let rows = h.versions(AssetCategory::Scene, "office").await;
    assert!(active_rows(&rows).is_empty());

    h.forge.approval.set_active(ids[2], ACTOR).await.unwrap();
    let rows = h.versions(AssetCategory::Scene, "office").await;
    let active = active_rows(&rows);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, ids[2]);
}

#[tokio::test]
async fn approving_a_character_sheet_enqueues_walk_frames_once() {
    let h = Harness::new();
    let v1 = h.seed(AssetCategory::CharacterRef, "pedestrian").await;
    let v2 = h.seed(AssetCategory::CharacterRef, "pedestrian").await;

    let first = h.forge.approval.approve(v1.id, ACTOR).await.unwrap();
    assert_eq!(first.pipeline, PipelineTrigger::Skipped);
    assert_eq!(first.dependents_enqueued.len(), 8);
    for row in &first.dependents_enqueued {
        assert_eq!(row.category, "npc");
        assert_eq!(row.status(), AssetStatus::Pending);
        assert_eq!(row.parent_asset_id, Some(v1.id));
        assert!(row.asset_key.starts_with("pedestrian_walk_"));
        let entries = h.store.list_generation_entries(row.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status(), Some(QueueStatus::Pending));
    }

    let second = h.forge.approval.approve(v2.id, ACTOR).await.unwrap();
    assert!(second.dependents_enqueued.is_empty());
    assert_eq!(h.all_assets().await.len(), 10);
}

#[tokio::test]
async fn approving_the_road_sheet_enqueues_every_connector() {
    let h = Harness::new();
    let sheet = h.seed(AssetCategory::TerrainRef, "road").await;

    let outcome = h.forge.approval.approve(sheet.id, ACTOR).await.unwrap();

    let mut keys: Vec<String> = outcome
        .dependents_enqueued
        .iter()
        .map(|r| r.asset_key.clone())
        .collect();
    keys.sort();
    assert_eq!(
        keys,
        vec!["road_corner", "road_crossroad", "road_end", "road_straight", "road_t_junction"]
    );
}

#[tokio::test]
async fn archive_hides_a_version_and_clears_active() {
    let h = Harness::new();
    let asset = h.seed_approved(AssetCategory::Scene, "office").await;

    let archived = h.forge.approval.archive(asset.id, ACTOR).await.unwrap();

    assert_eq!(archived.status(), AssetStatus::Archived);
    assert!(!archived.is_active);
    assert_eq!(h.versions(AssetCategory::Scene, "office").await.len(), 1);
}

#[tokio::test]
async fn archive_refuses_a_generating_row() {
    let h = Harness::new();
    let row = h
        .store
        .create_asset(&CreateGeneratedAsset::new(
            AssetCategory::Scene,
            "office",
            "prompt".into(),
        ))
        .await
        .unwrap();
    h.store.mark_generating(row.id).await.unwrap().unwrap();

    let err = h.forge.approval.archive(row.id, ACTOR).await.unwrap_err();

    assert_matches!(err, PipelineError::InvalidTransition { action: "archive", .. });
}

#[tokio::test]
async fn list_versions_validates_the_category() {
    let h = Harness::new();
    h.seed(AssetCategory::Scene, "office").await;

    let rows = h.forge.approval.list_versions("scene", "office").await.unwrap();
    assert_eq!(rows.len(), 1);

    let err = h
        .forge
        .approval
        .list_versions("castle", "office")
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::Validation(_));
}
