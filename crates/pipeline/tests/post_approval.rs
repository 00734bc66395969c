mod common;

use assert_matches::assert_matches;
use assetforge_cloud::{ObjectStore, Tier};
use assetforge_core::category::AssetCategory;
use assetforge_core::trim::dimensions;
use assetforge_db::models::status::{AssetStatus, PipelineStatus};
use assetforge_db::store::PipelineStateRepository;
use assetforge_events::AssetEvent;
use assetforge_imaging::mock::{MockBackgroundRemover, MockResizer};
use assetforge_pipeline::{PipelineConfig, PipelineError, PipelineOutcome};
use common::{wait_for_pipeline, Harness, ACTOR};

#[tokio::test]
async fn publishes_a_resized_webp() {
    let h = Harness::new();
    let asset = h.seed_approved(AssetCategory::BuildingSprite, "restaurant").await;
    let raw = asset.private_key.clone().unwrap();

    let outcome = h.forge.pipeline.run(asset.id).await.unwrap();

    let (row, warning) = match outcome {
        PipelineOutcome::Completed { asset, warning } => (asset, warning),
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert!(warning.is_none());
    assert_eq!(row.pipeline_status(), Some(PipelineStatus::Completed));
    assert_eq!(row.status(), AssetStatus::Approved);
    assert!(row.background_removed);
    assert!(row.pipeline_error.is_none());
    assert_eq!(
        row.public_key.as_deref(),
        Some("sprites/building_sprite/restaurant_v1.webp")
    );
    assert_eq!(
        row.public_url.as_deref(),
        Some("memory://public/sprites/building_sprite/restaurant_v1.webp")
    );
    assert_eq!(row.original_key.as_deref(), Some(raw.as_str()));
    assert_eq!(
        row.private_key.as_deref(),
        Some("raw/building_sprite_restaurant_raw_v1_transparent.png")
    );
    assert!(row
        .processed_key
        .as_deref()
        .unwrap()
        .starts_with("processed/building_sprite/restaurant_v1_"));

    // Only the sprite is public; the resize scratch object is gone.
    assert_eq!(
        h.objects.keys(Tier::Public),
        vec!["sprites/building_sprite/restaurant_v1.webp"]
    );
    assert_eq!(
        h.objects
            .content_type(Tier::Public, "sprites/building_sprite/restaurant_v1.webp")
            .as_deref(),
        Some("image/webp")
    );
    let published = h
        .objects
        .get(Tier::Public, "sprites/building_sprite/restaurant_v1.webp")
        .await
        .unwrap();
    assert_eq!(dimensions(&published).unwrap(), (256, 256));

    let urls = h.resizer.urls();
    assert_eq!(urls.len(), 1);
    assert!(urls[0].starts_with("memory://public/tmp/resize/"));
    assert_eq!(h.remover.calls(), vec![false]);
}

#[tokio::test]
async fn resize_failure_publishes_the_trimmed_png() {
    let h = Harness::with_resizer(MockResizer::failing("resize worker crashed"));
    let asset = h.seed_approved(AssetCategory::BuildingSprite, "restaurant").await;

    let outcome = h.forge.pipeline.run(asset.id).await.unwrap();

    assert_matches!(outcome, PipelineOutcome::Completed { warning: Some(ref w), .. } if w.contains("resize worker crashed"));
    let row = h.asset(asset.id).await;
    assert_eq!(row.pipeline_status(), Some(PipelineStatus::Completed));
    assert!(row
        .pipeline_error
        .as_deref()
        .unwrap()
        .contains("resize worker crashed"));
    let url = row.public_url.unwrap();
    assert!(url.ends_with(".png"), "{url}");

    assert_eq!(
        h.objects.keys(Tier::Public),
        vec!["sprites/building_sprite/restaurant_v1.png"]
    );
    let published = h
        .objects
        .get(Tier::Public, "sprites/building_sprite/restaurant_v1.png")
        .await
        .unwrap();
    // The 96x96 seed has an 8px transparent margin.
    assert_eq!(dimensions(&published).unwrap(), (80, 80));
}

#[tokio::test]
async fn background_removal_failure_fails_the_run_but_not_the_approval() {
    let h = Harness::with_remover(MockBackgroundRemover::failing("{\"detail\":\"gpu busy\"}"));
    let asset = h.seed_approved(AssetCategory::BuildingSprite, "restaurant").await;

    let err = h.forge.pipeline.run(asset.id).await.unwrap_err();

    assert_matches!(err, PipelineError::Remote(_));
    let row = h.asset(asset.id).await;
    assert_eq!(row.status(), AssetStatus::Approved);
    assert!(row.is_active);
    assert_eq!(row.pipeline_status(), Some(PipelineStatus::Failed));
    assert!(row.pipeline_error.as_deref().unwrap().contains("gpu busy"));
    assert!(!row.background_removed);
    assert!(row.public_url.is_none());
    assert!(h.objects.keys(Tier::Public).is_empty());
}

#[tokio::test]
async fn missing_original_is_reported() {
    let h = Harness::new();
    let asset = h.seed_approved(AssetCategory::Effect, "fire").await;
    let key = asset.private_key.clone().unwrap();
    h.objects.delete(Tier::Private, &key).await.unwrap();

    let err = h.forge.pipeline.run(asset.id).await.unwrap_err();

    assert_matches!(err, PipelineError::OriginalNotFound { key: ref k } if *k == key);
    assert_eq!(
        h.asset(asset.id).await.pipeline_status(),
        Some(PipelineStatus::Failed)
    );
}

#[tokio::test]
async fn rerunning_converges_on_the_same_public_object() {
    let h = Harness::new();
    let asset = h.seed_approved(AssetCategory::Npc, "pedestrian_walk_s_1").await;

    h.forge.pipeline.run(asset.id).await.unwrap();
    let first = h.asset(asset.id).await;
    h.forge.pipeline.run(asset.id).await.unwrap();
    let second = h.asset(asset.id).await;

    assert_eq!(first.public_url, second.public_url);
    assert_eq!(first.private_key, second.private_key);
    assert_eq!(first.original_key, second.original_key);
    assert_eq!(
        h.objects.keys(Tier::Public),
        vec!["sprites/npc/pedestrian_walk_s_1_v1.webp"]
    );
}

#[tokio::test]
async fn a_failed_run_can_be_retried() {
    let h = Harness::new();
    let asset = h.seed_approved(AssetCategory::Effect, "fire").await;
    h.store.claim_pipeline(asset.id).await.unwrap().unwrap();
    h.store
        .fail_pipeline(asset.id, "earlier failure")
        .await
        .unwrap();

    let mut rx = h.subscribe();
    let trigger = h.forge.approval.rerun_pipeline(asset.id, ACTOR).await.unwrap();
    assert_eq!(trigger, assetforge_pipeline::PipelineTrigger::Started);

    let event = wait_for_pipeline(&mut rx, asset.id).await;
    assert_matches!(event, AssetEvent::PipelineCompleted { .. });
    let row = h.asset(asset.id).await;
    assert_eq!(row.pipeline_status(), Some(PipelineStatus::Completed));
    assert!(row.pipeline_error.is_none());
}

#[tokio::test]
async fn ground_texture_keeps_its_background() {
    let h = Harness::new();
    let asset = h.seed_approved(AssetCategory::Terrain, "grass_base").await;

    h.forge.pipeline.run(asset.id).await.unwrap();

    assert_eq!(h.remover.call_count(), 0);
    let row = h.asset(asset.id).await;
    assert_eq!(row.pipeline_status(), Some(PipelineStatus::Completed));
    assert_eq!(
        row.public_key.as_deref(),
        Some("sprites/terrain/grass_base_v1.webp")
    );
}

#[tokio::test]
async fn delegated_trim_asks_the_remover_to_crop() {
    let h = Harness::with_config(PipelineConfig {
        delegate_trim: true,
        ..PipelineConfig::default()
    });
    let asset = h.seed_approved(AssetCategory::Effect, "smoke").await;

    h.forge.pipeline.run(asset.id).await.unwrap();

    assert_eq!(h.remover.calls(), vec![true]);
}

#[tokio::test]
async fn a_run_in_flight_blocks_a_second_claim() {
    let h = Harness::new();
    let asset = h.seed_approved(AssetCategory::Effect, "fire").await;
    h.store.claim_pipeline(asset.id).await.unwrap().unwrap();

    let outcome = h.forge.pipeline.run(asset.id).await.unwrap();

    assert_matches!(outcome, PipelineOutcome::Skipped { .. });
    assert_eq!(h.remover.call_count(), 0);
    assert_eq!(
        h.asset(asset.id).await.pipeline_status(),
        Some(PipelineStatus::Processing)
    );
}

#[tokio::test]
async fn only_approved_sprites_are_processed() {
    let h = Harness::new();
    let sheet = h.seed_approved(AssetCategory::BuildingRef, "restaurant").await;
    let draft = h.seed(AssetCategory::BuildingSprite, "restaurant").await;

    assert_matches!(
        h.forge.pipeline.run(sheet.id).await.unwrap(),
        PipelineOutcome::Skipped { .. }
    );
    assert_matches!(
        h.forge.pipeline.run(draft.id).await.unwrap(),
        PipelineOutcome::Skipped { .. }
    );
    assert!(h.asset(draft.id).await.pipeline_status().is_none());

    let err = h
        .forge
        .approval
        .rerun_pipeline(sheet.id, ACTOR)
        .await
        .unwrap_err();
    assert_matches!(err, PipelineError::Validation(_));
}

#[tokio::test]
async fn recovery_requeues_interrupted_runs_and_backlog() {
    let h = Harness::new();
    let interrupted = h.seed_approved(AssetCategory::Effect, "fire").await;
    h.store.claim_pipeline(interrupted.id).await.unwrap().unwrap();
    let never_run = h.seed_approved(AssetCategory::Effect, "smoke").await;
    h.seed_approved(AssetCategory::EffectRef, "smoke").await;

    let mut rx = h.subscribe();
    let queued = h.forge.queue.recover(h.services()).await.unwrap();
    assert_eq!(queued, 2);

    for id in [interrupted.id, never_run.id] {
        let event = wait_for_pipeline(&mut rx, id).await;
        assert_matches!(event, AssetEvent::PipelineCompleted { .. });
        assert_eq!(
            h.asset(id).await.pipeline_status(),
            Some(PipelineStatus::Completed)
        );
    }
}
