//! End-to-end: mock source → pipeline → response, and the webhook router
//! on top of it.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use fpl_squad::config::AppConfig;
use fpl_squad::data::PlayerSource;
use fpl_squad::selection::features::FeatureDeriver;
use fpl_squad::selection::lineup::LineupSelector;
use fpl_squad::selection::squad::SquadOptimizer;
use fpl_squad::selection::SelectionPipeline;
use fpl_squad::server::{build_router, ServerState};
use fpl_squad::types::*;

use crate::mock_source::MockSource;

fn pipeline_from(cfg: &AppConfig) -> SelectionPipeline {
    SelectionPipeline::new(
        FeatureDeriver::new(cfg.scoring.resolve()),
        SquadOptimizer::new(cfg.squad),
        LineupSelector::new(cfg.lineup),
    )
}

#[tokio::test]
async fn test_pipeline_runs_from_mock_source() {
    let source = MockSource::with_default_pool();
    let pool = source.fetch_pool().await.unwrap();
    let rec = pipeline_from(&AppConfig::default()).run(&pool).unwrap();

    assert_eq!(rec.gameweek, 12);
    assert_eq!(rec.squad.len(), 15);
    assert!(rec.squad.players().iter().all(|p| p.available));
    assert_eq!(rec.scored_pool.len(), pool.players.iter().filter(|p| p.available).count());

    let resp = rec.to_response(&pool.clubs);
    assert_eq!(resp.optimal_squad.iter().filter(|p| p.is_starter).count(), 11);
    assert_eq!(resp.formation.split('-').count(), 3);
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test]
async fn test_both_presets_produce_valid_squads() {
    let pool = MockSource::with_default_pool().fetch_pool().await.unwrap();
    for preset in ["blended", "form_weighted"] {
        let cfg = AppConfig::parse(&format!("[scoring]\npreset = \"{preset}\"")).unwrap();
        let rec = pipeline_from(&cfg).run(&pool).unwrap();
        assert_eq!(rec.squad.position_counts(), PositionCounts::new(2, 5, 5, 3));
        assert!(rec.total_cost() <= 1000);
    }
}

#[tokio::test]
async fn test_webhook_round_trip() {
    let cfg = AppConfig::default();
    let source = Arc::new(MockSource::with_default_pool());
    let state = Arc::new(ServerState::new(
        source.clone(),
        Arc::new(pipeline_from(&cfg)),
        Duration::from_secs(10),
    ));

    let resp = build_router(state.clone())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/generate-squad")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = build_router(state)
        .oneshot(Request::builder().uri("/api/squad/latest").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["gameweek"], 12);
    assert_eq!(json["optimal_squad"].as_array().unwrap().len(), 15);
    assert_eq!(source.fetch_count(), 1);
}

#[tokio::test]
async fn test_webhook_reports_source_failure_then_recovers() {
    let source = Arc::new(MockSource::with_default_pool());
    source.set_error("upstream down");
    let state = Arc::new(ServerState::new(
        source.clone(),
        Arc::new(pipeline_from(&AppConfig::default())),
        Duration::from_secs(10),
    ));

    let post = || {
        Request::builder()
            .method("POST")
            .uri("/generate-squad")
            .body(Body::empty())
            .unwrap()
    };

    let resp = build_router(state.clone()).oneshot(post()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    source.clear_error();
    let resp = build_router(state).oneshot(post()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(source.fetch_count(), 2);
}

#[test]
fn test_blocking_run_without_runtime() {
    let source = MockSource::with_default_pool();
    let pool = tokio_test::block_on(source.fetch_pool()).unwrap();
    let cfg = AppConfig::parse("[squad]\nbudget = 200").unwrap();
    let err = pipeline_from(&cfg).run(&pool).unwrap_err();
    assert!(err.is_infeasible());
    assert_eq!(err.suggestion(), "Raise the budget");
}
