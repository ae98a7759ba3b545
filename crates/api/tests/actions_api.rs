//! Integration tests for `/api/v1/actions`.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, delete, get, post_as, post_json, INSPECTOR, MANAGER};
use serde_json::json;

/// Create one pending action for item 7 and return its id.
async fn seed_action(app: &axum::Router) -> i64 {
    let body = json!({
        "inspection_id": 1,
        "asset_id": "P001",
        "created_by": INSPECTOR,
        "defects": [{
            "item_number": 7,
            "item_description": "Oil level",
            "days": [1],
            "comment": "oil leak",
            "primary_inspection_item_id": 100,
        }],
    });
    post_json(app, "/api/v1/defects/sync", body).await;

    let list = body_json(get(app, "/api/v1/actions?asset_id=P001").await).await;
    list["data"][0]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn log_requires_a_comment() {
    let (app, _store) = build_test_app();
    let id = seed_action(&app).await;

    let response = post_as(
        &app,
        &format!("/api/v1/actions/{id}/log"),
        MANAGER,
        Some(json!({ "comment": "   " })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let action = body_json(get(&app, &format!("/api/v1/actions/{id}")).await).await;
    assert_eq!(action["data"]["status"], "pending");
    assert_eq!(action["data"]["logged_comment"], json!(null));
}

#[tokio::test]
async fn log_rejects_comments_over_40_characters() {
    let (app, _store) = build_test_app();
    let id = seed_action(&app).await;

    let response = post_as(
        &app,
        &format!("/api/v1/actions/{id}/log"),
        MANAGER,
        Some(json!({ "comment": "x".repeat(41) })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn full_lifecycle_with_undo() {
    let (app, _store) = build_test_app();
    let id = seed_action(&app).await;

    let logged = body_json(
        post_as(
            &app,
            &format!("/api/v1/actions/{id}/log"),
            MANAGER,
            Some(json!({ "comment": "parts ordered" })),
        )
        .await,
    )
    .await;
    assert_eq!(logged["data"]["status"], "logged");
    assert_eq!(logged["data"]["logged_by"], MANAGER);

    let locked = body_json(get(&app, "/api/v1/defects/locked?asset_id=P001").await).await;
    assert_eq!(locked["data"]["locked_items"][0]["comment"], "parts ordered");

    let completed =
        body_json(post_as(&app, &format!("/api/v1/actions/{id}/complete"), MANAGER, None).await)
            .await;
    assert_eq!(completed["data"]["status"], "completed");
    assert_eq!(completed["data"]["logged_comment"], "parts ordered");

    let locked = body_json(get(&app, "/api/v1/defects/locked?asset_id=P001").await).await;
    assert_eq!(locked["data"]["locked_items"], json!([]));

    let restored = body_json(
        post_as(&app, &format!("/api/v1/actions/{id}/undo-complete"), MANAGER, None).await,
    )
    .await;
    assert_eq!(restored["data"]["status"], "logged");
    assert_eq!(restored["data"]["logged_comment"], "parts ordered");
    assert_eq!(restored["data"]["actioned_at"], json!(null));

    let pending =
        body_json(post_as(&app, &format!("/api/v1/actions/{id}/undo-log"), MANAGER, None).await)
            .await;
    assert_eq!(pending["data"]["status"], "pending");
    assert_eq!(pending["data"]["logged_comment"], json!(null));
}

#[tokio::test]
async fn repeated_complete_is_idempotent() {
    let (app, _store) = build_test_app();
    let id = seed_action(&app).await;
    let uri = format!("/api/v1/actions/{id}/complete");

    let first = post_as(&app, &uri, MANAGER, None).await;
    let second = post_as(&app, &uri, MANAGER, None).await;
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_json(second).await["data"]["status"], "completed");
}

#[tokio::test]
async fn transitions_require_an_actor() {
    let (app, _store) = build_test_app();
    let id = seed_action(&app).await;

    let response = post_json(&app, &format!("/api/v1/actions/{id}/complete"), json!({})).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn transition_on_missing_action_is_404() {
    let (app, _store) = build_test_app();
    let response = post_as(&app, "/api/v1/actions/999/complete", MANAGER, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let (app, _store) = build_test_app();
    let id = seed_action(&app).await;
    let uri = format!("/api/v1/actions/{id}");

    assert_eq!(delete(&app, &uri).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(delete(&app, &uri).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(get(&app, &uri).await.status(), StatusCode::NOT_FOUND);

    let locked = body_json(get(&app, "/api/v1/defects/locked?asset_id=P001").await).await;
    assert_eq!(locked["data"]["locked_items"], json!([]));
}

#[tokio::test]
async fn detail_includes_occurrences() {
    let (app, _store) = build_test_app();
    let id = seed_action(&app).await;

    let json = body_json(get(&app, &format!("/api/v1/actions/{id}")).await).await;
    assert_eq!(json["data"]["id"], id);
    assert_eq!(json["data"]["priority"], "high");
    assert_eq!(json["data"]["occurrences"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn list_filters_by_status() {
    let (app, _store) = build_test_app();
    let id = seed_action(&app).await;
    post_as(&app, &format!("/api/v1/actions/{id}/complete"), MANAGER, None).await;

    let pending = body_json(get(&app, "/api/v1/actions?status=pending").await).await;
    assert_eq!(pending["data"], json!([]));

    let completed = body_json(get(&app, "/api/v1/actions?status=completed").await).await;
    assert_eq!(completed["data"].as_array().unwrap().len(), 1);
}
