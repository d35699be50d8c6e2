//! Router tests against the in-memory Treestatus stub.
//!
//! Each test builds the full router around a fresh seeded
//! [`StubStatusApi`] and drives it with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use treestatus_core::api::{self, StatusApi, StubStatusApi};
use treestatus_core::config::{ApiMode, AppConfig};
use treestatus_core::models::TreeStatus;
use treestatus_web::{build_router, flash, AppState};

// ===========================================================================
// Helpers
// ===========================================================================

fn app_with(stub: Arc<StubStatusApi>) -> Router {
    let mut config = AppConfig::default();
    config.api.mode = ApiMode::Stub;
    let api: Arc<dyn StatusApi> = stub;
    build_router(Arc::new(AppState { config, api }))
}

fn seeded() -> (Arc<StubStatusApi>, Router) {
    let stub = Arc::new(StubStatusApi::seeded());
    let app = app_with(stub.clone());
    (stub, app)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(header::REFERER, "/treestatus/mozilla-central")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_text(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(resp: &Response) -> Option<&str> {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

// ===========================================================================
// Pages
// ===========================================================================

#[tokio::test]
async fn test_root_redirects_to_trees() {
    let (_, app) = seeded();
    let resp = app.oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), Some("/treestatus"));
}

#[tokio::test]
async fn test_heartbeat() {
    let (_, app) = seeded();
    let resp = app.oneshot(get("/__heartbeat__")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(json["ok"], true);
}

#[tokio::test]
async fn test_trees_page_lists_trees_and_stack() {
    let (stub, app) = seeded();
    let resp = app.oneshot(get("/treestatus")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let html = body_text(resp).await;
    assert!(html.contains("href=\"/treestatus/autoland\""));
    assert!(html.contains("href=\"/treestatus/esr115\""));
    let stack_id = stub.stack_ids()[0];
    assert!(html.contains(&format!("action=\"/treestatus/stack/{}\"", stack_id)));
    assert!(html.contains("we are CLOSED!"));
}

#[tokio::test]
async fn test_empty_service_renders_empty_page() {
    let app = app_with(Arc::new(StubStatusApi::new()));
    let resp = app.oneshot(get("/treestatus")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("No trees are being tracked."));
    assert!(html.contains("No recent changes."));
}

#[tokio::test]
async fn test_tree_page_shows_history() {
    let (_, app) = seeded();
    let resp = app.oneshot(get("/treestatus/mozilla-central")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let html = body_text(resp).await;
    assert!(html.contains("History"));
    assert!(html.contains("action=\"/treestatus/log/"));
}

#[tokio::test]
async fn test_unknown_tree_shows_api_detail() {
    let (_, app) = seeded();
    let resp = app.oneshot(get("/treestatus/nope")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_text(resp).await.contains("No tree nope found."));
}

#[tokio::test]
async fn test_tree_name_cannot_leave_trees_path() {
    let (stub, app) = seeded();
    let resp = app.oneshot(get("/treestatus/..%2Fstack")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let calls = stub.calls();
    assert!(!calls.is_empty());
    for call in calls {
        assert!(call.path.starts_with("/trees/..%2Fstack"), "{}", call.path);
    }
}

#[tokio::test]
async fn test_dot_segment_tree_is_not_found_without_api_call() {
    let (stub, app) = seeded();
    let resp = app.oneshot(get("/treestatus/%2E%2E")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_page_read_failure_without_detail_is_500() {
    let (stub, app) = seeded();
    stub.fail_next(503, None);
    let resp = app.oneshot(get("/treestatus")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_flash_cookie_is_shown_then_cleared() {
    let (_, app) = seeded();
    let cookie = flash::cookie_value(&[flash::Flash::success("Status change restored.")]);
    let pair = cookie.split(';').next().unwrap().to_string();
    let req = Request::builder()
        .uri("/treestatus")
        .header(header::COOKIE, pair)
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(set_cookie.contains("Max-Age=0"));
    assert!(body_text(resp).await.contains("Status change restored."));
}

// ===========================================================================
// Recent changes stack
// ===========================================================================

#[tokio::test]
async fn test_restore_redirects_with_flash() {
    let (stub, app) = seeded();
    let id = stub.stack_ids()[0];
    let resp = app
        .oneshot(post_form(
            &format!("/treestatus/stack/{}", id),
            &format!("id={}&restore=Restore", id),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), Some("/treestatus/mozilla-central"));
    let set_cookie = resp.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(set_cookie.starts_with(flash::FLASH_COOKIE));

    let calls = stub.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].path, format!("/stack/{}", id));
    assert_eq!(calls[0].params, vec![("revert".to_string(), "1".to_string())]);

    let tree = api::get_tree(stub.as_ref(), "mozilla-central").await.unwrap();
    assert_eq!(tree.status, TreeStatus::Open);
}

#[tokio::test]
async fn test_discard_sends_revert_zero() {
    let (stub, app) = seeded();
    let id = stub.stack_ids()[0];
    let resp = app
        .oneshot(post_form(
            &format!("/treestatus/stack/{}", id),
            "discard=Discard",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(stub.calls()[0].params, vec![("revert".to_string(), "0".to_string())]);
    assert!(stub.stack_ids().is_empty());
}

#[tokio::test]
async fn test_update_sends_patch_body() {
    let (stub, app) = seeded();
    let id = stub.stack_ids()[0];
    let resp = app
        .oneshot(post_form(
            &format!("/treestatus/stack/{}", id),
            "reason=flaky+tests&reason_category=Merges&update=Update",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        stub.calls()[0].body,
        Some(serde_json::json!({"reason": "flaky tests", "tags": ["Merges"]}))
    );
}

#[tokio::test]
async fn test_no_action_selected_never_calls_api() {
    let (stub, app) = seeded();
    let resp = app
        .oneshot(post_form("/treestatus/stack/5", "id=5&reason=x"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_two_actions_selected_never_calls_api() {
    let (stub, app) = seeded();
    let resp = app
        .oneshot(post_form("/treestatus/stack/5", "restore=Restore&discard=Discard"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_non_numeric_id_is_bad_request() {
    let (stub, app) = seeded();
    let resp = app
        .oneshot(post_form("/treestatus/stack/abc", "restore=Restore"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_rejection_shows_detail_without_redirect() {
    let (stub, app) = seeded();
    stub.fail_next(409, Some("Stack entry is locked by another sheriff."));
    let resp = app
        .oneshot(post_form("/treestatus/stack/5", "restore=Restore"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(location(&resp).is_none());
    assert!(body_text(resp)
        .await
        .contains("Stack entry is locked by another sheriff."));
}

#[tokio::test]
async fn test_failure_without_detail_is_500() {
    let (stub, app) = seeded();
    stub.fail_next(500, None);
    let resp = app
        .oneshot(post_form("/treestatus/stack/5", "update=Update"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// ===========================================================================
// Tree updates and log edits
// ===========================================================================

#[tokio::test]
async fn test_bulk_update_closes_trees() {
    let (stub, app) = seeded();
    let resp = app
        .oneshot(post_form(
            "/treestatus",
            "trees=autoland&trees=esr115&status=closed&reason=bustage\
             &reason_category=Check-in+test+failure&remember_this_change=y",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let trees = api::get_trees(stub.as_ref()).await.unwrap();
    let closed: Vec<&str> = trees
        .iter()
        .filter(|t| t.status == TreeStatus::Closed)
        .map(|t| t.tree.as_str())
        .collect();
    assert_eq!(closed, vec!["autoland", "esr115", "mozilla-central"]);
    assert_eq!(stub.stack_ids().len(), 2);
}

#[tokio::test]
async fn test_bulk_update_validation_blocks_call() {
    let (stub, app) = seeded();
    let resp = app
        .oneshot(post_form("/treestatus", "status=closed"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let html = body_text(resp).await;
    assert!(html.contains("A selection of trees is required."));
    assert!(html.contains("A reason is required."));
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_new_tree_then_listed() {
    let (stub, app) = seeded();
    let resp = app
        .clone()
        .oneshot(post_form("/treestatus/new_tree", "tree=comm-central"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = app.oneshot(get("/treestatus")).await.unwrap();
    assert!(body_text(resp).await.contains("href=\"/treestatus/comm-central\""));
    assert_eq!(stub.calls()[0].path, "/trees/comm-central");
}

#[tokio::test]
async fn test_duplicate_tree_is_rejected() {
    let (_, app) = seeded();
    let resp = app
        .oneshot(post_form("/treestatus/new_tree", "tree=autoland"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(resp).await.contains("Tree autoland already exists."));
}

#[tokio::test]
async fn test_reserved_tree_name_is_rejected() {
    let (stub, app) = seeded();
    let resp = app
        .oneshot(post_form("/treestatus/new_tree", "tree=new_tree"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_log_update() {
    let (stub, app) = seeded();
    let logs = api::get_tree_logs(stub.as_ref(), "mozilla-central").await.unwrap();
    let log_id = logs[0].id;

    let resp = app
        .oneshot(post_form(
            &format!("/treestatus/log/{}", log_id),
            "reason=merge+day&reason_category=Merges",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let logs = api::get_tree_logs(stub.as_ref(), "mozilla-central").await.unwrap();
    let edited = logs.iter().find(|l| l.id == log_id).unwrap();
    assert_eq!(edited.reason, "merge day");
    assert_eq!(edited.tags, vec!["Merges"]);
}
