mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};
use tinylink::domain::entities::Identity;

// ─── CREATE ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_guest_create_mints_guest_cookie() {
    let (state, _rx) = common::create_test_state();
    let server = common::make_server(state);

    let response = server
        .post("/api/links")
        .json(&json!({ "url": "https://example.com/one" }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["alias"], "1");
    assert_eq!(body["path"], "/1");
    assert_eq!(body["version"], 1);

    let guest = common::cookie_value(&response, "tl_guest").expect("guest cookie");
    assert!(Identity::guest_from_cookie(&guest).is_some());
}

#[tokio::test]
async fn test_guest_links_follow_cookie() {
    let (state, _rx) = common::create_test_state();
    let server = common::make_server(state);

    let created = server
        .post("/api/links")
        .json(&json!({ "url": "https://example.com/one", "alias": "first" }))
        .await;
    let guest = common::cookie_value(&created, "tl_guest").unwrap();

    let mine = server
        .get("/api/links")
        .add_header("Cookie", format!("tl_guest={guest}"))
        .await;
    mine.assert_status_ok();
    assert_eq!(mine.json::<Value>()["total"], 1);
    assert!(common::cookie_value(&mine, "tl_guest").is_none());

    let stranger = server.get("/api/links").await;
    assert_eq!(stranger.json::<Value>()["total"], 0);
}

#[tokio::test]
async fn test_user_create_private_and_conflict() {
    let (state, _rx) = common::create_test_state();
    let session = state
        .identity_resolver
        .establish_session(Identity::user(7))
        .await
        .unwrap();
    let server = common::make_server(state);

    let first = server
        .post("/api/links")
        .authorization_bearer(&session.access)
        .json(&json!({ "url": "https://example.com", "alias": "team-notes", "private": true }))
        .await;
    first.assert_status(StatusCode::CREATED);
    assert_eq!(first.json::<Value>()["path"], "/p/team-notes");

    let second = server
        .post("/api/links")
        .authorization_bearer(&session.access)
        .json(&json!({ "url": "https://example.org", "alias": "team-notes", "private": true }))
        .await;
    second.assert_status(StatusCode::CONFLICT);
    assert_eq!(second.json::<Value>()["error"]["code"], "alias_unavailable");
}

#[tokio::test]
async fn test_guest_cannot_create_private() {
    let (state, _rx) = common::create_test_state();
    let server = common::make_server(state);

    let response = server
        .post("/api/links")
        .json(&json!({ "url": "https://example.com", "private": true }))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_create_rejects_bad_input() {
    let (state, _rx) = common::create_test_state();
    let server = common::make_server(state);

    let short_alias = server
        .post("/api/links")
        .json(&json!({ "url": "https://example.com", "alias": "ab" }))
        .await;
    short_alias.assert_status_bad_request();

    let reserved = server
        .post("/api/links")
        .json(&json!({ "url": "https://example.com", "alias": "health" }))
        .await;
    reserved.assert_status_bad_request();

    let ftp = server
        .post("/api/links")
        .json(&json!({ "url": "ftp://example.com/file" }))
        .await;
    ftp.assert_status_bad_request();

    let not_a_url = server
        .post("/api/links")
        .json(&json!({ "url": "not a url" }))
        .await;
    not_a_url.assert_status_bad_request();
}

// ─── UPDATE ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_update_with_version() {
    let (state, _rx) = common::create_test_state();
    let owner = Identity::user(3);
    let link = common::create_link(&state, &owner, "docs", "https://example.com/v1", false).await;
    let session = state.identity_resolver.establish_session(owner).await.unwrap();
    let server = common::make_server(state);

    let updated = server
        .patch(&format!("/api/links/{}", link.id))
        .authorization_bearer(&session.access)
        .json(&json!({ "version": 1, "url": "https://example.com/v2" }))
        .await;
    updated.assert_status_ok();
    let body = updated.json::<Value>();
    assert_eq!(body["version"], 2);
    assert_eq!(body["url"], "https://example.com/v2");

    let redirect = server.get("/docs").await;
    assert_eq!(redirect.header("location"), "https://example.com/v2");

    let stale = server
        .patch(&format!("/api/links/{}", link.id))
        .authorization_bearer(&session.access)
        .json(&json!({ "version": 1, "url": "https://example.com/v3" }))
        .await;
    stale.assert_status_not_found();
}

#[tokio::test]
async fn test_update_someone_elses_link() {
    let (state, _rx) = common::create_test_state();
    let link =
        common::create_link(&state, &Identity::user(1), "docs", "https://example.com", false).await;
    let session = state
        .identity_resolver
        .establish_session(Identity::user(2))
        .await
        .unwrap();
    let server = common::make_server(state);

    let response = server
        .patch(&format!("/api/links/{}", link.id))
        .authorization_bearer(&session.access)
        .json(&json!({ "version": 1, "url": "https://evil.example.com" }))
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_update_requires_a_change() {
    let (state, _rx) = common::create_test_state();
    let owner = Identity::user(3);
    let link = common::create_link(&state, &owner, "docs", "https://example.com", false).await;
    let session = state.identity_resolver.establish_session(owner).await.unwrap();
    let server = common::make_server(state);

    let response = server
        .patch(&format!("/api/links/{}", link.id))
        .authorization_bearer(&session.access)
        .json(&json!({ "version": 1 }))
        .await;

    response.assert_status_bad_request();
}

// ─── DELETE ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_delete_alias() {
    let (state, _rx) = common::create_test_state();
    let owner = Identity::user(5);
    common::create_link(&state, &owner, "docs", "https://example.com/public", false).await;
    common::create_link(&state, &owner, "docs", "https://example.com/private", true).await;
    let session = state.identity_resolver.establish_session(owner).await.unwrap();
    let server = common::make_server(state);

    let response = server
        .delete("/api/aliases/docs")
        .authorization_bearer(&session.access)
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    server.get("/docs").await.assert_status_not_found();
    server
        .get("/p/docs")
        .authorization_bearer(&session.access)
        .await
        .assert_status_not_found();

    let again = server
        .delete("/api/aliases/docs")
        .authorization_bearer(&session.access)
        .await;
    again.assert_status_not_found();
}

#[tokio::test]
async fn test_delete_other_owner_alias_is_not_found() {
    let (state, _rx) = common::create_test_state();
    common::create_link(&state, &Identity::user(1), "docs", "https://example.com", false).await;
    let session = state
        .identity_resolver
        .establish_session(Identity::user(2))
        .await
        .unwrap();
    let server = common::make_server(state);

    let response = server
        .delete("/api/aliases/docs")
        .authorization_bearer(&session.access)
        .await;
    response.assert_status_not_found();

    server
        .get("/docs")
        .await
        .assert_status(StatusCode::TEMPORARY_REDIRECT);
}
