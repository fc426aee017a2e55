mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn register_returns_token_and_hides_secrets() {
    let app = TestApp::spawn().await;
    let resp = app
        .call(
            Method::POST,
            "/api/users/register",
            None,
            Some(json!({"username": "alice", "email": "Alice@Example.com", "password": "password123"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(resp.body["message"], "User created successfully");
    assert_eq!(resp.body["user"]["email"], "alice@example.com");
    assert_eq!(resp.body["user"]["account_origin"], "local");
    assert!(resp.body["token"].as_str().is_some_and(|t| !t.is_empty()));

    let raw = resp.body.to_string();
    assert!(!raw.contains("password"));
    assert!(!raw.contains("$2b$"));
}

#[tokio::test]
async fn duplicate_email_or_username_is_a_conflict() {
    let app = TestApp::spawn().await;
    app.register("alice", "alice@example.com", "password123").await;

    let resp = app
        .call(
            Method::POST,
            "/api/users/register",
            None,
            Some(json!({"username": "alice2", "email": "ALICE@example.com", "password": "password123"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.body["error"]["code"], "CONFLICT");

    let resp = app
        .call(
            Method::POST,
            "/api/users/register",
            None,
            Some(json!({"username": "alice", "email": "other@example.com", "password": "password123"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);

    let resp = app
        .call(
            Method::POST,
            "/api/users/register",
            None,
            Some(json!({"username": "Alice", "email": "third@example.com", "password": "password123"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.body["error"]["message"], "Username is already taken");
}

#[tokio::test]
async fn register_validates_fields() {
    let app = TestApp::spawn().await;
    for body in [
        json!({"username": "al", "email": "a@example.com", "password": "password123"}),
        json!({"username": "alice", "email": "not-an-email", "password": "password123"}),
        json!({"username": "alice", "email": "a@example.com", "password": "short"}),
        json!({"email": "a@example.com", "password": "password123"}),
    ] {
        let resp = app
            .call(Method::POST, "/api/users/register", None, Some(body.clone()))
            .await;
        assert_eq!(resp.status, StatusCode::BAD_REQUEST, "accepted {body}");
        assert_eq!(resp.body["error"]["code"], "BAD_REQUEST");
    }

    let resp = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/users/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_by_email_or_username() {
    let app = TestApp::spawn().await;
    let (_, id) = app.register("bob", "bob@example.com", "password123").await;

    for login in ["bob", "BOB@example.com", "Bob"] {
        let resp = app
            .call(
                Method::POST,
                "/api/users/login",
                None,
                Some(json!({"emailOrUsername": login, "password": "password123"})),
            )
            .await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body["user"]["id"], id.as_str());
        let token = resp.body["token"].as_str().unwrap();
        let me = app.call(Method::GET, "/api/users/me", Some(token), None).await;
        assert_eq!(me.status, StatusCode::OK);
    }

    let resp = app
        .call(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({"emailOrUsername": "bob", "password": "wrong-password"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let resp = app
        .call(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({"emailOrUsername": "nobody", "password": "password123"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.body["error"]["message"], "User not found");
}

#[tokio::test]
async fn spotify_only_account_cannot_use_password_login() {
    let app = TestApp::spawn().await;
    app.spotify_user("sp-only", "sp@example.com").await;
    let resp = app
        .call(
            Method::POST,
            "/api/users/login",
            None,
            Some(json!({"emailOrUsername": "sp@example.com", "password": "password123"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let app = TestApp::spawn().await;
    let resp = app.call(Method::GET, "/api/users/me", None, None).await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.body["error"]["message"], "Access denied, no token provided");

    let resp = app
        .call(Method::GET, "/api/users", Some("garbage.token.value"), None)
        .await;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_paging_uses_the_error_envelope() {
    let app = TestApp::spawn().await;
    let (token, _) = app.register("pager", "pager@example.com", "password123").await;
    let resp = app
        .call(Method::GET, "/api/users?limit=abc", Some(&token), None)
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.body["error"]["code"], "BAD_REQUEST");
    assert!(resp.body["error"]["message"].as_str().unwrap().contains("limit"));
}

#[tokio::test]
async fn complete_profile_sets_username_once() {
    let app = TestApp::spawn().await;
    app.register("taken", "taken@example.com", "password123").await;
    let (token, user) = app.spotify_user("sp-1", "fan@example.com").await;
    assert!(user.username.is_none());

    let resp = app
        .call(
            Method::POST,
            "/api/users/complete-profile",
            Some(&token),
            Some(json!({"username": "taken"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);

    let resp = app
        .call(
            Method::POST,
            "/api/users/complete-profile",
            Some(&token),
            Some(json!({"username": "fresh_name"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["user"]["username"], "fresh_name");

    let resp = app
        .call(
            Method::POST,
            "/api/users/complete-profile",
            Some(&token),
            Some(json!({"username": "another_name"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn profile_edit_and_public_view() {
    let app = TestApp::spawn().await;
    let (token, id) = app.register("carol", "carol@example.com", "password123").await;

    let resp = app
        .call(
            Method::PUT,
            "/api/users/me",
            Some(&token),
            Some(json!({
                "bio": "vinyl only",
                "image_url": "https://example.com/carol.png",
                "favorite_albums": ["Blue", "Kid A"]
            })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["user"]["bio"], "vinyl only");
    assert_eq!(resp.body["user"]["favorite_albums"], json!(["Blue", "Kid A"]));

    // absent fields stay, empty strings clear
    let resp = app
        .call(Method::PUT, "/api/users/me", Some(&token), Some(json!({"bio": ""})))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body["user"]["bio"].is_null());
    assert_eq!(resp.body["user"]["image_url"], "https://example.com/carol.png");

    let resp = app
        .call(
            Method::PUT,
            "/api/users/me",
            Some(&token),
            Some(json!({"favorite_albums": ["1", "2", "3", "4", "5", "6"]})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let resp = app
        .call(
            Method::PUT,
            "/api/users/me",
            Some(&token),
            Some(json!({"wallpaper_url": "ftp://example.com/w.png"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    let (other, _) = app.register("dave", "dave@example.com", "password123").await;
    let resp = app
        .call(Method::GET, &format!("/api/users/{id}"), Some(&other), None)
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["username"], "carol");
    assert!(resp.body.get("email").is_none());

    let resp = app.call(Method::GET, "/api/users", Some(&other), None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body.as_array().map(Vec::len), Some(2));

    let resp = app
        .call(
            Method::GET,
            &format!("/api/users/{}", uuid::Uuid::new_v4()),
            Some(&other),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleting_account_removes_it_and_its_posts() {
    let app = TestApp::spawn().await;
    let (token, id) = app.register("erin", "erin@example.com", "password123").await;
    let (viewer, _) = app.register("frank", "frank@example.com", "password123").await;

    let resp = app
        .call(
            Method::POST,
            "/api/posts",
            Some(&token),
            Some(json!({"content": "on repeat", "type": "song", "reference_id": "4uLU6hMCjMI75M1A2tKUQC"})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);

    let resp = app.call(Method::DELETE, "/api/users/me", Some(&token), None).await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app.call(Method::GET, "/api/users/me", Some(&token), None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);

    let resp = app
        .call(Method::GET, &format!("/api/posts?user_id={id}"), Some(&viewer), None)
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, json!([]));
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let app = TestApp::spawn().await;
    let bio = "a".repeat(70 * 1024);
    let resp = app
        .call(
            Method::POST,
            "/api/users/register",
            None,
            Some(json!({"username": "big", "email": "big@example.com", "password": bio})),
        )
        .await;
    assert_eq!(resp.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(resp.body["error"]["code"], "PAYLOAD_TOO_LARGE");
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::spawn().await;
    let resp = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, json!("ok"));
}
