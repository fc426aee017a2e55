#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use jamble::config::Config;
use jamble::db::NewUser;
use jamble::router::{JambleState, jamble_router};
use jamble::types::{Identity, SpotifyLink, User};
use serde_json::Value;
use tower::ServiceExt;
use wiremock::MockServer;

pub struct TestApp {
    pub router: Router,
    pub state: JambleState,
    pub spotify: MockServer,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let spotify = MockServer::start().await;

        let mut cfg = Config::default();
        cfg.basic.jwt_secret = "integration-test-secret".to_string();
        cfg.basic.bcrypt_cost = 4;
        cfg.basic.insecure_cookie = true;
        cfg.basic.deep_link_url = "jamble://auth".to_string();
        cfg.spotify.client_id = "test-client".to_string();
        cfg.spotify.client_secret = "test-secret".to_string();
        cfg.spotify.redirect_uri = "http://localhost/api/auth/spotify/callback".to_string();
        cfg.spotify.auth_url = format!("{}/authorize", spotify.uri());
        cfg.spotify.token_url = format!("{}/api/token", spotify.uri());
        cfg.spotify.api_base_url = format!("{}/v1/", spotify.uri());

        let pool = jamble::db::connect("sqlite::memory:")
            .await
            .expect("failed to open in-memory database");
        let state = JambleState::new(pool, &cfg).expect("failed to build state");
        let router = jamble_router(state.clone());
        Self {
            router,
            state,
            spotify,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let resp = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("request failed");
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        self.send(request(method, uri, token, body)).await
    }

    /// Register a local account; returns `(token, user_id)`.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> (String, String) {
        let resp = self
            .call(
                Method::POST,
                "/api/users/register",
                None,
                Some(serde_json::json!({
                    "username": username,
                    "email": email,
                    "password": password,
                })),
            )
            .await;
        assert_eq!(resp.status, StatusCode::CREATED, "register failed: {}", resp.body);
        (
            resp.body["token"].as_str().unwrap().to_string(),
            resp.body["user"]["id"].as_str().unwrap().to_string(),
        )
    }

    /// Insert a Spotify-only account directly and return it with a session token.
    pub async fn spotify_user(&self, spotify_id: &str, email: &str) -> (String, User) {
        let user = self
            .state
            .users
            .create(NewUser {
                username: None,
                email: email.to_string(),
                identity: Identity::Spotify(SpotifyLink {
                    spotify_id: spotify_id.to_string(),
                    access_token: "stored-access".to_string(),
                    refresh_token: Some("stored-refresh".to_string()),
                }),
                image_url: None,
            })
            .await
            .expect("failed to insert spotify user");
        let token = self.state.tokens.issue(user.id).unwrap();
        (token, user)
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("failed to build request")
}

/// Turn `Set-Cookie` headers into a `Cookie` request header value.
pub fn cookie_header(headers: &HeaderMap) -> String {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter(|pair| pair.split_once('=').is_some_and(|(_, value)| !value.is_empty()))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn location(headers: &HeaderMap) -> url::Url {
    let raw = headers
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("missing Location header");
    url::Url::parse(raw).expect("Location is not a URL")
}

pub fn query_param(url: &url::Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
