use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    http::{Method, header},
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use url::Url;

use crate::auth::{PasswordHasher, TokenIssuer};
use crate::config::Config;
use crate::db::{LinkTicketStore, PostStore, SqlitePool, UserStore};
use crate::error::JambleError;
use crate::handlers::{posts, spotify_oauth, users};
use crate::spotify_oauth::SpotifyOauthService;

/// Request bodies above this are rejected with 413.
pub const BODY_LIMIT_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct JambleState {
    pub users: UserStore,
    pub posts: PostStore,
    pub link_tickets: LinkTicketStore,
    pub tokens: TokenIssuer,
    pub passwords: PasswordHasher,
    pub spotify: SpotifyOauthService,
    pub deep_link: Url,
    pub insecure_cookie: bool,
    cookie_key: Key,
}

impl JambleState {
    pub fn new(pool: SqlitePool, cfg: &Config) -> Result<Self, JambleError> {
        let basic = &cfg.basic;
        let cookie_key = match basic.cookie_secret.as_deref() {
            Some(secret) => Key::try_from(secret.as_bytes()).map_err(|_| {
                JambleError::Config("basic.cookie_secret must be at least 64 bytes".to_string())
            })?,
            None => {
                warn!("basic.cookie_secret unset; OAuth cookies will not survive a restart");
                Key::generate()
            }
        };

        Ok(Self {
            users: UserStore::new(pool.clone()),
            posts: PostStore::new(pool.clone()),
            link_tickets: LinkTicketStore::new(pool),
            tokens: TokenIssuer::new(&basic.jwt_secret, basic.jwt_ttl_secs),
            passwords: PasswordHasher::new(basic.bcrypt_cost),
            spotify: SpotifyOauthService::new(&cfg.spotify, basic.proxy.as_ref())?,
            deep_link: Url::parse(&basic.deep_link_url)?,
            insecure_cookie: basic.insecure_cookie,
            cookie_key,
        })
    }
}

impl FromRef<JambleState> for Key {
    fn from_ref(state: &JambleState) -> Self {
        state.cookie_key.clone()
    }
}

impl FromRef<JambleState> for TokenIssuer {
    fn from_ref(state: &JambleState) -> Self {
        state.tokens.clone()
    }
}

pub fn jamble_router(state: JambleState) -> Router {
    let user_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/complete-profile", post(users::complete_profile))
        .route(
            "/me",
            get(users::get_me)
                .put(users::update_me)
                .delete(users::delete_me),
        )
        .route("/me/spotify", get(users::my_spotify_profile))
        .route("/{id}", get(users::get_user));

    let post_routes = Router::new()
        .route("/", get(posts::list_posts).post(posts::create_post))
        .route("/create", post(posts::create_post))
        .route(
            "/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        );

    let auth_routes = Router::new()
        .route("/spotify", get(spotify_oauth::spotify_authorize))
        .route("/spotify/callback", get(spotify_oauth::spotify_callback))
        .route("/spotify/link-ticket", post(spotify_oauth::spotify_link_ticket))
        .route("/spotify/refresh", post(spotify_oauth::spotify_refresh));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api/users", user_routes)
        .nest("/api/posts", post_routes)
        .nest("/api/auth", auth_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
