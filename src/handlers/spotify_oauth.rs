use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use chrono::Utc;
use oauth2::{AuthorizationCode, CsrfToken, PkceCodeChallenge, PkceCodeVerifier};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::error::JambleError;
use crate::handlers::users::load_user;
use crate::middleware::{AuthUser, MaybeAuthUser, QueryParams};
use crate::router::JambleState;
use crate::spotify_oauth::resolve_account;
use crate::types::UserId;

const CSRF_COOKIE: &str = "spotify_oauth_csrf";
const PKCE_COOKIE: &str = "spotify_oauth_pkce";
const LINK_COOKIE: &str = "spotify_oauth_link_user";
/// Lifetime of a link ticket, in seconds.
const LINK_TICKET_TTL_SECS: i64 = 300;

#[derive(Debug, Default, Deserialize)]
pub struct AuthorizeQuery {
    /// Link ticket for clients that cannot set headers on a browser redirect.
    pub ticket: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LinkTicketResponse {
    pub ticket: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub message: &'static str,
    pub access_token: String,
    pub expires_in: Option<u64>,
}

/// Values stashed in the cookies between authorize and callback.
struct OauthSession {
    csrf: String,
    pkce_verifier: String,
    link_user: Option<UserId>,
}

/// POST /api/auth/spotify/link-ticket -> short-lived, single-use ticket that
/// starts a linking flow from a plain browser link.
pub async fn spotify_link_ticket(
    State(state): State<JambleState>,
    AuthUser(user_id): AuthUser,
) -> Result<impl IntoResponse, JambleError> {
    let ticket = CsrfToken::new_random_len(32).secret().to_string();
    let expires_at = Utc::now() + chrono::Duration::seconds(LINK_TICKET_TTL_SECS);
    state
        .link_tickets
        .insert(&ticket, user_id, expires_at)
        .await?;
    info!(user_id = %user_id, "Issued Spotify link ticket");
    Ok((
        StatusCode::CREATED,
        Json(LinkTicketResponse {
            ticket,
            expires_in: LINK_TICKET_TTL_SECS,
        }),
    ))
}

/// GET /api/auth/spotify -> redirects to Spotify's consent page.
///
/// With a bearer header or a link ticket (`?ticket=`) the callback links the
/// Spotify account to that user instead of signing in.
pub async fn spotify_authorize(
    State(state): State<JambleState>,
    MaybeAuthUser(header_user): MaybeAuthUser,
    QueryParams(query): QueryParams<AuthorizeQuery>,
    jar: PrivateCookieJar,
) -> Result<Response, JambleError> {
    let link_user = match (header_user, query.ticket.as_deref()) {
        (Some(id), _) => Some(id),
        (None, Some(ticket)) => Some(
            state
                .link_tickets
                .redeem(ticket, Utc::now())
                .await?
                .ok_or_else(|| {
                    JambleError::Unauthorized("Invalid or expired link ticket".to_string())
                })?,
        ),
        (None, None) => None,
    };

    let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
    let (auth_url, csrf_token) = state.spotify.authorize_url(challenge);

    let jar = store_oauth_cookies(
        jar,
        &csrf_token,
        verifier.secret(),
        link_user,
        state.insecure_cookie,
    );

    info!(linking = link_user.is_some(), "Dispatching Spotify OAuth redirect");
    Ok((jar, Redirect::temporary(auth_url.as_str())).into_response())
}

/// GET /api/auth/spotify/callback -> resolves the account and hands a session
/// token to the app through the deep link.
///
/// Failures go to the deep link too, as `error=<CODE>&message=...`.
pub async fn spotify_callback(
    State(state): State<JambleState>,
    QueryParams(query): QueryParams<AuthCallbackQuery>,
    jar: PrivateCookieJar,
) -> Response {
    let (session, jar) = match load_oauth_session(jar) {
        Ok(data) => data,
        Err((jar, err)) => return redirect_with_error(jar, &state.deep_link, err),
    };
    match complete_callback(&state, query, session).await {
        Ok(location) => (jar, Redirect::to(&location)).into_response(),
        Err(err) => redirect_with_error(jar, &state.deep_link, err),
    }
}

async fn complete_callback(
    state: &JambleState,
    query: AuthCallbackQuery,
    session: OauthSession,
) -> Result<String, JambleError> {
    if let Some(error) = query.error {
        return Err(JambleError::OauthFlow(format!(
            "Spotify authorization was not granted: {error}"
        )));
    }
    let state_param = query
        .state
        .ok_or_else(|| JambleError::OauthFlow("missing `state` in callback".to_string()))?;
    if !bool::from(state_param.as_bytes().ct_eq(session.csrf.as_bytes())) {
        return Err(JambleError::OauthFlow("CSRF token mismatch".to_string()));
    }
    let code = query
        .code
        .ok_or_else(|| JambleError::OauthFlow("missing `code` in callback".to_string()))?;

    let tokens = state
        .spotify
        .exchange_code(
            AuthorizationCode::new(code),
            PkceCodeVerifier::new(session.pkce_verifier),
        )
        .await?;
    let profile = state.spotify.fetch_profile(&tokens.access_token).await?;
    let outcome = resolve_account(&state.users, &profile, &tokens, session.link_user).await?;

    let token = state.tokens.issue(outcome.user().id)?;
    let mut location = state.deep_link.clone();
    location
        .query_pairs_mut()
        .append_pair("token", &token)
        .append_pair("status", outcome.status());

    info!(
        user_id = %outcome.user().id,
        status = outcome.status(),
        "Spotify OAuth callback completed"
    );
    Ok(location.into())
}

/// POST /api/auth/spotify/refresh
pub async fn spotify_refresh(
    State(state): State<JambleState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<RefreshResponse>, JambleError> {
    let user = load_user(&state, user_id).await?;
    let link = user
        .identity
        .spotify()
        .ok_or(JambleError::NotFound("Spotify link"))?;
    let Some(refresh_token) = link.refresh_token.as_deref() else {
        return Err(JambleError::Unauthorized(
            "No Spotify refresh token stored; sign in with Spotify again".to_string(),
        ));
    };

    let tokens = state.spotify.refresh(refresh_token).await?;
    state
        .users
        .update_spotify_tokens(
            user_id,
            &tokens.access_token,
            tokens.refresh_token.as_deref(),
        )
        .await?
        .ok_or(JambleError::NotFound("user"))?;

    Ok(Json(RefreshResponse {
        message: "Spotify token refreshed",
        access_token: tokens.access_token,
        expires_in: tokens.expires_in,
    }))
}

fn store_oauth_cookies(
    jar: PrivateCookieJar,
    csrf: &CsrfToken,
    pkce_verifier: &str,
    link_user: Option<UserId>,
    insecure: bool,
) -> PrivateCookieJar {
    let jar = jar
        .add(build_cookie(CSRF_COOKIE, csrf.secret().to_string(), insecure))
        .add(build_cookie(PKCE_COOKIE, pkce_verifier.to_string(), insecure));
    match link_user {
        Some(id) => jar.add(build_cookie(LINK_COOKIE, id.to_string(), insecure)),
        None => jar.remove(clear_cookie(LINK_COOKIE)),
    }
}

fn load_oauth_session(
    jar: PrivateCookieJar,
) -> Result<(OauthSession, PrivateCookieJar), (PrivateCookieJar, JambleError)> {
    let csrf = jar.get(CSRF_COOKIE).map(|c| c.value().to_owned());
    let pkce = jar.get(PKCE_COOKIE).map(|c| c.value().to_owned());
    let link = jar.get(LINK_COOKIE).map(|c| c.value().to_owned());
    let jar = clear_oauth_cookies(jar);

    let Some(csrf) = csrf else {
        return Err((
            jar,
            JambleError::OauthFlow("Missing CSRF token in cookie".to_string()),
        ));
    };
    let Some(pkce_verifier) = pkce else {
        return Err((
            jar,
            JambleError::OauthFlow("Missing PKCE verifier in cookie".to_string()),
        ));
    };
    let link_user = match link.map(|raw| raw.parse::<UserId>()).transpose() {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "unreadable link cookie");
            return Err((
                jar,
                JambleError::OauthFlow("Invalid linking session".to_string()),
            ));
        }
    };

    Ok((
        OauthSession {
            csrf,
            pkce_verifier,
            link_user,
        },
        jar,
    ))
}

fn clear_oauth_cookies(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(clear_cookie(CSRF_COOKIE))
        .remove(clear_cookie(PKCE_COOKIE))
        .remove(clear_cookie(LINK_COOKIE))
}

fn build_cookie(name: &str, value: String, insecure: bool) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), value))
        .path("/")
        .http_only(true)
        .secure(!insecure)
        .same_site(SameSite::Lax)
        .max_age(Duration::minutes(15))
        .build()
}

fn clear_cookie(name: &str) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn redirect_with_error(jar: PrivateCookieJar, deep_link: &Url, err: JambleError) -> Response {
    let (status, code, message) = err.into_parts();
    warn!(status = %status, code, "Spotify OAuth callback failed");
    let mut location = deep_link.clone();
    location
        .query_pairs_mut()
        .append_pair("error", code)
        .append_pair("message", &message);
    (jar, Redirect::to(location.as_str())).into_response()
}
