use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::NewUser;
use crate::error::JambleError;
use crate::handlers::{Pagination, parse_id};
use crate::middleware::{AuthUser, JsonBody, QueryParams};
use crate::router::JambleState;
use crate::types::{
    AccountView, Identity, PublicUser, SpotifyProfile, SpotifyTokens, User, UserId, validate,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    #[serde(rename = "emailOrUsername", alias = "email_or_username")]
    pub email_or_username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CompleteProfileRequest {
    pub username: Option<String>,
}

/// Absent fields are left as they are; an empty string clears the field.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProfileRequest {
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub wallpaper_url: Option<String>,
    pub favorite_albums: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub message: &'static str,
    pub user: AccountView,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub message: &'static str,
    pub user: AccountView,
}

fn required<'a>(value: &'a Option<String>, what: &str) -> Result<&'a str, JambleError> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| JambleError::Validation(format!("{what} is required")))
}

pub(crate) async fn load_user(state: &JambleState, id: UserId) -> Result<User, JambleError> {
    state
        .users
        .find_by_id(id)
        .await?
        .ok_or(JambleError::NotFound("user"))
}

/// POST /api/users/register
pub async fn register(
    State(state): State<JambleState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, JambleError> {
    let username = validate::username(required(&req.username, "username")?)?;
    let email = validate::email(required(&req.email, "email")?)?;
    let password = req.password.as_deref().unwrap_or_default();
    validate::password(password)?;

    if state.users.find_by_email(&email).await?.is_some() {
        return Err(JambleError::conflict("User with this email already exists"));
    }
    if state.users.username_taken(&username).await? {
        return Err(JambleError::conflict("Username is already taken"));
    }

    let password_hash = state.passwords.hash(password).await?;
    let user = state
        .users
        .create(NewUser {
            username: Some(username),
            email,
            identity: Identity::Local {
                password_hash,
                spotify: None,
            },
            image_url: None,
        })
        .await?;
    let token = state.tokens.issue(user.id)?;
    info!(user_id = %user.id, "Registered local account");

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            message: "User created successfully",
            user: user.account(),
            token,
        }),
    ))
}

/// POST /api/users/login
pub async fn login(
    State(state): State<JambleState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<SessionResponse>, JambleError> {
    let (Some(login), Some(password)) = (
        req.email_or_username.as_deref().filter(|v| !v.trim().is_empty()),
        req.password.as_deref().filter(|v| !v.is_empty()),
    ) else {
        return Err(JambleError::validation(
            "Please provide an email or username and password",
        ));
    };

    let user = state
        .users
        .find_by_login(login)
        .await?
        .ok_or(JambleError::NotFound("user"))?;
    let Some(hash) = user.identity.password_hash() else {
        return Err(JambleError::Unauthorized(
            "This account signs in with Spotify".to_string(),
        ));
    };
    if !state.passwords.verify(password, hash).await? {
        return Err(JambleError::Unauthorized("Invalid password".to_string()));
    }

    let token = state.tokens.issue(user.id)?;
    info!(user_id = %user.id, "Login successful");
    Ok(Json(SessionResponse {
        message: "Login successful",
        user: user.account(),
        token,
    }))
}

/// POST /api/users/complete-profile
///
/// Sets the username of an account that has none yet (Spotify sign-ups).
pub async fn complete_profile(
    State(state): State<JambleState>,
    AuthUser(user_id): AuthUser,
    JsonBody(req): JsonBody<CompleteProfileRequest>,
) -> Result<Json<AccountResponse>, JambleError> {
    let username = validate::username(required(&req.username, "username")?)?;
    if state.users.username_taken(&username).await? {
        return Err(JambleError::conflict("Username is already taken"));
    }
    let user = load_user(&state, user_id).await?;
    if user.username.is_some() {
        return Err(JambleError::conflict("Username has already been set"));
    }

    // a concurrent completion wins the race and this one sees no row
    let user = state
        .users
        .set_username_once(user_id, &username)
        .await?
        .ok_or_else(|| JambleError::conflict("Username has already been set"))?;
    info!(user_id = %user.id, "Profile completed");
    Ok(Json(AccountResponse {
        message: "Profile updated successfully",
        user: user.account(),
    }))
}

/// GET /api/users
pub async fn list_users(
    State(state): State<JambleState>,
    AuthUser(_): AuthUser,
    QueryParams(page): QueryParams<Pagination>,
) -> Result<Json<Vec<PublicUser>>, JambleError> {
    let (limit, offset) = page.resolve()?;
    let users = state.users.list(limit, offset).await?;
    Ok(Json(users.iter().map(User::public).collect()))
}

/// GET /api/users/me
pub async fn get_me(
    State(state): State<JambleState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<AccountView>, JambleError> {
    Ok(Json(load_user(&state, user_id).await?.account()))
}

/// PUT /api/users/me
pub async fn update_me(
    State(state): State<JambleState>,
    AuthUser(user_id): AuthUser,
    JsonBody(req): JsonBody<UpdateProfileRequest>,
) -> Result<Json<AccountResponse>, JambleError> {
    let user = load_user(&state, user_id).await?;
    let mut profile = user.profile;
    if let Some(bio) = req.bio.as_deref() {
        profile.bio = validate::bio(bio)?;
    }
    if let Some(url) = req.image_url.as_deref() {
        profile.image_url = validate::image_url("image_url", url)?;
    }
    if let Some(url) = req.wallpaper_url.as_deref() {
        profile.wallpaper_url = validate::image_url("wallpaper_url", url)?;
    }
    if let Some(albums) = req.favorite_albums {
        profile.favorite_albums = validate::favorite_albums(albums)?;
    }

    let user = state
        .users
        .update_profile(user_id, &profile)
        .await?
        .ok_or(JambleError::NotFound("user"))?;
    Ok(Json(AccountResponse {
        message: "Profile updated successfully",
        user: user.account(),
    }))
}

/// DELETE /api/users/me
pub async fn delete_me(
    State(state): State<JambleState>,
    AuthUser(user_id): AuthUser,
) -> Result<StatusCode, JambleError> {
    if !state.users.delete(user_id).await? {
        return Err(JambleError::NotFound("user"));
    }
    info!(user_id = %user_id, "Account deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<JambleState>,
    AuthUser(_): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<PublicUser>, JambleError> {
    let id = parse_id(&id)?;
    Ok(Json(load_user(&state, id).await?.public()))
}

/// GET /api/users/me/spotify
///
/// Live profile from Spotify using the stored tokens. A refreshed access
/// token is written back before responding.
pub async fn my_spotify_profile(
    State(state): State<JambleState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<SpotifyProfile>, JambleError> {
    let user = load_user(&state, user_id).await?;
    let link = user
        .identity
        .spotify()
        .ok_or(JambleError::NotFound("Spotify link"))?;
    let tokens = SpotifyTokens {
        access_token: link.access_token.clone(),
        refresh_token: link.refresh_token.clone(),
        expires_in: None,
    };

    let (profile, refreshed) = state.spotify.fetch_profile_with_refresh(&tokens).await?;
    if let Some(fresh) = refreshed {
        state
            .users
            .update_spotify_tokens(
                user_id,
                &fresh.access_token,
                fresh.refresh_token.as_deref(),
            )
            .await?;
    }
    Ok(Json(profile))
}
