use crate::db::{NewUser, UserStore};
use crate::error::JambleError;
use crate::types::{Identity, SpotifyLink, SpotifyProfile, SpotifyTokens, User, UserId};
use tracing::info;

/// What the callback did with the Spotify identity.
#[derive(Debug)]
pub enum LinkOutcome {
    /// A new Spotify-only account was created.
    Created(User),
    /// An account already carrying this Spotify id signed in.
    LoggedIn(User),
    /// The Spotify id was attached to the caller's existing account.
    Linked(User),
}

impl LinkOutcome {
    pub fn user(&self) -> &User {
        match self {
            LinkOutcome::Created(u) | LinkOutcome::LoggedIn(u) | LinkOutcome::Linked(u) => u,
        }
    }

    /// Value carried back to the client in the deep link.
    pub fn status(&self) -> &'static str {
        match self {
            LinkOutcome::Created(_) => "created",
            LinkOutcome::LoggedIn(_) => "login",
            LinkOutcome::Linked(_) => "linked",
        }
    }
}

/// Decide which account a verified Spotify profile belongs to.
///
/// `linking_user` is set when the flow was started by a signed-in user who
/// wants Spotify attached to their account. Accounts are never merged on
/// email alone: an email match that is not already tied to this Spotify id
/// is a conflict.
pub async fn resolve_account(
    users: &UserStore,
    profile: &SpotifyProfile,
    tokens: &SpotifyTokens,
    linking_user: Option<UserId>,
) -> Result<LinkOutcome, JambleError> {
    let spotify_id = profile
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| JambleError::OauthFlow("Spotify profile has no id".to_string()))?;
    let email = profile
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| {
            JambleError::OauthFlow("Spotify account has no email address".to_string())
        })?;

    if let Some(owner) = users.find_by_spotify_id(spotify_id).await? {
        if let Some(caller) = linking_user
            && caller != owner.id
        {
            return Err(JambleError::conflict(
                "This Spotify account is already linked to another user",
            ));
        }
        let user = users
            .update_spotify_tokens(
                owner.id,
                &tokens.access_token,
                tokens.refresh_token.as_deref(),
            )
            .await?
            .ok_or(JambleError::NotFound("user"))?;
        info!(user_id = %user.id, "Spotify sign-in for existing account");
        return Ok(if linking_user.is_some() {
            LinkOutcome::Linked(user)
        } else {
            LinkOutcome::LoggedIn(user)
        });
    }

    let link = SpotifyLink {
        spotify_id: spotify_id.to_string(),
        access_token: tokens.access_token.clone(),
        refresh_token: tokens.refresh_token.clone(),
    };

    if let Some(caller_id) = linking_user {
        let caller = users
            .find_by_id(caller_id)
            .await?
            .ok_or(JambleError::NotFound("user"))?;
        if let Some(existing) = users.find_by_email(&email).await?
            && existing.id != caller.id
        {
            return Err(JambleError::conflict(
                "The Spotify email belongs to another account",
            ));
        }
        if caller.identity.spotify().is_some() {
            return Err(JambleError::conflict(
                "Account is already linked to a different Spotify account",
            ));
        }
        let user = users
            .link_spotify(caller.id, &link)
            .await?
            .ok_or(JambleError::NotFound("user"))?;
        info!(user_id = %user.id, "Spotify linked to existing account");
        return Ok(LinkOutcome::Linked(user));
    }

    if users.find_by_email(&email).await?.is_some() {
        return Err(JambleError::conflict(
            "An account with this email already exists; sign in and link Spotify instead",
        ));
    }

    let user = users
        .create(NewUser {
            username: None,
            email,
            identity: Identity::Spotify(link),
            image_url: profile.images.first().map(|img| img.url.clone()),
        })
        .await?;
    info!(user_id = %user.id, "Created account from Spotify");
    Ok(LinkOutcome::Created(user))
}
