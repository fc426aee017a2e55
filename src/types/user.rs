use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub type UserId = Uuid;

/// Maximum number of entries in a user's favorite album list.
pub const MAX_FAVORITE_ALBUMS: usize = 5;

/// Spotify identity attached to an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyLink {
    pub spotify_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// How an account authenticates.
///
/// A local account always has a password and may later be linked to Spotify;
/// an account created through Spotify has no password at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Local {
        password_hash: String,
        spotify: Option<SpotifyLink>,
    },
    Spotify(SpotifyLink),
}

impl Identity {
    pub fn origin(&self) -> AccountOrigin {
        match self {
            Identity::Local { .. } => AccountOrigin::Local,
            Identity::Spotify(_) => AccountOrigin::Spotify,
        }
    }

    pub fn password_hash(&self) -> Option<&str> {
        match self {
            Identity::Local { password_hash, .. } => Some(password_hash),
            Identity::Spotify(_) => None,
        }
    }

    pub fn spotify(&self) -> Option<&SpotifyLink> {
        match self {
            Identity::Local { spotify, .. } => spotify.as_ref(),
            Identity::Spotify(link) => Some(link),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountOrigin {
    Local,
    Spotify,
}

impl AccountOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountOrigin::Local => "local",
            AccountOrigin::Spotify => "spotify",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub wallpaper_url: Option<String>,
    pub favorite_albums: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: Option<String>,
    pub email: String,
    pub identity: Identity,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            bio: self.profile.bio.clone(),
            image_url: self.profile.image_url.clone(),
            wallpaper_url: self.profile.wallpaper_url.clone(),
            favorite_albums: self.profile.favorite_albums.clone(),
            created_at: self.created_at,
        }
    }

    pub fn account(&self) -> AccountView {
        AccountView {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            account_origin: self.identity.origin(),
            spotify_id: self.identity.spotify().map(|l| l.spotify_id.clone()),
            bio: self.profile.bio.clone(),
            image_url: self.profile.image_url.clone(),
            wallpaper_url: self.profile.wallpaper_url.clone(),
            favorite_albums: self.profile.favorite_albums.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// What other users get to see.
#[derive(Debug, Clone, Serialize)]
pub struct PublicUser {
    pub id: UserId,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub wallpaper_url: Option<String>,
    pub favorite_albums: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// The account owner's own view. Never carries secrets.
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: UserId,
    pub username: Option<String>,
    pub email: String,
    pub account_origin: AccountOrigin,
    pub spotify_id: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub wallpaper_url: Option<String>,
    pub favorite_albums: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
