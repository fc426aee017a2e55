use crate::error::JambleError;
use crate::types::{
    FeedPost, Identity, Post, PostAuthor, PostType, Profile, SpotifyLink, User,
};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Flat `users` row. Identity columns are folded into [`Identity`] on the way out.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DbUser {
    pub id: String,
    pub username: Option<String>,
    pub email: String,
    pub account_origin: String,
    pub password_hash: Option<String>,
    pub spotify_id: Option<String>,
    pub spotify_access_token: Option<String>,
    pub spotify_refresh_token: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub wallpaper_url: Option<String>,
    pub favorite_albums: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DbPost {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub post_type: String,
    pub reference_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A post joined with its author's display fields.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DbFeedPost {
    #[sqlx(flatten)]
    pub post: DbPost,
    pub author_username: Option<String>,
    pub author_image_url: Option<String>,
}

/// Fixed-width RFC3339 so text ordering matches time ordering.
pub fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, JambleError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| JambleError::CorruptRecord(format!("bad timestamp `{raw}`: {e}")))
}

fn decode_uuid(raw: &str) -> Result<Uuid, JambleError> {
    Uuid::parse_str(raw).map_err(|e| JambleError::CorruptRecord(format!("bad id `{raw}`: {e}")))
}

/// Column values for the identity half of a `users` row.
pub struct IdentityColumns<'a> {
    pub account_origin: &'static str,
    pub password_hash: Option<&'a str>,
    pub spotify_id: Option<&'a str>,
    pub spotify_access_token: Option<&'a str>,
    pub spotify_refresh_token: Option<&'a str>,
}

impl<'a> From<&'a Identity> for IdentityColumns<'a> {
    fn from(identity: &'a Identity) -> Self {
        let link = identity.spotify();
        Self {
            account_origin: identity.origin().as_str(),
            password_hash: identity.password_hash(),
            spotify_id: link.map(|l| l.spotify_id.as_str()),
            spotify_access_token: link.map(|l| l.access_token.as_str()),
            spotify_refresh_token: link.and_then(|l| l.refresh_token.as_deref()),
        }
    }
}

impl TryFrom<DbUser> for User {
    type Error = JambleError;

    fn try_from(row: DbUser) -> Result<Self, Self::Error> {
        let link = match (row.spotify_id, row.spotify_access_token) {
            (Some(spotify_id), Some(access_token)) => Some(SpotifyLink {
                spotify_id,
                access_token,
                refresh_token: row.spotify_refresh_token,
            }),
            (None, None) => None,
            _ => {
                return Err(JambleError::CorruptRecord(format!(
                    "user {} has a partial Spotify link",
                    row.id
                )));
            }
        };

        let identity = match (row.account_origin.as_str(), row.password_hash) {
            ("local", Some(password_hash)) => Identity::Local {
                password_hash,
                spotify: link,
            },
            ("spotify", None) => match link {
                Some(link) => Identity::Spotify(link),
                None => {
                    return Err(JambleError::CorruptRecord(format!(
                        "spotify user {} has no Spotify link",
                        row.id
                    )));
                }
            },
            (origin, _) => {
                return Err(JambleError::CorruptRecord(format!(
                    "user {} has inconsistent identity (origin `{origin}`)",
                    row.id
                )));
            }
        };

        let favorite_albums: Vec<String> = serde_json::from_str(&row.favorite_albums)?;

        Ok(User {
            id: decode_uuid(&row.id)?,
            username: row.username,
            email: row.email,
            identity,
            profile: Profile {
                bio: row.bio,
                image_url: row.image_url,
                wallpaper_url: row.wallpaper_url,
                favorite_albums,
            },
            created_at: decode_timestamp(&row.created_at)?,
            updated_at: decode_timestamp(&row.updated_at)?,
        })
    }
}

impl TryFrom<DbPost> for Post {
    type Error = JambleError;

    fn try_from(row: DbPost) -> Result<Self, Self::Error> {
        let post_type: PostType = row
            .post_type
            .parse()
            .map_err(JambleError::CorruptRecord)?;
        Ok(Post {
            id: decode_uuid(&row.id)?,
            user_id: decode_uuid(&row.user_id)?,
            content: row.content,
            post_type,
            reference_id: row.reference_id,
            created_at: decode_timestamp(&row.created_at)?,
            updated_at: decode_timestamp(&row.updated_at)?,
        })
    }
}

impl TryFrom<DbFeedPost> for FeedPost {
    type Error = JambleError;

    fn try_from(row: DbFeedPost) -> Result<Self, Self::Error> {
        Ok(FeedPost {
            post: row.post.try_into()?,
            user: PostAuthor {
                username: row.author_username,
                image_url: row.author_image_url,
            },
        })
    }
}
