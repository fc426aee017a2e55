use crate::db::models::{DbUser, IdentityColumns, encode_timestamp};
use crate::db::sqlite::SqlitePool;
use crate::error::JambleError;
use crate::types::{Identity, Profile, SpotifyLink, User, UserId};
use chrono::Utc;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, username, email, account_origin, password_hash, spotify_id, \
     spotify_access_token, spotify_refresh_token, bio, image_url, wallpaper_url, \
     favorite_albums, created_at, updated_at";

/// Fields needed to insert a user; id and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: Option<String>,
    pub email: String,
    pub identity: Identity,
    pub image_url: Option<String>,
}

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a user. Collisions on email, username or Spotify id surface as 409.
    pub async fn create(&self, new: NewUser) -> Result<User, JambleError> {
        let id = Uuid::new_v4();
        let now = encode_timestamp(Utc::now());
        let cols = IdentityColumns::from(&new.identity);
        let sql = format!(
            r#"INSERT INTO users (
                id, username, email, account_origin, password_hash, spotify_id,
                spotify_access_token, spotify_refresh_token, image_url,
                favorite_albums, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, '[]', ?, ?)
            RETURNING {USER_COLUMNS}"#
        );
        let row: DbUser = sqlx::query_as(&sql)
            .bind(id.to_string())
            .bind(new.username.as_deref())
            .bind(new.email.as_str())
            .bind(cols.account_origin)
            .bind(cols.password_hash)
            .bind(cols.spotify_id)
            .bind(cols.spotify_access_token)
            .bind(cols.spotify_refresh_token)
            .bind(new.image_url.as_deref())
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await
            .map_err(user_conflict)?;
        row.try_into()
    }

    pub async fn find_by_id(&self, id: UserId) -> Result<Option<User>, JambleError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let row: Option<DbUser> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, JambleError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        let row: Option<DbUser> = sqlx::query_as(&sql)
            .bind(email.trim().to_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    /// Look up by email or username, both case-insensitive.
    pub async fn find_by_login(&self, email_or_username: &str) -> Result<Option<User>, JambleError> {
        let needle = email_or_username.trim();
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ? OR username = ? LIMIT 1"
        );
        let row: Option<DbUser> = sqlx::query_as(&sql)
            .bind(needle.to_lowercase())
            .bind(needle)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    pub async fn find_by_spotify_id(&self, spotify_id: &str) -> Result<Option<User>, JambleError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE spotify_id = ?");
        let row: Option<DbUser> = sqlx::query_as(&sql)
            .bind(spotify_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    pub async fn username_taken(&self, username: &str) -> Result<bool, JambleError> {
        let rec: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(rec.0 > 0)
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, JambleError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id LIMIT ? OFFSET ?"
        );
        let rows: Vec<DbUser> = sqlx::query_as(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    /// Set the username only if it is still unset.
    ///
    /// Returns `None` when the user does not exist or already has a username.
    pub async fn set_username_once(
        &self,
        id: UserId,
        username: &str,
    ) -> Result<Option<User>, JambleError> {
        let sql = format!(
            "UPDATE users SET username = ?, updated_at = ? \
             WHERE id = ? AND username IS NULL RETURNING {USER_COLUMNS}"
        );
        let row: Option<DbUser> = sqlx::query_as(&sql)
            .bind(username)
            .bind(encode_timestamp(Utc::now()))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(user_conflict)?;
        row.map(User::try_from).transpose()
    }

    pub async fn update_profile(
        &self,
        id: UserId,
        profile: &Profile,
    ) -> Result<Option<User>, JambleError> {
        let favorites = serde_json::to_string(&profile.favorite_albums)?;
        let sql = format!(
            "UPDATE users SET bio = ?, image_url = ?, wallpaper_url = ?, favorite_albums = ?, \
             updated_at = ? WHERE id = ? RETURNING {USER_COLUMNS}"
        );
        let row: Option<DbUser> = sqlx::query_as(&sql)
            .bind(profile.bio.as_deref())
            .bind(profile.image_url.as_deref())
            .bind(profile.wallpaper_url.as_deref())
            .bind(favorites)
            .bind(encode_timestamp(Utc::now()))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    /// Attach (or replace) the Spotify identity on an existing account.
    pub async fn link_spotify(
        &self,
        id: UserId,
        link: &SpotifyLink,
    ) -> Result<Option<User>, JambleError> {
        let sql = format!(
            "UPDATE users SET spotify_id = ?, spotify_access_token = ?, \
             spotify_refresh_token = ?, updated_at = ? WHERE id = ? RETURNING {USER_COLUMNS}"
        );
        let row: Option<DbUser> = sqlx::query_as(&sql)
            .bind(link.spotify_id.as_str())
            .bind(link.access_token.as_str())
            .bind(link.refresh_token.as_deref())
            .bind(encode_timestamp(Utc::now()))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(user_conflict)?;
        row.map(User::try_from).transpose()
    }

    /// Store fresh Spotify tokens. A `None` refresh token keeps the stored one.
    ///
    /// Returns `None` when the user does not exist or has no Spotify link.
    pub async fn update_spotify_tokens(
        &self,
        id: UserId,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<Option<User>, JambleError> {
        let sql = format!(
            "UPDATE users SET spotify_access_token = ?, \
             spotify_refresh_token = COALESCE(?, spotify_refresh_token), updated_at = ? \
             WHERE id = ? AND spotify_id IS NOT NULL RETURNING {USER_COLUMNS}"
        );
        let row: Option<DbUser> = sqlx::query_as(&sql)
            .bind(access_token)
            .bind(refresh_token)
            .bind(encode_timestamp(Utc::now()))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    /// Delete the account; its posts go with it (ON DELETE CASCADE).
    pub async fn delete(&self, id: UserId) -> Result<bool, JambleError> {
        let res = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

fn user_conflict(err: sqlx::Error) -> JambleError {
    if let sqlx::Error::Database(db) = &err
        && db.is_unique_violation()
    {
        let msg = db.message();
        let reason = if msg.contains("users.email") {
            "User with this email already exists"
        } else if msg.contains("users.username") {
            "Username is already taken"
        } else if msg.contains("users.spotify_id") {
            "This Spotify account is already linked to another user"
        } else {
            "User already exists"
        };
        return JambleError::conflict(reason);
    }
    JambleError::Database(err)
}
