//! SQL DDL for the user and post tables.
//! SQLite-first design; can be adapted for other RDBMS.

/// SQLite schema with:
/// - `users.id` / `posts.id` UUID text primary keys
/// - `email`, `username` and `spotify_id` UNIQUE (NULLs never collide);
///   `username` compares case-insensitively
/// - `account_origin` plus CHECKs mirroring the `Identity` union:
///   local rows carry a password hash, spotify rows carry a Spotify id and
///   no password
/// - `favorite_albums` as a JSON array serialized to text
/// - `link_tickets`: single-use tickets that start Spotify linking
/// - `posts.user_id` ON DELETE CASCADE; foreign keys are switched on per
///   connection by the pool options
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    username TEXT NULL UNIQUE COLLATE NOCASE,
    email TEXT NOT NULL UNIQUE,
    account_origin TEXT NOT NULL CHECK (account_origin IN ('local', 'spotify')),
    password_hash TEXT NULL,
    spotify_id TEXT NULL UNIQUE,
    spotify_access_token TEXT NULL,
    spotify_refresh_token TEXT NULL,
    bio TEXT NULL,
    image_url TEXT NULL,
    wallpaper_url TEXT NULL,
    favorite_albums TEXT NOT NULL DEFAULT '[]', -- JSON array
    created_at TEXT NOT NULL, -- RFC3339
    updated_at TEXT NOT NULL, -- RFC3339
    CHECK (
        (account_origin = 'local' AND password_hash IS NOT NULL)
        OR (account_origin = 'spotify' AND password_hash IS NULL AND spotify_id IS NOT NULL)
    ),
    CHECK ((spotify_id IS NULL) = (spotify_access_token IS NULL))
);

CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    post_type TEXT NOT NULL CHECK (post_type IN ('song', 'album', 'artist')),
    reference_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS link_tickets (
    ticket TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    expires_at TEXT NOT NULL -- RFC3339
);

CREATE INDEX IF NOT EXISTS idx_posts_user_id ON posts(user_id);
CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at);
"#;
