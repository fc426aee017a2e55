use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::user::UserId;

pub type PostId = Uuid;

/// What a post's `reference_id` points at on Spotify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Song,
    Album,
    Artist,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Song => "song",
            PostType::Album => "album",
            PostType::Artist => "artist",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "song" => Ok(PostType::Song),
            "album" => Ok(PostType::Album),
            "artist" => Ok(PostType::Artist),
            other => Err(format!(
                "type must be one of song, album, artist (got `{other}`)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: PostId,
    pub user_id: UserId,
    pub content: String,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub reference_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Author fields shown next to a post in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostAuthor {
    pub username: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedPost {
    #[serde(flatten)]
    pub post: Post,
    pub user: PostAuthor,
}
