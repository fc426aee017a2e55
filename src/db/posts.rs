use crate::db::models::{DbFeedPost, DbPost, encode_timestamp};
use crate::db::sqlite::SqlitePool;
use crate::error::JambleError;
use crate::types::{FeedPost, Post, PostId, PostType, UserId};
use chrono::Utc;
use uuid::Uuid;

const POST_COLUMNS: &str =
    "id, user_id, content, post_type, reference_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewPost {
    pub content: String,
    pub post_type: PostType,
    pub reference_id: String,
}

/// Feed filter and page window.
#[derive(Debug, Clone, Copy)]
pub struct FeedQuery {
    pub author: Option<UserId>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Clone)]
pub struct PostStore {
    pool: SqlitePool,
}

impl PostStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a post owned by `owner`. An unknown owner is reported as 404.
    pub async fn create(&self, owner: UserId, new: NewPost) -> Result<Post, JambleError> {
        let now = encode_timestamp(Utc::now());
        let sql = format!(
            "INSERT INTO posts ({POST_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?) \
             RETURNING {POST_COLUMNS}"
        );
        let row: DbPost = sqlx::query_as(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(owner.to_string())
            .bind(new.content)
            .bind(new.post_type.as_str())
            .bind(new.reference_id)
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    JambleError::NotFound("user")
                }
                _ => JambleError::Database(e),
            })?;
        row.try_into()
    }

    pub async fn get(&self, id: PostId) -> Result<Option<Post>, JambleError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?");
        let row: Option<DbPost> = sqlx::query_as(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Post::try_from).transpose()
    }

    /// Newest first, joined with the author's username and image.
    pub async fn feed(&self, query: FeedQuery) -> Result<Vec<FeedPost>, JambleError> {
        let rows: Vec<DbFeedPost> = sqlx::query_as(
            r#"SELECT p.id, p.user_id, p.content, p.post_type, p.reference_id,
                      p.created_at, p.updated_at,
                      u.username AS author_username, u.image_url AS author_image_url
               FROM posts p
               JOIN users u ON u.id = p.user_id
               WHERE (?1 IS NULL OR p.user_id = ?1)
               ORDER BY p.created_at DESC, p.rowid DESC
               LIMIT ?2 OFFSET ?3"#,
        )
        .bind(query.author.map(|id| id.to_string()))
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(FeedPost::try_from).collect()
    }

    pub async fn update_content(
        &self,
        id: PostId,
        content: &str,
    ) -> Result<Option<Post>, JambleError> {
        let sql = format!(
            "UPDATE posts SET content = ?, updated_at = ? WHERE id = ? RETURNING {POST_COLUMNS}"
        );
        let row: Option<DbPost> = sqlx::query_as(&sql)
            .bind(content)
            .bind(encode_timestamp(Utc::now()))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Post::try_from).transpose()
    }

    /// Delete only if `owner` owns the post. Returns whether a row went away.
    pub async fn delete_owned(&self, id: PostId, owner: UserId) -> Result<bool, JambleError> {
        let res = sqlx::query("DELETE FROM posts WHERE id = ? AND user_id = ?")
            .bind(id.to_string())
            .bind(owner.to_string())
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::users::UserStore;
    use crate::db::users::tests::local;

    async fn stores() -> (UserStore, PostStore) {
        let pool = crate::db::sqlite::connect("sqlite::memory:").await.unwrap();
        (UserStore::new(pool.clone()), PostStore::new(pool))
    }

    fn new_post(content: &str) -> NewPost {
        NewPost {
            content: content.to_string(),
            post_type: PostType::Song,
            reference_id: "3n3Ppam7vgaVa1iaRUc9Lp".to_string(),
        }
    }

    #[tokio::test]
    async fn feed_is_newest_first_with_author() {
        let (users, posts) = stores().await;
        let alice = users.create(local("a@example.com", "alice")).await.unwrap();
        let bob = users.create(local("b@example.com", "bob")).await.unwrap();

        posts.create(alice.id, new_post("first")).await.unwrap();
        posts.create(bob.id, new_post("second")).await.unwrap();
        posts.create(alice.id, new_post("third")).await.unwrap();

        let all = posts
            .feed(FeedQuery { author: None, limit: 10, offset: 0 })
            .await
            .unwrap();
        let contents: Vec<&str> = all.iter().map(|p| p.post.content.as_str()).collect();
        assert_eq!(contents, vec!["third", "second", "first"]);
        assert_eq!(all[1].user.username.as_deref(), Some("bob"));

        let only_alice = posts
            .feed(FeedQuery { author: Some(alice.id), limit: 1, offset: 1 })
            .await
            .unwrap();
        assert_eq!(only_alice.len(), 1);
        assert_eq!(only_alice[0].post.content, "first");
    }

    #[tokio::test]
    async fn only_the_owner_can_delete() {
        let (users, posts) = stores().await;
        let alice = users.create(local("a@example.com", "alice")).await.unwrap();
        let bob = users.create(local("b@example.com", "bob")).await.unwrap();
        let post = posts.create(alice.id, new_post("mine")).await.unwrap();

        assert!(!posts.delete_owned(post.id, bob.id).await.unwrap());
        assert!(posts.get(post.id).await.unwrap().is_some());
        assert!(posts.delete_owned(post.id, alice.id).await.unwrap());
        assert!(posts.get(post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn posts_are_removed_with_their_owner() {
        let (users, posts) = stores().await;
        let alice = users.create(local("a@example.com", "alice")).await.unwrap();
        let post = posts.create(alice.id, new_post("bye")).await.unwrap();

        users.delete(alice.id).await.unwrap();
        assert!(posts.get(post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_owner_is_not_found() {
        let (_users, posts) = stores().await;
        let err = posts
            .create(Uuid::new_v4(), new_post("orphan"))
            .await
            .unwrap_err();
        assert!(matches!(err, JambleError::NotFound("user")));
    }
}
