use crate::db::models::{decode_timestamp, encode_timestamp};
use crate::db::sqlite::SqlitePool;
use crate::error::JambleError;
use crate::types::UserId;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Single-use tickets that put a Spotify authorize request in linking mode.
#[derive(Clone)]
pub struct LinkTicketStore {
    pool: SqlitePool,
}

impl LinkTicketStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store `ticket` for `user_id` until `expires_at`, dropping expired ones.
    pub async fn insert(
        &self,
        ticket: &str,
        user_id: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), JambleError> {
        sqlx::query("DELETE FROM link_tickets WHERE expires_at <= ?")
            .bind(encode_timestamp(Utc::now()))
            .execute(&self.pool)
            .await?;
        sqlx::query("INSERT INTO link_tickets (ticket, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(ticket)
            .bind(user_id.to_string())
            .bind(encode_timestamp(expires_at))
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    JambleError::NotFound("user")
                }
                _ => JambleError::Database(e),
            })?;
        Ok(())
    }

    /// Consume a ticket. Unknown, reused and expired tickets all yield `None`.
    pub async fn redeem(
        &self,
        ticket: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, JambleError> {
        let row: Option<(String, String)> = sqlx::query_as(
            "DELETE FROM link_tickets WHERE ticket = ? RETURNING user_id, expires_at",
        )
        .bind(ticket)
        .fetch_optional(&self.pool)
        .await?;
        let Some((user_id, expires_at)) = row else {
            return Ok(None);
        };
        if decode_timestamp(&expires_at)? <= now {
            return Ok(None);
        }
        Uuid::parse_str(&user_id)
            .map(Some)
            .map_err(|e| JambleError::CorruptRecord(format!("bad ticket owner `{user_id}`: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::users::UserStore;
    use crate::db::users::tests::local;
    use chrono::Duration;

    async fn stores() -> (UserStore, LinkTicketStore) {
        let pool = crate::db::sqlite::connect("sqlite::memory:").await.unwrap();
        (UserStore::new(pool.clone()), LinkTicketStore::new(pool))
    }

    #[tokio::test]
    async fn ticket_is_single_use() {
        let (users, tickets) = stores().await;
        let user = users.create(local("t@example.com", "ticketed")).await.unwrap();
        tickets
            .insert("abc", user.id, Utc::now() + Duration::minutes(5))
            .await
            .unwrap();

        assert_eq!(tickets.redeem("abc", Utc::now()).await.unwrap(), Some(user.id));
        assert_eq!(tickets.redeem("abc", Utc::now()).await.unwrap(), None);
        assert_eq!(tickets.redeem("unknown", Utc::now()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_ticket_is_rejected() {
        let (users, tickets) = stores().await;
        let user = users.create(local("x@example.com", "expired")).await.unwrap();
        tickets
            .insert("late", user.id, Utc::now() + Duration::minutes(5))
            .await
            .unwrap();
        let later = Utc::now() + Duration::minutes(6);
        assert_eq!(tickets.redeem("late", later).await.unwrap(), None);
    }

    #[tokio::test]
    async fn tickets_go_with_their_user() {
        let (users, tickets) = stores().await;
        let user = users.create(local("g@example.com", "goner")).await.unwrap();
        tickets
            .insert("orphan", user.id, Utc::now() + Duration::minutes(5))
            .await
            .unwrap();
        users.delete(user.id).await.unwrap();
        assert_eq!(tickets.redeem("orphan", Utc::now()).await.unwrap(), None);

        let err = tickets
            .insert("nobody", user.id, Utc::now() + Duration::minutes(5))
            .await
            .unwrap_err();
        assert!(matches!(err, JambleError::NotFound("user")));
    }
}
