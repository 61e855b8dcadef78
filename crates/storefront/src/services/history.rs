//! Recently viewed SKUs per user, kept in the Redis cache database.
//!
//! Each user has a list `history_<user id>` holding SKU ids, most recent
//! first, without duplicates and capped at [`HISTORY_LENGTH`].

use redis::{AsyncCommands, RedisError, aio::ConnectionManager};
use tracing::instrument;

use freshmall_core::{SkuId, UserId};

/// Number of SKUs remembered per user.
pub const HISTORY_LENGTH: isize = 5;

/// Redis key of a user's history list.
#[must_use]
pub fn history_key(user_id: UserId) -> String {
    format!("history_{user_id}")
}

/// Browsing history backed by Redis lists.
#[derive(Clone)]
pub struct BrowseHistory {
    conn: ConnectionManager,
}

impl BrowseHistory {
    /// Create a history store over a cache database connection.
    #[must_use]
    pub const fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Record that the user viewed a SKU.
    ///
    /// Moves the SKU to the front if it was already present, then trims the
    /// list. The three commands run as one atomic pipeline.
    ///
    /// # Errors
    ///
    /// Returns `RedisError` if the pipeline fails.
    #[instrument(skip(self))]
    pub async fn record(&self, user_id: UserId, sku_id: SkuId) -> Result<(), RedisError> {
        let key = history_key(user_id);
        let mut conn = self.conn.clone();

        let (): () = redis::pipe()
            .atomic()
            .lrem(&key, 0, sku_id.as_i32())
            .ignore()
            .lpush(&key, sku_id.as_i32())
            .ignore()
            .ltrim(&key, 0, HISTORY_LENGTH - 1)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(())
    }

    /// The user's recently viewed SKU ids, most recent first.
    ///
    /// # Errors
    ///
    /// Returns `RedisError` if the read fails.
    #[instrument(skip(self))]
    pub async fn recent(&self, user_id: UserId) -> Result<Vec<SkuId>, RedisError> {
        let mut conn = self.conn.clone();
        let entries: Vec<String> = conn
            .lrange(history_key(user_id), 0, HISTORY_LENGTH - 1)
            .await?;

        Ok(parse_entries(&entries))
    }
}

/// Parse stored entries, skipping anything that is not a SKU id.
fn parse_entries(entries: &[String]) -> Vec<SkuId> {
    entries
        .iter()
        .filter_map(|entry| entry.parse::<i32>().ok())
        .map(SkuId::new)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cache::test_connection;

    #[test]
    fn test_history_key() {
        assert_eq!(history_key(UserId::new(12)), "history_12");
    }

    #[test]
    fn test_parse_entries_skips_garbage() {
        let entries = vec![
            "5".to_string(),
            "oops".to_string(),
            "3".to_string(),
            String::new(),
        ];
        assert_eq!(parse_entries(&entries), vec![SkuId::new(5), SkuId::new(3)]);
    }

    // =========================================================================
    // Redis
    // =========================================================================

    async fn fresh_history(user_id: UserId) -> BrowseHistory {
        let mut conn = test_connection().await;
        let _removed: i64 = conn.del(history_key(user_id)).await.unwrap();
        BrowseHistory::new(conn)
    }

    #[tokio::test]
    #[ignore = "Requires a running Redis server (REDIS_URL)"]
    async fn test_record_keeps_five_distinct_most_recent_first() {
        let user_id = UserId::new(900_001);
        let history = fresh_history(user_id).await;

        for sku in [1, 2, 3, 4, 2, 5, 6] {
            history.record(user_id, SkuId::new(sku)).await.unwrap();
        }

        let recent = history.recent(user_id).await.unwrap();
        assert_eq!(
            recent,
            [6, 5, 2, 4, 3].map(SkuId::new).to_vec(),
            "re-viewed SKU moves to the front and the oldest falls off"
        );

        let mut conn = test_connection().await;
        let len: isize = conn.llen(history_key(user_id)).await.unwrap();
        assert_eq!(len, HISTORY_LENGTH);
    }

    #[tokio::test]
    #[ignore = "Requires a running Redis server (REDIS_URL)"]
    async fn test_recent_is_empty_for_new_user() {
        let user_id = UserId::new(900_002);
        let history = fresh_history(user_id).await;
        assert!(history.recent(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore = "Requires a running Redis server (REDIS_URL)"]
    async fn test_viewing_same_sku_twice_keeps_one_entry() {
        let user_id = UserId::new(900_003);
        let history = fresh_history(user_id).await;

        history.record(user_id, SkuId::new(8)).await.unwrap();
        history.record(user_id, SkuId::new(8)).await.unwrap();

        assert_eq!(history.recent(user_id).await.unwrap(), vec![SkuId::new(8)]);
    }
}
