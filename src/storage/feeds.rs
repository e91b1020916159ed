use super::schema::Database;
use super::types::{Feed, FeedListing, StorageError};

impl Database {
    // ========================================================================
    // Feed Operations
    // ========================================================================

    /// Register a feed owned by `user_id`. Fails with a UNIQUE violation if
    /// the url is already registered.
    pub async fn create_feed(
        &self,
        name: &str,
        url: &str,
        user_id: &str,
    ) -> Result<Feed, StorageError> {
        let now = chrono::Utc::now().timestamp();
        let feed = sqlx::query_as(
            r#"
            INSERT INTO feeds (id, created_at, updated_at, name, url, user_id)
            VALUES (?1, ?2, ?2, ?3, ?4, ?5)
            RETURNING id, created_at, updated_at, name, url, user_id, last_fetched_at
        "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(now)
        .bind(name)
        .bind(url)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(feed)
    }

    pub async fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>, StorageError> {
        let feed = sqlx::query_as(
            r#"
            SELECT id, created_at, updated_at, name, url, user_id, last_fetched_at
            FROM feeds WHERE url = ?1
        "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(feed)
    }

    /// Every feed with its owner's name, for the `feeds` listing.
    pub async fn list_feeds(&self) -> Result<Vec<FeedListing>, StorageError> {
        let feeds = sqlx::query_as(
            r#"
            SELECT feeds.name, feeds.url, users.name AS owner
            FROM feeds
            JOIN users ON feeds.user_id = users.id
            ORDER BY feeds.name
        "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(feeds)
    }

    // ========================================================================
    // Claim Operation
    // ========================================================================

    /// Atomically claim the next feed due for scraping and mark it fetched.
    ///
    /// The next feed is the least-recently-fetched one: never-fetched feeds
    /// (`last_fetched_at IS NULL`) come first, then ascending timestamp, with
    /// ties broken by id so the order is deterministic. The selected row's
    /// `last_fetched_at` and `updated_at` are set to now in the same statement
    /// that selects it, so two workers can never claim the same feed, and a
    /// feed's claim timestamp never moves backwards.
    ///
    /// Returns the feed as it looks after the update, or `None` when no feeds
    /// are registered.
    pub async fn claim_next_feed(&self) -> Result<Option<Feed>, StorageError> {
        let now = chrono::Utc::now().timestamp();
        let feed = sqlx::query_as(
            r#"
            UPDATE feeds
            SET last_fetched_at = ?1, updated_at = ?1
            WHERE id = (
                SELECT id FROM feeds
                ORDER BY last_fetched_at ASC NULLS FIRST, id ASC
                LIMIT 1
            )
            RETURNING id, created_at, updated_at, name, url, user_id, last_fetched_at
        "#,
        )
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(feed)
    }
}
