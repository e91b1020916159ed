use super::schema::Database;
use super::types::{FeedFollow, FollowedFeed, StorageError};

impl Database {
    // ========================================================================
    // Follow Operations
    // ========================================================================

    /// Record that `user_id` follows `feed_id`. Fails with a UNIQUE violation
    /// if the follow already exists.
    pub async fn create_follow(
        &self,
        user_id: &str,
        feed_id: &str,
    ) -> Result<FeedFollow, StorageError> {
        let now = chrono::Utc::now().timestamp();
        let follow = sqlx::query_as(
            r#"
            INSERT INTO feed_follows (id, created_at, updated_at, user_id, feed_id)
            VALUES (?1, ?2, ?2, ?3, ?4)
            RETURNING id, created_at, updated_at, user_id, feed_id
        "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(now)
        .bind(user_id)
        .bind(feed_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(follow)
    }

    /// Remove a follow. Returns false when the user was not following the
    /// feed in the first place.
    pub async fn delete_follow(&self, user_id: &str, feed_id: &str) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "DELETE FROM feed_follows WHERE user_id = ?1 AND feed_id = ?2",
        )
        .bind(user_id)
        .bind(feed_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// The feeds a user follows, for the `following` listing.
    pub async fn follows_for_user(&self, user_id: &str) -> Result<Vec<FollowedFeed>, StorageError> {
        let feeds = sqlx::query_as(
            r#"
            SELECT feeds.name, feeds.url
            FROM feed_follows
            JOIN feeds ON feed_follows.feed_id = feeds.id
            WHERE feed_follows.user_id = ?1
            ORDER BY feeds.name
        "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(feeds)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::Database;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_follow_and_list() {
        let db = test_db().await;
        let alice = db.create_user("alice").await.unwrap();
        let bob = db.create_user("bob").await.unwrap();
        let feed_a = db
            .create_feed("A", "https://a.example.com/rss", &alice.id)
            .await
            .unwrap();
        let feed_b = db
            .create_feed("B", "https://b.example.com/rss", &alice.id)
            .await
            .unwrap();

        db.create_follow(&bob.id, &feed_a.id).await.unwrap();
        db.create_follow(&bob.id, &feed_b.id).await.unwrap();

        let followed = db.follows_for_user(&bob.id).await.unwrap();
        assert_eq!(followed.len(), 2);
        assert_eq!(followed[0].name, "A");
        assert_eq!(followed[1].name, "B");

        // alice follows nothing yet
        assert!(db.follows_for_user(&alice.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_follow_rejected() {
        let db = test_db().await;
        let user = db.create_user("alice").await.unwrap();
        let feed = db
            .create_feed("A", "https://a.example.com/rss", &user.id)
            .await
            .unwrap();

        db.create_follow(&user.id, &feed.id).await.unwrap();
        let err = db.create_follow(&user.id, &feed.id).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_unfollow() {
        let db = test_db().await;
        let user = db.create_user("alice").await.unwrap();
        let feed = db
            .create_feed("A", "https://a.example.com/rss", &user.id)
            .await
            .unwrap();
        db.create_follow(&user.id, &feed.id).await.unwrap();

        assert!(db.delete_follow(&user.id, &feed.id).await.unwrap());
        assert!(db.follows_for_user(&user.id).await.unwrap().is_empty());

        // Second delete is a no-op
        assert!(!db.delete_follow(&user.id, &feed.id).await.unwrap());
    }
}
