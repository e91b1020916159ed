use super::schema::Database;
use super::types::{NewPost, Post, StorageError};

impl Database {
    // ========================================================================
    // Post Operations
    // ========================================================================

    /// Insert a post. The caller supplies the complete row, id and timestamps
    /// included. Fails with a UNIQUE violation when the url is already stored;
    /// ingestion relies on that as the dedup backstop.
    pub async fn create_post(&self, post: NewPost) -> Result<Post, StorageError> {
        let created = sqlx::query_as(
            r#"
            INSERT INTO posts (id, created_at, updated_at, title, url, description, published_at, feed_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING id, created_at, updated_at, title, url, description, published_at, feed_id
        "#,
        )
        .bind(post.id)
        .bind(post.created_at)
        .bind(post.updated_at)
        .bind(post.title)
        .bind(post.url)
        .bind(post.description)
        .bind(post.published_at)
        .bind(post.feed_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// Dedup lookup: the post previously stored for this item url, if any.
    pub async fn get_post_by_url(&self, url: &str) -> Result<Option<Post>, StorageError> {
        let post = sqlx::query_as(
            r#"
            SELECT id, created_at, updated_at, title, url, description, published_at, feed_id
            FROM posts WHERE url = ?1
        "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    /// The newest posts from feeds the user follows. Posts without a
    /// published date sort last.
    pub async fn posts_for_user(&self, user_id: &str, limit: i64) -> Result<Vec<Post>, StorageError> {
        let posts = sqlx::query_as(
            r#"
            SELECT posts.id, posts.created_at, posts.updated_at, posts.title, posts.url,
                   posts.description, posts.published_at, posts.feed_id
            FROM posts
            JOIN feed_follows ON posts.feed_id = feed_follows.feed_id
            WHERE feed_follows.user_id = ?1
            ORDER BY posts.published_at DESC
            LIMIT ?2
        "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(posts)
    }
}
