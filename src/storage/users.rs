use super::schema::Database;
use super::types::{StorageError, User};

impl Database {
    // ========================================================================
    // User Operations
    // ========================================================================

    /// Create a user. Fails with a UNIQUE violation if the name is taken.
    pub async fn create_user(&self, name: &str) -> Result<User, StorageError> {
        let now = chrono::Utc::now().timestamp();
        let user = sqlx::query_as(
            r#"
            INSERT INTO users (id, created_at, updated_at, name)
            VALUES (?1, ?2, ?2, ?3)
            RETURNING id, created_at, updated_at, name
        "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(now)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn get_user_by_name(&self, name: &str) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as(
            "SELECT id, created_at, updated_at, name FROM users WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// All users, oldest first.
    pub async fn list_users(&self) -> Result<Vec<User>, StorageError> {
        let users = sqlx::query_as(
            "SELECT id, created_at, updated_at, name FROM users ORDER BY created_at, name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Delete every user. Feeds, follows, and posts cascade through the
    /// foreign keys, leaving an empty database.
    pub async fn reset(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM users").execute(&self.pool).await?;
        Ok(())
    }
}
