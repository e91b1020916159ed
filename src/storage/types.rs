use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors surfaced by the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Schema migration failed while opening the database
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// A query or connection-level failure
    #[error("Database error: {0}")]
    Query(#[from] sqlx::Error),
}

impl StorageError {
    /// True when the database itself is gone rather than a single statement
    /// failing. Callers running a long-lived loop treat these as fatal; every
    /// other error is scoped to the statement that produced it.
    pub fn is_unrecoverable(&self) -> bool {
        match self {
            StorageError::Migration(_) => true,
            StorageError::Query(err) => matches!(
                err,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::WorkerCrashed
            ),
        }
    }

    /// True when the error is a UNIQUE constraint violation. Used by command
    /// handlers to turn duplicate names, urls, and follows into friendly
    /// messages.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            StorageError::Query(sqlx::Error::Database(e))
                if e.kind() == sqlx::error::ErrorKind::UniqueViolation
        )
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// An account row. The "current" user lives in the config file, not here.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub name: String,
}

/// A registered feed source.
///
/// `last_fetched_at` is `None` until the scheduler claims the feed for the
/// first time; afterwards it only moves forward. Unix seconds throughout.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Feed {
    pub id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub name: String,
    pub url: String,
    pub user_id: String,
    pub last_fetched_at: Option<i64>,
}

/// A user-follows-feed association.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedFollow {
    pub id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub user_id: String,
    pub feed_id: String,
}

/// A stored feed item. `url` is the deduplication key (UNIQUE in the schema);
/// `published_at` is `None` when the feed carried no parseable date.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<i64>,
    pub feed_id: String,
}

/// Insert payload for a post. The ingestion pipeline mints the id and
/// timestamps so a row is fully determined before it reaches the database.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub id: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<i64>,
    pub feed_id: String,
}

/// Row type for the `feeds` listing: every feed with its owner's name.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FeedListing {
    pub name: String,
    pub url: String,
    pub owner: String,
}

/// Row type for the `following` listing.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FollowedFeed {
    pub name: String,
    pub url: String,
}
