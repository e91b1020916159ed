use crate::feed::FeedDocument;
use crate::storage::{Database, NewPost};
use chrono::DateTime;
use uuid::Uuid;

/// Tally of one document's ingestion pass.
///
/// `new_posts` is the number callers report; the other counters exist so
/// lossy paths (duplicate urls, unparseable dates, failed inserts) show up
/// in logs instead of vanishing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Items stored as new posts
    pub new_posts: usize,
    /// Items whose url already had a post (idempotent re-ingestion)
    pub skipped_existing: usize,
    /// Items stored without a publish timestamp because the date string
    /// did not parse
    pub unparsed_dates: usize,
    /// Items whose insert failed for reasons other than a duplicate url
    pub failed: usize,
}

/// Stores every previously-unseen item of `document` as a post of `feed_id`.
///
/// Items are processed in document order. Deduplication is by item link: a
/// link that already has a post is skipped, and the UNIQUE constraint on
/// `posts.url` backstops the lookup. One item's insert failure never aborts
/// the rest of the document; it is logged and counted instead.
pub async fn ingest_document(
    db: &Database,
    feed_id: &str,
    document: &FeedDocument,
) -> IngestOutcome {
    let mut outcome = IngestOutcome::default();

    for item in &document.channel.items {
        match db.get_post_by_url(&item.link).await {
            Ok(Some(_)) => {
                outcome.skipped_existing += 1;
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                // The constraint still guards against duplicates, so a
                // failed lookup downgrades to an insert attempt
                tracing::warn!(
                    url = %item.link,
                    error = %e,
                    "Dedup lookup failed, attempting insert anyway"
                );
            }
        }

        let description = if item.description.is_empty() {
            None
        } else {
            Some(item.description.clone())
        };

        let published_at = if item.pub_date.is_empty() {
            None
        } else {
            match DateTime::parse_from_rfc2822(&item.pub_date) {
                Ok(date) => Some(date.timestamp()),
                Err(e) => {
                    outcome.unparsed_dates += 1;
                    tracing::debug!(
                        url = %item.link,
                        raw = %item.pub_date,
                        error = %e,
                        "Unparseable publish date, storing post without one"
                    );
                    None
                }
            }
        };

        let now = chrono::Utc::now().timestamp();
        let post = NewPost {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            title: item.title.clone(),
            url: item.link.clone(),
            description,
            published_at,
            feed_id: feed_id.to_string(),
        };

        match db.create_post(post).await {
            Ok(_) => outcome.new_posts += 1,
            Err(e) if e.is_unique_violation() => {
                // Raced with an earlier insert of the same url
                outcome.skipped_existing += 1;
            }
            Err(e) => {
                outcome.failed += 1;
                tracing::error!(
                    url = %item.link,
                    error = %e,
                    "Failed to store post, continuing with remaining items"
                );
            }
        }
    }

    outcome
}
