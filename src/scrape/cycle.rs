use crate::feed::{self, FetchError};
use crate::scrape::ingest::{self, IngestOutcome};
use crate::storage::{Database, StorageError};
use reqwest::Client;
use thiserror::Error;

/// Why a cycle produced no report.
#[derive(Debug, Error)]
pub enum CycleError {
    /// The claim query found zero feed rows
    #[error("No feeds registered")]
    NoFeeds,
    /// The claim step failed at the storage layer
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Fetching or decoding the claimed feed's document failed
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl CycleError {
    /// True when the scheduler should stop instead of waiting for the next
    /// tick. Only losing the database itself qualifies; an unreachable feed
    /// or an empty feeds table costs one cycle, never the loop.
    pub fn is_fatal(&self) -> bool {
        match self {
            CycleError::Storage(e) => e.is_unrecoverable(),
            CycleError::NoFeeds | CycleError::Fetch(_) => false,
        }
    }
}

/// What one completed cycle accomplished.
#[derive(Debug)]
pub struct CycleReport {
    pub feed_name: String,
    pub feed_url: String,
    pub outcome: IngestOutcome,
}

/// One claim -> fetch -> ingest pass.
///
/// Claims the feed least recently fetched, pulls its document, and stores
/// every item not already present. The claim happens before the fetch, so a
/// feed that fails stays at the back of the rotation instead of wedging it.
pub async fn run_cycle(db: &Database, client: &Client) -> Result<CycleReport, CycleError> {
    let feed = db.claim_next_feed().await?.ok_or(CycleError::NoFeeds)?;

    let document = feed::fetch_document(client, &feed.url).await?;
    let outcome = ingest::ingest_document(db, &feed.id, &document).await;

    tracing::info!(
        feed = %feed.name,
        url = %feed.url,
        new_posts = outcome.new_posts,
        skipped = outcome.skipped_existing,
        "Cycle complete"
    );
    if outcome.failed > 0 {
        tracing::warn!(
            feed = %feed.name,
            failed = outcome.failed,
            "Some items could not be stored this cycle"
        );
    }
    if outcome.unparsed_dates > 0 {
        tracing::info!(
            feed = %feed.name,
            unparsed_dates = outcome.unparsed_dates,
            "Items stored without a publish date"
        );
    }

    Ok(CycleReport {
        feed_name: feed.name,
        feed_url: feed.url,
        outcome,
    })
}
