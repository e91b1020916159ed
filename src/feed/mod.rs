//! Fetching and decoding of RSS 2.0 feeds.
//!
//! The module is organized into two submodules:
//!
//! - [`parser`] - strict RSS 2.0 decoding via `quick-xml`
//! - [`fetcher`] - one-shot HTTP retrieval with a body size cap
//!
//! Documents produced here are transient; they exist between a fetch and
//! the ingestion pass that turns their items into stored posts.

mod fetcher;
mod parser;

pub use fetcher::{build_client, fetch_document, FetchError, USER_AGENT};
pub use parser::{parse_document, Channel, FeedDocument, FeedItem, ParseError};
