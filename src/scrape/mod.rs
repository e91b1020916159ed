//! The periodic ingestion pipeline.
//!
//! [`Scheduler`] fires one cycle per tick. A cycle claims the feed least
//! recently fetched, pulls and decodes its document, and stores every item
//! not seen before. Cycles never overlap and most failures cost exactly one
//! cycle; see [`CycleError::is_fatal`] for the one class that does not.

mod cycle;
mod ingest;
mod scheduler;

pub use cycle::{run_cycle, CycleError, CycleReport};
pub use ingest::{ingest_document, IngestOutcome};
pub use scheduler::Scheduler;
