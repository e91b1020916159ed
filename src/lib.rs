//! A feed aggregator in the shape of a small CLI.
//!
//! Users register feeds and follow them; `trawl agg` then polls one feed per
//! tick, always the one least recently fetched, and stores previously-unseen
//! items as posts. Everything lives in a single SQLite database next to the
//! config file.

pub mod cli;
pub mod config;
pub mod feed;
pub mod scrape;
pub mod storage;
