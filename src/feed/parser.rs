use quick_xml::DeError;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Feed is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),
    #[error("Feed is not valid RSS: {0}")]
    Xml(#[from] DeError),
}

/// A parsed RSS 2.0 document. Exists only between fetch and ingestion.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename = "rss")]
pub struct FeedDocument {
    pub channel: Channel,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Channel {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "item")]
    pub items: Vec<FeedItem>,
}

/// One `<item>` element. Absent fields decode as empty strings; `pub_date`
/// stays the raw wire string because feeds put anything in it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FeedItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "pubDate")]
    pub pub_date: String,
}

/// Decode an RSS 2.0 body. A document without a `<channel>` is an error,
/// never a partial result.
pub fn parse_document(bytes: &[u8]) -> Result<FeedDocument, ParseError> {
    let text = std::str::from_utf8(bytes)?;
    let document: FeedDocument = quick_xml::de::from_str(text)?;
    Ok(document)
}
