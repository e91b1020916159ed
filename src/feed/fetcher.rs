use crate::feed::parser::{self, FeedDocument, ParseError};
use futures::StreamExt;
use reqwest::Client;
use thiserror::Error;

/// Sent on every request so feed operators know who is calling.
pub const USER_AGENT: &str = "trawl";

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while pulling a single feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Body was not a well-formed RSS document
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Builds the HTTP client shared by every fetch.
///
/// No request timeout is configured: a slow feed delays the cycle it
/// belongs to and nothing else, and the next tick is not queued behind it.
pub fn build_client() -> reqwest::Result<Client> {
    Client::builder().user_agent(USER_AGENT).build()
}

/// Fetches `url` and decodes the body as RSS 2.0.
///
/// One GET per call. There are no retries here; a feed that fails simply
/// waits for its next turn in the rotation.
///
/// # Errors
///
/// - [`FetchError::Network`] - connection or TLS failure
/// - [`FetchError::HttpStatus`] - non-2xx response
/// - [`FetchError::ResponseTooLarge`] - body over the 10MB cap
/// - [`FetchError::Parse`] - body is not a well-formed RSS document
pub async fn fetch_document(client: &Client, url: &str) -> Result<FeedDocument, FetchError> {
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;
    Ok(parser::parse_document(&bytes)?)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
