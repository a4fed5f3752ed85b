//! HTTP Dataset Fetcher
//!
//! Implements DatasetFetcher with a shared reqwest client.

use crate::domain::ports::DatasetFetcher;
use crate::error::{RadarError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;

/// Product identifier sent with every request.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Fetches dataset archives over HTTP(S).
///
/// Anything other than `200 OK` is a transport failure; redirects are
/// followed by the client before the status is checked.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DatasetFetcher for HttpFetcher {
    async fn fetch(&self, uri: &str) -> Result<Bytes> {
        let response = self.client.get(uri).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(RadarError::transport(format!("GET {}: status {}", redact(uri), status)));
        }

        let body = response.bytes().await?;
        tracing::debug!("fetched {} bytes from {}", body.len(), redact(uri));
        Ok(body)
    }
}

/// Strip the query string so access keys never reach the logs.
fn redact(uri: &str) -> &str {
    uri.split_once('?').map_or(uri, |(base, _)| base)
}
