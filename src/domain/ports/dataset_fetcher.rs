//! Dataset Fetcher Port
//!
//! Defines the interface for retrieving the raw bytes of a remote dataset.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Fetcher for bulk dataset archives.
///
/// This is an outbound port that abstracts the transport. Implementations
/// fail with `RadarError::Transport` on connection problems or any
/// non-200 answer.
#[async_trait]
pub trait DatasetFetcher: Send + Sync {
    /// Download the full body behind `uri`.
    async fn fetch(&self, uri: &str) -> Result<Bytes>;
}
