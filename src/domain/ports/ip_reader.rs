//! IP Reader Port
//!
//! Defines the interface for point lookups in an IP-to-location database.

use crate::domain::entities::IpLocation;
use crate::error::Result;
use std::net::IpAddr;
use std::sync::Arc;

/// Reader for IP address to geographic location.
///
/// This is an outbound port that abstracts the IP database.
/// Implementations may use MaxMind GeoLite2, IP2Location, or other databases.
pub trait IpReader: Send + Sync {
    /// Look up the network enclosing `ip`.
    ///
    /// Returns `Ok(None)` when the database has no entry for the address.
    fn lookup(&self, ip: IpAddr) -> Result<Option<IpLocation>>;

    /// Number of search-tree nodes, reported in statistics.
    fn node_count(&self) -> u64;
}

/// Builds a reader from a freshly extracted database image.
pub trait IpReaderFactory: Send + Sync {
    fn open(&self, database: Vec<u8>) -> Result<Arc<dyn IpReader>>;
}
