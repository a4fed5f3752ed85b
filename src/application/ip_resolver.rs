//! IP Resolver - TTL cache in front of an IP reader
//!
//! Hits and confirmed misses are both cached, each with its own lifetime.
//! Unallocated ranges change rarely, so misses are kept longer than hits.

use crate::domain::entities::Location;
use crate::domain::ports::IpReader;
use crate::error::{RadarError, Result};
use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default lifetime of a cached match.
pub const DEFAULT_POSITIVE_TTL: Duration = Duration::from_secs(30 * 60);
/// Default lifetime of a cached miss.
pub const DEFAULT_NEGATIVE_TTL: Duration = Duration::from_secs(90 * 60);

/// Default upper bound on cached entries.
pub const DEFAULT_CAPACITY: usize = 100_000;

#[derive(Debug, Clone)]
struct CacheEntry {
    /// `None` records a confirmed miss
    location: Option<Location>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Resolves IP addresses through one generation of the IP database.
///
/// Each refresh builds a new resolver, so the cache never outlives the
/// database that filled it.
pub struct IpResolver {
    reader: Arc<dyn IpReader>,
    cache: DashMap<String, CacheEntry>,
    positive_ttl: Duration,
    negative_ttl: Duration,
    capacity: usize,
}

impl IpResolver {
    pub fn new(reader: Arc<dyn IpReader>) -> Self {
        Self::with_ttl(reader, DEFAULT_POSITIVE_TTL, DEFAULT_NEGATIVE_TTL)
    }

    pub fn with_ttl(reader: Arc<dyn IpReader>, positive_ttl: Duration, negative_ttl: Duration) -> Self {
        Self {
            reader,
            cache: DashMap::new(),
            positive_ttl,
            negative_ttl,
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Bound the cache to `capacity` entries (at least one).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Resolve a textual IPv4 or IPv6 address.
    pub fn resolve(&self, address: &str) -> Result<Location> {
        let ip: IpAddr = address
            .trim()
            .parse()
            .map_err(|_| RadarError::invalid_input(format!("bad ip address {:?}", address)))?;
        self.resolve_ip(ip)
    }

    pub fn resolve_ip(&self, ip: IpAddr) -> Result<Location> {
        let key = ip.to_string();
        let now = Instant::now();

        let cached = self
            .cache
            .get(&key)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.location.clone());

        if let Some(location) = cached {
            tracing::debug!("ip cache hit for {}", key);
            return location.ok_or(RadarError::NotFound);
        }

        tracing::debug!("ip cache miss for {}", key);
        let location = match self.reader.lookup(ip)? {
            Some(found) if !found.is_sentinel() => Some(found.into_location()),
            _ => None,
        };

        let ttl = if location.is_some() {
            self.positive_ttl
        } else {
            self.negative_ttl
        };

        self.make_room(now);
        self.cache.insert(
            key,
            CacheEntry {
                location: location.clone(),
                expires_at: now + ttl,
            },
        );

        location.ok_or(RadarError::NotFound)
    }

    /// Once full, drop expired entries and then the ones closest to expiry
    /// until the cache is at most half full. Scans happen at most once per
    /// `capacity / 2` inserts.
    fn make_room(&self, now: Instant) {
        if self.cache.len() < self.capacity {
            return;
        }
        let before = self.cache.len();
        self.cache.retain(|_, entry| entry.is_fresh(now));

        let target = self.capacity / 2;
        if self.cache.len() > target {
            let mut expiries: Vec<Instant> = self.cache.iter().map(|e| e.expires_at).collect();
            let excess = expiries.len() - target;
            let (_, cutoff, _) = expiries.select_nth_unstable(excess - 1);
            let cutoff = *cutoff;
            self.cache.retain(|_, entry| entry.expires_at > cutoff);
        }

        tracing::debug!(
            "evicted {} ip cache entries ({} left)",
            before.saturating_sub(self.cache.len()),
            self.cache.len()
        );
    }

    /// Number of cached entries, expired ones included.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn node_count(&self) -> u64 {
        self.reader.node_count()
    }
}
