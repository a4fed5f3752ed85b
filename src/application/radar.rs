//! Radar - Refresh orchestrator and query surface
//!
//! A single background worker rebuilds the postal index and the IP resolver
//! and publishes each one with an atomic pointer swap. Queries never touch
//! the worker: they load whichever generation is currently published.
//!
//! Refresh requests go through a queue of capacity one. A request that finds
//! the slot taken is dropped, since the pending refresh already covers it.
//! Failures land in a one-slot mailbox that keeps the oldest unread error.

use crate::adapters::outbound::{extract_database, GeonamesLoader, HttpFetcher, MaxMindReaderFactory};
use crate::application::ip_resolver::{IpResolver, DEFAULT_NEGATIVE_TTL, DEFAULT_POSITIVE_TTL};
use crate::config::{Config, DEFAULT_GEONAMES_URI};
use crate::domain::entities::{Coordinate, Location};
use crate::domain::ports::{DatasetFetcher, IpReaderFactory};
use crate::domain::services::{Envelope, LocationIndex};
use crate::domain::value_objects::LocationId;
use crate::error::{RadarError, Result};
use arc_swap::ArcSwapOption;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};

/// Settings the orchestrator needs, detached from environment loading.
#[derive(Debug, Clone)]
pub struct RadarOptions {
    pub geonames_uri: String,
    /// `None` leaves the IP side unconfigured
    pub maxmind_uri: Option<String>,
    pub countries: Vec<String>,
    pub refresh_timeout: Duration,
    pub positive_ttl: Duration,
    pub negative_ttl: Duration,
}

impl Default for RadarOptions {
    fn default() -> Self {
        Self {
            geonames_uri: DEFAULT_GEONAMES_URI.to_string(),
            maxmind_uri: None,
            countries: Vec::new(),
            refresh_timeout: Duration::from_secs(300),
            positive_ttl: DEFAULT_POSITIVE_TTL,
            negative_ttl: DEFAULT_NEGATIVE_TTL,
        }
    }
}

impl From<&Config> for RadarOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            geonames_uri: cfg.geonames_uri.clone(),
            maxmind_uri: cfg.maxmind_location(),
            countries: cfg.countries.clone(),
            refresh_timeout: Duration::from_secs(cfg.refresh_timeout_secs),
            positive_ttl: Duration::from_secs(cfg.positive_ttl_secs),
            negative_ttl: Duration::from_secs(cfg.negative_ttl_secs),
        }
    }
}

/// Snapshot of what is currently published.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RadarStats {
    /// Records in the published postal index
    pub records: usize,
    /// Search-tree nodes in the published IP database
    pub ip_nodes: u64,
    /// Number of postal indexes published so far
    pub postal_generation: u64,
    /// Number of IP databases published so far
    pub ip_generation: u64,
    pub refreshing: bool,
}

/// Answer to a free-form query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Resolution {
    /// A single postal record or IP match
    Location { location: Location },
    /// Aggregate over every record matching a coarser id
    Area {
        location: Location,
        center: Coordinate,
        radius_km: f64,
        matches: usize,
    },
}

impl From<Envelope> for Resolution {
    fn from(env: Envelope) -> Self {
        Self::Area {
            center: env.center(),
            radius_km: env.radius(),
            matches: env.point_count(),
            location: env.into_location(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RefreshRequest {
    timeout: Duration,
}

struct Shared {
    options: RadarOptions,
    fetcher: Arc<dyn DatasetFetcher>,
    factory: Arc<dyn IpReaderFactory>,
    loader: GeonamesLoader,

    index: ArcSwapOption<LocationIndex>,
    resolver: ArcSwapOption<IpResolver>,
    postal_generation: AtomicU64,
    ip_generation: AtomicU64,

    mailbox: Mutex<Option<RadarError>>,
    /// Refreshes accepted but not yet finished
    outstanding: AtomicUsize,
}

/// Geodata radar: owns the published datasets and the refresh worker.
///
/// Must be created inside a tokio runtime. Dropping the radar closes the
/// request queue; the worker exits after finishing its current refresh.
pub struct Radar {
    shared: Arc<Shared>,
    refresh_tx: mpsc::Sender<RefreshRequest>,
    barrier_tx: mpsc::UnboundedSender<oneshot::Sender<()>>,
}

impl Radar {
    /// Radar backed by HTTP downloads and MaxMind databases.
    pub fn new(options: RadarOptions) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new()?);
        Ok(Self::with_ports(options, fetcher, Arc::new(MaxMindReaderFactory)))
    }

    /// Radar with explicit outbound ports. Queues the initial refresh.
    pub fn with_ports(
        options: RadarOptions,
        fetcher: Arc<dyn DatasetFetcher>,
        factory: Arc<dyn IpReaderFactory>,
    ) -> Self {
        let (refresh_tx, refresh_rx) = mpsc::channel(1);
        let (barrier_tx, barrier_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            loader: GeonamesLoader::new(options.countries.as_slice()),
            options,
            fetcher,
            factory,
            index: ArcSwapOption::empty(),
            resolver: ArcSwapOption::empty(),
            postal_generation: AtomicU64::new(0),
            ip_generation: AtomicU64::new(0),
            mailbox: Mutex::new(None),
            outstanding: AtomicUsize::new(0),
        });

        tokio::spawn(run_worker(shared.clone(), refresh_rx, barrier_rx));

        let radar = Self {
            shared,
            refresh_tx,
            barrier_tx,
        };
        radar.refresh();
        radar
    }

    /// Request a refresh with the configured timeout.
    ///
    /// Returns `false` when the request was coalesced into one already
    /// pending.
    pub fn refresh(&self) -> bool {
        self.refresh_with_timeout(self.shared.options.refresh_timeout)
    }

    pub fn refresh_with_timeout(&self, timeout: Duration) -> bool {
        self.shared.outstanding.fetch_add(1, Ordering::SeqCst);

        match self.refresh_tx.try_send(RefreshRequest { timeout }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.shared.outstanding.fetch_sub(1, Ordering::SeqCst);
                tracing::debug!("refresh already pending, request coalesced");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.shared.outstanding.fetch_sub(1, Ordering::SeqCst);
                tracing::warn!("refresh worker stopped, request dropped");
                false
            }
        }
    }

    /// Whether a refresh is pending or running.
    pub fn is_refreshing(&self) -> bool {
        self.shared.outstanding.load(Ordering::SeqCst) > 0
    }

    /// Wait until every refresh accepted before this call has finished.
    pub async fn wait(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.barrier_tx.send(done_tx).is_err() {
            return;
        }
        // A dropped sender means the worker is gone; nothing left to wait for.
        let _ = done_rx.await;
    }

    /// Take the oldest unread refresh failure, clearing the mailbox.
    pub fn take_error(&self) -> Option<RadarError> {
        self.shared.mailbox.lock().take()
    }

    fn index(&self) -> Result<Arc<LocationIndex>> {
        self.shared.index.load_full().ok_or(RadarError::NotReady)
    }

    fn resolver(&self) -> Result<Arc<IpResolver>> {
        self.shared.resolver.load_full().ok_or(RadarError::NotReady)
    }

    /// Aggregate all records matching any kind of id.
    pub fn get(&self, id: &LocationId) -> Result<Envelope> {
        self.index()?.envelope(id)
    }

    pub fn country(&self, country: &str) -> Result<Envelope> {
        self.get(&LocationId::country(country))
    }

    pub fn primary(&self, country: &str, subdivision1: &str) -> Result<Envelope> {
        self.get(&LocationId::primary(country, subdivision1))
    }

    pub fn secondary(&self, country: &str, subdivision1: &str, subdivision2: &str) -> Result<Envelope> {
        self.get(&LocationId::secondary(country, subdivision1, subdivision2))
    }

    pub fn city(&self, country: &str, subdivision1: &str, city: &str) -> Result<Envelope> {
        self.get(&LocationId::city(country, subdivision1, city))
    }

    pub fn postal(&self, country: &str, postal_code: &str) -> Result<Location> {
        self.index()?
            .postal(&LocationId::postal(country, postal_code))
            .cloned()
    }

    pub fn ip(&self, address: &str) -> Result<Location> {
        self.resolver()?.resolve(address)
    }

    /// Raw postal archive behind the published index.
    pub fn export(&self) -> Result<Bytes> {
        Ok(self.index()?.source().clone())
    }

    /// Resolve an IP address or an id in its text form.
    pub fn resolve(&self, query: &str) -> Result<Resolution> {
        let query = query.trim();
        if let Ok(ip) = query.parse::<std::net::IpAddr>() {
            let location = self.resolver()?.resolve_ip(ip)?;
            return Ok(Resolution::Location { location });
        }

        let id: LocationId = query.parse()?;
        if id.is_postal() {
            let location = self.index()?.postal(&id)?.clone();
            return Ok(Resolution::Location { location });
        }
        self.get(&id).map(Resolution::from)
    }

    pub fn stats(&self) -> RadarStats {
        let shared = &self.shared;
        RadarStats {
            records: shared.index.load_full().map_or(0, |i| i.len()),
            ip_nodes: shared.resolver.load_full().map_or(0, |r| r.node_count()),
            postal_generation: shared.postal_generation.load(Ordering::SeqCst),
            ip_generation: shared.ip_generation.load(Ordering::SeqCst),
            refreshing: self.is_refreshing(),
        }
    }
}

async fn run_worker(
    shared: Arc<Shared>,
    mut refresh_rx: mpsc::Receiver<RefreshRequest>,
    mut barrier_rx: mpsc::UnboundedReceiver<oneshot::Sender<()>>,
) {
    loop {
        tokio::select! {
            // Drain refresh work before releasing barriers.
            biased;

            Some(request) = refresh_rx.recv() => {
                shared.refresh(request).await;
                shared.outstanding.fetch_sub(1, Ordering::SeqCst);
            }
            Some(done) = barrier_rx.recv() => {
                let _ = done.send(());
            }
            else => break,
        }
    }
    tracing::debug!("refresh worker stopped");
}

impl Shared {
    async fn refresh(&self, request: RefreshRequest) {
        let deadline = tokio::time::Instant::now() + request.timeout;
        tracing::info!("refreshing datasets (timeout {:?})", request.timeout);

        let postal = async {
            tokio::time::timeout_at(deadline, self.refresh_postal())
                .await
                .unwrap_or(Err(RadarError::Timeout(request.timeout)))
        };
        let ip = async {
            match &self.options.maxmind_uri {
                Some(uri) => tokio::time::timeout_at(deadline, self.refresh_ip(uri))
                    .await
                    .unwrap_or(Err(RadarError::Timeout(request.timeout))),
                None => Ok(()),
            }
        };

        let (postal, ip) = tokio::join!(postal, ip);

        if let Err(e) = postal {
            tracing::error!("postal refresh failed: {}", e);
            self.record_error(e);
        }
        if let Err(e) = ip {
            tracing::error!("ip refresh failed: {}", e);
            self.record_error(e);
        }
    }

    async fn refresh_postal(&self) -> Result<()> {
        let archive = self.fetcher.fetch(&self.options.geonames_uri).await?;

        let loader = self.loader.clone();
        let index = tokio::task::spawn_blocking(move || loader.load(archive))
            .await
            .map_err(|e| RadarError::format(format!("postal loader task: {}", e)))??;

        let records = index.len();
        self.index.store(Some(Arc::new(index)));
        let generation = self.postal_generation.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::info!(
            "published postal index generation {} ({} records)",
            generation,
            records
        );
        Ok(())
    }

    async fn refresh_ip(&self, uri: &str) -> Result<()> {
        let archive = self.fetcher.fetch(uri).await?;

        let factory = self.factory.clone();
        let reader = tokio::task::spawn_blocking(move || {
            let database = extract_database(&archive)?;
            factory.open(database)
        })
        .await
        .map_err(|e| RadarError::format(format!("ip loader task: {}", e)))??;

        let resolver = IpResolver::with_ttl(reader, self.options.positive_ttl, self.options.negative_ttl);
        let nodes = resolver.node_count();
        self.resolver.store(Some(Arc::new(resolver)));
        let generation = self.ip_generation.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::info!(
            "published ip database generation {} ({} nodes)",
            generation,
            nodes
        );
        Ok(())
    }

    /// Park a failure unless an unread one is already waiting.
    fn record_error(&self, err: RadarError) {
        debug_assert!(err.is_refresh_failure(), "query error in mailbox: {}", err);
        let mut slot = self.mailbox.lock();
        if slot.is_none() {
            *slot = Some(err);
        } else {
            tracing::debug!("error mailbox full, dropping: {}", err);
        }
    }
}
