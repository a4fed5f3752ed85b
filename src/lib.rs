//! geo-radar Library
//!
//! Resolves countries, subdivisions, cities, postal codes and IP addresses
//! to locations or aggregated areas, backed by periodically refreshed bulk
//! datasets.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{IpResolver, Radar, RadarOptions, RadarStats};
pub use application::radar::Resolution;
pub use config::{load_config, Config};
pub use domain::entities::{Coordinate, IpLocation, Location};
pub use domain::ports::{DatasetFetcher, IpReader, IpReaderFactory};
pub use domain::services::{Envelope, LocationIndex};
pub use domain::value_objects::{LocationId, LocationKind};
pub use error::{RadarError, Result};
