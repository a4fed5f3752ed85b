//! Application Layer
//!
//! The IP cache and the refresh orchestrator that callers talk to.

pub mod ip_resolver;
pub mod radar;

pub use ip_resolver::IpResolver;
pub use radar::{Radar, RadarOptions, RadarStats};
