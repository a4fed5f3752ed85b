use serde::Deserialize;
use std::fmt;

pub const DEFAULT_GEONAMES_URI: &str = "https://download.geonames.org/export/zip/allCountries.zip";
pub const DEFAULT_MAXMIND_URI: &str = "https://download.maxmind.com/app/geoip_download?edition_id=GeoLite2-City&license_key=YOUR_LICENSE_KEY&suffix=tar.gz";

/// Placeholder in the MaxMind URI replaced by the configured license key.
pub const LICENSE_KEY_PLACEHOLDER: &str = "YOUR_LICENSE_KEY";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GEORADAR_GEONAMES_URI must not be empty")]
    EmptyGeonamesUri,
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Deserialize, Clone)]
pub struct Config {
    // Dataset sources
    pub geonames_uri: String,
    pub maxmind_uri: String,
    pub maxmind_key: Option<String>,
    /// Country allow-list; empty loads every country
    pub countries: Vec<String>,

    // Refresh scheduling
    pub refresh_timeout_secs: u64,
    /// 0 disables periodic refresh
    pub refresh_interval_secs: u64,

    // IP cache lifetimes
    pub positive_ttl_secs: u64,
    pub negative_ttl_secs: u64,

    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geonames_uri: DEFAULT_GEONAMES_URI.to_string(),
            maxmind_uri: DEFAULT_MAXMIND_URI.to_string(),
            maxmind_key: None,
            countries: Vec::new(),
            refresh_timeout_secs: 300,
            refresh_interval_secs: 86400,
            positive_ttl_secs: 1800,
            negative_ttl_secs: 5400,
            debug: false,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("geonames_uri", &self.geonames_uri)
            .field("maxmind_uri", &self.maxmind_uri)
            .field("maxmind_key", &self.maxmind_key.as_ref().map(|_| "<redacted>"))
            .field("countries", &self.countries)
            .field("refresh_timeout_secs", &self.refresh_timeout_secs)
            .field("refresh_interval_secs", &self.refresh_interval_secs)
            .field("positive_ttl_secs", &self.positive_ttl_secs)
            .field("negative_ttl_secs", &self.negative_ttl_secs)
            .field("debug", &self.debug)
            .finish()
    }
}

impl Config {
    /// IP dataset URI with the license key filled in.
    ///
    /// `None` when the default download URL is configured without a key,
    /// in which case the IP side is not refreshed at all.
    pub fn maxmind_location(&self) -> Option<String> {
        match &self.maxmind_key {
            Some(key) if !key.is_empty() => {
                Some(self.maxmind_uri.replace(LICENSE_KEY_PLACEHOLDER, key))
            }
            _ if self.maxmind_uri.is_empty() || self.maxmind_uri == DEFAULT_MAXMIND_URI => None,
            _ => Some(self.maxmind_uri.clone()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.geonames_uri.trim().is_empty() {
            return Err(ConfigError::EmptyGeonamesUri);
        }
        if self.refresh_timeout_secs == 0 {
            return Err(ConfigError::Zero("GEORADAR_REFRESH_TIMEOUT_SECS"));
        }
        if self.positive_ttl_secs == 0 {
            return Err(ConfigError::Zero("GEORADAR_POSITIVE_TTL_SECS"));
        }
        if self.negative_ttl_secs == 0 {
            return Err(ConfigError::Zero("GEORADAR_NEGATIVE_TTL_SECS"));
        }
        Ok(())
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    let geonames_uri = std::env::var("GEORADAR_GEONAMES_URI")
        .unwrap_or_else(|_| DEFAULT_GEONAMES_URI.to_string());

    let maxmind_uri = std::env::var("GEORADAR_MAXMIND_URI")
        .unwrap_or_else(|_| DEFAULT_MAXMIND_URI.to_string());

    let maxmind_key = std::env::var("GEORADAR_MAXMIND_KEY").ok();

    let countries = std::env::var("GEORADAR_COUNTRIES")
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let refresh_timeout_secs = std::env::var("GEORADAR_REFRESH_TIMEOUT_SECS")
        .unwrap_or_else(|_| "300".to_string())
        .parse()
        .unwrap_or(300);

    let refresh_interval_secs = std::env::var("GEORADAR_REFRESH_INTERVAL_SECS")
        .unwrap_or_else(|_| "86400".to_string())
        .parse()
        .unwrap_or(86400);

    let positive_ttl_secs = std::env::var("GEORADAR_POSITIVE_TTL_SECS")
        .unwrap_or_else(|_| "1800".to_string())
        .parse()
        .unwrap_or(1800);

    let negative_ttl_secs = std::env::var("GEORADAR_NEGATIVE_TTL_SECS")
        .unwrap_or_else(|_| "5400".to_string())
        .parse()
        .unwrap_or(5400);

    let debug = std::env::var("DEBUG").is_ok();

    let cfg = Config {
        geonames_uri,
        maxmind_uri,
        maxmind_key,
        countries,
        refresh_timeout_secs,
        refresh_interval_secs,
        positive_ttl_secs,
        negative_ttl_secs,
        debug,
    };
    cfg.validate()?;

    Ok(cfg)
}
