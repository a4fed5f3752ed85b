//! MaxMind IP Reader
//!
//! Implements IpReader on top of a GeoLite2-City database image.

use crate::domain::entities::{Coordinate, IpLocation};
use crate::domain::ports::{IpReader, IpReaderFactory};
use crate::error::Result;
use maxminddb::{MaxMindDBError, Reader};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
struct CityRecord {
    city: Option<City>,
    country: Option<Country>,
    subdivisions: Option<Vec<Subdivision>>,
    postal: Option<Postal>,
    location: Option<Position>,
}

#[derive(Debug, Default, Deserialize)]
struct City {
    geoname_id: Option<u32>,
    names: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct Country {
    iso_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Subdivision {
    iso_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Postal {
    code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Position {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl From<CityRecord> for IpLocation {
    fn from(rec: CityRecord) -> Self {
        let (geoname_id, city) = match rec.city {
            Some(c) => (
                c.geoname_id.unwrap_or_default(),
                c.names
                    .and_then(|mut n| n.remove("en"))
                    .unwrap_or_default(),
            ),
            None => (0, String::new()),
        };
        let position = rec.location.unwrap_or_default();

        IpLocation {
            geoname_id,
            country: rec.country.and_then(|c| c.iso_code).unwrap_or_default(),
            subdivision1: rec
                .subdivisions
                .and_then(|s| s.into_iter().next())
                .and_then(|s| s.iso_code)
                .unwrap_or_default(),
            city,
            postal_code: rec.postal.and_then(|p| p.code),
            coordinate: Coordinate::new(
                position.latitude.unwrap_or_default(),
                position.longitude.unwrap_or_default(),
            ),
        }
    }
}

/// MaxMind GeoLite2-City reader.
pub struct MaxMindIpReader {
    reader: Reader<Vec<u8>>,
}

impl MaxMindIpReader {
    /// Open a database image held in memory.
    pub fn from_bytes(database: Vec<u8>) -> Result<Self> {
        let reader = Reader::from_source(database)?;
        tracing::debug!(
            "opened {} database built {}",
            reader.metadata.database_type,
            reader.metadata.build_epoch
        );
        Ok(Self { reader })
    }
}

impl IpReader for MaxMindIpReader {
    fn lookup(&self, ip: IpAddr) -> Result<Option<IpLocation>> {
        match self.reader.lookup::<CityRecord>(ip) {
            Ok(rec) => Ok(Some(rec.into())),
            Err(MaxMindDBError::AddressNotFoundError(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn node_count(&self) -> u64 {
        self.reader.metadata.node_count as u64
    }
}

/// Opens GeoLite2 images as `MaxMindIpReader`s.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxMindReaderFactory;

impl IpReaderFactory for MaxMindReaderFactory {
    fn open(&self, database: Vec<u8>) -> Result<Arc<dyn IpReader>> {
        Ok(Arc::new(MaxMindIpReader::from_bytes(database)?))
    }
}
