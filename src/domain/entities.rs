//! Domain Entities - Core geographic records
//!
//! These entities carry no behaviour beyond identity helpers. Text fields
//! are stored lower-cased so that they can be compared against index keys
//! directly.

use crate::domain::value_objects::LocationId;
use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One row of the postal dataset.
///
/// Immutable once built. A postal-level location is identified by
/// (country, postal code); the coarser ids are derived from its hierarchy
/// path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// ISO 3166-1 alpha-2 country code, lower-cased
    pub country: String,
    pub postal_code: String,
    /// Place name
    pub city: String,
    /// First-order subdivision (state, province)
    pub subdivision1: String,
    /// Second-order subdivision (county)
    pub subdivision2: String,
    pub coordinate: Coordinate,
}

impl Location {
    /// Build a location, normalizing every text field to lower case.
    pub fn new(
        country: &str,
        postal_code: &str,
        city: &str,
        subdivision1: &str,
        subdivision2: &str,
        coordinate: Coordinate,
    ) -> Self {
        Self {
            country: country.to_lowercase(),
            postal_code: postal_code.to_lowercase(),
            city: city.to_lowercase(),
            subdivision1: subdivision1.to_lowercase(),
            subdivision2: subdivision2.to_lowercase(),
            coordinate,
        }
    }

    pub fn id(&self) -> LocationId {
        LocationId::postal(&self.country, &self.postal_code)
    }

    pub fn country_id(&self) -> LocationId {
        LocationId::country(&self.country)
    }

    pub fn primary_id(&self) -> LocationId {
        LocationId::primary(&self.country, &self.subdivision1)
    }

    pub fn secondary_id(&self) -> LocationId {
        LocationId::secondary(&self.country, &self.subdivision1, &self.subdivision2)
    }

    pub fn city_id(&self) -> LocationId {
        LocationId::city(&self.country, &self.subdivision1, &self.city)
    }
}

/// Result of an IP lookup in the IP-to-location database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpLocation {
    /// Database identifier of the matched city; zero is the "no city" sentinel
    pub geoname_id: u32,
    pub country: String,
    pub subdivision1: String,
    pub city: String,
    pub postal_code: Option<String>,
    pub coordinate: Coordinate,
}

impl IpLocation {
    /// Whether the reader returned a placeholder record instead of a match.
    pub fn is_sentinel(&self) -> bool {
        self.geoname_id == 0
    }

    /// Convert into the same shape as postal records.
    pub fn into_location(self) -> Location {
        Location::new(
            &self.country,
            self.postal_code.as_deref().unwrap_or_default(),
            &self.city,
            &self.subdivision1,
            "",
            self.coordinate,
        )
    }
}
