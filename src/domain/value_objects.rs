//! Value Objects - Immutable domain primitives
//!
//! `LocationId` is a tagged identifier. Each granularity has its own
//! constructor, so the kind of an id is fixed when it is built and never
//! inferred from which fields happen to be filled in.

use crate::error::{RadarError, Result};
use std::fmt;
use std::str::FromStr;

/// Granularity selected by a [`LocationId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationKind {
    Country,
    /// First-order subdivision (state, province)
    Primary,
    /// Second-order subdivision (county)
    Secondary,
    City,
    Postal,
}

impl LocationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::City => "city",
            Self::Postal => "postal",
        }
    }
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Country(String),
    Primary(String, String),
    Secondary(String, String, String),
    City(String, String, String),
    Postal(String, String),
}

/// Identifier of a place at one level of the postal hierarchy.
///
/// All components are lower-cased on construction, so two ids built from
/// differently-cased input compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationId(Key);

impl LocationId {
    pub fn country(country: &str) -> Self {
        Self(Key::Country(country.to_lowercase()))
    }

    pub fn primary(country: &str, subdivision1: &str) -> Self {
        Self(Key::Primary(
            country.to_lowercase(),
            subdivision1.to_lowercase(),
        ))
    }

    pub fn secondary(country: &str, subdivision1: &str, subdivision2: &str) -> Self {
        Self(Key::Secondary(
            country.to_lowercase(),
            subdivision1.to_lowercase(),
            subdivision2.to_lowercase(),
        ))
    }

    pub fn city(country: &str, subdivision1: &str, city: &str) -> Self {
        Self(Key::City(
            country.to_lowercase(),
            subdivision1.to_lowercase(),
            city.to_lowercase(),
        ))
    }

    pub fn postal(country: &str, postal_code: &str) -> Self {
        Self(Key::Postal(
            country.to_lowercase(),
            postal_code.to_lowercase(),
        ))
    }

    pub fn kind(&self) -> LocationKind {
        match &self.0 {
            Key::Country(..) => LocationKind::Country,
            Key::Primary(..) => LocationKind::Primary,
            Key::Secondary(..) => LocationKind::Secondary,
            Key::City(..) => LocationKind::City,
            Key::Postal(..) => LocationKind::Postal,
        }
    }

    pub fn is_country(&self) -> bool {
        self.kind() == LocationKind::Country
    }

    pub fn is_primary(&self) -> bool {
        self.kind() == LocationKind::Primary
    }

    pub fn is_secondary(&self) -> bool {
        self.kind() == LocationKind::Secondary
    }

    pub fn is_city(&self) -> bool {
        self.kind() == LocationKind::City
    }

    pub fn is_postal(&self) -> bool {
        self.kind() == LocationKind::Postal
    }

    /// Country component, present for every kind.
    pub fn country_code(&self) -> &str {
        match &self.0 {
            Key::Country(c)
            | Key::Primary(c, _)
            | Key::Secondary(c, _, _)
            | Key::City(c, _, _)
            | Key::Postal(c, _) => c.as_str(),
        }
    }

    /// Components in hierarchy order.
    pub fn components(&self) -> Vec<&str> {
        match &self.0 {
            Key::Country(c) => vec![c.as_str()],
            Key::Primary(c, s1) => vec![c.as_str(), s1.as_str()],
            Key::Secondary(c, s1, s2) => vec![c.as_str(), s1.as_str(), s2.as_str()],
            Key::City(c, s1, city) => vec![c.as_str(), s1.as_str(), city.as_str()],
            Key::Postal(c, p) => vec![c.as_str(), p.as_str()],
        }
    }

    /// Reject ids with an empty component; they can never match a record.
    pub fn validate(&self) -> Result<()> {
        if self.components().iter().any(|c| c.trim().is_empty()) {
            return Err(RadarError::invalid_input(format!(
                "empty component in {} id '{}'",
                self.kind(),
                self
            )));
        }
        Ok(())
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Key::Country(c) => write!(f, "country:{}", c),
            Key::Primary(c, s1) => write!(f, "subdivision:{},{}", c, s1),
            Key::Secondary(c, s1, s2) => write!(f, "subdivision:{},{},{}", c, s1, s2),
            Key::City(c, s1, city) => write!(f, "city:{},{},{}", c, s1, city),
            Key::Postal(c, p) => write!(f, "postal:{},{}", c, p),
        }
    }
}

impl FromStr for LocationId {
    type Err = RadarError;

    /// Parse the `<kind>:<field1>[,<field2>[,<field3>]]` text form.
    ///
    /// `subdivision` with two fields is a primary id, with three fields a
    /// secondary id.
    fn from_str(s: &str) -> Result<Self> {
        let bad = || RadarError::invalid_input(format!("bad location {}", s));

        let lowered = s.to_lowercase();
        let (kind, rest) = lowered.split_once(':').ok_or_else(bad)?;
        if rest.contains(':') {
            return Err(bad());
        }

        let fields: Vec<&str> = rest.split(',').collect();
        let id = match (kind, fields.as_slice()) {
            ("country", [c]) => Self::country(c),
            ("subdivision", [c, s1]) => Self::primary(c, s1),
            ("subdivision", [c, s1, s2]) => Self::secondary(c, s1, s2),
            ("city", [c, s1, city]) => Self::city(c, s1, city),
            ("postal", [c, p]) => Self::postal(c, p),
            _ => return Err(bad()),
        };

        Ok(id)
    }
}
