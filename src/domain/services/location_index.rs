//! Location Index Service
//!
//! Immutable snapshot of the postal dataset with one lookup table per
//! `LocationKind`. Built off to the side by the refresh worker and then
//! published as a whole; it is never mutated afterwards.

use crate::domain::entities::Location;
use crate::domain::services::Envelope;
use crate::domain::value_objects::{LocationId, LocationKind};
use crate::error::{RadarError, Result};
use bytes::Bytes;
use std::collections::HashMap;

type Table = HashMap<LocationId, Vec<u32>>;

/// Hierarchical lookup tables over one generation of postal records.
#[derive(Debug, Default)]
pub struct LocationIndex {
    records: Vec<Location>,
    country: Table,
    primary: Table,
    secondary: Table,
    city: Table,
    postal: Table,
    /// Archive the records were decoded from, kept for export
    source: Bytes,
}

impl LocationIndex {
    /// Build the tables over `records`.
    ///
    /// A record whose (country, postal code) was already seen replaces the
    /// earlier one. Records with an empty subdivision or city are left out
    /// of the tables keyed by that field.
    pub fn build(records: Vec<Location>, source: Bytes) -> Self {
        let mut positions: HashMap<LocationId, usize> = HashMap::with_capacity(records.len());
        let mut unique: Vec<Location> = Vec::with_capacity(records.len());

        for loc in records {
            if loc.postal_code.is_empty() {
                unique.push(loc);
                continue;
            }
            let id = loc.id();
            match positions.get(&id).copied() {
                Some(pos) => unique[pos] = loc,
                None => {
                    positions.insert(id, unique.len());
                    unique.push(loc);
                }
            }
        }

        let mut index = Self {
            source,
            ..Default::default()
        };

        for (i, loc) in unique.iter().enumerate() {
            let i = i as u32;
            index.country.entry(loc.country_id()).or_default().push(i);
            if !loc.postal_code.is_empty() {
                index.postal.entry(loc.id()).or_default().push(i);
            }
            if loc.subdivision1.is_empty() {
                continue;
            }
            index.primary.entry(loc.primary_id()).or_default().push(i);
            if !loc.subdivision2.is_empty() {
                index.secondary.entry(loc.secondary_id()).or_default().push(i);
            }
            if !loc.city.is_empty() {
                index.city.entry(loc.city_id()).or_default().push(i);
            }
        }

        index.records = unique;
        index
    }

    fn table(&self, kind: LocationKind) -> &Table {
        match kind {
            LocationKind::Country => &self.country,
            LocationKind::Primary => &self.primary,
            LocationKind::Secondary => &self.secondary,
            LocationKind::City => &self.city,
            LocationKind::Postal => &self.postal,
        }
    }

    /// All records matching `id`, in dataset order.
    pub fn lookup(&self, id: &LocationId) -> Result<Vec<&Location>> {
        id.validate()?;

        let hits = self
            .table(id.kind())
            .get(id)
            .ok_or(RadarError::NotFound)?;

        Ok(hits.iter().map(|&i| &self.records[i as usize]).collect())
    }

    /// The unique record for a postal id.
    pub fn postal(&self, id: &LocationId) -> Result<&Location> {
        if !id.is_postal() {
            return Err(RadarError::invalid_input(format!("{} is not a postal id", id)));
        }
        self.lookup(id)?
            .into_iter()
            .next()
            .ok_or(RadarError::NotFound)
    }

    /// Aggregate every record matching `id` into one envelope.
    pub fn envelope(&self, id: &LocationId) -> Result<Envelope> {
        let hits = self.lookup(id)?;
        Envelope::aggregate(hits).ok_or(RadarError::NotFound)
    }

    /// Number of distinct records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Raw archive this snapshot was built from.
    pub fn source(&self) -> &Bytes {
        &self.source
    }
}
