//! Envelope Service
//!
//! Aggregates matched locations into a bounding rectangle on the sphere and
//! derives a center and a radius from it. The radius is taken from the
//! smallest spherical cap around the rectangle, which over-approximates the
//! minimal enclosing circle but needs a single pass over the points.
//! This service has NO external dependencies - it's pure Rust.

use crate::domain::entities::{Coordinate, Location};
use std::f64::consts::PI;

/// The Earth's mean radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.01;

/// Latitude/longitude rectangle accumulated point by point.
///
/// Longitudes are tracked in two frames, `[-180, 180]` and `[0, 360)`.
/// The narrower of the two spans is the rectangle's longitude interval, so
/// clusters straddling the antimeridian get a tight bound and the result
/// does not depend on the order in which points arrive.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LatLngBounds {
    lat_lo: f64,
    lat_hi: f64,
    lng_lo: f64,
    lng_hi: f64,
    wrapped_lo: f64,
    wrapped_hi: f64,
}

impl LatLngBounds {
    fn from_point(c: Coordinate) -> Self {
        let lng = normalize_lng(c.longitude);
        let wrapped = wrap_360(lng);
        Self {
            lat_lo: c.latitude,
            lat_hi: c.latitude,
            lng_lo: lng,
            lng_hi: lng,
            wrapped_lo: wrapped,
            wrapped_hi: wrapped,
        }
    }

    fn add_point(&mut self, c: Coordinate) {
        let lng = normalize_lng(c.longitude);
        let wrapped = wrap_360(lng);

        self.lat_lo = self.lat_lo.min(c.latitude);
        self.lat_hi = self.lat_hi.max(c.latitude);
        self.lng_lo = self.lng_lo.min(lng);
        self.lng_hi = self.lng_hi.max(lng);
        self.wrapped_lo = self.wrapped_lo.min(wrapped);
        self.wrapped_hi = self.wrapped_hi.max(wrapped);
    }

    /// Longitude interval `(lo, hi)` in degrees with `hi - lo` in `[0, 360)`.
    ///
    /// `hi` may exceed 180 when the interval crosses the antimeridian.
    fn lng_interval(&self) -> (f64, f64) {
        let direct = self.lng_hi - self.lng_lo;
        let wrapped = self.wrapped_hi - self.wrapped_lo;
        if wrapped < direct {
            let lo = normalize_lng(self.wrapped_lo);
            (lo, lo + wrapped)
        } else {
            (self.lng_lo, self.lng_hi)
        }
    }

    fn center(&self) -> Coordinate {
        let (lo, hi) = self.lng_interval();
        Coordinate::new(
            (self.lat_lo + self.lat_hi) / 2.0,
            normalize_lng((lo + hi) / 2.0),
        )
    }

    /// Height (`1 - cos(angle)`) of the smallest cap containing the rectangle.
    ///
    /// Two candidates are considered: a cap around the rectangle center
    /// reaching its corners, and a cap around the nearer pole reaching the
    /// far latitude edge. The center cap is only valid when the longitude
    /// span is at most a hemisphere.
    fn cap_height(&self) -> f64 {
        let lat_lo = self.lat_lo.to_radians();
        let lat_hi = self.lat_hi.to_radians();

        let pole_angle = if lat_hi + lat_lo < 0.0 {
            PI / 2.0 + lat_hi
        } else {
            PI / 2.0 - lat_lo
        };
        let pole_height = 1.0 - pole_angle.cos();

        let (lng_lo, lng_hi) = self.lng_interval();
        if (lng_hi - lng_lo).to_radians() > PI {
            return pole_height;
        }

        let center = self.center();
        let c = unit_vector(center.latitude.to_radians(), center.longitude.to_radians());
        let lo = unit_vector(lat_lo, lng_lo.to_radians());
        let hi = unit_vector(lat_hi, lng_hi.to_radians());

        // Squared chord length is 2 * (1 - cos(angle)).
        let chord2 = chord2(&c, &lo).max(chord2(&c, &hi));
        let mid_height = chord2 / 2.0;

        mid_height.min(pole_height)
    }
}

/// Aggregated bounding region over one or more locations.
///
/// The first location is the envelope's base. A single-location envelope
/// never allocates a rectangle: its radius is zero and its center is the
/// base coordinate.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    base: Location,
    bounds: Option<LatLngBounds>,
    count: usize,
}

impl Envelope {
    /// Start an envelope from its base location.
    pub fn new(base: Location) -> Self {
        Self {
            base,
            bounds: None,
            count: 1,
        }
    }

    /// Build an envelope over all given locations, or `None` when empty.
    pub fn aggregate<'a, I>(locations: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Location>,
    {
        let mut iter = locations.into_iter();
        let mut envelope = Self::new(iter.next()?.clone());
        for loc in iter {
            envelope.merge(loc.coordinate);
        }
        Some(envelope)
    }

    /// Merge one more point into the rectangle.
    pub fn merge(&mut self, coordinate: Coordinate) {
        match self.bounds.as_mut() {
            Some(bounds) => bounds.add_point(coordinate),
            None => {
                let mut bounds = LatLngBounds::from_point(self.base.coordinate);
                bounds.add_point(coordinate);
                self.bounds = Some(bounds);
            }
        }
        self.count += 1;
    }

    /// First location the envelope was built from.
    pub fn location(&self) -> &Location {
        &self.base
    }

    pub fn into_location(self) -> Location {
        self.base
    }

    /// Number of points merged, base included.
    pub fn point_count(&self) -> usize {
        self.count
    }

    /// Midpoint of the bounding rectangle.
    pub fn center(&self) -> Coordinate {
        match &self.bounds {
            Some(bounds) => bounds.center(),
            None => self.base.coordinate,
        }
    }

    /// Radius in kilometers of the disc whose area equals the bounding cap.
    pub fn radius(&self) -> f64 {
        match &self.bounds {
            Some(bounds) => {
                let area = 2.0 * PI * bounds.cap_height();
                (area / PI).sqrt() * EARTH_RADIUS_KM
            }
            None => 0.0,
        }
    }
}

fn normalize_lng(lng: f64) -> f64 {
    let mut l = lng % 360.0;
    if l > 180.0 {
        l -= 360.0;
    } else if l < -180.0 {
        l += 360.0;
    }
    l
}

fn wrap_360(lng: f64) -> f64 {
    if lng < 0.0 {
        lng + 360.0
    } else {
        lng
    }
}

fn unit_vector(lat: f64, lng: f64) -> [f64; 3] {
    [lat.cos() * lng.cos(), lat.cos() * lng.sin(), lat.sin()]
}

fn chord2(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)
}
