mod envelope;
mod location_index;

pub use envelope::{Envelope, EARTH_RADIUS_KM};
pub use location_index::LocationIndex;
