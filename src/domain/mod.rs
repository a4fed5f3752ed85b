//! Domain Layer
//!
//! Entities, identifiers, ports and pure services. Nothing in here talks to
//! the network or the filesystem.

pub mod entities;
pub mod ports;
pub mod services;
pub mod value_objects;
