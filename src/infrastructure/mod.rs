//! Infrastructure Layer
//!
//! Process-level plumbing used by the binary.

pub mod shutdown;

pub use shutdown::{shutdown_signal, ShutdownController};
