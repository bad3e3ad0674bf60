//! cairn library crate: the pieces of the `cairn` binary that sit above the
//! store and are worth testing on their own.
//!
//! The store itself lives in `cairn-store`; this crate adds repository
//! configuration, telemetry setup, and the ancestry graph description.

pub mod config;
pub mod graph;
pub mod telemetry;

pub use cairn_store as store;
