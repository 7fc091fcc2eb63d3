//! # Formats Module
//!
//! Serialization and format handling for catalog data.
//!
//! This module contains:
//! - Binary snapshot format (magic header + version + postcard payload)
//! - Record codec shared by the redb backend
//!
//! File I/O for snapshots lives in the storage layer; this module only
//! handles format conversion (pure transformations).

mod snapshot;

pub use snapshot::*;
