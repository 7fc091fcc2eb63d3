//! # Lost & Found Library
//!
//! This library exposes the Lost & Found app modules for testing and integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;
pub mod config;
pub mod notifier;

// Re-export lostfound_core for convenience
pub use lostfound_core;
