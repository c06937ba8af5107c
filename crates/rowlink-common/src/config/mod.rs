//! Configuration for rowlink.
//!
//! This module provides the configuration that governs how result sets are
//! described, bound, and fetched.

mod fetch;

pub use fetch::{ChunkTermination, FetchConfig, FetchConfigBuilder};
