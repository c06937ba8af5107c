//! # rowlink-common
//!
//! Common types, errors, and utilities for rowlink.
//!
//! This crate provides the foundations shared by the row materialization
//! layer. It includes:
//!
//! - **Errors**: Structured error handling with `OdbcError` and native diagnostics
//! - **Config**: Fetch configuration (`FetchConfig`) loaded from code or TOML
//! - **Constants**: ODBC indicator sentinels, SQLSTATEs, C struct widths
//! - **Memory**: Column buffers with stable addresses for native binding
//!
//! ## Example
//!
//! ```rust
//! use rowlink_common::config::FetchConfig;
//! use rowlink_common::error::OdbcResult;
//! use rowlink_common::memory::ColumnBuffer;
//!
//! fn example() -> OdbcResult<()> {
//!     let config = FetchConfig::default();
//!     config.validate()?;
//!     let buffer = ColumnBuffer::new(config.chunk_size);
//!     assert_eq!(buffer.capacity(), 1024);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod memory;

// Re-export commonly used items at the crate root
pub use config::{ChunkTermination, FetchConfig};
pub use constants::*;
pub use error::{DiagnosticRecord, ErrorCode, OdbcError, OdbcResult};
pub use memory::{ColumnBuffer, Indicator};
