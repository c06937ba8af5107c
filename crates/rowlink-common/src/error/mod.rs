//! Error handling for rowlink.
//!
//! This module provides the structured error type and result alias used
//! across all rowlink components.

mod odbc;

pub use odbc::{DiagnosticRecord, ErrorCode, OdbcError};

/// Result type alias for rowlink operations.
pub type OdbcResult<T> = std::result::Result<T, OdbcError>;
