//! rowlink Performance Benchmarks
//!
//! This crate contains benchmarks for the row layer:
//! - Cursor fetch over bound, chunked, and mixed result sets
//! - Native value decoding
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench -p rowlink-bench
//! ```

pub mod utils;
