//! Memory management utilities for rowlink.
//!
//! Column buffers are the only memory shared with a native engine. They are
//! allocated once per column and per statement execution, aligned for any
//! bound C scalar, and never move while registered with the engine.

mod buffer;

pub use buffer::{ColumnBuffer, Indicator};
