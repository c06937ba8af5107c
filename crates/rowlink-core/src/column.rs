//! Column descriptors.
//!
//! A [`Column`] knows how to pull one column of the current row out of the
//! engine. There are exactly two strategies:
//!
//! - **Bindable**: a fixed-capacity buffer registered with the engine, filled
//!   on every fetch. Used for fixed-width types and short declared widths.
//! - **NonBindable**: the value is read after the fetch with repeated
//!   `SQLGetData` calls into a scratch buffer and accumulated.
//!
//! A bindable column that follows a non-bindable one in the result set is
//! never registered, because drivers only allow explicit reads on columns
//! after the last bound one. It is read with a single `SQLGetData` into its
//! own buffer instead.
//!
//! # Lifecycle
//!
//! ```text
//! Unbound ──bind──▶ Bound ──close──▶ Closed
//!    └──────────────close──────────────┘
//! ```

use std::fmt;

use bytes::BytesMut;
use rowlink_common::config::{ChunkTermination, FetchConfig};
use rowlink_common::constants::{MIN_CHUNK_SIZE, SQL_NO_TOTAL};
use rowlink_common::error::{DiagnosticRecord, OdbcError, OdbcResult};
use rowlink_common::memory::{ColumnBuffer, Indicator};
use tracing::trace;

use crate::catalog::{classify, CType, ValueKind};
use crate::native::{self, ops, NativeStatement, SqlReturn};
use crate::value::{self, Value};

/// How a column is transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingStrategy {
    /// Fixed buffer, filled by fetch when bound.
    Bindable,
    /// Chunked explicit reads.
    NonBindable,
}

impl fmt::Display for BindingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingStrategy::Bindable => write!(f, "bindable"),
            BindingStrategy::NonBindable => write!(f, "non-bindable"),
        }
    }
}

/// Lifecycle state of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnState {
    /// Not registered with the engine; read explicitly.
    Unbound,
    /// Registered with the engine.
    Bound,
    /// Buffers released.
    Closed,
}

/// Bytes of `capacity` usable for data of `c_type`, leaving room for the
/// terminator and keeping wide data on code unit boundaries.
fn usable_len(c_type: CType, capacity: usize) -> usize {
    let usable = capacity.saturating_sub(c_type.terminator_len());
    if c_type.is_wide() {
        usable & !1
    } else {
        usable
    }
}

fn native_len(n: usize) -> isize {
    isize::try_from(n).unwrap_or(isize::MAX)
}

// =============================================================================
// Bindable
// =============================================================================

/// A column with a fixed-capacity buffer.
#[derive(Debug)]
pub struct BindableColumn {
    name: String,
    ordinal: u16,
    c_type: CType,
    buffer: ColumnBuffer,
    state: ColumnState,
}

impl BindableColumn {
    /// Creates a column whose buffer holds `capacity` bytes, terminator
    /// included.
    pub fn new(name: impl Into<String>, ordinal: u16, c_type: CType, capacity: usize) -> Self {
        Self {
            name: name.into(),
            ordinal,
            c_type,
            buffer: ColumnBuffer::new(capacity),
            state: ColumnState::Unbound,
        }
    }

    /// Returns the buffer capacity.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Registers the buffer with the engine.
    ///
    /// The caller owns the column for as long as the binding exists and
    /// unbinds before the column is closed or dropped.
    pub(crate) fn bind<S>(&mut self, stmt: &mut S) -> OdbcResult<()>
    where
        S: NativeStatement + ?Sized,
    {
        if self.state == ColumnState::Closed {
            return Err(OdbcError::CursorClosed);
        }

        // SAFETY: the buffer's heap regions never move, and the owning
        // cursor unbinds before releasing them
        let ret = unsafe { stmt.bind_col(self.ordinal + 1, self.c_type, &mut self.buffer) };
        native::check(stmt, ops::BIND_COL, ret)?;

        self.state = ColumnState::Bound;
        trace!("Bound column {} ({}) with {} bytes", self.ordinal, self.c_type, self.capacity());
        Ok(())
    }

    fn extract<S>(&mut self, stmt: &mut S) -> OdbcResult<Value>
    where
        S: NativeStatement + ?Sized,
    {
        match self.state {
            ColumnState::Closed => return Err(OdbcError::CursorClosed),
            ColumnState::Bound => {}
            ColumnState::Unbound => {
                let ret = stmt.get_data(self.ordinal + 1, self.c_type, &mut self.buffer);
                if native::check(stmt, ops::GET_DATA, ret)? == SqlReturn::NoData {
                    return Err(OdbcError::native(
                        ops::GET_DATA,
                        vec![DiagnosticRecord::general(format!(
                            "no data returned for column {}",
                            self.ordinal
                        ))],
                    ));
                }
            }
        }

        let usable = usable_len(self.c_type, self.buffer.capacity());
        match self.buffer.indicator() {
            Indicator::Null => Ok(Value::Null),
            Indicator::NoTotal => Err(OdbcError::Truncated {
                column: self.ordinal,
                indicator: SQL_NO_TOTAL,
                capacity: usable,
            }),
            Indicator::Length(len) => {
                match self.c_type.fixed_width() {
                    Some(width) if len != width => {
                        return Err(OdbcError::UnexpectedLength {
                            column: self.ordinal,
                            expected: width,
                            actual: len,
                        });
                    }
                    None if len > usable => {
                        return Err(OdbcError::Truncated {
                            column: self.ordinal,
                            indicator: native_len(len),
                            capacity: usable,
                        });
                    }
                    _ => {}
                }
                value::decode(self.ordinal, self.c_type, self.buffer.filled(len))
            }
        }
    }
}

// =============================================================================
// Non-bindable
// =============================================================================

/// A column read in chunks.
#[derive(Debug)]
pub struct NonBindableColumn {
    name: String,
    ordinal: u16,
    c_type: CType,
    scratch: ColumnBuffer,
    accumulator: BytesMut,
    max_chunk_size: usize,
    max_value_size: usize,
    termination: ChunkTermination,
    state: ColumnState,
}

impl NonBindableColumn {
    /// Creates a chunked column sized by `config`.
    ///
    /// The scratch buffer is never smaller than `MIN_CHUNK_SIZE`, so every
    /// chunk has room for data after the terminator.
    pub fn new(name: impl Into<String>, ordinal: u16, c_type: CType, config: &FetchConfig) -> Self {
        let mut chunk = config.chunk_size.max(MIN_CHUNK_SIZE);
        if let Some(width) = c_type.fixed_width() {
            chunk = chunk.max(width);
        }
        if c_type.is_wide() {
            chunk += chunk % 2;
        }

        Self {
            name: name.into(),
            ordinal,
            c_type,
            scratch: ColumnBuffer::new(chunk),
            accumulator: BytesMut::new(),
            max_chunk_size: config.max_chunk_size.max(chunk),
            max_value_size: config.max_value_size,
            termination: config.chunk_termination,
            state: ColumnState::Unbound,
        }
    }

    /// Returns the current scratch buffer capacity.
    pub fn chunk_capacity(&self) -> usize {
        self.scratch.capacity()
    }

    fn append(&mut self, len: usize) -> OdbcResult<()> {
        if self.accumulator.len() + len > self.max_value_size {
            return Err(OdbcError::ChunkLimitExceeded {
                column: self.ordinal,
                limit: self.max_value_size,
            });
        }
        self.accumulator.extend_from_slice(self.scratch.filled(len));
        Ok(())
    }

    /// Grows the scratch so `remaining` bytes plus terminator fit in one
    /// more call, within `max_chunk_size`.
    fn grow_for(&mut self, remaining: usize) {
        let mut wanted = (remaining + self.c_type.terminator_len()).min(self.max_chunk_size);
        if self.c_type.is_wide() {
            wanted -= wanted % 2;
        }
        if wanted > self.scratch.capacity() {
            trace!(
                "Growing chunk buffer of column {} from {} to {} bytes",
                self.ordinal,
                self.scratch.capacity(),
                wanted
            );
            self.scratch.grow(wanted);
        }
    }

    fn extract<S>(&mut self, stmt: &mut S) -> OdbcResult<Value>
    where
        S: NativeStatement + ?Sized,
    {
        if self.state == ColumnState::Closed {
            return Err(OdbcError::CursorClosed);
        }

        self.accumulator.clear();
        let column_number = self.ordinal + 1;
        let mut chunks = 0usize;

        loop {
            self.scratch.set_indicator(0);
            let ret = stmt.get_data(column_number, self.c_type, &mut self.scratch);
            let usable = usable_len(self.c_type, self.scratch.capacity());

            match ret {
                SqlReturn::Success => {
                    chunks += 1;
                    match self.scratch.indicator() {
                        Indicator::Null if chunks == 1 => return Ok(Value::Null),
                        Indicator::Null => {
                            return Err(OdbcError::native(
                                ops::GET_DATA,
                                vec![DiagnosticRecord::general(format!(
                                    "NULL indicator after partial value in column {}",
                                    self.ordinal
                                ))],
                            ));
                        }
                        Indicator::NoTotal => {
                            return Err(OdbcError::Truncated {
                                column: self.ordinal,
                                indicator: SQL_NO_TOTAL,
                                capacity: usable,
                            });
                        }
                        Indicator::Length(len) if len > usable => {
                            return Err(OdbcError::Truncated {
                                column: self.ordinal,
                                indicator: native_len(len),
                                capacity: usable,
                            });
                        }
                        Indicator::Length(len) => self.append(len)?,
                    }
                    trace!("Column {} chunk {} complete", self.ordinal, chunks);

                    if self.termination == ChunkTermination::StopOnSuccess {
                        break;
                    }
                }
                SqlReturn::SuccessWithInfo => {
                    let records = stmt.diagnostics();
                    if !records.iter().any(DiagnosticRecord::is_truncation) {
                        return Err(OdbcError::native(ops::GET_DATA, records));
                    }
                    chunks += 1;

                    let capacity = self.scratch.capacity();
                    let copied = match self.scratch.indicator() {
                        Indicator::Null => {
                            return Err(OdbcError::native(ops::GET_DATA, records));
                        }
                        Indicator::NoTotal => {
                            self.append(usable)?;
                            usable
                        }
                        Indicator::Length(total) => {
                            let copied = total.min(usable);
                            self.append(copied)?;
                            self.grow_for(total - copied);
                            copied
                        }
                    };

                    // A truncated chunk that delivered nothing and left the
                    // scratch unchanged would be requested again forever.
                    if copied == 0 && self.scratch.capacity() == capacity {
                        return Err(OdbcError::Truncated {
                            column: self.ordinal,
                            indicator: self.scratch.raw_indicator(),
                            capacity: usable,
                        });
                    }
                    trace!(
                        "Column {} chunk {} truncated, {} bytes so far",
                        self.ordinal,
                        chunks,
                        self.accumulator.len()
                    );
                }
                SqlReturn::NoData => break,
                other => return Err(native::failure(stmt, ops::GET_DATA, other)),
            }
        }

        let data = self.accumulator.split().freeze();
        value::decode_owned(self.ordinal, self.c_type, data)
    }
}

// =============================================================================
// Column
// =============================================================================

/// A result column descriptor.
#[derive(Debug)]
pub enum Column {
    /// Fixed buffer.
    Bindable(BindableColumn),
    /// Chunked reads.
    NonBindable(NonBindableColumn),
}

impl Column {
    /// Creates a bindable column with a buffer of `capacity` bytes.
    pub fn bindable(name: impl Into<String>, ordinal: u16, c_type: CType, capacity: usize) -> Self {
        Column::Bindable(BindableColumn::new(name, ordinal, c_type, capacity))
    }

    /// Creates a chunked column.
    pub fn non_bindable(
        name: impl Into<String>,
        ordinal: u16,
        c_type: CType,
        config: &FetchConfig,
    ) -> Self {
        Column::NonBindable(NonBindableColumn::new(name, ordinal, c_type, config))
    }

    /// Creates a column for `c_type`: bindable at the type's width when it
    /// is fixed-width, chunked otherwise.
    pub fn for_type(
        name: impl Into<String>,
        ordinal: u16,
        c_type: CType,
        config: &FetchConfig,
    ) -> Self {
        match c_type.fixed_width() {
            Some(width) => Column::bindable(name, ordinal, c_type, width),
            None => Column::non_bindable(name, ordinal, c_type, config),
        }
    }

    /// Returns the declared column name.
    pub fn name(&self) -> &str {
        match self {
            Column::Bindable(c) => &c.name,
            Column::NonBindable(c) => &c.name,
        }
    }

    /// Returns the zero-based ordinal.
    pub fn ordinal(&self) -> u16 {
        match self {
            Column::Bindable(c) => c.ordinal,
            Column::NonBindable(c) => c.ordinal,
        }
    }

    /// Returns the C type the column is read as.
    pub fn c_type(&self) -> CType {
        match self {
            Column::Bindable(c) => c.c_type,
            Column::NonBindable(c) => c.c_type,
        }
    }

    /// Returns the value kind a caller should scan into.
    pub fn scan_value_kind(&self) -> ValueKind {
        classify(self.c_type()).kind
    }

    /// Returns the catalog name of the C type, empty if unrecognized.
    pub fn database_type_name(&self) -> &'static str {
        classify(self.c_type()).name
    }

    /// Returns the transfer strategy.
    pub fn strategy(&self) -> BindingStrategy {
        match self {
            Column::Bindable(_) => BindingStrategy::Bindable,
            Column::NonBindable(_) => BindingStrategy::NonBindable,
        }
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> ColumnState {
        match self {
            Column::Bindable(c) => c.state,
            Column::NonBindable(c) => c.state,
        }
    }

    /// Returns true if the column is bindable.
    pub fn is_bindable(&self) -> bool {
        matches!(self, Column::Bindable(_))
    }

    /// Returns true if the buffer is registered with the engine.
    pub fn is_bound(&self) -> bool {
        self.state() == ColumnState::Bound
    }

    pub(crate) fn bind<S>(&mut self, stmt: &mut S) -> OdbcResult<()>
    where
        S: NativeStatement + ?Sized,
    {
        match self {
            Column::Bindable(c) => c.bind(stmt),
            Column::NonBindable(_) => Ok(()),
        }
    }

    /// Marks the column unbound after the engine released all bindings.
    pub(crate) fn mark_unbound(&mut self) {
        if let Column::Bindable(c) = self {
            if c.state == ColumnState::Bound {
                c.state = ColumnState::Unbound;
            }
        }
    }

    /// Extracts the value of this column from the current row.
    ///
    /// The statement must be positioned on a row, and columns must be
    /// extracted in ascending ordinal order.
    ///
    /// # Errors
    ///
    /// Returns a `Native` error if a read fails, `Truncated` or
    /// `UnexpectedLength` if the engine's indicator contradicts the buffer,
    /// `ChunkLimitExceeded` if a chunked value grows too large, and
    /// `CursorClosed` after [`Column::close`].
    pub fn extract_value<S>(&mut self, stmt: &mut S) -> OdbcResult<Value>
    where
        S: NativeStatement + ?Sized,
    {
        match self {
            Column::Bindable(c) => c.extract(stmt),
            Column::NonBindable(c) => c.extract(stmt),
        }
    }

    /// Releases the column's buffers.
    ///
    /// A bound column must be unbound at the engine first.
    pub fn close(&mut self) {
        match self {
            Column::Bindable(c) => {
                c.buffer = ColumnBuffer::new(0);
                c.state = ColumnState::Closed;
            }
            Column::NonBindable(c) => {
                c.scratch = ColumnBuffer::new(0);
                c.accumulator = BytesMut::new();
                c.state = ColumnState::Closed;
            }
        }
    }
}
