//! Scoped, forward-only cursors.
//!
//! A [`ScopedCursor`] owns a provider cursor handle and guarantees that the handle is
//! returned to the provider exactly once: on exhaustion, on an explicit
//! [`ScopedCursor::close`], when a read fails, or when the cursor is dropped on any
//! other exit path (early return, `?` propagation, unwinding).
//!
//! # Examples
//!
//! ```no_run
//! use geoscan_core::cursor::ScopedCursor;
//! # fn demo(collection: &dyn geoscan_core_common::FeatureCollection) -> geoscan_core::Result<()> {
//! let mut cursor = ScopedCursor::open(collection, None)?;
//! while let Some(record) = cursor.next_record()? {
//!     println!("{:?}", record.oid);
//! }
//! // Exhausted: the handle has already been released.
//! # Ok(())
//! # }
//! ```

use geoscan_core_common::{FeatureCollection, QueryFilter, Record, RecordCursor};
use log::debug;

use crate::error::{CursorError, Result};

/// Lifecycle state of a [`ScopedCursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Opened, nothing read yet.
    Created,
    /// At least one read performed, more records may follow.
    Iterating,
    /// All records read; the handle has been released.
    Exhausted,
    /// Closed before exhaustion; the handle has been released.
    Closed,
}

/// Single-pass record iterator bound to one collection and filter.
pub struct ScopedCursor<'a> {
    handle: Option<Box<dyn RecordCursor + 'a>>,
    state: CursorState,
    collection: String,
}

impl<'a> ScopedCursor<'a> {
    /// Opens a cursor over `collection`, restricted by `filter` when given.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::ResourceExhaustion`] when the provider has no handle
    /// available, or a query error when the filter is rejected.
    pub fn open(collection: &'a dyn FeatureCollection, filter: Option<&QueryFilter>) -> Result<Self> {
        let handle = collection.open_cursor(filter)?;
        debug!("Opened cursor on '{}'", collection.name());
        Ok(Self::from_handle(collection.name(), handle))
    }

    /// Wraps an already opened provider handle.
    #[must_use]
    pub fn from_handle(collection: impl Into<String>, handle: Box<dyn RecordCursor + 'a>) -> Self {
        Self {
            handle: Some(handle),
            state: CursorState::Created,
            collection: collection.into(),
        }
    }

    #[must_use]
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Name of the collection the cursor is bound to.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Reads the next record.
    ///
    /// Returns `Ok(None)` once the stream is exhausted, releasing the handle; further
    /// calls keep returning `Ok(None)`. A failed read closes the cursor before the
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Closed`] if the cursor was closed, or the provider's
    /// error for a failed read.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        match self.state {
            CursorState::Exhausted => return Ok(None),
            CursorState::Closed => {
                return Err(CursorError::Closed {
                    collection: self.collection.clone(),
                }
                .into());
            },
            CursorState::Created | CursorState::Iterating => {},
        }

        let Some(handle) = self.handle.as_mut() else {
            return Ok(None);
        };
        self.state = CursorState::Iterating;

        match handle.next_record() {
            Ok(Some(record)) => Ok(Some(record)),
            Ok(None) => {
                self.release();
                self.state = CursorState::Exhausted;
                Ok(None)
            },
            Err(err) => {
                self.close();
                Err(err.into())
            },
        }
    }

    /// Releases the handle. Valid from any state; repeated calls, and calls after
    /// exhaustion, do nothing.
    pub fn close(&mut self) {
        self.release();
        if self.state != CursorState::Exhausted {
            self.state = CursorState::Closed;
        }
    }

    fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.release();
            debug!("Released cursor on '{}'", self.collection);
        }
    }
}

impl Iterator for ScopedCursor<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == CursorState::Closed {
            return None;
        }
        self.next_record().transpose()
    }
}

impl Drop for ScopedCursor<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Opens a cursor, runs `scan` over it, and releases the cursor whatever `scan`
/// returns.
///
/// # Errors
///
/// Returns the error from opening the cursor or from `scan`.
pub fn with_cursor<T>(
    collection: &dyn FeatureCollection,
    filter: Option<&QueryFilter>,
    scan: impl FnOnce(&mut ScopedCursor<'_>) -> Result<T>,
) -> Result<T> {
    let mut cursor = ScopedCursor::open(collection, filter)?;
    let result = scan(&mut cursor);
    cursor.close();
    result
}
