//! Custom error types for `GeoScan` operations.
//!
//! This module provides structured error handling using `thiserror`. Provider failures
//! are mapped onto the error kinds callers branch on (resource exhaustion, geometry,
//! query syntax) so the provider's own error enum never has to be matched directly.

use geoscan_core_common::{ProviderError, ShapeType};
use thiserror::Error;

/// Main error type for `GeoScan` operations.
///
/// This is the root error type that encompasses all domain-specific errors.
/// It uses `#[error(transparent)]` to delegate display formatting to the
/// underlying error variants.
#[derive(Debug, Error)]
pub enum GeoScanError {
    /// Cursor and handle lifetime errors
    #[error(transparent)]
    Cursor(#[from] CursorError),

    /// Geometry errors (empty, incompatible or non-spatial inputs)
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Attribute predicate errors reported by the query engine
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Provider failures not covered by a more specific kind
    #[error(transparent)]
    Provider(ProviderError),

    /// Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic errors from dependencies
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Cursor and handle errors.
#[derive(Debug, Error)]
pub enum CursorError {
    /// Opening a cursor failed because the provider's handle pool is exhausted
    #[error("Could not open a cursor on '{collection}': handle pool exhausted ({in_use} of {limit} in use)")]
    ResourceExhaustion {
        /// The collection the cursor was requested for
        collection: String,
        /// Handles currently held
        in_use: usize,
        /// Pool size
        limit: usize,
    },

    /// `next()` was called on a cursor that was already closed
    #[error("Cursor on '{collection}' is closed")]
    Closed {
        /// The collection the cursor was bound to
        collection: String,
    },
}

/// Geometry errors.
///
/// These errors occur when an operation receives an empty or incompatible geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// An empty or missing geometry was passed to an operation that needs coordinates
    #[error("Empty geometry passed to {operation}")]
    Empty {
        /// The operation that received it
        operation: &'static str,
    },

    /// Two geometries carry different spatial references
    #[error("Spatial reference mismatch: {left} vs {right}")]
    SpatialReferenceMismatch {
        /// WKID of the first geometry
        left: u32,
        /// WKID of the second geometry
        right: u32,
    },

    /// A shape type that the operation does not accept
    #[error("{operation} does not accept {shape_type} geometries")]
    UnsupportedType {
        /// The operation
        operation: &'static str,
        /// The rejected shape type
        shape_type: &'static str,
    },

    /// A spatial operation was requested on a collection without shapes
    #[error("'{collection}' is a table and has no geometry")]
    NotSpatial {
        /// The collection name
        collection: String,
    },
}

impl GeometryError {
    pub(crate) fn unsupported(operation: &'static str, shape_type: ShapeType) -> Self {
        Self::UnsupportedType {
            operation,
            shape_type: shape_type.as_str(),
        }
    }
}

/// Query errors.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The attribute predicate was rejected by the query engine at execution time
    #[error("Invalid where clause '{clause}': {message}")]
    Syntax {
        /// The clause as supplied
        clause: String,
        /// The engine's message
        message: String,
    },
}

/// Configuration errors.
///
/// These errors occur when options or configuration are invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid option value
    #[error("Invalid {option} option: {message}")]
    InvalidOption {
        /// The option name
        option: String,
        /// Why it's invalid
        message: String,
    },

    /// Required option is missing
    #[error("Missing required option: {option}")]
    MissingRequired {
        /// The missing option name
        option: String,
    },
}

impl From<ProviderError> for GeoScanError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::ResourceExhausted {
                collection,
                in_use,
                limit,
            } => Self::Cursor(CursorError::ResourceExhaustion {
                collection,
                in_use,
                limit,
            }),
            ProviderError::QuerySyntax { clause, message } => {
                Self::Query(QueryError::Syntax { clause, message })
            },
            other => Self::Provider(other),
        }
    }
}

/// Type alias for Results using `GeoScanError`.
pub type Result<T> = std::result::Result<T, GeoScanError>;

impl GeoScanError {
    /// Get a user-friendly error message.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Cursor(e) => format!("Cursor error: {e}"),
            Self::Geometry(e) => format!("Geometry error: {e}"),
            Self::Query(e) => format!("Query error: {e}"),
            Self::Provider(e) => format!("Provider error: {e}"),
            Self::Config(e) => format!("Configuration error: {e}"),
            Self::Other(e) => format!("Error: {e}"),
        }
    }

    /// Get recovery suggestions if available.
    ///
    /// Returns helpful suggestions on how to fix or work around the error.
    #[must_use]
    pub fn recovery_suggestion(&self) -> Option<String> {
        match self {
            Self::Cursor(CursorError::ResourceExhaustion { .. }) => Some(
                "Another scan is still holding cursors; make sure earlier cursors were closed."
                    .to_string(),
            ),
            Self::Query(_) => {
                Some("Check the field names and literal quoting in the where clause.".to_string())
            },
            Self::Geometry(GeometryError::NotSpatial { .. }) => {
                Some("Pick a feature class instead of a table.".to_string())
            },
            Self::Provider(ProviderError::NotFound { .. }) => {
                Some("Run 'geoscan info' to list the collections in the workspace.".to_string())
            },
            _ => None,
        }
    }

    /// Check if this error is potentially recoverable.
    ///
    /// Recoverable errors might be fixed by retrying with different parameters.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Query(_))
    }
}
