//! Errors reported by providers.

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by a geodata provider while serving the core.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No cursor or insert handle could be opened because the pool is exhausted.
    #[error("Handle pool exhausted for '{collection}': {in_use} of {limit} handles in use")]
    ResourceExhausted {
        /// Collection the handle was requested for
        collection: String,
        /// Handles currently held
        in_use: usize,
        /// Pool size
        limit: usize,
    },

    /// The attribute predicate was rejected by the query engine.
    #[error("Invalid where clause '{clause}': {message}")]
    QuerySyntax {
        /// The clause as supplied by the caller
        clause: String,
        /// Why it was rejected
        message: String,
    },

    /// A named collection or dataset does not exist.
    #[error("'{name}' not found in workspace")]
    NotFound {
        /// The requested name
        name: String,
    },

    /// Reading or writing the backing store failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// The path being accessed
        path: PathBuf,
        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// The backing data could not be decoded or encoded.
    #[error("Invalid {format} data: {message}")]
    Format {
        /// Format name (e.g. "`GeoJSON`")
        format: String,
        /// Description of the problem
        message: String,
    },

    /// A tool-style collaborator failed and reported a list of messages.
    #[error("{}", messages.join("\n"))]
    Tool {
        /// Messages in the order the provider reported them
        messages: Vec<String>,
    },
}

impl ProviderError {
    /// Aggregates a provider-reported message list into one error.
    #[must_use]
    pub fn from_messages<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Tool {
            messages: messages.into_iter().map(Into::into).collect(),
        }
    }
}

/// Result type alias for provider operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_messages_are_joined() {
        let error = ProviderError::from_messages(["Executing: Append", "ERROR 000732: missing"]);
        assert_eq!(error.to_string(), "Executing: Append\nERROR 000732: missing");
    }

    #[test]
    fn test_resource_exhausted_display() {
        let error = ProviderError::ResourceExhausted {
            collection: "roads".to_string(),
            in_use: 4,
            limit: 4,
        };
        assert_eq!(
            error.to_string(),
            "Handle pool exhausted for 'roads': 4 of 4 handles in use"
        );
    }
}
