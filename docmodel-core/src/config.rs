//! Connection-wide settings for bounded-duration scopes and update semantics.

use std::time::Duration;

/// Which version of a document `find_one_and_update` hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnDocument {
    /// The document as it was before the update was applied.
    #[default]
    Before,
    /// The document after the update was applied.
    After,
}

/// Timeouts and defaults shared by every handle resolved from a [`Connection`](crate::connection::Connection).
///
/// # Example
///
/// ```ignore
/// let config = ConnectionConfig::default()
///     .with_operation_timeout(Duration::from_secs(3))
///     .with_return_document(ReturnDocument::After);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Bound for client construction plus the liveness ping.
    pub connect_timeout: Duration,
    /// Bound applied to each collection wrapper operation.
    pub operation_timeout: Duration,
    /// Bound applied to each index creation request.
    pub index_timeout: Duration,
    /// Default return semantics for find-and-update operations.
    pub return_document: ReturnDocument,
}

impl ConnectionConfig {
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_INDEX_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_index_timeout(mut self, timeout: Duration) -> Self {
        self.index_timeout = timeout;
        self
    }

    pub fn with_return_document(mut self, return_document: ReturnDocument) -> Self {
        self.return_document = return_document;
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            operation_timeout: Self::DEFAULT_OPERATION_TIMEOUT,
            index_timeout: Self::DEFAULT_INDEX_TIMEOUT,
            return_document: ReturnDocument::default(),
        }
    }
}
