//! Error types for the clustering engine

use thiserror::Error;

use crate::matrix::{ClusterId, ItemId};

/// Errors returned by the clustering engine and the matrix types it reads.
#[derive(Debug, Error)]
pub enum Error {
    /// A run or query parameter is outside its valid range.
    #[error("configuration error: {name} {message}")]
    Configuration {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: String,
    },

    /// Two items were declared with the same id.
    #[error("duplicate item id {0}")]
    DuplicateItem(ItemId),

    /// A connection or assignment names an item that does not exist.
    #[error("unknown item {0}")]
    UnknownItem(String),

    /// An item is assigned to a group that does not exist.
    #[error("item {item} refers to unknown group {group}")]
    UnknownGroup {
        /// Item carrying the assignment.
        item: ItemId,
        /// Missing group id.
        group: ClusterId,
    },

    /// A clustering has no entry for an item of the matrix.
    #[error("item {0} has no cluster assignment")]
    Unassigned(ItemId),

    /// A connection joins an item to itself.
    #[error("self connection on item {0}")]
    SelfConnection(ItemId),

    /// The unordered item pair already has a connection.
    #[error("duplicate connection between items {a} and {b}")]
    DuplicateConnection {
        /// Lower item id.
        a: ItemId,
        /// Higher item id.
        b: ItemId,
    },

    /// Connection weights must be finite and positive.
    #[error("invalid weight {weight} on connection {a}-{b}")]
    InvalidWeight {
        /// First endpoint.
        a: ItemId,
        /// Second endpoint.
        b: ItemId,
        /// Offending weight.
        weight: f64,
    },

    /// The run was cancelled before completing every level.
    #[error("optimization cancelled after {completed_levels} levels")]
    Cancelled {
        /// Number of levels fully completed before the cancel flag was seen.
        completed_levels: u32,
    },

    /// The worker thread could not be started.
    #[error("failed to spawn optimization worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// The worker thread exited without sending a result.
    #[error("optimization worker terminated without a result")]
    WorkerDisconnected,

    /// A dedicated thread pool could not be created.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub(crate) fn configuration(name: &'static str, message: impl Into<String>) -> Self {
        Error::Configuration {
            name,
            message: message.into(),
        }
    }
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
