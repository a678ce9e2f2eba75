//! Error taxonomy shared by every `river` crate.
//!
//! Each variant corresponds to one of the failure classes the river has to
//! reason about: a malformed rule, a row with a null identity column, a
//! bulk submission that never reached the search store, and so on. Whether
//! a given variant is fatal (trips the shared cancellation signal) or
//! merely logged is a property of the *caller*, not of the error itself;
//! see the doc comment on each variant.

use thiserror::Error;

/// The error type returned by the river's rule table, request builder,
/// event handler, and sync loop.
#[derive(Debug, Error)]
pub enum RiverError {
    /// An invalid rule: a missing parent column, a malformed field-mapping
    /// entry, or an identity column absent from the table. Fatal at load
    /// time; during streaming it is logged and trips cancellation.
    #[error("config error: {0}")]
    Config(String),

    /// A document id (or one of its components) was null.
    /// Fatal for the current stream.
    #[error("id error: {0}")]
    Id(String),

    /// Transport-level failure submitting a bulk request to the search
    /// store. Fatal; trips cancellation.
    #[error("transport error: {0}")]
    Transport(String),

    /// Failure persisting a replication position. Fatal; trips
    /// cancellation.
    #[error("persist error: {0}")]
    Persist(String),

    /// A single document within a bulk batch was rejected by the search
    /// store. Logged with item coordinates; the batch as a whole is still
    /// considered complete.
    #[error("bulk item error: action={action} index={index} type={doc_type} id={id} status={status} error={message}")]
    BulkItem {
        action: String,
        index: String,
        doc_type: String,
        id: String,
        status: u16,
        message: String,
    },
}

/// Result alias used throughout the workspace.
pub type RiverResult<T> = Result<T, RiverError>;

/// A non-fatal coercion problem: an out-of-range enum index, an
/// unparseable date. Never returned as an `Err` — callers log it via
/// `tracing::warn!` and substitute the documented fallback value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionWarning(pub String);

impl std::fmt::Display for CoercionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
