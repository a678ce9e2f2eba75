//! Small utilities shared by every `river` crate: the process-wide
//! cancellation signal and a bounded retry-with-backoff helper.

pub mod retry;
pub mod shutdown;

pub use shutdown::Shutdown;
