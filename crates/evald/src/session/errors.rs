//! Error types for session lookup.

use thiserror::Error;

use crate::evaluator::EvaluatorStartupError;

/// Errors surfaced while resolving a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The registry map lock was poisoned by a panicking thread.
    #[error("session registry lock poisoned")]
    RegistryPoisoned,
    /// A session's context lock was poisoned while this request held a handle.
    ///
    /// The next request for the key gets a fresh context: earlier bindings and
    /// any buffered incomplete input are discarded.
    #[error("session '{session_key}' is unusable after an evaluator panic")]
    ContextPoisoned { session_key: String },
    /// The session's evaluator could not be created.
    #[error("failed to create session: {0}")]
    EvaluatorStartup(#[source] EvaluatorStartupError),
}
