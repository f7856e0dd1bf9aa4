//! State owned by one session.

use crate::evaluator::{Evaluator, OutputSink};

/// Evaluator, captured output and unconsumed source for one session key.
#[derive(Debug)]
pub struct Context<E> {
    pub(crate) evaluator: E,
    pub(crate) output: OutputSink,
    pub(crate) pending_source: String,
}

impl<E: Evaluator> Context<E> {
    /// Wraps a freshly created evaluator with empty output and buffer.
    #[must_use]
    pub const fn new(evaluator: E) -> Self {
        Self {
            evaluator,
            output: OutputSink::new(),
            pending_source: String::new(),
        }
    }

    /// Source carried over from an earlier incomplete request.
    #[must_use]
    pub fn pending_source(&self) -> &str {
        self.pending_source.as_str()
    }

    /// Output captured since the last flush.
    #[must_use]
    pub const fn output(&self) -> &OutputSink {
        &self.output
    }
}
