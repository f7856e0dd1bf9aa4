//! Contract between the session core and a source-language engine.
//!
//! The daemon never parses or runs code itself. Each session owns one
//! [`Evaluator`], which answers two questions: is this text complete enough to
//! run, and what happened when the complete part ran. Printed side effects are
//! written straight into the session's [`OutputSink`].

use std::fmt;

use thiserror::Error;

/// Completeness of a source fragment as judged by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    /// Nothing left to evaluate.
    Empty,
    /// More input is required before anything can run.
    Incomplete,
    /// A complete unit is ready; any trailing text is reported separately.
    Complete,
    /// The evaluator could not decide. Treated as [`Completeness::Complete`].
    Unknown,
}

/// Result of classifying a source fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionInfo {
    /// Completeness of the leading unit.
    pub completeness: Completeness,
    /// The leading unit to execute when complete.
    pub source: String,
    /// Text following the leading unit.
    pub remaining: String,
}

impl CompletionInfo {
    /// Nothing to evaluate.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            completeness: Completeness::Empty,
            source: String::new(),
            remaining: String::new(),
        }
    }

    /// The whole fragment needs more input.
    #[must_use]
    pub fn incomplete(remaining: impl Into<String>) -> Self {
        Self {
            completeness: Completeness::Incomplete,
            source: String::new(),
            remaining: remaining.into(),
        }
    }

    /// `source` is ready to run and `remaining` follows it.
    #[must_use]
    pub fn complete(source: impl Into<String>, remaining: impl Into<String>) -> Self {
        Self {
            completeness: Completeness::Complete,
            source: source.into(),
            remaining: remaining.into(),
        }
    }

    /// The evaluator could not classify `source`; it is attempted anyway.
    #[must_use]
    pub fn unknown(source: impl Into<String>, remaining: impl Into<String>) -> Self {
        Self {
            completeness: Completeness::Unknown,
            source: source.into(),
            remaining: remaining.into(),
        }
    }
}

/// Exception thrown while a snippet executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrownException {
    /// Reported type name of the exception.
    pub kind: String,
    /// Description and trace as the engine renders it.
    pub trace: String,
}

/// Outcome of one top-level unit produced by an execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnippetOutcome {
    /// The unit compiled; it may carry a value or a thrown exception.
    Valid {
        /// Rendered result value, if the unit produces one.
        value: Option<String>,
        /// Exception raised while running the unit.
        exception: Option<ThrownException>,
    },
    /// The unit was rejected; diagnostics explain why.
    Invalid {
        /// Human-readable diagnostic messages.
        diagnostics: Vec<String>,
    },
}

/// One top-level definition or statement reported by [`Evaluator::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetEvent {
    /// Whether the unit did not exist before this execution.
    ///
    /// Only introduced units are reported back to the client; updates to
    /// existing definitions are side effects of other units.
    pub introduced: bool,
    /// What happened to the unit.
    pub outcome: SnippetOutcome,
}

impl SnippetEvent {
    /// A newly introduced valid unit.
    #[must_use]
    pub const fn valid(value: Option<String>, exception: Option<ThrownException>) -> Self {
        Self {
            introduced: true,
            outcome: SnippetOutcome::Valid { value, exception },
        }
    }

    /// A newly introduced invalid unit.
    #[must_use]
    pub const fn invalid(diagnostics: Vec<String>) -> Self {
        Self {
            introduced: true,
            outcome: SnippetOutcome::Invalid { diagnostics },
        }
    }
}

/// Text printed by evaluation since the last flush.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OutputSink {
    buffer: String,
}

impl OutputSink {
    /// Creates an empty sink.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Appends text verbatim.
    pub fn push_str(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Appends text followed by a newline.
    pub fn push_line(&mut self, text: &str) {
        self.buffer.push_str(text);
        self.buffer.push('\n');
    }

    /// Captured text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.buffer.as_str()
    }

    /// Returns `true` when nothing has been captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns the captured text and resets the sink.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.buffer)
    }
}

impl fmt::Write for OutputSink {
    fn write_str(&mut self, text: &str) -> fmt::Result {
        self.buffer.push_str(text);
        Ok(())
    }
}

/// A per-session source-language engine.
pub trait Evaluator: Send {
    /// Classifies the completeness of `source`.
    fn classify(&mut self, source: &str) -> CompletionInfo;

    /// Executes a complete unit, printing side effects into `output`.
    fn execute(&mut self, source: &str, output: &mut OutputSink) -> Vec<SnippetEvent>;
}

/// Constructs one evaluator per session.
pub trait EvaluatorProvider: Send + Sync + 'static {
    /// Evaluator type owned by each session.
    type Evaluator: Evaluator + 'static;

    /// Creates the evaluator for a newly referenced session key.
    fn create(&self, session_key: &str) -> Result<Self::Evaluator, EvaluatorStartupError>;
}

/// Error raised when an evaluator cannot be constructed.
#[derive(Debug, Error)]
#[error("evaluator for session '{session_key}' failed to start: {message}")]
pub struct EvaluatorStartupError {
    /// Session the evaluator was being created for.
    pub session_key: String,
    message: String,
    /// Optional source error reported by the engine.
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl EvaluatorStartupError {
    /// Builds an error without an underlying source.
    #[must_use]
    pub fn new(session_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_key: session_key.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Builds an error that wraps an underlying source.
    #[must_use]
    pub fn with_source(
        session_key: impl Into<String>,
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            session_key: session_key.into(),
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Human-readable message describing the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}
