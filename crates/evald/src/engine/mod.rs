//! Built-in evaluator for a small integer and string scripting language.
//!
//! The language has `let` declarations, `print(...)`, bare expressions and
//! `{ ... }` blocks with lexical scoping:
//!
//! ```text
//! let greeting = "hello";
//! { let n = 6 * 7; print(greeting + " " + n); }
//! n;            // undefined name 'n'
//! 1 / 0;        // ArithmeticError
//! ```
//!
//! Each top-level statement is one snippet. Top-level bindings live for as
//! long as the session that owns the engine.

mod classify;
mod interpreter;
mod lexer;
mod parser;

use tracing::debug;

use crate::evaluator::{
    CompletionInfo, Evaluator, EvaluatorProvider, EvaluatorStartupError, OutputSink,
    SnippetEvent, ThrownException,
};

use self::interpreter::{Interpreter, Thrown};
use self::parser::Stmt;

const ENGINE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::engine");

/// Session-scoped interpreter state.
#[derive(Debug, Default)]
pub struct ScriptEngine {
    interpreter: Interpreter,
    snippets: u64,
}

impl ScriptEngine {
    /// Creates an engine with no bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn run_snippet(&mut self, stmt: &Stmt, output: &mut OutputSink) -> SnippetEvent {
        let missing = self.interpreter.unresolved_names(stmt);
        if !missing.is_empty() {
            return SnippetEvent::invalid(
                missing
                    .into_iter()
                    .map(|name| format!("undefined name '{name}'"))
                    .collect(),
            );
        }

        self.snippets += 1;
        match self.interpreter.run(stmt, output) {
            Ok(value) => SnippetEvent::valid(value.map(|value| value.repr()), None),
            Err(thrown) => SnippetEvent::valid(None, Some(self.exception(thrown))),
        }
    }

    fn exception(&self, thrown: Thrown) -> ThrownException {
        ThrownException {
            kind: thrown.kind.to_owned(),
            trace: format!("{}: {}\n\tat #{}\n", thrown.kind, thrown.message, self.snippets),
        }
    }
}

impl Evaluator for ScriptEngine {
    fn classify(&mut self, source: &str) -> CompletionInfo {
        classify::classify(source)
    }

    fn execute(&mut self, source: &str, output: &mut OutputSink) -> Vec<SnippetEvent> {
        match parser::parse(source) {
            Ok(statements) => statements
                .iter()
                .map(|stmt| self.run_snippet(stmt, output))
                .collect(),
            Err(error) => {
                debug!(target: ENGINE_TARGET, %error, "rejected snippet");
                vec![SnippetEvent::invalid(vec![error.to_string()])]
            }
        }
    }
}

/// Provider handing every session a fresh [`ScriptEngine`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptEngineProvider;

impl ScriptEngineProvider {
    /// Builds a new provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EvaluatorProvider for ScriptEngineProvider {
    type Evaluator = ScriptEngine;

    fn create(&self, session_key: &str) -> Result<Self::Evaluator, EvaluatorStartupError> {
        debug!(target: ENGINE_TARGET, session = session_key, "starting script engine");
        Ok(ScriptEngine::new())
    }
}
