//! Buffering of incomplete input and execution of complete units.
//!
//! Each request's code is appended to whatever the session left pending. The
//! evaluator then peels complete units off the front one at a time until the
//! text runs out or the rest needs more input. Incomplete text is kept for the
//! next request and the client sees [`CONTINUE_PROMPT`]; otherwise the output
//! captured so far is flushed into the response.

use tracing::{debug, warn};

use crate::evaluator::{
    Completeness, Evaluator, OutputSink, SnippetEvent, SnippetOutcome, ThrownException,
};
use crate::session::Context;

const COMPLETION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::completion");

/// Response text sent while a session is waiting for more input.
pub const CONTINUE_PROMPT: &str = "(continue...)";

/// Runs `new_code` against the session and returns the response text.
pub fn process<E: Evaluator>(context: &mut Context<E>, new_code: &str) -> String {
    let mut code = std::mem::take(&mut context.pending_source);
    code.push_str(new_code);

    loop {
        let info = context.evaluator.classify(&code);
        match info.completeness {
            Completeness::Incomplete => {
                debug!(
                    target: COMPLETION_TARGET,
                    pending_bytes = code.len(),
                    "input incomplete; buffering"
                );
                context.pending_source = code;
                return CONTINUE_PROMPT.to_owned();
            }
            Completeness::Empty => break,
            Completeness::Complete | Completeness::Unknown => {
                let events = context.evaluator.execute(&info.source, &mut context.output);
                for event in events.iter().filter(|event| event.introduced) {
                    render_event(event, &mut context.output);
                }
                if info.remaining.len() >= code.len() {
                    warn!(
                        target: COMPLETION_TARGET,
                        remaining_bytes = info.remaining.len(),
                        "evaluator made no progress; discarding unconsumed input"
                    );
                    break;
                }
                code = info.remaining;
            }
        }
    }

    context.output.take()
}

fn render_event(event: &SnippetEvent, output: &mut OutputSink) {
    match &event.outcome {
        SnippetOutcome::Valid {
            exception: Some(exception),
            ..
        } => render_exception(exception, output),
        SnippetOutcome::Valid {
            value: Some(value), ..
        } => output.push_line(value),
        SnippetOutcome::Valid { .. } => {}
        SnippetOutcome::Invalid { diagnostics } => {
            for diagnostic in diagnostics {
                output.push_line(diagnostic);
            }
        }
    }
}

fn render_exception(exception: &ThrownException, output: &mut OutputSink) {
    output.push_line(&exception.kind);
    output.push_str(&exception.trace);
    if !exception.trace.is_empty() && !exception.trace.ends_with('\n') {
        output.push_str("\n");
    }
}
