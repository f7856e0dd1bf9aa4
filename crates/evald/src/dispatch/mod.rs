//! One-shot request dispatch for daemon connections.
//!
//! Every accepted connection carries exactly one framed request. The handler
//! decodes it, runs the code through the completion loop inside the session
//! named by the request's key, writes the framed response and closes the
//! connection. Failures are logged and end only the connection they occur on.

mod handler;

pub use self::handler::EvalConnectionHandler;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
