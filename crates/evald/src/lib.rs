//! Persistent, session-keyed code evaluation daemon.
//!
//! `evald` accepts connections on a Unix domain socket, normally a listening
//! descriptor inherited from its launcher. Each connection carries one framed
//! request naming a session key and a fragment of source text. The fragment is
//! appended to whatever the session left unfinished, every complete statement
//! is executed by the session's [`Evaluator`], and the captured output is sent
//! back as a single framed response. While the buffered text is still
//! incomplete the daemon answers with [`CONTINUE_PROMPT`] instead.
//!
//! Sessions are created on first use and live for the rest of the process.
//! State such as variable bindings persists between requests with the same
//! key; different keys never observe one another.
//!
//! The bootstrap sequence loads configuration through [`ConfigLoader`],
//! installs structured telemetry, prepares the socket filesystem and builds
//! the [`SessionRegistry`]. [`Daemon::serve`] then starts the accept loop on a
//! background thread, with one thread per connection. Lifecycle events are
//! surfaced through a [`HealthReporter`].

mod bootstrap;
mod client;
mod completion;
mod dispatch;
mod engine;
mod evaluator;
mod health;
mod process;
pub mod protocol;
mod session;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Daemon, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use client::{ClientError, EvalClient};
pub use completion::{CONTINUE_PROMPT, process};
pub use dispatch::EvalConnectionHandler;
pub use engine::{ScriptEngine, ScriptEngineProvider};
pub use evaluator::{
    Completeness, CompletionInfo, Evaluator, EvaluatorProvider, EvaluatorStartupError,
    OutputSink, SnippetEvent, SnippetOutcome, ThrownException,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{LaunchError, run_daemon};
pub use session::{Context, SessionError, SessionRegistry, SharedContext};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::{ConnectionHandler, ListenerError, ListenerHandle, SocketListener};

#[cfg(test)]
mod tests;
