//! Entry point wiring for the daemon binary.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::bootstrap::{BootstrapError, ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::engine::ScriptEngineProvider;
use crate::evaluator::EvaluatorProvider;
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::transport::ListenerError;

const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Errors surfaced while launching the daemon process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrapping the daemon failed.
    #[error("daemon bootstrap failed: {source}")]
    Bootstrap {
        /// Underlying bootstrap error.
        #[source]
        source: BootstrapError,
    },
    /// The listener could not be started or its thread panicked.
    #[error("daemon listener failed: {source}")]
    Listener {
        /// Underlying listener error.
        #[source]
        source: ListenerError,
    },
}

impl From<BootstrapError> for LaunchError {
    fn from(source: BootstrapError) -> Self {
        Self::Bootstrap { source }
    }
}

impl From<ListenerError> for LaunchError {
    fn from(source: ListenerError) -> Self {
        Self::Listener { source }
    }
}

/// Runs the daemon using the production collaborators.
///
/// Blocks for the lifetime of the process; it only returns on failure or
/// if the accept loop is asked to stop.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap fails or the listener cannot run.
pub fn run_daemon() -> Result<(), LaunchError> {
    let reporter = Arc::new(StructuredHealthReporter::new());
    run_daemon_with(&SystemConfigLoader, reporter, ScriptEngineProvider::new())
}

pub(crate) fn run_daemon_with<P>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    provider: P,
) -> Result<(), LaunchError>
where
    P: EvaluatorProvider,
{
    let daemon = bootstrap_with(loader, reporter, provider)?;
    info!(
        target: PROCESS_TARGET,
        endpoint = %daemon.config().daemon_socket(),
        "starting daemon runtime"
    );
    let listener = daemon.serve()?;
    listener.join()?;
    info!(target: PROCESS_TARGET, "listener stopped");
    Ok(())
}
