//! Daemon bootstrap orchestration.

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use evald_config::{Config, SocketPreparationError};

use crate::dispatch::EvalConnectionHandler;
use crate::evaluator::EvaluatorProvider;
use crate::health::HealthReporter;
use crate::session::SessionRegistry;
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::transport::{ListenerError, ListenerHandle, SocketListener};

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that merges defaults, the configuration file, environment and CLI.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out an already resolved configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Socket preparation failed.
    #[error("failed to prepare daemon socket: {source}")]
    Socket {
        /// Filesystem error reported while preparing the socket directory.
        #[source]
        source: SocketPreparationError,
    },
}

/// Result of a successful bootstrap invocation.
pub struct Daemon<P: EvaluatorProvider> {
    config: Config,
    registry: Arc<SessionRegistry<P>>,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl<P: EvaluatorProvider> Daemon<P> {
    fn new(
        config: Config,
        registry: Arc<SessionRegistry<P>>,
        telemetry: TelemetryHandle,
        reporter: Arc<dyn HealthReporter>,
    ) -> Self {
        Self {
            config,
            registry,
            telemetry,
            reporter,
        }
    }

    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Session registry shared with every connection.
    #[must_use]
    pub fn registry(&self) -> Arc<SessionRegistry<P>> {
        Arc::clone(&self.registry)
    }

    /// Binds the configured endpoint and starts accepting connections.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when the endpoint cannot be bound or the
    /// accept thread cannot be started.
    pub fn serve(&self) -> Result<ListenerHandle, ListenerError> {
        let endpoint = self.config.daemon_socket();
        let handler = Arc::new(EvalConnectionHandler::new(self.registry()));
        let started = SocketListener::bind(endpoint).and_then(|listener| listener.start(handler));
        match started {
            Ok(handle) => {
                self.reporter.listener_started(endpoint);
                Ok(handle)
            }
            Err(error) => {
                self.reporter.listener_failed(&error);
                Err(error)
            }
        }
    }
}

/// Bootstraps the daemon using the supplied collaborators.
///
/// # Errors
///
/// Returns [`BootstrapError`] when configuration, telemetry or socket
/// preparation fails. The reporter sees the failure before it is returned.
pub fn bootstrap_with<P>(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    provider: P,
) -> Result<Daemon<P>, BootstrapError>
where
    P: EvaluatorProvider,
{
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    if let Err(source) = config.daemon_socket().prepare_filesystem() {
        let error = BootstrapError::Socket { source };
        reporter.bootstrap_failed(&error);
        return Err(error);
    }

    let registry = Arc::new(SessionRegistry::new(provider));
    reporter.bootstrap_succeeded(&config);

    Ok(Daemon::new(config, registry, telemetry, reporter))
}
