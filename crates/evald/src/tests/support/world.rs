//! BDD test world: loader, reporter, daemon and client state for step functions.

use std::cell::RefCell;
use std::sync::Arc;

use crate::bootstrap::{BootstrapError, ConfigLoader, Daemon, bootstrap_with};
use crate::client::{ClientError, EvalClient};
use crate::engine::ScriptEngineProvider;
use crate::transport::{ListenerError, ListenerHandle};

use super::config_loader::{FailingConfigLoader, TestConfigLoader};
use super::reporter::RecordingHealthReporter;

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    loader: Box<dyn ConfigLoader>,
    socket: Option<std::path::PathBuf>,
    pub reporter: Arc<RecordingHealthReporter>,
    daemon: Option<Daemon<ScriptEngineProvider>>,
    bootstrap_error: Option<BootstrapError>,
    listener: Option<ListenerHandle>,
    listener_error: Option<ListenerError>,
    response: Option<Result<String, ClientError>>,
}

impl TestWorld {
    /// Builds a world with a successful configuration loader.
    #[must_use]
    pub fn new() -> Self {
        let loader = TestConfigLoader::new();
        let socket = Some(loader.socket_path());
        Self {
            loader: Box::new(loader),
            socket,
            reporter: Arc::new(RecordingHealthReporter::default()),
            daemon: None,
            bootstrap_error: None,
            listener: None,
            listener_error: None,
            response: None,
        }
    }

    /// Installs a loader that always fails.
    pub fn use_failing_loader(&mut self) {
        self.loader = Box::new(FailingConfigLoader);
        self.socket = None;
        self.reset_results();
    }

    /// Installs a loader that succeeds.
    pub fn use_successful_loader(&mut self) {
        let loader = TestConfigLoader::new();
        self.socket = Some(loader.socket_path());
        self.loader = Box::new(loader);
        self.reset_results();
    }

    /// Runs the bootstrap sequence once.
    pub fn bootstrap(&mut self) {
        if self.daemon.is_some() || self.bootstrap_error.is_some() {
            return;
        }

        match bootstrap_with(&*self.loader, self.reporter.clone(), ScriptEngineProvider::new()) {
            Ok(daemon) => {
                self.daemon = Some(daemon);
            }
            Err(error) => {
                self.bootstrap_error = Some(error);
            }
        }
    }

    /// Starts the listener for a bootstrapped daemon.
    pub fn serve(&mut self) {
        self.bootstrap();
        let Some(daemon) = self.daemon.as_ref() else {
            return;
        };
        match daemon.serve() {
            Ok(handle) => self.listener = Some(handle),
            Err(error) => self.listener_error = Some(error),
        }
    }

    /// Sends one request through the socket and records the outcome.
    pub fn send(&mut self, session_key: &str, code: &str) {
        let path = self.socket.clone().expect("socket path should be configured");
        self.response = Some(EvalClient::new(path).evaluate(session_key, code, 0));
    }

    /// Returns whether bootstrap produced an error.
    #[must_use]
    pub fn bootstrap_error(&self) -> Option<&BootstrapError> {
        self.bootstrap_error.as_ref()
    }

    /// Returns the listener start error, if any.
    #[must_use]
    pub fn listener_error(&self) -> Option<&ListenerError> {
        self.listener_error.as_ref()
    }

    /// Returns true when the daemon handle is available.
    #[must_use]
    pub fn daemon_started(&self) -> bool {
        self.daemon.is_some()
    }

    /// Number of sessions held by the daemon's registry.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.daemon
            .as_ref()
            .map_or(0, |daemon| daemon.registry().len())
    }

    /// Configured socket path, when the loader provides one.
    #[must_use]
    pub fn socket_path(&self) -> Option<&std::path::Path> {
        self.socket.as_deref()
    }

    /// Text of the last response; panics when the exchange failed.
    #[must_use]
    pub fn response_text(&self) -> String {
        match self.response.as_ref() {
            Some(Ok(text)) => text.clone(),
            Some(Err(error)) => panic!("request failed: {error}"),
            None => panic!("no request was sent"),
        }
    }

    fn reset_results(&mut self) {
        self.stop_listener();
        self.daemon = None;
        self.bootstrap_error = None;
        self.listener_error = None;
        self.response = None;
    }

    fn stop_listener(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.shutdown();
            handle.join().expect("listener thread should exit cleanly");
        }
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestWorld {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.shutdown();
            drop(handle.join());
        }
    }
}

/// Default test world fixture.
#[must_use]
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
