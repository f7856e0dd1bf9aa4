//! Test configuration loaders for scenarios covering success and failure paths.

use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use ortho_config::{OrthoConfig, OrthoError};
use tempfile::TempDir;
use evald_config::{Config, SocketEndpoint};

use crate::bootstrap::ConfigLoader;

/// Loader that provisions a Unix socket path under a temporary directory.
pub struct TestConfigLoader {
    socket_dir: Arc<Mutex<TempDir>>,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory for socket");
        Self {
            socket_dir: Arc::new(Mutex::new(dir)),
        }
    }

    /// Path of the daemon socket inside the temporary directory.
    pub fn socket_path(&self) -> PathBuf {
        let dir = self
            .socket_dir
            .lock()
            .expect("temporary directory mutex poisoned");
        dir.path().join("run").join("evald.sock")
    }

    fn socket_path_string(&self) -> String {
        self.socket_path()
            .to_str()
            .expect("temporary socket path was not valid UTF-8")
            .to_owned()
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            daemon_socket: SocketEndpoint::unix(self.socket_path_string()),
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing invalid CLI arguments.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("evald"),
            OsString::from("--daemon-socket"),
            OsString::from("tcp://127.0.0.1:9000"),
        ];
        Config::load_from_iter(args)
    }
}
