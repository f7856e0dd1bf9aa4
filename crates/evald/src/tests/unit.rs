//! Unit tests for the daemon bootstrap and launch utilities.

use std::fs;
use std::sync::Arc;

use rstest::rstest;

use evald_config::{Config, SocketEndpoint};

use crate::bootstrap::{StaticConfigLoader, bootstrap_with};
use crate::client::EvalClient;
use crate::engine::ScriptEngineProvider;
use crate::process::{LaunchError, run_daemon_with};
use crate::transport::ListenerError;

use super::support::{FailingConfigLoader, HealthEvent, RecordingHealthReporter, TestConfigLoader};

#[rstest]
fn bootstrap_does_not_eagerly_create_sessions() {
    let loader = TestConfigLoader::new();
    let reporter = Arc::new(RecordingHealthReporter::default());

    let daemon = bootstrap_with(&loader, reporter.clone(), ScriptEngineProvider::new())
        .expect("bootstrap should succeed");

    let events = reporter.events();
    assert!(events.contains(&HealthEvent::BootstrapStarting));
    assert!(events.contains(&HealthEvent::BootstrapSucceeded));
    assert!(daemon.registry().is_empty());
    assert_eq!(
        daemon.config().daemon_socket().unix_path().map(|path| path.as_std_path()),
        Some(loader.socket_path().as_path())
    );
}

#[rstest]
fn serve_answers_requests_until_shutdown() {
    let loader = TestConfigLoader::new();
    let reporter = Arc::new(RecordingHealthReporter::default());
    let daemon = bootstrap_with(&loader, reporter.clone(), ScriptEngineProvider::new())
        .expect("bootstrap should succeed");
    let handle = daemon.serve().expect("listener should start");

    let client = EvalClient::new(loader.socket_path());
    assert_eq!(client.evaluate("k", "let x = 2;", 1_000).expect("declare"), "");
    assert_eq!(client.evaluate("k", "x * 21;", 1_000).expect("evaluate"), "42\n");
    assert_eq!(daemon.registry().len(), 1);

    handle.shutdown();
    handle.join().expect("join listener");
    assert!(
        !loader.socket_path().exists(),
        "socket file should be removed after shutdown"
    );
    assert!(reporter.events().contains(&HealthEvent::ListenerStarted(
        daemon.config().daemon_socket().clone()
    )));
}

#[rstest]
fn serve_reports_listener_failures() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("occupied");
    fs::write(&path, b"not a socket").expect("write placeholder");
    let config = Config {
        daemon_socket: SocketEndpoint::unix(path.to_str().expect("utf8 path").to_owned()),
        ..Config::default()
    };
    let reporter = Arc::new(RecordingHealthReporter::default());
    let daemon = bootstrap_with(
        &StaticConfigLoader::new(config),
        reporter.clone(),
        ScriptEngineProvider::new(),
    )
    .expect("bootstrap should succeed");

    let error = daemon.serve().expect_err("listener should fail");
    assert!(matches!(error, ListenerError::UnixNotSocket { .. }));
    assert!(
        reporter
            .events()
            .iter()
            .any(|event| matches!(event, HealthEvent::ListenerFailed(_)))
    );
}

#[rstest]
fn launch_surfaces_bootstrap_failures() {
    let reporter = Arc::new(RecordingHealthReporter::default());
    let error = run_daemon_with(&FailingConfigLoader, reporter, ScriptEngineProvider::new())
        .expect_err("launch should fail");
    assert!(matches!(error, LaunchError::Bootstrap { .. }));
}

#[rstest]
fn launch_surfaces_listener_failures() {
    let reporter = Arc::new(RecordingHealthReporter::default());
    let config = Config {
        daemon_socket: SocketEndpoint::inherited(i32::MAX),
        ..Config::default()
    };
    let error = run_daemon_with(
        &StaticConfigLoader::new(config),
        reporter,
        ScriptEngineProvider::new(),
    )
    .expect_err("launch should fail");
    assert!(matches!(
        error,
        LaunchError::Listener {
            source: ListenerError::InvalidDescriptor { .. }
        }
    ));
}
