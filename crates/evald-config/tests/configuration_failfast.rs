use std::ffi::OsString;
use std::fs;
use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use rstest::rstest;
use tempfile::TempDir;

use evald_config::{Config, SocketEndpoint};

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

fn args(extra: &[&str]) -> Vec<OsString> {
    std::iter::once("evald")
        .chain(extra.iter().copied())
        .map(OsString::from)
        .collect()
}

fn config_file(dir: &TempDir, contents: &str) -> OsString {
    let path = dir.path().join("evald.toml");
    fs::write(&path, contents).expect("write config file");
    path.into_os_string()
}

/// Loads with `EVALD_LOG_FORMAT` set to `value`, restoring it afterwards.
fn load_with_log_format_env(value: &str) -> bool {
    const KEY: &str = "EVALD_LOG_FORMAT";
    let _guard = ENV_MUTEX.lock().unwrap_or_else(PoisonError::into_inner);
    let previous = std::env::var_os(KEY);
    // Edition 2024 marks environment mutation unsafe; the mutex serialises it.
    unsafe { std::env::set_var(KEY, value) };
    let loaded = Config::load_from_iter(args(&[])).is_ok();
    match previous {
        Some(previous) => unsafe { std::env::set_var(KEY, previous) },
        None => unsafe { std::env::remove_var(KEY) },
    }
    loaded
}

#[rstest]
#[case::negative_descriptor("fd://-1")]
#[case::non_numeric_descriptor("fd://three")]
#[case::missing_descriptor("fd://")]
#[case::missing_unix_path("unix://")]
#[case::tcp_endpoint("tcp://127.0.0.1:9000")]
fn invalid_socket_flags_are_rejected(#[case] socket: &str) {
    let result = Config::load_from_iter(args(&["--daemon-socket", socket]));
    assert!(result.is_err(), "{socket} should be rejected, got {result:?}");
}

#[test]
fn descriptor_flag_selects_an_inherited_socket() {
    let config =
        Config::load_from_iter(args(&["--daemon-socket", "fd://5"])).expect("load config");
    assert_eq!(config.daemon_socket(), &SocketEndpoint::inherited(5));
}

#[rstest]
#[case::tcp_transport(r#"daemon_socket = { transport = "tcp", host = "127.0.0.1" }"#)]
#[case::textual_descriptor(r#"daemon_socket = { transport = "inherited", fd = "three" }"#)]
#[case::unix_without_path(r#"daemon_socket = { transport = "unix" }"#)]
#[case::unknown_log_format(r#"log_format = "yaml""#)]
fn invalid_file_layers_are_rejected(#[case] contents: &str) {
    let dir = TempDir::new().expect("create temp dir");
    let path = config_file(&dir, contents);
    let mut cli = args(&["--config-path"]);
    cli.push(path);

    let result = Config::load_from_iter(cli);
    assert!(result.is_err(), "{contents} should be rejected, got {result:?}");
}

#[test]
fn unknown_log_format_in_the_environment_is_rejected() {
    assert!(!load_with_log_format_env("yaml"));
    assert!(load_with_log_format_env("compact"));
}
