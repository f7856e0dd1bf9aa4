use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match evald::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(target: "evald::process", %error, "daemon terminated");
            let mut stderr = io::stderr().lock();
            if writeln!(stderr, "evald: {error}").is_err() {
                return ExitCode::from(2);
            }
            ExitCode::FAILURE
        }
    }
}
