//! Binary entrypoint for the `qtest` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    qtest::logging::init();

    // Recording is handled in commands::dispatch via QTEST_RECORD=<dir>.
    match qtest::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
