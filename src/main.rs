//! lk - latchkey command-line entry point

use std::process::ExitCode;

fn main() -> ExitCode {
    match latchkey::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            latchkey::ui::output::error(format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
