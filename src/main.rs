use std::process::ExitCode;

use scenepack::{cli, ui::output};

fn main() -> ExitCode {
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(format_args!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}
