use std::process::ExitCode;

mod cli;

use cli::Args;

fn main() -> ExitCode {
    cli::init_tracing();
    let args = Args::from_env();

    match cli::run(&args) {
        Ok(Some(report)) => {
            for file in &report.files {
                tracing::info!(path = %file.path.display(), rows = file.rows, "written");
            }
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:?}");
            ExitCode::FAILURE
        }
    }
}
