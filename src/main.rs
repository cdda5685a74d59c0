use std::process::ExitCode;

use clap::Parser;

fn main() -> ExitCode {
    // A missing .env is fine; it only supplies defaults such as HAA_SPLINES_CONFIG.
    let _ = dotenvy::dotenv();

    let cli = haa_splines::cli::Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match haa_splines::app::run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
