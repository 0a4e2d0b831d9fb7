use clap::Parser;
use momtrader::cli::{log_filter, run, Cli};
use tracing_subscriber::EnvFilter;

fn main() -> std::process::ExitCode {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(&directives))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    run(Cli::parse())
}
