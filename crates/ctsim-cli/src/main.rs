mod cli;
mod data;

use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(error) = cli::run_from_env() {
        eprintln!("ctsim: {error:#}");
        std::process::exit(1);
    }
}
