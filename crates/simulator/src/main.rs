//! CLI entry point: `simulator <config-file>`, exiting non-zero on any
//! config/metadata/PCB-build failure.

use std::path::Path;

use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

fn run(config_path: &Path) -> anyhow::Result<()> {
    info!(path = %config_path.display(), "starting simulation");
    sisim::simulate(config_path)?;
    Ok(())
}

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("No config file given.");
        std::process::exit(1);
    }
    let config_path = Path::new(&args[1]);

    match run(config_path) {
        Ok(()) => std::process::exit(0),
        Err(err) => {
            error!(%err, "simulation failed");
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
