use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use log::{error, info, warn};

use skriptendruck::config::load_config;
use skriptendruck::logging::init_logging;
use skriptendruck::pipeline::{BatchRunner, TracingProgress};
use skriptendruck::OrderStatus;

const CONFIG_ENV: &str = "SKRIPTENDRUCK_CONFIG";

const USAGE: &str = "\
Usage: skriptendruck [CONFIG]

Processes every PDF in the input directory once and exits.

The configuration file is taken from CONFIG, then $SKRIPTENDRUCK_CONFIG,
then <config dir>/skriptendruck/config.json. JSON and YAML are accepted.";

fn config_path() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .or_else(|| dirs::config_dir().map(|dir| dir.join("skriptendruck").join("config.json")))
}

fn main() -> ExitCode {
    if let Some(arg) = std::env::args().nth(1) {
        if arg == "-h" || arg == "--help" {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
    }

    let Some(path) = config_path() else {
        eprintln!("No configuration file given and no config directory found.\n\n{}", USAGE);
        return ExitCode::from(2);
    };

    let config = match load_config(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {}", path.display(), e);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        return ExitCode::from(2);
    }

    info!("Starting skriptendruck v{}", env!("CARGO_PKG_VERSION"));
    info!("Using configuration {}", path.display());

    let runner = match BatchRunner::from_config(&config) {
        Ok(runner) => runner.with_progress(Arc::new(TracingProgress)),
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(2);
        }
    };

    let shutdown = runner.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        shutdown.store(true, Ordering::Relaxed);
    }) {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }

    match runner.run() {
        Ok(report) => {
            let summary = &report.summary;
            for status in OrderStatus::ALL {
                let count = summary.count(status);
                if count > 0 {
                    info!("{:>26}: {}", status.as_str(), count);
                }
            }
            info!("Amount due for processed orders: {}", summary.revenue_formatted());

            if summary.interrupted {
                warn!(
                    "Interrupted: {} of {} orders left in the input directory",
                    summary.discovered - summary.finished,
                    summary.discovered
                );
                ExitCode::from(130)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("Batch aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}
