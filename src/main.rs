use std::{path::PathBuf, process};

use clap::Parser;
use linebar::{
    config::Config,
    core::{modules::Modules, Engine},
    logger::LoggerManager,
    print_error,
};
use tracing::{debug, error, info};
use validator::Validate;

/// Concurrent status line generator for i3bar/swaybar.
///
/// Writes the i3bar JSON protocol to standard output; diagnostics go to
/// standard error.
#[derive(Debug, Parser)]
#[command(name = "linebar", version, about)]
struct Cli {
    /// Configuration file (default: $LINEBAR_CONFIG, then the XDG and /etc locations)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// List available modules and exit
    #[arg(short, long)]
    list: bool,

    /// Modules to show, in order. Replaces the configured module list.
    #[arg(value_name = "MODULE")]
    modules: Vec<String>,
}

fn log_modules_table(requested: Vec<&str>, available: Vec<&'static str>) {
    use std::collections::BTreeSet;

    let requested_set: BTreeSet<&str> = requested.into_iter().collect();
    let available_set: BTreeSet<&str> = available.into_iter().collect();

    let all_names: BTreeSet<&str> = requested_set
        .iter()
        .copied()
        .chain(available_set.iter().copied())
        .collect();

    let name_width = all_names
        .iter()
        .map(|s| s.len())
        .max()
        .unwrap_or(10)
        .max("Module".len());

    info!("{:<width$} | Status", "Module", width = name_width);
    info!("{}-+-{}", "-".repeat(name_width), "-".repeat(12));

    for name in all_names {
        let status = match (requested_set.contains(name), available_set.contains(name)) {
            (true, true) => "ACTIVE",
            // Requested but not compiled in; startup will fail below
            (true, false) => "ACTIVE (missing)",
            (false, true) => "INACTIVE",
            (false, false) => "UNKNOWN",
        };

        info!("{:<width$} | {}", name, status, width = name_width);
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.list {
        for name in Modules::list() {
            println!("{}", name);
        }
        return;
    }

    let mut cfg = Config::new(cli.config.as_deref()).unwrap_or_else(|e| {
        print_error!("{}", e);
        process::exit(1);
    });

    cfg.status.override_modules(&cli.modules);
    if let Err(e) = cfg.status.validate() {
        print_error!("Invalid module selection: {}", e);
        process::exit(1);
    }

    let logger_manager = LoggerManager::new(cfg.logger.clone()).unwrap_or_else(|e| {
        print_error!("Failed to setup Log Manager: {}", e);
        process::exit(1);
    });
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to init Log Manager: {}", e);
        process::exit(1);
    });
    info!("Starting linebar version {}...", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", cfg.logger.level);
    debug!("{:#?}", cfg.status);

    log_modules_table(cfg.status.module_names(), Modules::list());
    info!("{} modules available", Modules::count());

    let missing: Vec<&str> = cfg
        .status
        .module_names()
        .into_iter()
        .filter(|name| Modules::get(name).is_none())
        .collect();
    if !missing.is_empty() {
        error!(
            "Unknown modules: {}. Available modules: {}",
            missing.join(", "),
            Modules::list().join(", ")
        );
        process::exit(1);
    }

    let engine = Engine::from_config(&cfg.status).unwrap_or_else(|e| {
        error!("{}", e);
        process::exit(1);
    });

    info!("Modules: {}", engine.module_names().join(", "));

    if let Err(e) = engine.run(tokio::io::stdout()).await {
        error!("{}", e);
        process::exit(1);
    }
}
