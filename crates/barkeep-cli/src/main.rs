mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::serve::{Driver, ServeOptions};
use std::net::IpAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "barkeep",
    about = "Drink dispenser controller: plan recipes, drive pump relays, serve the HTTP API",
    version,
    propagate_version = true
)]
struct Cli {
    /// Configuration file (default: nearest barkeep.yaml walking upward)
    #[arg(long, global = true, env = "BARKEEP_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dispense worker and the HTTP API
    Serve {
        /// Port to listen on (0 = OS-assigned)
        #[arg(long, default_value = "5000")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        bind: IpAddr,

        /// Relay driver
        #[arg(long, value_enum, default_value = "dry-run")]
        driver: Driver,

        /// sysfs GPIO directory (sysfs driver only)
        #[arg(long, default_value = barkeep_core::actuator::SYSFS_GPIO_ROOT)]
        gpio_root: PathBuf,

        /// Relays switch on a HIGH level (most boards are active-low)
        #[arg(long)]
        active_high: bool,
    },

    /// List the recipes on the menu
    Menu,

    /// Show the seconds-per-unit rate in effect for each pump
    Calibration,

    /// Show the dispense plan for a recipe without running it
    Plan {
        /// Recipe id (text or number)
        recipe_id: String,
    },

    /// Validate the configuration file
    Check,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let config = root::resolve_config(cli.config.as_deref());

    let result = match cli.command {
        Commands::Serve {
            port,
            bind,
            driver,
            gpio_root,
            active_high,
        } => cmd::serve::run(
            &config,
            ServeOptions {
                port,
                bind,
                driver,
                gpio_root,
                active_low: !active_high,
            },
        ),
        Commands::Menu => cmd::menu::run(&config, cli.json),
        Commands::Calibration => cmd::calibration::run(&config, cli.json),
        Commands::Plan { recipe_id } => cmd::plan::run(&config, &recipe_id, cli.json),
        Commands::Check => cmd::check::run(&config, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
