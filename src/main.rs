use clap::Parser;
use log::{error, info};
use marathon_session::configuration::{Config, ConfigOverrides};
use marathon_session::controller::{Command, Controller};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "marathon-session")]
#[command(version = "0.1.0")]
#[command(about = "Marathon Hub sign-in and session client")]
struct Args {
    /// Optional TOML configuration file
    #[arg(short, long, env = "MARATHON_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // https://docs.rs/env_logger/latest/env_logger/
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path).unwrap_or_else(|e| {
            error!("Unable to import configuration from file: {}", e);
            std::process::exit(1);
        }),
        None => {
            info!("No configuration file given, using defaults");
            Config::default()
        }
    }
    .apply_overrides(&args.overrides);

    let controller = Controller::new(config).unwrap_or_else(|e| {
        error!("Unable to create a controller instance: {}, exiting...", e);
        std::process::exit(1);
    });

    let result = controller.run(args.command).await;
    controller.shutdown();

    match result {
        Ok(summary) => println!("{}", summary),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
