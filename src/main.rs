mod cli;
mod config;
mod craft;
mod device;
mod error;
mod forward;
mod headers;

use std::process;

use clap::Parser;
use log::info;

use crate::cli::Args;
use crate::config::ReflectorConfig;
use crate::craft::reflect::Reflector;
use crate::device::open_transport;
use crate::error::Error;
use crate::forward::reflect_loop::FrameLoop;

// one frame in flight at a time: no need for more than one thread
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    let config = match ReflectorConfig::from_args(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(1);
        }
    };

    init_logging(config.verbose);

    if let Err(err) = run(&config).await {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

async fn run(config: &ReflectorConfig) -> Result<(), Error> {
    let transport = open_transport(config)?;
    info!(
        "Successfully connected to interface {} ({:?} mode)",
        config.interface, config.mode
    );

    let reflector = Reflector::new(config.mode, config.verbose);
    let mut frame_loop = FrameLoop::new(transport, reflector, config.verbose);
    let result = frame_loop.run().await;
    info!("Reflection stopped: {}", frame_loop.stats());
    result
}
