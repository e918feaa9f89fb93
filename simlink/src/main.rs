//! # Simlink Binary
//!
//! `serve` hosts the bundled rolling sphere simulator over TCP, `run` drives
//! one session against a simulator and `vec` steps a pool of in-process
//! simulators through the vectorized executor.

mod app;

use anyhow::Result;
use clap::{Parser, Subcommand};
use simlink::config::AppConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "simlink", version, about = "Client runtime for remote simulators")]
struct Cli {
    /// JSON file with `connection` and `executor` sections.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Host a rolling sphere simulator.
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Answer this many describe probes with an empty description first.
        #[arg(long, default_value_t = 0)]
        describe_after: u32,
    },
    /// Connect one session and react with sampled actions.
    Run {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[arg(long, default_value_t = 1000)]
        steps: u64,
    },
    /// Step in-process simulators through the vectorized executor.
    Vec {
        #[arg(long, default_value_t = 4)]
        envs: usize,
        #[arg(long, default_value_t = 1000)]
        steps: u64,
        #[arg(long)]
        render_interval: Option<u32>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    match cli.command {
        Command::Serve { host, port, describe_after } => {
            app::serve(&config.with_overrides(host, port, None), describe_after)
        }
        Command::Run { host, port, steps } => app::run(config.with_overrides(host, port, None), steps),
        Command::Vec { envs, steps, render_interval } => {
            let config = config.with_overrides(None, None, render_interval);
            config.executor.validate()?;
            app::vec(&config, envs, steps)
        }
    }
}
