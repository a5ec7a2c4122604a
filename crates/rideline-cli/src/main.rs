//! # rideline
//!
//! Command line tool for the rideline driver platform core.
//!
//! This binary provides:
//! - Fare quotes from the configured day/night rates
//! - Tracking mode resolution for a driver state
//! - Configuration validation and initialization
//!
//! ## Running
//!
//! ```bash
//! # Price a 10 km ride with 8 minutes of waiting at 10:00
//! rideline fare --distance-km 10 --wait-minutes 8 --at 10:00
//!
//! # Which tracking mode applies to an invisible driver on a ride?
//! rideline tracking --online --invisible --ride-id ride-123
//!
//! # Validate /etc/rideline/config.toml
//! rideline check-config
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use chrono::Utc;
use clap::Parser;
use rideline_cli::{cli, logging};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    logging::init(args.env.is_production())?;

    let output = cli::run(&args, Utc::now())?;
    println!("{output}");

    Ok(())
}
