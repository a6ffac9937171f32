//! Command line entry point for labhal
//!
//! Send one request to an instrument and print what it answers:
//! ```bash
//! labhal send "*IDN?" --port /dev/ttyUSB0 --expect "^(\S+),(\S+)"
//! ```
//!
//! Try a request without hardware against a simulated echo port:
//! ```bash
//! labhal loopback "PING"
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use labhal::{
    default_config_path, init_logging, CommunicationPort, Config, SerialLink, SimulatedLink,
    BUILD_DATE, VERSION,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "labhal")]
#[command(about = "Talk to lab instruments over serial links", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one request over the configured serial port and print the reply
    Send {
        /// Request text; the configured line ending is appended
        text: String,

        /// Configuration file (.toml or .json)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Serial port, overriding the configuration
        #[arg(long)]
        port: Option<String>,

        /// Baud rate, overriding the configuration
        #[arg(long)]
        baud: Option<u32>,

        /// Pattern the reply must match; its groups are printed
        #[arg(long, default_value = "(.*)")]
        expect: String,

        /// Pattern identifying an error reply
        #[arg(long)]
        alternate: Option<String>,
    },

    /// Run a request against a simulated echo port
    Loopback {
        /// Request text
        text: String,

        /// Pattern the echoed reply must match
        #[arg(long, default_value = "(.+)")]
        expect: String,
    },

    /// Write a configuration file with default values
    InitConfig {
        /// Destination (.toml or .json); the user configuration directory if omitted
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_logging()?;
    tracing::debug!("labhal {} (built {})", VERSION, BUILD_DATE);

    let cli = Cli::parse();
    match cli.command {
        Commands::Send {
            text,
            config,
            port,
            baud,
            expect,
            alternate,
        } => {
            let mut config = match config {
                Some(path) => Config::load_from_file(&path)
                    .with_context(|| format!("Failed to load {}", path.display()))?,
                None => Config::load_or_default(&default_config_path()?)?,
            };
            if let Some(port) = port {
                config.transport.port = port;
            }
            if let Some(baud) = baud {
                config.transport.baud_rate = baud;
            }
            config.validate()?;
            if config.transport.port.is_empty() {
                bail!("No serial port configured; pass --port or set transport.port");
            }

            let port = CommunicationPort::new(SerialLink::new(config.transport.clone()));
            port.open()?;
            let request = format!("{}{}", text, config.line_ending);
            let groups = port.transact_groups(&request, &expect, alternate.as_deref());
            port.close()?;
            print_groups(&groups?);
        }
        Commands::Loopback { text, expect } => {
            let port = CommunicationPort::new(SimulatedLink::echo_text());
            port.open()?;
            let groups = port.transact_groups(&format!("{text}\n"), &expect, None)?;
            print_groups(&groups);
        }
        Commands::InitConfig { file } => {
            let path = match file {
                Some(path) => path,
                None => default_config_path()?,
            };
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            Config::default().save_to_file(&path)?;
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}

fn print_groups(groups: &[Option<String>]) {
    for group in groups {
        println!("{}", group.as_deref().unwrap_or("-"));
    }
}
