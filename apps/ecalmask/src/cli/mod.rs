//! # ecalmask CLI Module
//!
//! This module implements the CLI interface for ecalmask.
//!
//! ## Available Commands
//!
//! - `channel` - Is a channel masked
//! - `tower` - Is a channel's tower masked
//! - `scan` - List masked positions of a module
//! - `import` - Convert a status sheet into a conditions payload
//! - `store-put` - Add a payload to a conditions store
//! - `store-list` - List the epochs of a conditions store
//! - `status` - Show the loaded conditions
//! - `hash` - BLAKE3 digest of the loaded conditions
//! - `serve` - Start the HTTP server

mod commands;

use crate::config::{AppConfig, DEFAULT_CONFIG_FILE};
use clap::{Args, Parser, Subcommand};
use ecalmask_core::MaskError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// ecalmask - ECAL channel and tower masking
///
/// Answers whether a crystal is masked by the status records of a
/// conditions epoch.
#[derive(Parser, Debug)]
#[command(name = "ecalmask")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: ecalmask.toml, if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Conditions payload file or redb store
    #[arg(short = 'C', long, global = true)]
    pub conditions: Option<PathBuf>,

    /// Run used to select an epoch from a store
    #[arg(short, long, global = true)]
    pub run: Option<u64>,

    /// Log resolver initialization
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Position and mask of a single query.
#[derive(Args, Debug, Clone)]
pub struct QueryArgs {
    /// Module number (supermodule or sector)
    #[arg(short, long)]
    pub module: i32,

    /// Local x coordinate
    #[arg(short = 'x', long)]
    pub ix: i32,

    /// Local y coordinate
    #[arg(short = 'y', long)]
    pub iy: i32,

    /// Status bits: decimal, 0x hex or comma-separated flag names
    #[arg(short, long)]
    pub bits: Option<String>,

    /// Subdetector (barrel, endcap, ...)
    #[arg(short, long, default_value = "barrel")]
    pub subdet: String,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Is a channel masked (own status or its tower's)
    Channel(QueryArgs),

    /// Is a channel's tower or super-crystal masked
    Tower(QueryArgs),

    /// List masked positions of a module
    Scan {
        /// Module number (supermodule or sector)
        #[arg(short, long)]
        module: i32,

        /// Status bits: decimal, 0x hex or comma-separated flag names
        #[arg(short, long)]
        bits: Option<String>,

        /// Subdetector (barrel or endcap)
        #[arg(short, long, default_value = "barrel")]
        subdet: String,

        /// Print at most this many positions
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Convert a status sheet (TOML or JSON) into a conditions payload
    Import {
        /// Status sheet
        #[arg(short, long)]
        input: PathBuf,

        /// Payload file to write
        #[arg(short, long)]
        output: PathBuf,

        /// Epoch id (overrides the sheet's own)
        #[arg(short, long)]
        epoch: Option<u64>,
    },

    /// Add a payload file to a conditions store
    StorePut {
        /// redb conditions store
        #[arg(short, long)]
        store: PathBuf,

        /// First run of the epoch
        #[arg(short, long)]
        first_run: u64,

        /// Payload file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// List the epochs of a conditions store
    StoreList {
        /// redb conditions store
        #[arg(short, long)]
        store: PathBuf,
    },

    /// Show the loaded conditions
    Status,

    /// Compute BLAKE3 digest of the loaded conditions
    Hash,

    /// Start HTTP server
    Serve {
        /// Host to bind to (default from config, then 127.0.0.1)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (default from config, then 8080)
        #[arg(short, long)]
        port: Option<u16>,

        /// Reload the store every SECS seconds (needs --run)
        #[arg(long, value_name = "SECS")]
        refresh: Option<u64>,
    },
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Effective settings: config file values overridden by flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub conditions: Option<PathBuf>,
    pub run: Option<u64>,
    pub default_bits: Option<String>,
    pub verbose: bool,
    pub json_mode: bool,
    pub config: AppConfig,
}

impl Settings {
    /// Merge `cli` flags over `config`.
    pub fn merge(cli: &Cli, config: AppConfig) -> Self {
        Self {
            conditions: cli.conditions.clone().or_else(|| config.conditions.clone()),
            run: cli.run.or(config.run),
            default_bits: config.default_bits.clone(),
            verbose: cli.verbose || config.verbose,
            json_mode: cli.json_mode,
            config,
        }
    }

    /// Bits given on the command line, else the configured default.
    pub fn bits(&self, given: Option<&str>) -> Result<u32, MaskError> {
        let text = given.or(self.default_bits.as_deref()).ok_or_else(|| {
            MaskError::ConfigError(
                "No status bits given (use --bits or set default_bits)".to_string(),
            )
        })?;
        ecalmask_core::parse_bits(text)
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), MaskError> {
    let config = match &cli.config {
        Some(path) => AppConfig::load(path, true)?,
        None => AppConfig::load(std::path::Path::new(DEFAULT_CONFIG_FILE), false)?,
    };
    let settings = Settings::merge(&cli, config);

    match cli.command {
        Some(Commands::Channel(args)) => cmd_channel(&settings, &args),
        Some(Commands::Tower(args)) => cmd_tower(&settings, &args),
        Some(Commands::Scan {
            module,
            bits,
            subdet,
            limit,
        }) => cmd_scan(&settings, module, bits.as_deref(), &subdet, limit),
        Some(Commands::Import {
            input,
            output,
            epoch,
        }) => cmd_import(&settings, &input, &output, epoch),
        Some(Commands::StorePut {
            store,
            first_run,
            input,
        }) => cmd_store_put(&settings, &store, first_run, &input),
        Some(Commands::StoreList { store }) => cmd_store_list(&settings, &store),
        Some(Commands::Status) => cmd_status(&settings),
        Some(Commands::Hash) => cmd_hash(&settings),
        Some(Commands::Serve {
            host,
            port,
            refresh,
        }) => cmd_serve(&settings, host, port, refresh).await,
        None => {
            // No subcommand - show status by default
            cmd_status(&settings)
        }
    }
}
