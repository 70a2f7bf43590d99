//! Command-line interface parsing for stalecache
//!
//! Global options select the cache location, the generation and logging;
//! subcommands drive the interceptor, the generation sweep and the GitHub
//! browser.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use thiserror::Error;

use crate::cache::{DiskStorage, Generation, DEFAULT_CACHE_VERSION};
use crate::interceptor::InterceptorConfig;
use crate::telemetry::LogFormat;

/// Error types for CLI argument handling
#[derive(Debug, Error)]
pub enum CliError {
    /// No cache directory was given and none could be derived for this user
    #[error("Could not determine a cache directory. Pass --cache-dir")]
    NoCacheDir,

    /// A zero timeout would fail every request
    #[error("Invalid timeout: {0}s. Timeout must be at least 1 second")]
    InvalidTimeout(u64),

    /// The GitHub listing page size must be 1..=100
    #[error("Invalid page size: {0}. Must be between 1 and 100")]
    InvalidPageSize(u32),
}

/// stalecache - stale-while-revalidate HTTP cache
#[derive(Parser, Debug)]
#[command(name = "stalecache")]
#[command(about = "Serve HTTP requests from a generation-tagged cache and refresh it in the background")]
#[command(version)]
pub struct Cli {
    /// Directory holding the cache generations (defaults to the user cache dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub cache_dir: Option<PathBuf>,

    /// Keep the cache in memory only; nothing survives the process
    #[arg(long, global = true, conflicts_with = "cache_dir")]
    pub in_memory: bool,

    /// Cache generation version; bumping it invalidates every stored entry
    #[arg(
        long,
        global = true,
        env = "STALECACHE_VERSION",
        value_name = "N",
        default_value_t = DEFAULT_CACHE_VERSION
    )]
    pub cache_version: u32,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    /// Network timeout per request, in seconds
    #[arg(long, global = true, value_name = "SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch URLs through the cache and wait for their background refreshes
    Fetch {
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,

        /// Print response bodies instead of a summary line
        #[arg(long)]
        body: bool,
    },

    /// Print the stored response for a URL without touching the network
    Show {
        #[arg(value_name = "URL")]
        url: String,
    },

    /// List stored cache generations
    Generations,

    /// Activate the current generation, deleting all others
    Sweep,

    /// List a GitHub user's repositories
    Repos {
        user: String,

        #[arg(long, default_value_t = 30)]
        per_page: u32,

        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// List the contents of a directory in a GitHub repository
    Contents {
        owner: String,
        repo: String,

        /// Path inside the repository (defaults to the root)
        #[arg(default_value = "")]
        path: String,
    },
}

/// Where the cache lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageChoice {
    Memory,
    Disk(PathBuf),
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupConfig {
    pub interceptor: InterceptorConfig,
    pub storage: StorageChoice,
    pub timeout: Duration,
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with the resolved cache location
    /// * `Err(CliError)` if an option is out of range or no cache dir exists
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if cli.timeout_secs == 0 {
            return Err(CliError::InvalidTimeout(cli.timeout_secs));
        }
        if let Command::Repos { per_page, .. } = &cli.command {
            if !(1..=100).contains(per_page) {
                return Err(CliError::InvalidPageSize(*per_page));
            }
        }

        let storage = if cli.in_memory {
            StorageChoice::Memory
        } else {
            match &cli.cache_dir {
                Some(dir) => StorageChoice::Disk(dir.clone()),
                None => {
                    let disk = DiskStorage::new().ok_or(CliError::NoCacheDir)?;
                    StorageChoice::Disk(disk.root().to_path_buf())
                }
            }
        };

        Ok(StartupConfig {
            interceptor: InterceptorConfig::new(Generation::new(cli.cache_version)),
            storage,
            timeout: Duration::from_secs(cli.timeout_secs),
        })
    }
}
