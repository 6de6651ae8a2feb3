//! Configuration for the kairos node
//!
//! Values come from an optional TOML file, then command line overrides.
//! Every field has a default so an empty file is a valid config.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kairos_rpc::ServerConfig;
use kairos_scheduler::{RetryPolicy, SchedulerConfig};
use kairos_storage::{OperationStore, StorageError};
use kairos_types::ChainId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Cli;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`NodeConfig`]
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// No chain to poll
    #[error("no chains configured")]
    EmptyChains,

    /// A `bundlers` key is not a supported chain
    #[error("unknown chain in bundlers: {0}")]
    UnknownBundlerChain(String),

    /// A polled chain has no bundler endpoint
    #[error("no bundler URL configured for chain {0}")]
    MissingBundler(ChainId),

    /// A field that must be positive is zero
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// The store holds records for chains nobody polls
    #[error("store holds operations for chains that are not polled: {0:?}")]
    UnpolledChains(Vec<ChainId>),

    /// The store could not be inspected
    #[error("failed to inspect store: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for configuration
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Chains polled by the scheduler and accepted at intake
    pub chains: Vec<ChainId>,
    /// Lookahead of the due query, in seconds
    pub lookahead_secs: u64,
    /// Scheduler tick interval, in seconds
    pub tick_interval_secs: u64,
    /// Submission attempts per record per tick
    pub max_retries: u32,
    /// Delay between attempts, in milliseconds
    pub retry_delay_ms: u64,
    /// Concurrent executions within a tick
    pub max_concurrent_executions: usize,
    /// Bundler URL per chain, keyed by chain id or name
    pub bundlers: BTreeMap<String, String>,
    /// HTTP listen address
    pub listen_addr: SocketAddr,
    /// Operation store directory
    pub datadir: PathBuf,
    /// Gas-estimate deferred operations before saving them
    pub preflight_estimate: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            chains: ChainId::ALL.to_vec(),
            lookahead_secs: 30 * 60,
            tick_interval_secs: 60,
            max_retries: 3,
            retry_delay_ms: 5_000,
            max_concurrent_executions: 16,
            bundlers: BTreeMap::new(),
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            datadir: PathBuf::from("./data"),
            preflight_estimate: false,
        }
    }
}

impl NodeConfig {
    /// Load a config file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from TOML text
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply command line overrides
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(datadir) = &cli.datadir {
            self.datadir = datadir.clone();
        }
        if let Some(addr) = cli.listen_addr {
            self.listen_addr = addr;
        }
        for (chain, url) in &cli.bundler_urls {
            // drop any alias of the same chain so the override wins
            self.bundlers
                .retain(|key, _| key.parse::<ChainId>().ok() != Some(*chain));
            self.bundlers.insert(chain.id().to_string(), url.clone());
        }
    }

    /// Check the config is usable
    pub fn validate(&self) -> ConfigResult<()> {
        if self.chains.is_empty() {
            return Err(ConfigError::EmptyChains);
        }
        if self.max_retries == 0 {
            return Err(ConfigError::Zero("max_retries"));
        }
        if self.tick_interval_secs == 0 {
            return Err(ConfigError::Zero("tick_interval_secs"));
        }
        if self.max_concurrent_executions == 0 {
            return Err(ConfigError::Zero("max_concurrent_executions"));
        }
        let endpoints = self.bundler_endpoints()?;
        if let Some(chain) = self.chains.iter().find(|c| !endpoints.contains_key(c)) {
            return Err(ConfigError::MissingBundler(*chain));
        }
        Ok(())
    }

    /// Bundler endpoints keyed by chain
    pub fn bundler_endpoints(&self) -> ConfigResult<HashMap<ChainId, String>> {
        self.bundlers
            .iter()
            .map(|(key, url)| {
                let chain = key
                    .parse::<ChainId>()
                    .map_err(|_| ConfigError::UnknownBundlerChain(key.clone()))?;
                Ok((chain, url.clone()))
            })
            .collect()
    }

    /// Scheduler settings
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            chains: self.chains.clone(),
            lookahead: Duration::from_secs(self.lookahead_secs),
            tick_interval: Duration::from_secs(self.tick_interval_secs),
            max_concurrent_executions: self.max_concurrent_executions,
        }
    }

    /// Retry settings
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    /// HTTP server settings
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.listen_addr)
    }
}

/// Refuse to start when the store holds records no configured chain polls
pub async fn check_store_chains(
    store: &dyn OperationStore,
    chains: &[ChainId],
) -> ConfigResult<()> {
    let unpolled: Vec<ChainId> = store
        .chains_in_use()
        .await?
        .into_iter()
        .filter(|chain| !chains.contains(chain))
        .collect();
    if unpolled.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::UnpolledChains(unpolled))
    }
}
