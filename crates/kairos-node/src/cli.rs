//! CLI argument parsing for the kairos node

use clap::{Parser, ValueEnum};
use kairos_types::ChainId;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines
    Pretty,
    /// One JSON object per line
    Json,
}

/// Kairos scheduled user operation relay
#[derive(Parser, Debug, Clone)]
#[command(name = "kairos")]
#[command(about = "Executes ERC-4337 user operations once their validity window opens")]
#[command(version)]
pub struct Cli {
    /// TOML config file; command line flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Data directory for the operation store
    #[arg(long)]
    pub datadir: Option<PathBuf>,

    /// HTTP listen address
    #[arg(long)]
    pub listen_addr: Option<SocketAddr>,

    /// Bundler endpoint for a chain, as CHAIN=URL (repeatable)
    #[arg(long = "bundler-url", value_parser = parse_bundler_url)]
    pub bundler_urls: Vec<(ChainId, String)>,

    /// Keep operations in memory only
    #[arg(long)]
    pub memory_store: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Log format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

fn parse_bundler_url(s: &str) -> Result<(ChainId, String), String> {
    let (chain, url) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CHAIN=URL, got {s:?}"))?;
    let chain = chain.trim().parse::<ChainId>().map_err(|e| e.to_string())?;
    let url = url.trim();
    if url.is_empty() {
        return Err(format!("empty bundler URL for {chain}"));
    }
    Ok((chain, url.to_string()))
}
