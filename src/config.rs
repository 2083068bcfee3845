use clap::Parser;
use std::time::Duration;
use thiserror::Error;

use crate::rate_limit::Limit;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

// CLI argument structure. Every flag can also come from the environment
// (or a .env file loaded before parsing).
#[derive(Parser, Debug, Clone)]
#[command(name = "summary-gateway")]
#[command(about = "Caching text summarization service backed by Gemini")]
pub struct Args {
    // Address to bind
    #[arg(long, env = "SUMMARY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    // Port to run the server on
    #[arg(short, long, env = "SUMMARY_PORT", default_value_t = 5001)]
    pub port: u16,

    // Provider API key, required
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-1.5-pro-latest")]
    pub model: String,

    #[arg(long, env = "GEMINI_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    // Provider request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    // Cache TTL in seconds
    #[arg(short, long, default_value_t = 3600)]
    pub cache_ttl: u64,

    // Max cached summaries
    #[arg(long, default_value_t = 10_000)]
    pub cache_capacity: usize,

    // Rate limits per caller
    #[arg(long, default_value_t = 10)]
    pub per_minute: u32,

    #[arg(long, default_value_t = 50)]
    pub per_hour: u32,

    #[arg(long, default_value_t = 200)]
    pub per_day: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set. Export it or put it in a .env file.")]
    MissingApiKey,
}

/// Validated runtime settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    pub limits: Vec<Limit>,
}

impl TryFrom<Args> for Config {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let api_key = args
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(Self {
            host: args.host,
            port: args.port,
            api_key,
            model: args.model,
            api_base: args.api_base,
            timeout: Duration::from_secs(args.timeout_secs),
            cache_ttl: Duration::from_secs(args.cache_ttl),
            cache_capacity: args.cache_capacity,
            limits: vec![
                Limit::per_minute(args.per_minute),
                Limit::per_hour(args.per_hour),
                Limit::per_day(args.per_day),
            ],
        })
    }
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
