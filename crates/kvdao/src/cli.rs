//! Command line interface for inspecting and editing cache keys.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;

use kvdao::cache::{CacheRecord, RedisCache};
use kvdao::Config;
use kvdao_core::cache::ValueShape;

/// kvdao - inspect and edit cache keys
#[derive(Debug, Parser)]
#[command(name = "kvdao")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Redis connection URL (overrides REDIS_URL)
    #[arg(long, global = true)]
    pub redis_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Read and write cache keys
    Cache(CacheCommand),
}

#[derive(Debug, clap::Args)]
pub struct CacheCommand {
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Shape to decode a stored value as.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Shape {
    Object,
    Sequence,
    Text,
}

impl From<Shape> for ValueShape {
    fn from(shape: Shape) -> Self {
        match shape {
            Shape::Object => ValueShape::Object,
            Shape::Sequence => ValueShape::Sequence,
            Shape::Text => ValueShape::Text,
        }
    }
}

#[derive(Debug, clap::Subcommand)]
pub enum CacheAction {
    /// Print the value stored at a key
    Get {
        key: String,
        /// Expected shape of the value
        #[arg(long, value_enum, default_value_t = Shape::Sequence)]
        shape: Shape,
    },

    /// Store a value; JSON input is stored as JSON, anything else as text
    Set {
        key: String,
        value: String,
        /// Expiry in seconds (defaults to CACHE_TTL_SECONDS)
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// Delete a key
    Del { key: String },

    /// Print the type of a key
    Type { key: String },

    /// Prepend values to a list
    Lpush {
        key: String,
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Append values to a list
    Rpush {
        key: String,
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Remove and print the first element of a list
    Lpop { key: String },

    /// Remove and print the last element of a list
    Rpop { key: String },

    /// Print list elements between two inclusive indexes
    Lrange {
        key: String,
        #[arg(default_value = "0", allow_hyphen_values = true)]
        start: isize,
        #[arg(default_value = "-1", allow_hyphen_values = true)]
        stop: isize,
    },

    /// Print the length of a list
    Llen { key: String },

    /// Remove occurrences of a value from a list
    Lrem {
        key: String,
        value: String,
        /// Occurrences to remove: >0 from the head, <0 from the tail, 0 for all
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        count: isize,
    },
}

impl CacheAction {
    fn key(&self) -> &str {
        match self {
            Self::Get { key, .. }
            | Self::Set { key, .. }
            | Self::Del { key }
            | Self::Type { key }
            | Self::Lpush { key, .. }
            | Self::Rpush { key, .. }
            | Self::Lpop { key }
            | Self::Rpop { key }
            | Self::Lrange { key, .. }
            | Self::Llen { key }
            | Self::Lrem { key, .. } => key,
        }
    }
}

/// Parses `input` as JSON, falling back to a plain string.
fn parse_value(input: String) -> Value {
    serde_json::from_str(&input).unwrap_or(Value::String(input))
}

/// Run the cache command.
pub async fn run_cache(cmd: CacheCommand, redis_url: &str, config: &Config) -> Result<()> {
    let client = RedisCache::new(redis_url)
        .await
        .with_context(|| format!("Failed to connect to {redis_url}"))?;
    let record = CacheRecord::new(Arc::new(client), cmd.action.key())?
        .with_default_ttl(config.cache_ttl());

    match cmd.action {
        CacheAction::Get { shape, .. } => {
            match record.try_fetch(Some(shape.into())).await? {
                Some(Value::String(text)) => println!("{text}"),
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => anyhow::bail!("Key {} not found", record.key()),
            }
        }
        CacheAction::Set { value, ttl, .. } => {
            record
                .try_store(&parse_value(value), ttl.map(Duration::from_secs))
                .await?;
            println!("OK");
        }
        CacheAction::Del { .. } => {
            record.try_remove().await?;
            println!("OK");
        }
        CacheAction::Type { .. } => println!("{}", record.key_type().await?),
        CacheAction::Lpush { values, .. } => println!("{}", record.push_left(values).await?),
        CacheAction::Rpush { values, .. } => println!("{}", record.push_right(values).await?),
        CacheAction::Lpop { .. } => print_popped(record.pop_left().await?),
        CacheAction::Rpop { .. } => print_popped(record.pop_right().await?),
        CacheAction::Lrange { start, stop, .. } => {
            for element in record.range(start, stop).await? {
                println!("{element}");
            }
        }
        CacheAction::Llen { .. } => println!("{}", record.length().await?),
        CacheAction::Lrem { value, count, .. } => {
            println!("{}", record.remove_value(count, value).await?)
        }
    }

    Ok(())
}

fn print_popped(popped: Option<String>) {
    match popped {
        Some(element) => println!("{element}"),
        None => println!("(nil)"),
    }
}
