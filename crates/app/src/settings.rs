//! Handles settings for the application. Configuration is read from
//! `settings.toml` (or the file given with `--config`) and then overridden by
//! `DAIRY__*` environment variables, e.g. `DAIRY__AUTH__SECRET`.
//!
//! See `settings.toml` for an example.
use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "milk_dairy")]
#[command(about = "Milk dairy bookkeeping backend", long_about = None)]
pub struct Cli {
    /// Settings file, with or without the `.toml` extension
    #[arg(long, env = "DAIRY_CONFIG", default_value = "settings")]
    pub config: String,
}

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Server {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite {
        path: String,
    },
    Mysql {
        host: String,
        #[serde(default = "default_mysql_port")]
        port: u16,
        user: String,
        password: String,
        name: String,
    },
}

/// Connection pool knobs. Unset values keep the sea-orm defaults.
#[derive(Debug, Default, Deserialize)]
pub struct Pool {
    pub max_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Auth {
    pub secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

impl Auth {
    /// Token lifetime; rejects values that are not positive or do not fit a
    /// `chrono::Duration`.
    pub fn token_ttl(&self) -> Result<chrono::Duration, ConfigError> {
        chrono::Duration::try_hours(self.token_ttl_hours)
            .filter(|ttl| *ttl > chrono::Duration::zero())
            .ok_or_else(|| {
                ConfigError::Message(format!(
                    "auth.token_ttl_hours must be a positive number of hours, got {}",
                    self.token_ttl_hours
                ))
            })
    }
}

#[derive(Debug, Deserialize)]
pub struct Ledger {
    #[serde(default = "default_auto_post")]
    pub auto_post: bool,
}

impl Default for Ledger {
    fn default() -> Self {
        Self {
            auto_post: default_auto_post(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    #[serde(default)]
    pub server: Server,
    pub database: Database,
    #[serde(default)]
    pub pool: Pool,
    pub auth: Auth,
    #[serde(default)]
    pub ledger: Ledger,
}

impl Settings {
    pub fn new(cli: &Cli) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name(&cli.config).required(false))
            .add_source(Environment::with_prefix("DAIRY").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_token_ttl_hours() -> i64 {
    24
}

fn default_bcrypt_cost() -> u32 {
    engine::DEFAULT_BCRYPT_COST
}

fn default_auto_post() -> bool {
    true
}
