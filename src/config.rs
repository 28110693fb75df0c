use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Which [`CompanyRepository`](crate::CompanyRepository) adapter backs the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Mongo,
}

/// Service configuration, built once at startup and passed down.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Document database connection string
    #[serde(default = "default_mongo_url")]
    pub mongo_url: String,

    /// Database holding the `Company` collection
    #[serde(default = "default_mongo_db_name")]
    pub mongo_db_name: String,

    /// tracing filter directive, e.g. `info` or `company_catalog=debug`
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `host:port` the HTTP server binds to
    #[serde(default = "default_address")]
    pub address: String,

    /// Company file loaded at startup
    #[serde(default = "default_init_file")]
    pub init_file: PathBuf,

    /// encoding_rs label of the startup file
    #[serde(default = "default_init_file_charset")]
    pub init_file_charset: String,

    #[serde(default)]
    pub storage: StorageBackend,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum upload size in MB
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mongo_url: default_mongo_url(),
            mongo_db_name: default_mongo_db_name(),
            log_level: default_log_level(),
            address: default_address(),
            init_file: default_init_file(),
            init_file_charset: default_init_file_charset(),
            storage: StorageBackend::default(),
            timeout_secs: default_timeout_secs(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl Config {
    /// Load from an optional `catalog.{toml,yaml,json}` file, overridden by
    /// environment variables (`MONGO_URL`, `INIT_FILE`, ...).
    pub fn load() -> anyhow::Result<Self> {
        Self::load_with(config::Environment::default())
    }

    pub fn load_with(env: config::Environment) -> anyhow::Result<Self> {
        let config: Config = config::Config::builder()
            .add_source(config::File::with_name("catalog").required(false))
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.address.parse()?)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn max_upload_size(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }

    /// Resolve `init_file_charset`, failing on labels encoding_rs does not know.
    pub fn init_charset(&self) -> anyhow::Result<&'static encoding_rs::Encoding> {
        encoding_rs::Encoding::for_label(self.init_file_charset.as_bytes())
            .ok_or_else(|| anyhow::anyhow!("unknown charset label: {}", self.init_file_charset))
    }
}

fn default_mongo_url() -> String {
    "mongodb://localhost".to_string()
}

fn default_mongo_db_name() -> String {
    "dic".to_string()
}

fn default_log_level() -> String {
    "debug".to_string()
}

fn default_address() -> String {
    "127.0.0.1:8091".to_string()
}

fn default_init_file() -> PathBuf {
    PathBuf::from("resource/q1_catalog.csv")
}

fn default_init_file_charset() -> String {
    "utf-8".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_upload_mb() -> usize {
    10
}
