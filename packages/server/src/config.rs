use common::config::{BagAppConfig, StorageAppConfig};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

/// Activity stream settings.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct AuditConfig {
    /// Publish activity events at all. Default: true.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Fail the lifecycle operation when publishing fails. Default: false.
    #[serde(default)]
    pub strict: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strict: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageAppConfig,
    #[serde(default)]
    pub bag: BagAppConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("BAGIT_CONFIG").unwrap_or_else(|_| "config/config".into());
        Self::builder(&path)?.build()?.try_deserialize()
    }

    fn builder(
        path: &str,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.url", "sqlite://bagit.db?mode=rwc")?
            .set_default("storage.data_dir", "./data")?
            .set_default("bag.default_hash", "md5")?
            .set_default("audit.enabled", true)?
            .set_default("audit.strict", false)?
            // Load from config/config.toml unless BAGIT_CONFIG points elsewhere
            .add_source(File::with_name(path).required(false))
            // Override from environment (e.g., BAGIT__AUTH__JWT_SECRET)
            .add_source(
                Environment::with_prefix("BAGIT")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors.allow_origins")
                    .try_parsing(true),
            ))
    }
}
