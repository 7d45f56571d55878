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
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Content-type prefixes accepted for upload.
    pub allowed_types: Vec<String>,
    /// Maximum multipart body size in bytes.
    pub max_upload_size: usize,
}

/// Service-discovery registration. Disabled when `url` is unset.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RegistryConfig {
    pub url: Option<String>,
    pub app_name: String,
    pub hostname: String,
    pub ip_addr: String,
    pub heartbeat_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub registry: RegistryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.max_connections", 100)?
            .set_default("database.min_connections", 5)?
            .set_default("storage.allowed_types", vec!["image/", "video/"])?
            .set_default("storage.max_upload_size", 128 * 1024 * 1024)?
            .set_default("registry.app_name", "blob-store")?
            .set_default("registry.hostname", "localhost")?
            .set_default("registry.ip_addr", "127.0.0.1")?
            .set_default("registry.heartbeat_secs", 30)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., BLOBSTORE__DATABASE__URL)
            .add_source(Environment::with_prefix("BLOBSTORE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
