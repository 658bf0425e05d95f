use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    pub images_path: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/pickarr.db".to_string(),
            log_level: "info".to_string(),
            images_path: "images".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            cors_allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Signing secret for access tokens. Must be overridden in production;
    /// see `PICKARR_ACCESS_SECRET`.
    pub access_token_secret: String,

    /// Signing secret for refresh tokens. Kept separate so a leaked access
    /// secret cannot mint refresh tokens.
    pub refresh_token_secret: String,

    pub access_token_minutes: i64,

    pub refresh_token_days: i64,

    /// Admin account seeded at startup when no such user exists.
    pub admin_username: String,

    pub admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_secret: "change-me-access".to_string(),
            refresh_token_secret: "change-me-refresh".to_string(),
            access_token_minutes: 30,
            refresh_token_days: 7,
            admin_username: "admin".to_string(),
            admin_password: "admin123".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    /// Lower values reduce memory usage but decrease GPU resistance.
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations) - higher = more CPU work
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                let mut config = Self::load_from_path(path)?;
                config.apply_env_overrides();
                return Ok(config);
            }
        }

        info!("No config file found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Environment variables win over the config file so deployments can
    /// inject secrets without writing them to disk.
    fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("PICKARR_ACCESS_SECRET") {
            self.auth.access_token_secret = secret;
        }
        if let Ok(secret) = std::env::var("PICKARR_REFRESH_SECRET") {
            self.auth.refresh_token_secret = secret;
        }
        if let Ok(password) = std::env::var("PICKARR_ADMIN_PASSWORD") {
            self.auth.admin_password = password;
        }
        if let Ok(path) = std::env::var("PICKARR_DATABASE_PATH") {
            self.general.database_path = path;
        }
        if let Ok(port) = std::env::var("PICKARR_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
        }
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("pickarr").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".pickarr").join("config.toml"));
        }

        paths
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.access_token_secret.is_empty() || self.auth.refresh_token_secret.is_empty() {
            anyhow::bail!("Token secrets cannot be empty");
        }

        if self.auth.access_token_secret == self.auth.refresh_token_secret {
            anyhow::bail!("Access and refresh token secrets must differ");
        }

        if self.auth.access_token_minutes <= 0 || self.auth.refresh_token_days <= 0 {
            anyhow::bail!("Token lifetimes must be positive");
        }

        Ok(())
    }
}
