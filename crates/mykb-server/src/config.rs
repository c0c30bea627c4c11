use mykb_auth::config::AuthConfig;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

/// Top-level `mykb.toml` layout. Every section may be omitted.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Operator credentials, token lifetimes and registration settings
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    /// Backing store for CSRF tokens, codes and bearer tokens
    pub redis: RedisConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        // Server validations
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        let base_url = self
            .server
            .base_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| String::from("server.base_url is required"))?;
        match url::Url::parse(base_url) {
            Ok(u) if matches!(u.scheme(), "http" | "https") && u.has_host() => {}
            _ => {
                return Err(format!(
                    "server.base_url must be an absolute http(s) URL: '{base_url}'"
                ));
            }
        }
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        // Storage validation
        if let Some(ref pg) = self.storage.postgres {
            if pg.url.is_empty() {
                return Err("storage.postgres.url must not be empty".into());
            }
            if pg.pool_size == 0 {
                return Err("storage.postgres.pool_size must be > 0".into());
            }
        }
        if self.redis.enabled && self.redis.pool_size == 0 {
            return Err("redis.pool_size must be > 0".into());
        }
        // Auth validation
        self.auth
            .validate()
            .map_err(|e| format!("auth config error: {e}"))?;
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    /// Returns the public base URL without a trailing slash.
    /// Falls back to http://{host}:{port} when unset.
    pub fn base_url(&self) -> String {
        self.server
            .base_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://{}:{}", self.server.host, self.server.port))
    }
}

/// HTTP listener and public URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL, used as the OAuth issuer and in every advertised
    /// endpoint.
    pub base_url: Option<String>,
    pub body_limit_bytes: usize,
    /// Take the client IP from `X-Forwarded-For` instead of the socket peer.
    pub behind_proxy: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
            base_url: None,
            body_limit_bytes: 1 << 20,
            behind_proxy: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// Durable client registry. Clients live in memory when absent.
    pub postgres: Option<PostgresStorageConfig>,
}

/// `[storage.postgres]`: `url` is required once the table is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresStorageConfig {
    /// e.g. `postgres://mykb:secret@db:5432/mykb`
    pub url: String,
    /// Upper bound on pooled connections.
    pub pool_size: u32,
    pub connect_timeout_ms: u64,
}

impl Default for PostgresStorageConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            pool_size: 10,
            connect_timeout_ms: 5000,
        }
    }
}

impl PostgresStorageConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

/// Shared ephemeral token store.
///
/// With Redis enabled, CSRF tokens, authorization codes and bearer tokens
/// survive restarts and are visible to every instance. Otherwise each
/// process keeps its own in-memory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub enabled: bool,
    pub url: String,
    pub pool_size: usize,
    /// Applies to pool wait, connection create and recycle.
    pub timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "redis://localhost:6379".into(),
            pool_size: 10,
            timeout_ms: 5000,
        }
    }
}

impl RedisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Default configuration file, relative to the working directory.
    pub const DEFAULT_CONFIG_PATH: &str = "mykb.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., MYKB__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("MYKB")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                base_url: Some("https://kb.example.com/".into()),
                ..ServerConfig::default()
            },
            auth: AuthConfig::with_password("secret"),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.server.body_limit_bytes, 1024 * 1024);
        assert!(!cfg.server.behind_proxy);
        assert!(cfg.storage.postgres.is_none());
        assert!(!cfg.redis.enabled);
        assert_eq!(cfg.redis.url, "redis://localhost:6379");
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_valid_config() {
        let cfg = valid();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.base_url(), "https://kb.example.com");
    }

    #[test]
    fn test_base_url_required() {
        let mut cfg = valid();
        cfg.server.base_url = None;
        assert!(cfg.validate().unwrap_err().contains("base_url is required"));

        cfg.server.base_url = Some("kb.example.com".into());
        assert!(cfg.validate().unwrap_err().contains("absolute http(s) URL"));

        cfg.server.base_url = Some("ftp://kb.example.com".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_port_and_unknown_level() {
        let mut cfg = valid();
        cfg.server.port = 0;
        assert!(cfg.validate().unwrap_err().contains("server.port"));

        let mut cfg = valid();
        cfg.logging.level = "loud".into();
        assert!(cfg.validate().unwrap_err().contains("logging.level"));
    }

    #[test]
    fn test_requires_operator_credentials() {
        let mut cfg = valid();
        cfg.auth = AuthConfig::default();
        assert!(cfg.validate().unwrap_err().contains("auth config error"));
    }

    #[test]
    fn test_addr_falls_back_to_unspecified() {
        let mut cfg = valid();
        cfg.server.host = "not-an-ip".into();
        cfg.server.port = 9000;
        assert_eq!(cfg.addr().to_string(), "0.0.0.0:9000");
    }
}
