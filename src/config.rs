//! Server configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! environment variables (a `.env` file is honoured by the binary).

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{IonixError, Result};

const DEFAULT_CONFIG_FILE: &str = "ionix.yaml";
/// Longest session token lifetime accepted from configuration.
const MAX_TTL_DAYS: i64 = 3650;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind: SocketAddr,
    /// Path of the SQLite document store.
    pub database: PathBuf,
    /// Directory holding the built single-page app.
    pub static_dir: PathBuf,
    /// Origin allowed by CORS. `None` disables the CORS layer.
    pub cors_origin: Option<String>,
    /// Maximum request body size in bytes.
    pub body_limit: usize,
    pub jwt: JwtConfig,
    pub google: GoogleConfig,
    pub ai: AiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
            database: PathBuf::from("ionix.db"),
            static_dir: PathBuf::from("frontend/dist"),
            cors_origin: Some("http://localhost:5173".to_string()),
            body_limit: 50 * 1024 * 1024,
            jwt: JwtConfig::default(),
            google: GoogleConfig::default(),
            ai: AiConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub ttl_days: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: "ionix".to_string(),
            ttl_days: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// OAuth client id; ID tokens must carry it as their audience.
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from `ionix.yaml` when it exists,
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .parse()
                .map_err(|_| IonixError::Config(format!("invalid PORT: {}", port)))?;
            self.bind.set_port(port);
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.jwt.secret = secret;
        }
        if let Some(client_id) = lookup("GOOGLE_CLIENT_ID") {
            self.google.client_id = Some(client_id);
        }
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.ai.api_key = Some(key);
        }
        if let Some(database) = lookup("IONIX_DATABASE") {
            self.database = PathBuf::from(database);
        }
        if let Some(dir) = lookup("IONIX_STATIC_DIR") {
            self.static_dir = PathBuf::from(dir);
        }
        if let Some(origin) = lookup("IONIX_CORS_ORIGIN") {
            self.cors_origin = Some(origin).filter(|o| !o.is_empty());
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.jwt.secret.trim().is_empty() {
            return Err(IonixError::Config(
                "jwt.secret is empty; set JWT_SECRET".to_string(),
            ));
        }
        if !(1..=MAX_TTL_DAYS).contains(&self.jwt.ttl_days) {
            return Err(IonixError::Config(format!(
                "jwt.ttl_days must be between 1 and {}",
                MAX_TTL_DAYS
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bind.port(), 5000);
        assert_eq!(config.jwt.ttl_days, 30);
        assert_eq!(config.ai.model, "gemini-2.5-flash");
        assert_eq!(config.body_limit, 50 * 1024 * 1024);
    }

    #[test]
    fn test_yaml_overrides_defaults() {
        let config = Config::from_yaml(
            "bind: 127.0.0.1:8080\njwt:\n  secret: s3cret\n  ttl_days: 7\n",
        )
        .unwrap();
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.jwt.secret, "s3cret");
        assert_eq!(config.jwt.ttl_days, 7);
        assert_eq!(config.jwt.issuer, "ionix");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PORT", "6001"),
            ("JWT_SECRET", "from-env"),
            ("GOOGLE_CLIENT_ID", "client.apps.googleusercontent.com"),
            ("IONIX_CORS_ORIGIN", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.bind.port(), 6001);
        assert_eq!(config.jwt.secret, "from-env");
        assert_eq!(
            config.google.client_id.as_deref(),
            Some("client.apps.googleusercontent.com")
        );
        assert!(config.cors_origin.is_none());
    }

    #[test]
    fn test_invalid_port_rejected() {
        let mut config = Config::default();
        let result = config.apply_env(|k| (k == "PORT").then(|| "nope".to_string()));
        assert!(matches!(result, Err(IonixError::Config(_))));
    }

    #[test]
    fn test_validate_bounds_token_lifetime() {
        let config = Config::from_yaml("jwt:\n  secret: s\n  ttl_days: 1000000000\n").unwrap();
        assert!(matches!(config.validate(), Err(IonixError::Config(_))));

        let config = Config::from_yaml("jwt:\n  secret: s\n  ttl_days: 0\n").unwrap();
        assert!(config.validate().is_err());

        let config = Config::from_yaml("jwt:\n  secret: s\n  ttl_days: 3650\n").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_secret() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.jwt.secret = "x".to_string();
        assert!(config.validate().is_ok());
    }
}
