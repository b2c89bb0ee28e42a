//! Layered configuration: YAML file → profile YAML → `.env` → process
//! environment, the same resolution order and `${...}` secret-placeholder
//! convention used across the rest of the stack.

mod loader;
pub mod secrets;
pub mod value;

use std::collections::HashMap;
use std::path::Path;

pub use secrets::{DefaultSecretResolver, SecretResolver};
pub use value::{ConfigValue, FromConfigValue};

#[derive(Debug)]
pub enum ConfigError {
    NotFound(String),
    TypeMismatch { key: String, expected: &'static str },
    Load(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(key) => write!(f, "config key not found: {key}"),
            ConfigError::TypeMismatch { key, expected } => {
                write!(f, "config type mismatch for '{key}': expected {expected}")
            }
            ConfigError::Load(msg) => write!(f, "config load error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Raw key-value configuration, resolved from files/env but not yet typed.
#[derive(Debug, Clone)]
pub struct RawConfig {
    values: HashMap<String, ConfigValue>,
}

impl RawConfig {
    /// Resolution order (lowest to highest priority):
    /// 1. `conflux.yaml`
    /// 2. `conflux-{profile}.yaml`
    /// 3. `.env` (never overwrites an already-set process env var)
    /// 4. process environment (`CONFLUX_DB_URL` <-> `conflux.db.url`, or the
    ///    bare env keys named in the external interfaces, see below)
    pub fn load(profile: &str, resolver: &dyn SecretResolver) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        loader::load_yaml_file(Path::new("conflux.yaml"), &mut values)?;
        loader::load_yaml_file(Path::new(&format!("conflux-{profile}.yaml")), &mut values)?;

        let _ = dotenvy::dotenv();
        let _ = dotenvy::from_filename(format!(".env.{profile}"));

        resolve_string_values(&mut values, resolver)?;

        for (env_key, env_val) in std::env::vars() {
            let config_key = env_key.to_lowercase().replace('_', ".");
            values.insert(config_key, ConfigValue::String(env_val));
        }

        Ok(RawConfig { values })
    }

    pub fn get<V: FromConfigValue>(&self, key: &str) -> Result<V, ConfigError> {
        let value = self.values.get(key).ok_or_else(|| ConfigError::NotFound(key.to_string()))?;
        V::from_config_value(value, key)
    }

    pub fn get_or<V: FromConfigValue>(&self, key: &str, default: V) -> V {
        self.get(key).unwrap_or(default)
    }

    /// Plain environment-variable lookup, used for keys that aren't exposed
    /// through the dotted-key convention (e.g. `MAX_WORKERS`).
    pub fn env_or<V: std::str::FromStr>(key: &str, default: V) -> V {
        std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
    }
}

fn resolve_string_values(
    values: &mut HashMap<String, ConfigValue>,
    resolver: &dyn SecretResolver,
) -> Result<(), ConfigError> {
    let keys: Vec<String> = values.keys().cloned().collect();
    for key in keys {
        if let Some(ConfigValue::String(s)) = values.get(&key) {
            if s.contains("${") {
                let resolved = secrets::resolve_placeholders(s, resolver)?;
                values.insert(key, ConfigValue::String(resolved));
            }
        }
    }
    Ok(())
}

/// Typed configuration for the sync engine, covering exactly the
/// environment variables named in the external-interfaces section.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_workers: usize,
    pub stream_buffer: usize,
    pub token_refresh_skew_s: i64,
    pub http_rate_limit_per_sec: u32,
    pub http_max_retries: u32,
    pub db_url: String,
    pub credential_encryption_key: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: 20,
            stream_buffer: 256,
            token_refresh_skew_s: 300,
            http_rate_limit_per_sec: 10,
            http_max_retries: 5,
            db_url: "sqlite::memory:".to_string(),
            credential_encryption_key: None,
        }
    }
}

impl EngineConfig {
    /// Load from `conflux.yaml`/profile overrides/`.env`/process environment,
    /// falling back to [`EngineConfig::default`] for anything unset.
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        let raw = RawConfig::load(profile, &DefaultSecretResolver)?;
        let defaults = EngineConfig::default();
        Ok(EngineConfig {
            max_workers: RawConfig::env_or("MAX_WORKERS", defaults.max_workers),
            stream_buffer: RawConfig::env_or("STREAM_BUFFER", defaults.stream_buffer),
            token_refresh_skew_s: RawConfig::env_or(
                "TOKEN_REFRESH_SKEW_S",
                defaults.token_refresh_skew_s,
            ),
            http_rate_limit_per_sec: RawConfig::env_or(
                "HTTP_RATE_LIMIT_PER_SEC",
                defaults.http_rate_limit_per_sec,
            ),
            http_max_retries: RawConfig::env_or("HTTP_MAX_RETRIES", defaults.http_max_retries),
            db_url: std::env::var("DB_URL").unwrap_or(raw.get_or("conflux.db.url", defaults.db_url)),
            credential_encryption_key: std::env::var("CREDENTIAL_ENCRYPTION_KEY").ok(),
        })
    }
}
