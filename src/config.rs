//! Configuration types.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Composer configuration.
#[derive(Debug, Clone)]
pub struct ComposerConfig {
    /// Managed remote procedure that performs generation (primary path).
    pub primary_url: String,
    /// Optional bearer token sent to the managed procedure.
    pub primary_token: Option<SecretString>,
    /// Base URL of the upstream chat-completion provider (fallback path).
    pub provider_url: String,
    /// API key for the upstream provider.
    pub provider_api_key: SecretString,
    /// Model requested on the fallback path.
    pub model: String,
    /// Fixed bound on the single primary attempt.
    pub primary_timeout: Duration,
    /// Request timeout for the fallback HTTP client.
    pub fallback_timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
    /// libSQL database file.
    pub db_path: String,
    /// Port for the REST surface.
    pub port: u16,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            primary_url: String::new(),
            primary_token: None,
            provider_url: "https://api.openai.com".to_string(),
            provider_api_key: SecretString::from(String::new()),
            model: "gpt-4o-mini".to_string(),
            primary_timeout: Duration::from_secs(30),
            fallback_timeout: Duration::from_secs(60),
            temperature: 0.8,
            max_tokens: 1024,
            db_path: "./data/composer.db".to_string(),
            port: 8080,
        }
    }
}

impl ComposerConfig {
    /// Build a configuration from `COMPOSER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup (env, test map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let primary_url = lookup("COMPOSER_PRIMARY_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("COMPOSER_PRIMARY_URL".to_string()))?;

        let provider_api_key = lookup("COMPOSER_PROVIDER_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .map(SecretString::from)
            .ok_or_else(|| {
                ConfigError::MissingEnvVar("COMPOSER_PROVIDER_API_KEY".to_string())
            })?;

        Ok(Self {
            primary_url,
            primary_token: lookup("COMPOSER_PRIMARY_TOKEN")
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from),
            provider_url: lookup("COMPOSER_PROVIDER_URL").unwrap_or(defaults.provider_url),
            provider_api_key,
            model: lookup("COMPOSER_MODEL").unwrap_or(defaults.model),
            primary_timeout: parse_secs(
                &lookup,
                "COMPOSER_PRIMARY_TIMEOUT_SECS",
                defaults.primary_timeout,
            )?,
            fallback_timeout: parse_secs(
                &lookup,
                "COMPOSER_FALLBACK_TIMEOUT_SECS",
                defaults.fallback_timeout,
            )?,
            temperature: defaults.temperature,
            max_tokens: defaults.max_tokens,
            db_path: lookup("COMPOSER_DB_PATH").unwrap_or(defaults.db_path),
            port: match lookup("COMPOSER_PORT") {
                Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                    key: "COMPOSER_PORT".to_string(),
                    message: format!("{raw:?}: {e}"),
                })?,
                None => defaults.port,
            },
        })
    }
}

fn parse_secs<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let secs: u64 = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("{raw:?}: {e}"),
    })?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "timeout must be at least one second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}
