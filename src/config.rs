use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub redis: RedisConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_body_size: usize,  // in bytes
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Redis,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub sentinel_enabled: bool,
    pub sentinel_url: Option<String>,
}

impl RedisConfig {
    /// URL to connect to, honouring the sentinel switch.
    pub fn connection_url(&self) -> Result<&str, config::ConfigError> {
        if self.sentinel_enabled {
            self.sentinel_url
                .as_deref()
                .ok_or_else(|| config::ConfigError::NotFound("redis.sentinel_url".into()))
        } else {
            Ok(&self.url)
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_seconds: i64,
    pub bcrypt_cost: u32,
}

// bcrypt rejects costs outside this range
const BCRYPT_MIN_COST: u32 = 4;
const BCRYPT_MAX_COST: u32 = 31;

// one year
const MAX_TOKEN_TTL_SECONDS: i64 = 365 * 24 * 60 * 60;

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(config::ConfigError::Message("auth.jwt_secret must not be empty".into()));
        }
        if !(1..=MAX_TOKEN_TTL_SECONDS).contains(&self.auth.token_ttl_seconds) {
            return Err(config::ConfigError::Message(format!(
                "auth.token_ttl_seconds must be between 1 and {}",
                MAX_TOKEN_TTL_SECONDS
            )));
        }
        if !(BCRYPT_MIN_COST..=BCRYPT_MAX_COST).contains(&self.auth.bcrypt_cost) {
            return Err(config::ConfigError::Message(format!(
                "auth.bcrypt_cost must be between {} and {}",
                BCRYPT_MIN_COST, BCRYPT_MAX_COST
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            server: ServerConfig { host: "127.0.0.1".into(), port: 0, max_body_size: 1024 },
            storage: StorageConfig { backend: StorageBackend::Memory },
            redis: RedisConfig {
                url: "redis://127.0.0.1".into(),
                sentinel_enabled: false,
                sentinel_url: None,
            },
            auth: AuthConfig {
                jwt_secret: "secret".into(),
                token_ttl_seconds: 60,
                bcrypt_cost: 4,
            },
        }
    }

    #[test]
    fn test_validate_accepts_sample() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let mut config = sample();
        config.auth.jwt_secret = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_token_ttl() {
        let mut config = sample();
        config.auth.token_ttl_seconds = 0;
        assert!(config.validate().is_err());

        config.auth.token_ttl_seconds = MAX_TOKEN_TTL_SECONDS;
        assert!(config.validate().is_ok());

        config.auth.token_ttl_seconds = i64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sentinel_url_required_when_enabled() {
        let mut config = sample();
        config.redis.sentinel_enabled = true;
        assert!(config.redis.connection_url().is_err());

        config.redis.sentinel_url = Some("redis+sentinel://host".into());
        assert_eq!(config.redis.connection_url().unwrap(), "redis+sentinel://host");
    }
}
