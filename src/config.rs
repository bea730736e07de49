use anyhow::Context;
use serde::Deserialize;

/// Upper bound for `JWT_TTL_MINUTES`: one year.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub leeway_secs: u64,
    /// Goes into the `kid` header. Bumping it invalidates every outstanding token.
    pub key_version: String,
}

impl JwtConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.secret.is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }
        if !(1..=MAX_TTL_MINUTES).contains(&self.ttl_minutes) {
            anyhow::bail!(
                "JWT_TTL_MINUTES must be between 1 and {MAX_TTL_MINUTES}, got {}",
                self.ttl_minutes
            );
        }
        Ok(())
    }
}

/// Argon2 work factor.
#[derive(Debug, Clone, Deserialize)]
pub struct HashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("unknown STORE_BACKEND {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub hash: HashConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = match std::env::var("STORE_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => StoreBackend::Postgres,
        };
        let database_url = std::env::var("DATABASE_URL").ok();
        if store == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required when STORE_BACKEND=postgres");
        }

        let secret = std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?;

        let jwt = JwtConfig {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "gatekeep".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "gatekeep-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
            leeway_secs: env_parse("JWT_LEEWAY_SECS").unwrap_or(30),
            key_version: std::env::var("JWT_KEY_VERSION").unwrap_or_else(|_| "v1".into()),
        };
        jwt.validate()?;

        let defaults = HashConfig::default();
        let hash = HashConfig {
            memory_kib: env_parse("ARGON2_MEMORY_KIB").unwrap_or(defaults.memory_kib),
            iterations: env_parse("ARGON2_ITERATIONS").unwrap_or(defaults.iterations),
            parallelism: env_parse("ARGON2_PARALLELISM").unwrap_or(defaults.parallelism),
        };

        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT").unwrap_or(8010),
            store,
            database_url,
            jwt,
            hash,
        })
    }

    /// Fixed configuration for tests: memory store and the cheapest valid argon2 parameters.
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            store: StoreBackend::Memory,
            database_url: None,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
                leeway_secs: 0,
                key_version: "v1".into(),
            },
            hash: HashConfig {
                memory_kib: argon2::Params::MIN_M_COST,
                iterations: 1,
                parallelism: 1,
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
