use minishop_core::SubjectMap;
use minishop_events::config::load_subject_map;
use minishop_events::{ChannelConfig, ConfigError, EnvSource, StoreConfig, TransportConfig};

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. A single `*` allows any origin.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// Upper bound on how long each background task may take to drain.
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// | Env Var                 | Default   |
    /// |-------------------------|-----------|
    /// | `HOST`                  | `0.0.0.0` |
    /// | `PORT`                  | `8083`    |
    /// | `CORS_ORIGINS`          | `*`       |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`      |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `5`       |
    pub fn load(env: &EnvSource<'_>) -> Result<Self, ConfigError> {
        let cors_origins = env
            .string("CORS_ORIGINS", "*")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: env.string("HOST", "0.0.0.0"),
            port: env.parse("PORT", 8083)?,
            cors_origins,
            request_timeout_secs: env.parse("REQUEST_TIMEOUT_SECS", 30)?,
            shutdown_timeout_secs: env.parse("SHUTDOWN_TIMEOUT_SECS", 5)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8083,
            cors_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
            shutdown_timeout_secs: 5,
        }
    }
}

/// Everything the service reads from the environment at startup.
///
/// Loaded once in `main` and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub server: ServerConfig,
    pub transport: TransportConfig,
    pub subjects: SubjectMap,
    pub store: StoreConfig,
    pub channels: ChannelConfig,
}

impl HubConfig {
    pub fn load(env: &EnvSource<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::load(env)?,
            transport: TransportConfig::load(env)?,
            subjects: load_subject_map(env),
            store: StoreConfig::load(env)?,
            channels: ChannelConfig::load(env)?,
        })
    }
}
