//! # Server Configuration
//!
//! [`ServerConfig`] is assembled from CLI flags with environment fallbacks:
//!
//! | Variable | Default |
//! | --- | --- |
//! | `LOSTFOUND_HOST` | `127.0.0.1` |
//! | `LOSTFOUND_PORT` | `8080` |
//! | `LOSTFOUND_API_KEY` | unset (admin routes disabled) |
//! | `LOSTFOUND_RATE_LIMIT` | `100` requests per second |
//! | `LOSTFOUND_PUBLIC_URL` | `http://127.0.0.1:8080` |
//! | `LOSTFOUND_CORS_ORIGINS` | unset (same-origin only) |

use std::net::SocketAddr;

pub const ENV_HOST: &str = "LOSTFOUND_HOST";
pub const ENV_PORT: &str = "LOSTFOUND_PORT";
pub const ENV_API_KEY: &str = "LOSTFOUND_API_KEY";
pub const ENV_RATE_LIMIT: &str = "LOSTFOUND_RATE_LIMIT";
pub const ENV_PUBLIC_URL: &str = "LOSTFOUND_PUBLIC_URL";
pub const ENV_CORS_ORIGINS: &str = "LOSTFOUND_CORS_ORIGINS";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Runtime settings of the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bearer token for `/api/admin/*`. `None` disables those routes.
    pub api_key: Option<String>,
    /// Requests per second across all clients.
    pub rate_limit: u32,
    /// Base of the links placed in share descriptors and notifications.
    pub public_url: String,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            api_key: None,
            rate_limit: DEFAULT_RATE_LIMIT,
            public_url: format!("http://{}:{}", DEFAULT_HOST, DEFAULT_PORT),
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Read the environment, then let explicit flags win.
    pub fn from_env(host: Option<String>, port: Option<u16>) -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok(), host, port)
    }

    /// Same as [`ServerConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        host: Option<String>,
        port: Option<u16>,
    ) -> Result<Self, String> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = host.or_else(|| var(ENV_HOST)).unwrap_or(defaults.host);
        let port = match port {
            Some(port) => port,
            None => match var(ENV_PORT) {
                Some(raw) => raw
                    .parse::<u16>()
                    .map_err(|e| format!("{} must be a port number: {}", ENV_PORT, e))?,
                None => defaults.port,
            },
        };
        let rate_limit = match var(ENV_RATE_LIMIT) {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| format!("{} must be a positive integer", ENV_RATE_LIMIT))?,
            None => defaults.rate_limit,
        };
        let public_url = var(ENV_PUBLIC_URL)
            .unwrap_or_else(|| format!("http://{}:{}", host, port))
            .trim_end_matches('/')
            .to_string();
        let cors_origins = var(ENV_CORS_ORIGINS)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            api_key: var(ENV_API_KEY),
            rate_limit,
            public_url,
            cors_origins,
        })
    }

    /// Socket address to bind.
    pub fn bind_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| format!("invalid bind address {}:{}: {}", self.host, self.port, e))
    }
}
