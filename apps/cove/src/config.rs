use std::env;
#[cfg(test)]
use std::sync::Mutex;

use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("server endpoint cannot be empty")]
    Empty,
    #[error("invalid server url: {0}")]
    Invalid(String),
    #[error("unsupported url scheme '{0}'; expected ws or wss")]
    Scheme(String),
}

pub const DEFAULT_SERVER: &str = "ws://127.0.0.1:8008";

/// Cove client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// The chat server endpoint (defaults to "ws://127.0.0.1:8008")
    pub server: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let server = env::var("COVE_SERVER").unwrap_or_else(|_| DEFAULT_SERVER.to_string());
        Self {
            server: normalize_host(server),
        }
    }

    /// Validated WebSocket URL for the configured endpoint. A bare
    /// `host:port` gets a scheme inferred: `ws://` for loopback hosts,
    /// `wss://` for everything else.
    pub fn server_url(&self) -> Result<Url, ConfigError> {
        let raw = self.server.trim();
        if raw.is_empty() {
            return Err(ConfigError::Empty);
        }
        let with_scheme = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("{}{raw}", infer_scheme(raw))
        };
        let url = Url::parse(&with_scheme).map_err(|err| ConfigError::Invalid(err.to_string()))?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(ConfigError::Scheme(other.to_string())),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
        }
    }
}

// Normalize localhost to IPv4 to avoid IPv6 (::1) preference on macOS
fn normalize_host(server: String) -> String {
    if server.starts_with("localhost") || server.contains("://localhost") {
        server.replacen("localhost", "127.0.0.1", 1)
    } else {
        server
    }
}

fn infer_scheme(host: &str) -> &'static str {
    if host.starts_with("localhost") || host.starts_with("127.0.0.1") {
        "ws://"
    } else {
        "wss://"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::LazyLock;

    // Mutex to ensure environment variable tests don't run in parallel
    static ENV_MUTEX: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server, "ws://127.0.0.1:8008");
    }

    #[test]
    fn test_config_from_env_default() {
        let _lock = ENV_MUTEX.lock().unwrap();

        unsafe {
            env::remove_var("COVE_SERVER");
        }
        let config = Config::from_env();
        assert_eq!(config.server, DEFAULT_SERVER);
    }

    #[test]
    fn test_config_from_env_custom() {
        let _lock = ENV_MUTEX.lock().unwrap();

        let original = env::var("COVE_SERVER").ok();

        unsafe {
            env::set_var("COVE_SERVER", "wss://chat.example.com");
        }
        let config = Config::from_env();
        assert_eq!(config.server, "wss://chat.example.com");

        unsafe {
            if let Some(orig) = original {
                env::set_var("COVE_SERVER", orig);
            } else {
                env::remove_var("COVE_SERVER");
            }
        }
    }

    #[test]
    fn localhost_is_normalized_to_ipv4() {
        assert_eq!(
            normalize_host("ws://localhost:8008".into()),
            "ws://127.0.0.1:8008"
        );
        assert_eq!(normalize_host("localhost:8008".into()), "127.0.0.1:8008");
    }

    #[test]
    fn bare_endpoints_get_a_scheme_inferred() {
        let local = Config {
            server: "127.0.0.1:8008".into(),
        };
        assert_eq!(local.server_url().unwrap().scheme(), "ws");

        let remote = Config {
            server: "chat.example.com:8008".into(),
        };
        assert_eq!(remote.server_url().unwrap().scheme(), "wss");
    }

    #[test]
    fn non_websocket_schemes_are_rejected() {
        let config = Config {
            server: "http://chat.example.com".into(),
        };
        assert!(matches!(config.server_url(), Err(ConfigError::Scheme(_))));
    }

    #[test]
    fn empty_endpoint_is_rejected() {
        let config = Config { server: "  ".into() };
        assert!(matches!(config.server_url(), Err(ConfigError::Empty)));
    }
}
