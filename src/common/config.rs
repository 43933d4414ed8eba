use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5002/api";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    Keyring,
    File,
    Memory,
}

impl SessionBackend {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "keyring" => Some(SessionBackend::Keyring),
            "file" => Some(SessionBackend::File),
            "memory" => Some(SessionBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub session_backend: SessionBackend,
    pub keyring_fallback: bool,
    pub session_file: PathBuf,
    pub request_timeout: Option<Duration>,
    pub log_level: String,
    pub page_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_backend: SessionBackend::Keyring,
            keyring_fallback: false,
            session_file: PathBuf::from("data").join("session.json"),
            request_timeout: None,
            log_level: "info".to_string(),
            page_size: 10,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; malformed values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            api_url: lookup("API_URL")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.api_url),
            session_backend: lookup("SESSION_BACKEND")
                .and_then(|v| SessionBackend::parse(&v))
                .unwrap_or(defaults.session_backend),
            keyring_fallback: lookup("KEYRING_FALLBACK").map(|v| v == "true" || v == "1").unwrap_or(false),
            session_file: lookup("SESSION_FILE").map(PathBuf::from).unwrap_or(defaults.session_file),
            request_timeout: lookup("API_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            page_size: lookup("PAGE_SIZE")
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.page_size),
        }
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }
}
