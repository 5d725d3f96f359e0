use std::env;
use std::time::Duration;

/// Plan engine endpoint configuration.
///
/// Reads from the `FAHRPLAN_ENGINE_URL` environment variable, falling back
/// to `http://localhost:8000` when unset.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Base URL of the plan engine HTTP API.
    pub base_url: String,
    /// Per-request timeout. Retry policy belongs to the caller, not here.
    pub timeout: Duration,
}

impl EngineConfig {
    /// The default engine URL used when no environment variable is set.
    pub const DEFAULT_URL: &str = "http://localhost:8000";

    /// Default per-request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Build a config from the environment.
    ///
    /// Priority: `FAHRPLAN_ENGINE_URL` env var, then the compile-time default.
    pub fn from_env() -> Self {
        let base_url =
            env::var("FAHRPLAN_ENGINE_URL").unwrap_or_else(|_| Self::DEFAULT_URL.to_owned());
        Self::new(base_url)
    }

    /// Build a config from an explicit URL (useful for tests and CLI flags).
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        // Normalize: route building joins with a leading slash.
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
