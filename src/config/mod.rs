use std::env;
use std::time::Duration;

/// Exponential backoff parameters used while polling for completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// First delay (default: 10 ms)
    pub initial_delay: Duration,

    /// Growth factor applied after every attempt (default: 4)
    pub factor: u32,

    /// Ceiling for a single delay (default: 1 s)
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(10),
            factor: 4,
            max_delay: Duration::from_secs(1),
        }
    }
}

/// Client configuration for talking to the upload coordinator
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    /// Coordinator URL, resolved against the default origin (default: none)
    pub url: Option<String>,

    /// Client package identifier sent with every request (default: "rust-file-uploader")
    pub package: String,

    /// Completion polling backoff
    pub poll_backoff: BackoffPolicy,

    /// Per-request timeout for coordinator, polling and storage requests;
    /// `None` leaves them unbounded (default: none)
    pub request_timeout: Option<Duration>,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            url: None,
            package: env!("CARGO_PKG_NAME").to_string(),
            poll_backoff: BackoffPolicy::default(),
            request_timeout: None,
        }
    }
}

impl UploaderConfig {
    pub fn new(url: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            package: package.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();
        let backoff = default.poll_backoff;

        Self {
            url: env::var("UPLOADER_URL").ok().or(default.url),

            package: env::var("UPLOADER_PACKAGE").unwrap_or(default.package),

            poll_backoff: BackoffPolicy {
                initial_delay: env::var("UPLOADER_POLL_INITIAL_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_millis)
                    .unwrap_or(backoff.initial_delay),

                factor: env::var("UPLOADER_POLL_FACTOR")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .filter(|f: &u32| *f >= 2)
                    .unwrap_or(backoff.factor),

                max_delay: env::var("UPLOADER_POLL_MAX_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_millis)
                    .unwrap_or(backoff.max_delay),
            },

            request_timeout: env::var("UPLOADER_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .or(default.request_timeout),
        }
    }

    /// Create config for local development (fast polling, short timeouts)
    pub fn development() -> Self {
        Self {
            url: Some(format!(
                "{}{}",
                crate::constants::DEFAULT_ORIGIN,
                crate::constants::DEFAULT_API_PATH
            )),
            package: env!("CARGO_PKG_NAME").to_string(),
            poll_backoff: BackoffPolicy {
                initial_delay: Duration::from_millis(1),
                factor: 2,
                max_delay: Duration::from_millis(100),
            },
            request_timeout: Some(Duration::from_secs(30)),
        }
    }

    pub fn with_poll_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.poll_backoff = backoff;
        self
    }
}
