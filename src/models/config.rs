//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Outline retry/timeout/fallback schedule
    #[serde(default)]
    pub retry: RetryConfig,

    /// Checkpoint cadence and location
    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    /// Remote service endpoints
    #[serde(default)]
    pub endpoints: EndpointConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.term_concurrency == 0 {
            return Err(AppError::validation("crawler.term_concurrency must be > 0"));
        }
        if self.crawler.course_concurrency == 0 {
            return Err(AppError::validation(
                "crawler.course_concurrency must be > 0",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::validation("retry.max_attempts must be > 0"));
        }
        if self.retry.fallback_after == 0 || self.retry.fallback_after > self.retry.max_attempts {
            return Err(AppError::validation(
                "retry.fallback_after must be in 1..=retry.max_attempts",
            ));
        }
        if self.retry.timeout_floor_secs == 0
            || self.retry.timeout_floor_secs > self.retry.timeout_secs
        {
            return Err(AppError::validation(
                "retry.timeout_floor_secs must be in 1..=retry.timeout_secs",
            ));
        }
        if self.retry.fallback_min_graphemes == 0 {
            return Err(AppError::validation(
                "retry.fallback_min_graphemes must be > 0",
            ));
        }
        if self.checkpoint.save_every == 0 {
            return Err(AppError::validation("checkpoint.save_every must be > 0"));
        }
        if url::Url::parse(&self.endpoints.base_url).is_err() {
            return Err(AppError::validation("endpoints.base_url is not a valid URL"));
        }
        if self.endpoints.fallback_routes.is_empty() {
            return Err(AppError::validation("endpoints.fallback_routes is empty"));
        }
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Client-wide request timeout ceiling in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Pause between sub-resource requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Worker pool size for independent terms
    #[serde(default = "defaults::term_concurrency")]
    pub term_concurrency: usize,

    /// Courses processed in parallel within one term
    #[serde(default = "defaults::course_concurrency")]
    pub course_concurrency: usize,

    /// Skip TLS certificate verification (the service serves an incomplete
    /// chain)
    #[serde(default = "defaults::accept_invalid_certs")]
    pub accept_invalid_certs: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            term_concurrency: defaults::term_concurrency(),
            course_concurrency: defaults::course_concurrency(),
            accept_invalid_certs: defaults::accept_invalid_certs(),
        }
    }
}

/// Outline retry, timeout, and fallback schedule.
///
/// Defaults match the behavior observed against the live service; every
/// knob is tunable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per course before giving up
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,

    /// Failed attempts before the first fallback try
    #[serde(default = "defaults::fallback_after")]
    pub fallback_after: u32,

    /// Per-attempt timeout for the first attempt, in seconds
    #[serde(default = "defaults::attempt_timeout")]
    pub timeout_secs: u64,

    /// Timeout shrink per attempt, in seconds
    #[serde(default = "defaults::timeout_step")]
    pub timeout_step_secs: u64,

    /// Timeout never shrinks below this floor, in seconds
    #[serde(default = "defaults::timeout_floor")]
    pub timeout_floor_secs: u64,

    /// Base delay for exponential backoff between failed attempts
    #[serde(default = "defaults::backoff_base")]
    pub backoff_base_ms: u64,

    /// Backoff cap in milliseconds
    #[serde(default = "defaults::backoff_max")]
    pub backoff_max_ms: u64,

    /// Minimum grapheme count for fallback text to count as data
    #[serde(default = "defaults::fallback_min_graphemes")]
    pub fallback_min_graphemes: usize,

    /// Fallback text is truncated to this many graphemes
    #[serde(default = "defaults::fallback_max_graphemes")]
    pub fallback_max_graphemes: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
            fallback_after: defaults::fallback_after(),
            timeout_secs: defaults::attempt_timeout(),
            timeout_step_secs: defaults::timeout_step(),
            timeout_floor_secs: defaults::timeout_floor(),
            backoff_base_ms: defaults::backoff_base(),
            backoff_max_ms: defaults::backoff_max(),
            fallback_min_graphemes: defaults::fallback_min_graphemes(),
            fallback_max_graphemes: defaults::fallback_max_graphemes(),
        }
    }
}

/// Checkpoint cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Checkpoint is flushed every this many processed courses
    #[serde(default = "defaults::save_every")]
    pub save_every: usize,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            save_every: defaults::save_every(),
        }
    }
}

/// Remote service endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL of the timetable service
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Alternate document routes for the text fallback, tried in order
    #[serde(default = "defaults::fallback_routes")]
    pub fallback_routes: Vec<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            fallback_routes: defaults::fallback_routes(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        200
    }
    pub fn term_concurrency() -> usize {
        4
    }
    pub fn course_concurrency() -> usize {
        1
    }
    pub fn accept_invalid_certs() -> bool {
        true
    }

    // Retry defaults
    pub fn max_attempts() -> u32 {
        7
    }
    pub fn fallback_after() -> u32 {
        5
    }
    pub fn attempt_timeout() -> u64 {
        10
    }
    pub fn timeout_step() -> u64 {
        1
    }
    pub fn timeout_floor() -> u64 {
        5
    }
    pub fn backoff_base() -> u64 {
        500
    }
    pub fn backoff_max() -> u64 {
        8_000
    }
    pub fn fallback_min_graphemes() -> usize {
        100
    }
    pub fn fallback_max_graphemes() -> usize {
        1_000
    }

    // Checkpoint defaults
    pub fn save_every() -> usize {
        50
    }

    // Endpoint defaults
    pub fn base_url() -> String {
        "https://timetable.nycu.edu.tw/".into()
    }
    pub fn fallback_routes() -> Vec<String> {
        vec!["course/syllabus".into()]
    }
}
