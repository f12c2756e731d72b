//! Run configuration: defaults, an optional RON file, then environment overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use harvester_core::{BackoffSettings, TerminationPolicy};
use harvester_engine::{FetchSettings, HarvestSettings, Paging};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("environment variable {name}={value:?} is not {expected}")]
    Env {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ExtractorKind {
    /// Anchors whose path contains `link_marker`.
    #[default]
    LinkPattern,
    /// JSON-LD item lists embedded in the page.
    StructuredData,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub min_wait_secs: f64,
    pub max_wait_secs: f64,
    pub fast_forward_min_secs: f64,
    pub fast_forward_max_secs: f64,
    pub server_overload_secs: f64,
    pub transient_error_secs: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_wait_secs: 5.0,
            max_wait_secs: 10.0,
            fast_forward_min_secs: 1.0,
            fast_forward_max_secs: 2.0,
            server_overload_secs: 10.0,
            transient_error_secs: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub connect_timeout_secs: f64,
    pub request_timeout_secs: f64,
    pub max_bytes: u64,
    pub user_agent: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10.0,
            request_timeout_secs: 30.0,
            max_bytes: 5 * 1024 * 1024,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub start_url: String,
    /// Query parameter carrying the page number for pages after the first.
    pub page_query: String,
    pub link_marker: String,
    pub extractor: ExtractorKind,
    pub checkpoint_path: PathBuf,
    pub output_path: PathBuf,
    pub log_file: PathBuf,
    pub max_steps: u64,
    pub max_consecutive_no_new: u32,
    pub max_attempts: u32,
    pub max_runtime_hours: f64,
    pub advance_timeout_secs: f64,
    pub progress_interval: u64,
    pub backoff: BackoffConfig,
    pub fetch: FetchConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            start_url: "https://www.thinkspain.com/property-for-sale".to_string(),
            page_query: "numpag".to_string(),
            link_marker: "/property-for-sale/".to_string(),
            extractor: ExtractorKind::LinkPattern,
            checkpoint_path: PathBuf::from("scraper_progress.json"),
            output_path: PathBuf::from("harvested_properties.json"),
            log_file: PathBuf::from("production_scraper.log"),
            max_steps: 15627,
            max_consecutive_no_new: 5,
            max_attempts: 3,
            max_runtime_hours: 12.0,
            advance_timeout_secs: 30.0,
            progress_interval: 10,
            backoff: BackoffConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl HarvestConfig {
    /// Defaults, overlaid with `path` when given, then with the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ron::from_str(&content).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup("MAX_CLICKS") {
            self.max_steps = parse_env("MAX_CLICKS", value, "a step count")?;
        }
        if let Some(value) = lookup("START_URL") {
            self.start_url = value;
        }
        if let Some(value) = lookup("OUTPUT_FILE") {
            self.output_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("PROGRESS_FILE") {
            self.checkpoint_path = PathBuf::from(value);
        }
        if let Some(value) = lookup("LOG_FILE") {
            self.log_file = PathBuf::from(value);
        }
        if let Some(value) = lookup("MAX_RUNTIME_HOURS") {
            self.max_runtime_hours = parse_env("MAX_RUNTIME_HOURS", value, "a number of hours")?;
        }
        if let Some(value) = lookup("MIN_WAIT_BETWEEN_CLICKS") {
            self.backoff.min_wait_secs =
                parse_env("MIN_WAIT_BETWEEN_CLICKS", value, "a number of seconds")?;
        }
        if let Some(value) = lookup("MAX_WAIT_BETWEEN_CLICKS") {
            self.backoff.max_wait_secs =
                parse_env("MAX_WAIT_BETWEEN_CLICKS", value, "a number of seconds")?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.paging()
            .page_url(1)
            .map_err(|err| invalid("start_url", err.message))?;
        if self.page_query.is_empty() {
            return Err(invalid("page_query", "must not be empty"));
        }
        if self.link_marker.is_empty() {
            return Err(invalid("link_marker", "must not be empty"));
        }
        if self.max_attempts == 0 {
            return Err(invalid("max_attempts", "must be at least 1"));
        }
        if self.max_consecutive_no_new == 0 {
            return Err(invalid("max_consecutive_no_new", "must be at least 1"));
        }
        // Surfaces negative or non-finite durations.
        self.harvest_settings()?;
        self.fetch_settings()?;
        let backoff = &self.backoff;
        if backoff.min_wait_secs > backoff.max_wait_secs {
            return Err(invalid(
                "backoff",
                format!(
                    "min_wait_secs {} exceeds max_wait_secs {}",
                    backoff.min_wait_secs, backoff.max_wait_secs
                ),
            ));
        }
        if backoff.fast_forward_min_secs > backoff.fast_forward_max_secs {
            return Err(invalid(
                "backoff",
                format!(
                    "fast_forward_min_secs {} exceeds fast_forward_max_secs {}",
                    backoff.fast_forward_min_secs, backoff.fast_forward_max_secs
                ),
            ));
        }
        Ok(())
    }

    pub fn harvest_settings(&self) -> Result<HarvestSettings, ConfigError> {
        let backoff = &self.backoff;
        Ok(HarvestSettings {
            policy: TerminationPolicy {
                max_steps: self.max_steps,
                max_consecutive_no_new: self.max_consecutive_no_new,
                max_runtime: secs("max_runtime_hours", self.max_runtime_hours * 3600.0)?,
            },
            backoff: BackoffSettings {
                normal_min: secs("backoff.min_wait_secs", backoff.min_wait_secs)?,
                normal_max: secs("backoff.max_wait_secs", backoff.max_wait_secs)?,
                fast_forward_min: secs(
                    "backoff.fast_forward_min_secs",
                    backoff.fast_forward_min_secs,
                )?,
                fast_forward_max: secs(
                    "backoff.fast_forward_max_secs",
                    backoff.fast_forward_max_secs,
                )?,
                server_overload: secs(
                    "backoff.server_overload_secs",
                    backoff.server_overload_secs,
                )?,
                transient_error: secs(
                    "backoff.transient_error_secs",
                    backoff.transient_error_secs,
                )?,
            },
            max_attempts: self.max_attempts,
            advance_timeout: secs("advance_timeout_secs", self.advance_timeout_secs)?,
            progress_interval: self.progress_interval,
        })
    }

    pub fn fetch_settings(&self) -> Result<FetchSettings, ConfigError> {
        Ok(FetchSettings {
            connect_timeout: secs("fetch.connect_timeout_secs", self.fetch.connect_timeout_secs)?,
            request_timeout: secs("fetch.request_timeout_secs", self.fetch.request_timeout_secs)?,
            max_bytes: self.fetch.max_bytes,
            user_agent: self.fetch.user_agent.clone(),
            ..FetchSettings::default()
        })
    }

    pub fn paging(&self) -> Paging {
        Paging::new(self.start_url.clone(), self.page_query.clone())
    }
}

fn parse_env<T: std::str::FromStr>(
    name: &'static str,
    value: String,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        name,
        value,
        expected,
    })
}

fn secs(field: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|err| invalid(field, format!("{value}: {err}")))
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
