//! Server configuration read from the environment at startup.

use std::str::FromStr;
use std::time::Duration;

use chrono::TimeDelta;
use tabletop_core::session::{AiAgentConfig, AiBehavior};
use tabletop_voting::application::settings::{
    DEFAULT_VOTE_THRESHOLD, DEFAULT_VOTE_WINDOW_SECS, VotingSettings,
};
use tabletop_voting::domain::quorum::ExpiryPolicy;

use crate::error::AppError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 5;

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Rules applied to new absentee votes.
    pub voting: VotingSettings,
    /// How often overdue votes are swept.
    pub sweep_interval: Duration,
    /// OTLP collector endpoint; tracing stays local when unset.
    pub otlp_endpoint: Option<String>,
}

impl Settings {
    /// Reads settings from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, which returns the value of a
    /// variable or `None` when it is unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;

        let window_secs = parse_or(&lookup, "VOTE_WINDOW_SECS", DEFAULT_VOTE_WINDOW_SECS)?;
        if window_secs <= 0 {
            return Err(AppError::Config(
                "VOTE_WINDOW_SECS must be a positive number of seconds".to_owned(),
            ));
        }
        let vote_threshold = parse_or(&lookup, "VOTE_THRESHOLD_PERCENT", DEFAULT_VOTE_THRESHOLD)?;
        if !(1..=100).contains(&vote_threshold) {
            return Err(AppError::Config(
                "VOTE_THRESHOLD_PERCENT must be between 1 and 100".to_owned(),
            ));
        }
        let expiry_policy = parse_or(&lookup, "VOTE_EXPIRY_POLICY", ExpiryPolicy::default())?;
        let behavior = parse_or(&lookup, "AI_AGENT_BEHAVIOR", AiBehavior::default())?;

        let sweep_secs = parse_or(&lookup, "EXPIRY_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;
        if sweep_secs == 0 {
            return Err(AppError::Config(
                "EXPIRY_SWEEP_INTERVAL_SECS must be at least 1".to_owned(),
            ));
        }

        Ok(Self {
            host,
            port,
            voting: VotingSettings {
                vote_window: TimeDelta::seconds(window_secs),
                vote_threshold,
                expiry_policy,
                ai_agent: AiAgentConfig {
                    behavior,
                    instructions: None,
                },
            },
            sweep_interval: Duration::from_secs(sweep_secs),
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|value| !value.is_empty()),
        })
    }

    /// `host:port` for binding.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key} is invalid ({raw:?}): {e}"))),
    }
}
