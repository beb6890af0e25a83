use std::str::FromStr;

use anyhow::Result;
use chrono::TimeDelta;
use chrono_tz::Tz;
use config::Config;
use serde::Deserialize;

use crate::error::{CoreError, CoreResult};
use crate::types::{Instant, RuleId, TargetKey};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub timezone: String,
    pub window: WindowConfig,
    pub logging: LoggingConfig,
}

/// Expansion window bounds, as offsets relative to the moment of the run.
#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    pub before_days: u16,
    pub after_days: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from `.env` file and environment variables into a `Settings`.
    /// Environment variables take precedence over `.env` file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Config::builder()
            .set_default("timezone", "America/New_York")?
            .set_default("window.before_days", 365)?
            .set_default("window.after_days", 365)?
            .set_default("logging.level", "debug")?
            // Env file
            .add_source(
                config::Environment::default()
                    .convert_case(config::Case::Snake)
                    .separator("_")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            // TOML file
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Settings>()?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    dotenvy::dotenv().ok();

    Settings::load()
}

/// Per-run transformation configuration.
///
/// Everything the transformation needs is passed in here explicitly; there is
/// no ambient configuration lookup inside the transformation layer.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    /// Target field the rule and its overrides are persisted under.
    pub target: TargetKey,
    /// Timezone used to interpret local date and datetime tokens.
    pub timezone: Tz,
    /// Upper bound of the occurrence expansion window.
    pub before: Instant,
    /// Lower bound of the occurrence expansion window.
    pub after: Instant,
    /// Rule identity from a previously produced result, if the target was
    /// transformed before. An identity that no longer resolves is treated as
    /// "no prior state", never as an error.
    pub existing: Option<RuleId>,
}

impl TransformConfig {
    /// ## Summary
    /// Builds a per-run configuration from loaded settings, resolving the
    /// relative window offsets against `now`.
    ///
    /// ## Errors
    /// Returns `CoreError::UnknownTimezone` if the configured timezone is not
    /// a valid IANA timezone name.
    pub fn from_settings(
        settings: &Settings,
        target: TargetKey,
        now: chrono::DateTime<chrono::Utc>,
        existing: Option<RuleId>,
    ) -> CoreResult<Self> {
        let timezone = Tz::from_str(&settings.timezone)
            .map_err(|_| CoreError::UnknownTimezone(settings.timezone.clone()))?;
        let now = now.with_timezone(&timezone);

        Ok(Self {
            target,
            timezone,
            before: now + TimeDelta::days(i64::from(settings.window.before_days)),
            after: now - TimeDelta::days(i64::from(settings.window.after_days)),
            existing,
        })
    }
}
