//! TOML-based application configuration.
//!
//! Stores the workday boundaries and the break-duration table:
//! - work start/end as `HH:MM` strings, tolerance window in minutes
//! - break type -> scheduled duration in minutes, plus the fallback
//!   duration used for unknown types
//!
//! Configuration is stored at `~/.config/presensi/config.toml` and
//! validated once at load time. Transitions consume the resolved
//! [`Workday`] view and can no longer fail on configuration.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::ConfigError;

use super::data_dir;

/// Workday section of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkdayConfig {
    /// Scheduled work start, `HH:MM`.
    #[serde(default = "default_work_start")]
    pub work_start: String,
    /// Scheduled work end, `HH:MM`.
    #[serde(default = "default_work_end")]
    pub work_end: String,
    /// Tolerance window in minutes, applied symmetrically to lateness
    /// and early-leave but never to overtime.
    #[serde(default = "default_tolerance")]
    pub tolerance_minutes: u32,
}

/// Break section of the configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreaksConfig {
    /// Break type -> scheduled duration in minutes.
    #[serde(default = "default_durations")]
    pub durations: BTreeMap<String, u32>,
    /// Duration used when the requested type is not in the table.
    #[serde(default = "default_break_minutes")]
    pub default_minutes: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/presensi/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub workday: WorkdayConfig,
    #[serde(default)]
    pub breaks: BreaksConfig,
}

/// The workday boundaries with the `HH:MM` strings already parsed.
/// Produced once by [`Config::workday`]; transitions only ever see this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workday {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub tolerance_minutes: u32,
}

// Default functions
fn default_work_start() -> String {
    "08:00".into()
}
fn default_work_end() -> String {
    "17:00".into()
}
fn default_tolerance() -> u32 {
    15
}
fn default_break_minutes() -> u32 {
    30
}
fn default_durations() -> BTreeMap<String, u32> {
    BTreeMap::from([
        ("toilet".into(), 15),
        ("makan".into(), 60),
        ("merokok".into(), 10),
        ("sholat".into(), 15),
        ("lainnya".into(), 30),
    ])
}

impl Default for WorkdayConfig {
    fn default() -> Self {
        Self {
            work_start: default_work_start(),
            work_end: default_work_end(),
            tolerance_minutes: default_tolerance(),
        }
    }
}

impl Default for BreaksConfig {
    fn default() -> Self {
        Self {
            durations: default_durations(),
            default_minutes: default_break_minutes(),
        }
    }
}

fn parse_hhmm(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{value}' is not a valid HH:MM time"),
    })
}

impl Config {
    fn path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, or write and return the defaults when the file is
    /// missing. A file that exists but fails to parse or validate is an
    /// error, never silently replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// fails validation, or if the default config cannot be written.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(Self::path()?, content)?;
        Ok(())
    }

    /// Load from disk, returning defaults on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Reject malformed entries once, at the boundary.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.workday()?;
        for (ty, minutes) in &self.breaks.durations {
            if *minutes == 0 {
                return Err(ConfigError::InvalidValue {
                    key: format!("breaks.durations.{ty}"),
                    message: "duration must be at least 1 minute".into(),
                });
            }
        }
        if self.breaks.default_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "breaks.default_minutes".into(),
                message: "duration must be at least 1 minute".into(),
            });
        }
        Ok(())
    }

    /// Resolve the workday boundaries into their typed form.
    pub fn workday(&self) -> Result<Workday, ConfigError> {
        let start = parse_hhmm("workday.work_start", &self.workday.work_start)?;
        let end = parse_hhmm("workday.work_end", &self.workday.work_end)?;
        if end <= start {
            return Err(ConfigError::InvalidValue {
                key: "workday.work_end".into(),
                message: format!(
                    "work_end ({}) must be after work_start ({})",
                    self.workday.work_end, self.workday.work_start
                ),
            });
        }
        Ok(Workday {
            start,
            end,
            tolerance_minutes: self.workday.tolerance_minutes,
        })
    }

    /// Scheduled duration for a break type. An unknown type falls back to
    /// the configured default; this is deliberate, not an error.
    pub fn break_minutes(&self, break_type: &str) -> u32 {
        self.breaks
            .durations
            .get(break_type)
            .copied()
            .unwrap_or(self.breaks.default_minutes)
    }

    /// Get a config value as a string by key. Keys match the ones `set`
    /// accepts.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "workday.work_start" => Some(self.workday.work_start.clone()),
            "workday.work_end" => Some(self.workday.work_end.clone()),
            "workday.tolerance_minutes" => Some(self.workday.tolerance_minutes.to_string()),
            "breaks.default_minutes" => Some(self.breaks.default_minutes.to_string()),
            _ => key
                .strip_prefix("breaks.durations.")
                .and_then(|ty| self.breaks.durations.get(ty))
                .map(|m| m.to_string()),
        }
    }

    /// Set a config value by key and persist. Unknown keys and values
    /// that fail validation are rejected; nothing is written in that
    /// case.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value is invalid, or
    /// the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut next = self.clone();
        match key {
            "workday.work_start" => next.workday.work_start = value.to_string(),
            "workday.work_end" => next.workday.work_end = value.to_string(),
            "workday.tolerance_minutes" => {
                next.workday.tolerance_minutes =
                    value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: format!("'{value}' is not a number of minutes"),
                    })?;
            }
            "breaks.default_minutes" => {
                next.breaks.default_minutes =
                    value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: format!("'{value}' is not a number of minutes"),
                    })?;
            }
            _ => match key.strip_prefix("breaks.durations.") {
                Some(ty) if !ty.is_empty() => {
                    let minutes = value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: key.to_string(),
                        message: format!("'{value}' is not a number of minutes"),
                    })?;
                    next.breaks.durations.insert(ty.to_string(), minutes);
                }
                _ => return Err(ConfigError::UnknownKey(key.to_string()).into()),
            },
        }
        next.validate()?;
        next.save()?;
        *self = next;
        Ok(())
    }
}
