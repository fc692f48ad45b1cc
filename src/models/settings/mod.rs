// Settings module
// User toggles and calendar overrides for the timeline, persisted as TOML

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Weekday;
use chrono_tz::Tz;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::calendar::CalendarContext;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("unknown time zone '{0}'")]
    UnknownTimeZone(String),
    #[error("unknown weekday '{0}'")]
    UnknownWeekday(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NextEventSettings {
    pub enabled: bool,
    /// Titles longer than this are cut and suffixed with "...".
    pub max_title_length: usize,
}

impl Default for NextEventSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_title_length: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineSettings {
    pub show_past_events: bool,
    pub show_overdue_reminders: bool,
    /// IANA zone name; the environment's zone is used when unset.
    pub time_zone: Option<String>,
    pub first_weekday: Option<String>,
    pub next_event: NextEventSettings,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            show_past_events: true,
            show_overdue_reminders: true,
            time_zone: None,
            first_weekday: None,
            next_event: NextEventSettings::default(),
        }
    }
}

impl TimelineSettings {
    /// Platform config location, e.g. `~/.config/event-timeline/settings.toml`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "EventTimeline", "event-timeline")
            .map(|dirs| dirs.config_dir().join("settings.toml"))
    }

    /// Loads settings from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            log::info!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let data = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = toml::from_str(&data)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let data = toml::to_string_pretty(self)?;
        fs::write(path, data).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.calendar_context().map(|_| ())
    }

    /// Builds the calendar rules these settings describe.
    pub fn calendar_context(&self) -> Result<CalendarContext, SettingsError> {
        let base = CalendarContext::from_environment();

        let time_zone = match &self.time_zone {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| SettingsError::UnknownTimeZone(name.clone()))?,
            None => base.time_zone(),
        };
        let first_weekday = match &self.first_weekday {
            Some(name) => name
                .parse::<Weekday>()
                .map_err(|_| SettingsError::UnknownWeekday(name.clone()))?,
            None => base.first_weekday(),
        };

        Ok(CalendarContext::new(time_zone, first_weekday))
    }
}
