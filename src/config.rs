use clap::ValueEnum;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Preset tag selecting how the phase schedule is derived.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimerMode {
    /// 40s work / 20s rest, 8 rounds, long rest every 4
    Standard,
    /// 20s work / 10s rest, 8 rounds
    Tabata,
    /// every minute on the minute, 10 rounds
    Emom,
    /// work duration auto-derived from total time, interval count and pause length
    Session,
    /// whatever the numeric settings say
    Custom,
}

/// Invalid configuration, rejected before any run state is touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("work duration must be at least 1 second")]
    ZeroWorkDuration,
    #[error("round count must be at least 1")]
    ZeroRounds,
    #[error("work intervals per round must be at least 1")]
    ZeroWorkIntervals,
    #[error("session mode needs at least 2 intervals")]
    TooFewSessionIntervals,
    #[error("session pauses take {pause_budget}s of a {total_seconds}s session, leaving no work time")]
    SessionPauseBudget {
        pause_budget: u32,
        total_seconds: u32,
    },
}

/// User-authored timer settings. Immutable during a run; replacing them
/// through the controller forces a reset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimerConfig {
    pub timer_name: String,
    pub work_duration: u32,
    pub rest_duration: u32,
    pub rounds: u32,
    pub prep_time: u32,
    pub work_intervals: u32,
    pub long_rest_duration: u32,
    /// A long rest replaces the normal inter-round rest after every this
    /// many rounds; 0 disables long rests.
    pub long_rest_after: u32,
    /// Seconds before a phase boundary at which warning tones begin.
    pub countdown_warning: u32,
    pub sound_enabled: bool,
    pub voice_enabled: bool,
    /// Keep ticking into the next round, or park at the round boundary
    /// until the next explicit start.
    pub auto_advance: bool,
    pub mode: TimerMode,
    pub session_total_minutes: u32,
    pub session_intervals: u32,
    pub session_pause_seconds: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            timer_name: "My Workout".to_string(),
            work_duration: 40,
            rest_duration: 20,
            rounds: 8,
            prep_time: 10,
            work_intervals: 1,
            long_rest_duration: 60,
            long_rest_after: 4,
            countdown_warning: 3,
            sound_enabled: true,
            voice_enabled: true,
            auto_advance: true,
            mode: TimerMode::Standard,
            session_total_minutes: 45,
            session_intervals: 15,
            session_pause_seconds: 120,
        }
    }
}

impl TimerConfig {
    /// Reject configurations the controller could not run without entering
    /// a negative or undefined remaining time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.work_duration == 0 {
            return Err(ConfigError::ZeroWorkDuration);
        }
        if self.rounds == 0 {
            return Err(ConfigError::ZeroRounds);
        }
        if self.work_intervals == 0 {
            return Err(ConfigError::ZeroWorkIntervals);
        }
        if self.mode == TimerMode::Session {
            self.session_budget()?;
        }
        Ok(())
    }

    /// Work seconds available per interval in session mode, or the reason
    /// the session parameters do not add up.
    pub fn session_budget(&self) -> Result<u32, ConfigError> {
        if self.session_intervals < 2 {
            return Err(ConfigError::TooFewSessionIntervals);
        }
        let total_seconds = self.session_total_minutes * 60;
        let pause_budget = self.session_pause_seconds * (self.session_intervals - 1);
        if pause_budget >= total_seconds {
            return Err(ConfigError::SessionPauseBudget {
                pause_budget,
                total_seconds,
            });
        }
        Ok((total_seconds - pause_budget) / self.session_intervals)
    }

    /// Total work intervals across the whole run.
    pub fn total_intervals(&self) -> u32 {
        self.rounds * self.work_intervals
    }
}

pub trait ConfigStore {
    fn load(&self) -> TimerConfig;
    fn save(&self, cfg: &TimerConfig) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "rally") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("rally_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> TimerConfig {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<TimerConfig>(&bytes) {
                return cfg;
            }
        }
        TimerConfig::default()
    }

    fn save(&self, cfg: &TimerConfig) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
