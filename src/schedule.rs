//! Preset resolution: maps a mode tag to a concrete phase schedule.
//!
//! Every preset produces a full replacement `TimerConfig` rather than
//! patching fields in place, so switching modes repeatedly can never leave
//! stale values behind. The controller resets before adopting the result.

use crate::config::{ConfigError, TimerConfig, TimerMode};

/// Resolve `mode` against `base`, returning the configuration a run of that
/// preset should use. `base` supplies the name, the cue/advance flags and,
/// for custom and session modes, the user-entered numbers.
pub fn resolve(mode: TimerMode, base: &TimerConfig) -> Result<TimerConfig, ConfigError> {
    let cfg = match mode {
        TimerMode::Standard => TimerConfig {
            work_duration: 40,
            rest_duration: 20,
            rounds: 8,
            prep_time: 10,
            work_intervals: 1,
            long_rest_duration: 60,
            long_rest_after: 4,
            mode,
            ..base.clone()
        },
        TimerMode::Tabata => TimerConfig {
            work_duration: 20,
            rest_duration: 10,
            rounds: 8,
            prep_time: 10,
            work_intervals: 1,
            long_rest_after: 0,
            mode,
            ..base.clone()
        },
        TimerMode::Emom => TimerConfig {
            work_duration: 60,
            rest_duration: 0,
            rounds: 10,
            prep_time: 10,
            work_intervals: 1,
            long_rest_after: 0,
            mode,
            ..base.clone()
        },
        TimerMode::Session => {
            let work_duration = base.session_budget()?;
            TimerConfig {
                work_duration,
                rest_duration: base.session_pause_seconds,
                rounds: base.session_intervals,
                prep_time: 10,
                work_intervals: 1,
                long_rest_after: 0,
                mode,
                ..base.clone()
            }
        }
        TimerMode::Custom => TimerConfig {
            mode,
            ..base.clone()
        },
    };
    cfg.validate()?;
    Ok(cfg)
}
