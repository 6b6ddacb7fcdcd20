//! The interval timer controller: a phase-driven countdown state machine.
//!
//! The controller owns no clock and plays no audio. The embedding caller
//! invokes [`IntervalTimer::tick`] once per elapsed second while running;
//! every mutation returns a list of [`Effect`] descriptors that the caller
//! feeds to the cue emitter, the UI and the persistence sink. That keeps
//! the state machine testable without mocking timers or audio.

use crate::config::{ConfigError, TimerConfig, TimerMode};
use crate::report::CompletionReport;
use crate::schedule;
use crate::util::whole_minutes;
use std::time::SystemTime;

/// One named segment of the countdown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    #[strum(serialize = "Get Ready")]
    Preparation,
    Work,
    Rest,
    #[strum(serialize = "Long Rest")]
    LongRest,
    #[strum(serialize = "Complete")]
    Completed,
}

/// Side effect requested by the state machine, emitted at most once per
/// transition. The engine never performs these itself.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Short warning tone; fires at remaining = warning, ..., 1.
    Warning(u32),
    /// Triple-tone at the instant a phase hits zero.
    PhaseEnd,
    /// Rising three-beep sequence on an explicit start.
    StartSequence,
    /// The run moved to a new phase.
    PhaseChange {
        phase: Phase,
        round: u32,
        interval: u32,
    },
    /// Spoken announcement naming the new phase/round.
    Announce(String),
    /// The run finished; emitted exactly once, alongside the final
    /// `PhaseChange` to `Completed`.
    Completed(CompletionReport),
}

/// Phase-driven countdown over a [`TimerConfig`]: preparation, then rounds
/// of work intervals separated by rests, with a long rest substituted at
/// the configured cadence.
#[derive(Debug)]
pub struct IntervalTimer {
    config: TimerConfig,
    phase: Phase,
    round: u32,
    interval: u32,
    remaining: u32,
    running: bool,
    started_at: Option<SystemTime>,
}

impl IntervalTimer {
    pub fn new(config: TimerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let remaining = config.prep_time;
        Ok(Self {
            config,
            phase: Phase::Preparation,
            round: 1,
            interval: 1,
            remaining,
            running: false,
            started_at: None,
        })
    }

    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Fraction of the current phase already elapsed, for progress bars.
    pub fn progress(&self) -> f64 {
        let total = match self.phase {
            Phase::Preparation => self.config.prep_time,
            Phase::Work => self.config.work_duration,
            Phase::Rest => self.config.rest_duration,
            Phase::LongRest => self.config.long_rest_duration,
            Phase::Completed => return 1.0,
        };
        if total == 0 {
            1.0
        } else {
            f64::from(total - self.remaining) / f64::from(total)
        }
    }

    /// Begin or resume ticking. Starting a completed run restarts it from
    /// the initial state.
    pub fn start(&mut self) -> Vec<Effect> {
        if self.phase == Phase::Completed {
            self.reset();
        }
        if self.running {
            return Vec::new();
        }
        self.running = true;
        let mut effects = vec![
            Effect::StartSequence,
            Effect::Announce(format!("Starting {}. Get ready!", self.config.timer_name)),
        ];
        // A zero-length preparation phase passes through without consuming
        // a tick.
        if self.remaining == 0 {
            self.advance(&mut effects);
        }
        effects
    }

    /// Stop ticking without losing the current remaining time. Idempotent.
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Return to the initial state for the current configuration.
    pub fn reset(&mut self) {
        self.phase = Phase::Preparation;
        self.round = 1;
        self.interval = 1;
        self.remaining = self.config.prep_time;
        self.running = false;
        self.started_at = None;
    }

    /// Replace the configuration and reset. The old state survives a
    /// rejected configuration untouched.
    pub fn update_settings(&mut self, config: TimerConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        self.reset();
        Ok(())
    }

    /// Resolve a preset against the current settings, adopt it and reset.
    pub fn apply_preset(&mut self, mode: TimerMode) -> Result<(), ConfigError> {
        let resolved = schedule::resolve(mode, &self.config)?;
        self.update_settings(resolved)
    }

    /// Advance one second of wall-clock time. No-op while paused or after
    /// completion; the caller drives this from its own one-second clock.
    pub fn tick(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.running || self.phase == Phase::Completed {
            return effects;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            effects.push(Effect::PhaseEnd);
            self.advance(&mut effects);
        } else if self.remaining <= self.config.countdown_warning {
            effects.push(Effect::Warning(self.remaining));
        }
        effects
    }

    fn push_change(&self, effects: &mut Vec<Effect>) {
        effects.push(Effect::PhaseChange {
            phase: self.phase,
            round: self.round,
            interval: self.interval,
        });
    }

    fn completion_report(&self) -> CompletionReport {
        let elapsed_secs = self
            .started_at
            .and_then(|t| t.elapsed().ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        CompletionReport {
            completed: self.config.total_intervals(),
            total: self.config.total_intervals(),
            duration_minutes: whole_minutes(elapsed_secs),
        }
    }

    /// Move past a phase whose countdown reached zero. Loops so that
    /// zero-length phases (an EMOM's 0s rest) pass through within the same
    /// tick instead of consuming a second.
    fn advance(&mut self, effects: &mut Vec<Effect>) {
        loop {
            match self.phase {
                Phase::Preparation => {
                    self.phase = Phase::Work;
                    self.remaining = self.config.work_duration;
                    self.round = 1;
                    self.interval = 1;
                    if self.started_at.is_none() {
                        self.started_at = Some(SystemTime::now());
                    }
                    self.push_change(effects);
                    effects.push(Effect::Announce("Work time".to_string()));
                }
                Phase::Work => {
                    if self.interval < self.config.work_intervals {
                        // more work intervals left inside this round
                        self.interval += 1;
                        self.phase = Phase::Rest;
                        self.remaining = self.config.rest_duration;
                        self.push_change(effects);
                        effects.push(Effect::Announce("Rest".to_string()));
                    } else if self.round < self.config.rounds {
                        // round boundary; the interval counter restarts
                        // with the next round
                        self.interval = 1;
                        let long_rest = self.config.long_rest_after > 0
                            && self.round % self.config.long_rest_after == 0;
                        if long_rest {
                            self.phase = Phase::LongRest;
                            self.remaining = self.config.long_rest_duration;
                            self.push_change(effects);
                            effects.push(Effect::Announce("Long rest".to_string()));
                        } else {
                            self.phase = Phase::Rest;
                            self.remaining = self.config.rest_duration;
                            self.push_change(effects);
                            effects.push(Effect::Announce("Rest".to_string()));
                        }
                    } else {
                        self.phase = Phase::Completed;
                        self.running = false;
                        self.push_change(effects);
                        effects
                            .push(Effect::Announce("Workout complete! Great job!".to_string()));
                        effects.push(Effect::Completed(self.completion_report()));
                        return;
                    }
                }
                Phase::Rest | Phase::LongRest => {
                    // A boundary rest entered the phase with interval reset
                    // to 1; an intra-round rest left it above 1.
                    let new_round = self.interval == 1;
                    if new_round {
                        self.round += 1;
                    }
                    self.phase = Phase::Work;
                    self.remaining = self.config.work_duration;
                    if new_round && !self.config.auto_advance {
                        // park at the boundary with the next work phase
                        // pre-loaded, awaiting an explicit start
                        self.running = false;
                        self.push_change(effects);
                    } else {
                        self.push_change(effects);
                        if new_round {
                            effects.push(Effect::Announce(format!("Round {}", self.round)));
                        }
                    }
                }
                Phase::Completed => return,
            }
            if self.remaining > 0 || !self.running {
                return;
            }
        }
    }
}
