//! Session runner: the interval engine driven by an ordered exercise list
//! instead of uniform rounds. Each exercise carries its own work duration
//! and an optional rest after it; every boundary advances automatically.

use crate::report::CompletionReport;
use crate::timer::{Effect, Phase};
use crate::util::whole_minutes;
use std::time::SystemTime;
use thiserror::Error;

/// Fixed preparation countdown before the first exercise.
pub const PREP_SECONDS: u32 = 5;

/// Warning tones begin this many seconds before each boundary.
const COUNTDOWN_WARNING: u32 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("exercise name must not be empty")]
    EmptyName,
    #[error("exercise name must be at most 100 characters")]
    NameTooLong,
    #[error("exercise duration must be between 5 and 3600 seconds, got {0}")]
    DurationOutOfRange(u32),
    #[error("rest after an exercise must be at most 600 seconds, got {0}")]
    RestOutOfRange(u32),
    #[error("a session needs at least one exercise")]
    NoExercises,
}

/// One entry of the user-authored exercise sequence. Immutable once the
/// session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exercise {
    name: String,
    duration: u32,
    rest_after: u32,
}

impl Exercise {
    pub fn new(name: &str, duration: u32, rest_after: u32) -> Result<Self, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyName);
        }
        if name.chars().count() > 100 {
            return Err(SessionError::NameTooLong);
        }
        if !(5..=3600).contains(&duration) {
            return Err(SessionError::DurationOutOfRange(duration));
        }
        if rest_after > 600 {
            return Err(SessionError::RestOutOfRange(rest_after));
        }
        Ok(Self {
            name: name.to_string(),
            duration,
            rest_after,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn rest_after(&self) -> u32 {
        self.rest_after
    }
}

/// Countdown over an ordered exercise list, with per-exercise completion
/// flags. Same tick contract as [`crate::timer::IntervalTimer`].
#[derive(Debug)]
pub struct SessionTimer {
    name: String,
    exercises: Vec<Exercise>,
    phase: Phase,
    exercise_index: usize,
    remaining: u32,
    running: bool,
    completed: Vec<bool>,
    started_at: Option<SystemTime>,
}

impl SessionTimer {
    pub fn new(name: &str, exercises: Vec<Exercise>) -> Result<Self, SessionError> {
        if exercises.is_empty() {
            return Err(SessionError::NoExercises);
        }
        let completed = vec![false; exercises.len()];
        Ok(Self {
            name: name.to_string(),
            exercises,
            phase: Phase::Preparation,
            exercise_index: 0,
            remaining: PREP_SECONDS,
            running: false,
            completed,
            started_at: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn exercise_index(&self) -> usize {
        self.exercise_index
    }

    pub fn current_exercise(&self) -> Option<&Exercise> {
        self.exercises.get(self.exercise_index)
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn completed_flags(&self) -> &[bool] {
        &self.completed
    }

    pub fn completed_count(&self) -> u32 {
        self.completed.iter().filter(|c| **c).count() as u32
    }

    /// Fraction of the exercise list already completed.
    pub fn progress(&self) -> f64 {
        f64::from(self.completed_count()) / self.exercises.len() as f64
    }

    pub fn start(&mut self) -> Vec<Effect> {
        if self.phase == Phase::Completed {
            self.reset();
        }
        if self.running {
            return Vec::new();
        }
        self.running = true;
        vec![Effect::StartSequence]
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Preparation;
        self.exercise_index = 0;
        self.remaining = PREP_SECONDS;
        self.running = false;
        self.completed.fill(false);
        self.started_at = None;
    }

    /// Advance one second of wall-clock time; same contract as the
    /// interval controller.
    pub fn tick(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if !self.running || self.phase == Phase::Completed {
            return effects;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            effects.push(Effect::PhaseEnd);
            self.advance(&mut effects);
        } else if self.remaining <= COUNTDOWN_WARNING {
            effects.push(Effect::Warning(self.remaining));
        }
        effects
    }

    fn push_change(&self, effects: &mut Vec<Effect>) {
        effects.push(Effect::PhaseChange {
            phase: self.phase,
            round: self.exercise_index as u32 + 1,
            interval: 1,
        });
    }

    fn completion_report(&self) -> CompletionReport {
        let elapsed_secs = self
            .started_at
            .and_then(|t| t.elapsed().ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        CompletionReport {
            completed: self.completed_count(),
            total: self.exercises.len() as u32,
            duration_minutes: whole_minutes(elapsed_secs),
        }
    }

    fn begin_exercise(&mut self, index: usize, effects: &mut Vec<Effect>) {
        self.exercise_index = index;
        self.phase = Phase::Work;
        self.remaining = self.exercises[index].duration;
        self.push_change(effects);
        effects.push(Effect::Announce(self.exercises[index].name.clone()));
    }

    fn advance(&mut self, effects: &mut Vec<Effect>) {
        match self.phase {
            Phase::Preparation => {
                if self.started_at.is_none() {
                    self.started_at = Some(SystemTime::now());
                }
                self.exercise_index = 0;
                self.phase = Phase::Work;
                self.remaining = self.exercises[0].duration;
                self.push_change(effects);
                effects.push(Effect::Announce(format!(
                    "Starting {}",
                    self.exercises[0].name
                )));
            }
            Phase::Work => {
                self.completed[self.exercise_index] = true;
                let last = self.exercise_index + 1 == self.exercises.len();
                if last {
                    self.phase = Phase::Completed;
                    self.running = false;
                    self.push_change(effects);
                    effects.push(Effect::Announce(
                        "Workout complete! Amazing work!".to_string(),
                    ));
                    effects.push(Effect::Completed(self.completion_report()));
                } else if self.exercises[self.exercise_index].rest_after > 0 {
                    self.remaining = self.exercises[self.exercise_index].rest_after;
                    self.phase = Phase::Rest;
                    self.push_change(effects);
                    effects.push(Effect::Announce("Rest".to_string()));
                } else {
                    self.begin_exercise(self.exercise_index + 1, effects);
                }
            }
            Phase::Rest => {
                self.begin_exercise(self.exercise_index + 1, effects);
            }
            // LongRest never occurs in this variant; Completed is terminal
            Phase::LongRest | Phase::Completed => {}
        }
    }

    #[cfg(test)]
    fn set_completed(&mut self, index: usize, value: bool) {
        self.completed[index] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn ex(name: &str, duration: u32, rest_after: u32) -> Exercise {
        Exercise::new(name, duration, rest_after).unwrap()
    }

    #[test]
    fn exercise_validation() {
        assert_eq!(Exercise::new("  ", 30, 10), Err(SessionError::EmptyName));
        assert_eq!(
            Exercise::new(&"x".repeat(101), 30, 10),
            Err(SessionError::NameTooLong)
        );
        assert_eq!(
            Exercise::new("shadow drills", 4, 10),
            Err(SessionError::DurationOutOfRange(4))
        );
        assert_eq!(
            Exercise::new("shadow drills", 3601, 10),
            Err(SessionError::DurationOutOfRange(3601))
        );
        assert_eq!(
            Exercise::new("shadow drills", 30, 601),
            Err(SessionError::RestOutOfRange(601))
        );
        assert!(Exercise::new("shadow drills", 5, 0).is_ok());
        assert!(Exercise::new("shadow drills", 3600, 600).is_ok());
    }

    #[test]
    fn rejects_empty_exercise_list() {
        assert_eq!(
            SessionTimer::new("empty", vec![]).unwrap_err(),
            SessionError::NoExercises
        );
    }

    #[test]
    fn initial_state() {
        let session = SessionTimer::new("warmup", vec![ex("jumps", 10, 0)]).unwrap();
        assert_eq!(session.phase(), Phase::Preparation);
        assert_eq!(session.exercise_index(), 0);
        assert_eq!(session.remaining(), PREP_SECONDS);
        assert!(!session.is_running());
        assert_eq!(session.completed_flags(), &[false]);
    }

    #[test]
    fn full_run_with_rest() {
        let mut session = SessionTimer::new(
            "footwork",
            vec![ex("six corners", 5, 5), ex("split steps", 5, 0)],
        )
        .unwrap();
        session.start();

        // prep(5) + work(5) + rest(5) + work(5) = 20 ticks
        let mut ticks = 0;
        while session.phase() != Phase::Completed && ticks < 100 {
            session.tick();
            ticks += 1;
        }
        assert_eq!(ticks, 20);
        assert_eq!(session.completed_flags(), &[true, true]);
        assert!(!session.is_running());
    }

    #[test]
    fn zero_rest_advances_directly_to_next_exercise() {
        let mut session = SessionTimer::new(
            "drills",
            vec![ex("net kills", 5, 0), ex("clears", 5, 0)],
        )
        .unwrap();
        session.start();
        for _ in 0..5 {
            session.tick();
        }
        assert_eq!(session.phase(), Phase::Work);

        // first work ends: straight into the second exercise, same tick
        let mut effects = Vec::new();
        for _ in 0..5 {
            effects = session.tick();
        }
        assert_eq!(session.phase(), Phase::Work);
        assert_eq!(session.exercise_index(), 1);
        assert_eq!(session.remaining(), 5);
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::Announce(text) if text == "clears")));
    }

    #[test]
    fn rest_after_last_exercise_is_ignored() {
        let mut session =
            SessionTimer::new("single", vec![ex("smash practice", 5, 60)]).unwrap();
        session.start();
        let mut last = Vec::new();
        for _ in 0..10 {
            last = session.tick();
        }
        assert_eq!(session.phase(), Phase::Completed);
        assert!(last.iter().any(|e| matches!(e, Effect::Completed(_))));
    }

    #[test]
    fn pause_preserves_remaining() {
        let mut session = SessionTimer::new("warmup", vec![ex("jumps", 10, 0)]).unwrap();
        session.start();
        session.tick();
        session.tick();
        assert_eq!(session.remaining(), 3);

        session.pause();
        assert!(session.tick().is_empty());
        assert_eq!(session.remaining(), 3);

        session.start();
        assert_eq!(session.remaining(), 3);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut session = SessionTimer::new(
            "footwork",
            vec![ex("six corners", 5, 0), ex("split steps", 5, 0)],
        )
        .unwrap();
        session.start();
        for _ in 0..8 {
            session.tick();
        }
        session.reset();
        assert_eq!(session.phase(), Phase::Preparation);
        assert_eq!(session.exercise_index(), 0);
        assert_eq!(session.remaining(), PREP_SECONDS);
        assert_eq!(session.completed_flags(), &[false, false]);
        assert!(!session.is_running());
    }

    #[test]
    fn report_reflects_actual_completion_flags() {
        let exercises: Vec<Exercise> = (1..=5).map(|i| ex(&format!("drill {}", i), 5, 0)).collect();
        let mut session = SessionTimer::new("injected", exercises).unwrap();
        session.start();

        // stop one tick short of the final boundary: 5 prep + 5*5 work - 1
        for _ in 0..29 {
            session.tick();
        }
        assert_eq!(session.phase(), Phase::Work);
        assert_eq!(session.exercise_index(), 4);

        // pretend exercise 3 never happened
        session.set_completed(2, false);

        let effects = session.tick();
        let report = effects
            .iter()
            .find_map(|e| match e {
                Effect::Completed(r) => Some(*r),
                _ => None,
            })
            .expect("completion report");
        assert_eq!(report.completed, 4);
        assert_eq!(report.total, 5);
    }

    #[test]
    fn start_after_completion_restarts() {
        let mut session = SessionTimer::new("single", vec![ex("lunges", 5, 0)]).unwrap();
        session.start();
        for _ in 0..10 {
            session.tick();
        }
        assert_eq!(session.phase(), Phase::Completed);

        let effects = session.start();
        assert_eq!(session.phase(), Phase::Preparation);
        assert_eq!(session.remaining(), PREP_SECONDS);
        assert_eq!(session.completed_flags(), &[false]);
        assert!(session.is_running());
        assert_matches!(effects[0], Effect::StartSequence);
    }

    #[test]
    fn progress_is_completed_fraction() {
        let mut session = SessionTimer::new(
            "drills",
            vec![ex("net kills", 5, 0), ex("clears", 5, 0)],
        )
        .unwrap();
        assert_eq!(session.progress(), 0.0);
        session.start();
        for _ in 0..10 {
            session.tick();
        }
        assert_eq!(session.progress(), 0.5);
    }
}
