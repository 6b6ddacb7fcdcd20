mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use rally::{
    config::{ConfigStore, FileConfigStore, TimerConfig, TimerMode},
    cue::CueEmitter,
    report::{CompletionReport, SessionDb},
    runtime::{CrosstermEventSource, EventSource, Runner, TimerEvent},
    schedule,
    session::{Exercise, SessionTimer},
    timer::{Effect, IntervalTimer, Phase},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// interval workout timer for the terminal
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "An interval workout timer with standard/tabata/EMOM/session presets, \
                  warning and phase-end tones, voice announcements, and a local history \
                  of completed sessions."
)]
pub struct Cli {
    /// preset mode to apply before any overrides
    #[clap(short, long, value_enum)]
    mode: Option<TimerMode>,

    /// workout name used in announcements and the session history
    #[clap(short = 'n', long)]
    name: Option<String>,

    /// work duration in seconds
    #[clap(short = 'w', long)]
    work: Option<u32>,

    /// rest duration in seconds
    #[clap(short = 'r', long)]
    rest: Option<u32>,

    /// number of rounds
    #[clap(long)]
    rounds: Option<u32>,

    /// preparation time in seconds
    #[clap(long)]
    prep: Option<u32>,

    /// work intervals per round
    #[clap(long)]
    work_intervals: Option<u32>,

    /// long rest duration in seconds
    #[clap(long)]
    long_rest: Option<u32>,

    /// take a long rest after every N rounds (0 disables)
    #[clap(long)]
    long_rest_after: Option<u32>,

    /// seconds of warning tones before each phase boundary
    #[clap(long)]
    warning: Option<u32>,

    /// total minutes for session mode
    #[clap(long)]
    session_minutes: Option<u32>,

    /// interval count for session mode
    #[clap(long)]
    session_intervals: Option<u32>,

    /// pause between session intervals, in seconds
    #[clap(long)]
    session_pause: Option<u32>,

    /// disable tones
    #[clap(long)]
    no_sound: bool,

    /// disable voice announcements
    #[clap(long)]
    no_voice: bool,

    /// stop at each round boundary instead of rolling into the next round
    #[clap(long)]
    manual_advance: bool,

    /// run an exercise session instead of uniform rounds:
    /// comma-separated name:work[:rest] entries, seconds
    #[clap(short = 'e', long)]
    exercises: Option<String>,

    /// print recent completed sessions and exit
    #[clap(long)]
    history: bool,
}

impl Cli {
    /// Overlay explicit numeric flags on a base configuration.
    fn overlay(&self, base: TimerConfig) -> TimerConfig {
        let mut cfg = base;
        if let Some(ref name) = self.name {
            cfg.timer_name = name.clone();
        }
        if let Some(work) = self.work {
            cfg.work_duration = work;
        }
        if let Some(rest) = self.rest {
            cfg.rest_duration = rest;
        }
        if let Some(rounds) = self.rounds {
            cfg.rounds = rounds;
        }
        if let Some(prep) = self.prep {
            cfg.prep_time = prep;
        }
        if let Some(intervals) = self.work_intervals {
            cfg.work_intervals = intervals;
        }
        if let Some(long_rest) = self.long_rest {
            cfg.long_rest_duration = long_rest;
        }
        if let Some(after) = self.long_rest_after {
            cfg.long_rest_after = after;
        }
        if let Some(warning) = self.warning {
            cfg.countdown_warning = warning;
        }
        if let Some(minutes) = self.session_minutes {
            cfg.session_total_minutes = minutes;
        }
        if let Some(intervals) = self.session_intervals {
            cfg.session_intervals = intervals;
        }
        if let Some(pause) = self.session_pause {
            cfg.session_pause_seconds = pause;
        }
        if self.no_sound {
            cfg.sound_enabled = false;
        }
        if self.no_voice {
            cfg.voice_enabled = false;
        }
        if self.manual_advance {
            cfg.auto_advance = false;
        }
        cfg
    }
}

/// Parse `name:work[:rest]` entries separated by commas.
fn parse_exercises(spec: &str) -> Result<Vec<Exercise>, Box<dyn Error>> {
    let mut exercises = Vec::new();
    for entry in spec.split(',') {
        let mut parts = entry.splitn(3, ':');
        let name = parts.next().unwrap_or_default();
        let work: u32 = parts
            .next()
            .ok_or_else(|| format!("missing work duration in {:?}", entry))?
            .trim()
            .parse()?;
        let rest: u32 = match parts.next() {
            Some(s) => s.trim().parse()?,
            None => 0,
        };
        exercises.push(Exercise::new(name, work, rest)?);
    }
    Ok(exercises)
}

/// Either timer variant behind one control surface.
#[derive(Debug)]
pub enum Engine {
    Interval(IntervalTimer),
    Session(SessionTimer),
}

impl Engine {
    pub fn start(&mut self) -> Vec<Effect> {
        match self {
            Engine::Interval(t) => t.start(),
            Engine::Session(s) => s.start(),
        }
    }

    pub fn pause(&mut self) {
        match self {
            Engine::Interval(t) => t.pause(),
            Engine::Session(s) => s.pause(),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Engine::Interval(t) => t.reset(),
            Engine::Session(s) => s.reset(),
        }
    }

    pub fn tick(&mut self) -> Vec<Effect> {
        match self {
            Engine::Interval(t) => t.tick(),
            Engine::Session(s) => s.tick(),
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Engine::Interval(t) => t.phase(),
            Engine::Session(s) => s.phase(),
        }
    }

    pub fn remaining(&self) -> u32 {
        match self {
            Engine::Interval(t) => t.remaining(),
            Engine::Session(s) => s.remaining(),
        }
    }

    pub fn is_running(&self) -> bool {
        match self {
            Engine::Interval(t) => t.is_running(),
            Engine::Session(s) => s.is_running(),
        }
    }

    pub fn progress(&self) -> f64 {
        match self {
            Engine::Interval(t) => t.progress(),
            Engine::Session(s) => s.progress(),
        }
    }

    pub fn timer_name(&self) -> &str {
        match self {
            Engine::Interval(t) => &t.config().timer_name,
            Engine::Session(s) => s.name(),
        }
    }
}

#[derive(Debug)]
pub struct App {
    pub engine: Engine,
    pub cues: CueEmitter,
    pub db: Option<SessionDb>,
    pub last_report: Option<CompletionReport>,
}

impl App {
    pub fn new(engine: Engine, cues: CueEmitter) -> Self {
        let db = match SessionDb::new() {
            Ok(db) => Some(db),
            Err(e) => {
                warn!("session history unavailable: {e}");
                None
            }
        };
        Self {
            engine,
            cues,
            db,
            last_report: None,
        }
    }

    /// Route engine effects to the cue emitter and the persistence sink.
    pub fn handle_effects(&mut self, effects: &[Effect]) {
        self.cues.apply(effects);
        for effect in effects {
            if let Effect::Completed(report) = effect {
                self.last_report = Some(*report);
                if let Some(ref db) = self.db {
                    if let Err(e) = db.record(self.engine.timer_name(), report) {
                        warn!("failed to record session: {e}");
                    }
                }
            }
        }
    }
}

fn print_history() -> Result<(), Box<dyn Error>> {
    let db = SessionDb::new()?;
    let records = db.recent(20)?;
    if records.is_empty() {
        println!("no completed sessions yet");
        return Ok(());
    }
    let (count, minutes) = db.totals()?;
    for r in &records {
        println!(
            "{}  {:<30} {}/{} done, {} min",
            r.completed_at.format("%Y-%m-%d %H:%M"),
            r.timer_name,
            r.completed,
            r.total,
            r.duration_minutes,
        );
    }
    println!("{} sessions, {} minutes total", count, minutes);
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    if cli.history {
        return print_history();
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = FileConfigStore::new();
    let mut cfg = store.load();
    if let Some(mode) = cli.mode {
        cfg = schedule::resolve(mode, &cfg)?;
    }
    let cfg = cli.overlay(cfg);
    cfg.validate()?;
    if let Err(e) = store.save(&cfg) {
        warn!("could not save config: {e}");
    }

    let cues = CueEmitter::new(cfg.sound_enabled, cfg.voice_enabled);
    let engine = match cli.exercises {
        Some(ref spec) => Engine::Session(SessionTimer::new(
            &cfg.timer_name,
            parse_exercises(spec)?,
        )?),
        None => Engine::Interval(IntervalTimer::new(cfg)?),
    };
    let mut app = App::new(engine, cues);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::new(CrosstermEventSource::new());

    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        match runner.step() {
            TimerEvent::Tick => {
                let effects = app.engine.tick();
                app.handle_effects(&effects);
                // completion and manual-advance parking stop the engine
                if !app.engine.is_running() {
                    runner.halt();
                }
            }
            TimerEvent::Resize => {}
            TimerEvent::Key(key) => {
                if !handle_key(app, key, &mut runner) {
                    return Ok(());
                }
            }
        }
    }
}

/// Returns false when the app should exit. The runner's clock follows the
/// engine: armed while running, disarmed on pause and reset.
fn handle_key<E: EventSource>(app: &mut App, key: KeyEvent, runner: &mut Runner<E>) -> bool {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return false,
        KeyCode::Char('q') | KeyCode::Esc => return false,
        KeyCode::Char(' ') | KeyCode::Char('p') => {
            if app.engine.is_running() {
                app.engine.pause();
                runner.halt();
            } else {
                let effects = app.engine.start();
                app.handle_effects(&effects);
                if app.engine.is_running() {
                    runner.resume();
                }
            }
        }
        KeyCode::Char('r') => {
            app.engine.reset();
            app.last_report = None;
            runner.halt();
        }
        KeyCode::Char('m') => {
            let enabled = !app.cues.sound_enabled();
            app.cues.set_sound_enabled(enabled);
        }
        KeyCode::Char('v') => {
            let enabled = !app.cues.voice_enabled();
            app.cues.set_voice_enabled(enabled);
        }
        _ => {}
    }
    true
}
