//! Terminal event plumbing and the countdown clock.
//!
//! `Runner` multiplexes terminal input with a wall-clock deadline. While the
//! clock is armed it yields one `Tick` per elapsed second; the countdown
//! engines consume exactly one second of state per `Tick`, so the runner is
//! the only place that knows about wall time. Deadlines missed while the
//! caller was busy drawing are paid back one `Tick` at a time, so the
//! countdown never drifts.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent};

/// One engine tick per second of wall clock.
const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Unified event type consumed by the app loop.
#[derive(Clone, Debug)]
pub enum TimerEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal input events (keyboard, resize, etc.)
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an input event.
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError>;
}

/// Production event source: a reader thread forwarding crossterm events.
pub struct CrosstermEventSource {
    rx: Receiver<TimerEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || forward_terminal_events(tx));
        Self { rx }
    }
}

fn forward_terminal_events(tx: mpsc::Sender<TimerEvent>) {
    loop {
        let forwarded = match event::read() {
            Ok(CtEvent::Key(key)) => tx.send(TimerEvent::Key(key)),
            Ok(CtEvent::Resize(_, _)) => tx.send(TimerEvent::Resize),
            Ok(_) => Ok(()),
            Err(_) => break,
        };
        if forwarded.is_err() {
            break;
        }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Channel-backed source for driving the runner without a terminal.
pub struct TestEventSource {
    rx: Receiver<TimerEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<TimerEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Multiplexes input events with the countdown clock.
///
/// The clock starts disarmed: `step` only returns input events. `resume`
/// arms it when the engine starts running and `halt` disarms it on pause,
/// reset, or when the engine stops itself.
pub struct Runner<E: EventSource> {
    events: E,
    period: Duration,
    next_tick: Option<Instant>,
}

impl<E: EventSource> Runner<E> {
    pub fn new(events: E) -> Self {
        Self::with_period(events, TICK_PERIOD)
    }

    /// A shorter tick period keeps headless runs fast.
    pub fn with_period(events: E, period: Duration) -> Self {
        Self {
            events,
            period,
            next_tick: None,
        }
    }

    /// Arm the clock; the first `Tick` arrives one full period from now.
    pub fn resume(&mut self) {
        self.next_tick = Some(Instant::now() + self.period);
    }

    /// Disarm the clock and discard any pending deadline.
    pub fn halt(&mut self) {
        self.next_tick = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Block until the next input event or tick deadline, whichever comes
    /// first. Each returned `Tick` advances the deadline by exactly one
    /// period, so deadlines already in the past drain back-to-back.
    pub fn step(&mut self) -> TimerEvent {
        loop {
            let timeout = match self.next_tick {
                Some(deadline) => {
                    let now = Instant::now();
                    if deadline <= now {
                        self.next_tick = Some(deadline + self.period);
                        return TimerEvent::Tick;
                    }
                    deadline - now
                }
                None => self.period,
            };
            match self.events.recv_timeout(timeout) {
                Ok(ev) => return ev,
                Err(RecvTimeoutError::Timeout) => {}
                // A dead input channel still honors the clock.
                Err(RecvTimeoutError::Disconnected) => std::thread::sleep(timeout),
            }
        }
    }
}
