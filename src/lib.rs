// Library surface for headless/integration tests and embedding.
// The TUI front end lives in main.rs and consumes this through the
// effect/callback surface only.
pub mod config;
pub mod cue;
pub mod report;
pub mod runtime;
pub mod schedule;
pub mod session;
pub mod timer;
pub mod util;
