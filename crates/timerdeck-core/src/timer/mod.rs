mod display;
mod engine;

pub use display::format_remaining;
pub use engine::{TimerEngine, TimerState, MAX_DURATION_SECS};
