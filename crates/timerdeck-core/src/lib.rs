//! # Timerdeck Core Library
//!
//! Core logic for a deck of independent countdown timers driven by pointer
//! gestures. Everything a host needs lives here; the `timerdeck` CLI is a
//! thin shell over the same types.
//!
//! ## Architecture
//!
//! - **Timer Engine**: a wall-clock countdown state machine. Callers pass
//!   `now` into every command and call `poll()` each frame.
//! - **Gesture Interpreter**: turns raw pointer events into tap, long-press
//!   and horizontal-swipe actions.
//! - **Cards and Groups**: a card binds one engine to one interpreter; a
//!   group orders cards and broadcasts start/pause/reset to them.
//! - **Storage**: batched key-value persistence on SQLite, TOML
//!   configuration.
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: countdown state machine
//! - [`GestureInterpreter`]: pointer gesture recognition
//! - [`TimerCard`], [`TimerGroup`], [`Deck`]: orchestration
//! - [`Persistence`]: staged writes over a [`storage::KeyValueStore`]
//! - [`Config`]: application configuration

pub mod card;
pub mod clock;
pub mod collaborators;
pub mod deck;
pub mod error;
pub mod events;
pub mod gesture;
pub mod group;
pub mod poller;
pub mod storage;
pub mod timer;

pub use card::{CardContext, CardEffect, EditRequest, TimerCard};
pub use clock::{Clock, ManualClock, SystemClock};
pub use collaborators::{Alarm, ConfirmPrompt, FixedAnswer, LogNotifier, Notifier, SilentAlarm};
pub use deck::Deck;
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use events::Event;
pub use gesture::{GestureAction, GestureConfig, GestureInterpreter, GesturePhase, PointerEvent};
pub use group::{BroadcastReport, GroupRecord, TimerGroup, SINGLE_GROUP_ID};
pub use poller::run_frames;
pub use storage::{Config, Database, MemoryStore, Persistence};
pub use timer::{format_remaining, TimerEngine, TimerState, MAX_DURATION_SECS};
