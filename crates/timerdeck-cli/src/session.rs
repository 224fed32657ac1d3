//! Per-invocation wiring: config, store, collaborators, and the deck.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use serde::Serialize;
use timerdeck_core::collaborators::AlarmError;
use timerdeck_core::storage::KeyValueStore;
use timerdeck_core::{
    Alarm, CardContext, Clock, Config, ConfirmPrompt, Database, Deck, FixedAnswer, MemoryStore,
    Notifier, Persistence, SystemClock,
};
use tracing::debug;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Database file (overrides storage.database_path)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Config file (defaults to ~/.config/timerdeck/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Keep everything in memory; nothing is read or written
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalOpts {
    pub fn load_config(&self) -> CliResult<Config> {
        let config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        Ok(config)
    }

    pub fn save_config(&self, config: &Config) -> CliResult {
        match &self.config {
            Some(path) => config.save_to(path)?,
            None => config.save()?,
        }
        Ok(())
    }

    fn open_store(&self, config: &Config) -> CliResult<Box<dyn KeyValueStore>> {
        if self.ephemeral {
            return Ok(Box::new(MemoryStore::new()));
        }
        let store = match self.db.as_ref().or(config.storage.database_path.as_ref()) {
            Some(path) => Database::open_at(path)?,
            None => Database::open()?,
        };
        Ok(Box::new(store))
    }
}

/// Rings the terminal bell.
pub struct TerminalBell;

impl Alarm for TerminalBell {
    fn ring(&self) -> Result<(), AlarmError> {
        let mut err = std::io::stderr();
        err.write_all(b"\x07")?;
        err.flush()?;
        Ok(())
    }
}

/// Prints notices on stderr, away from the JSON on stdout.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, message: &str) {
        eprintln!("warning: {message}");
    }
}

/// Asks on stderr and reads the answer from stdin.
pub struct StdinPrompt;

impl ConfirmPrompt for StdinPrompt {
    fn confirm(&self, question: &str, confirm_label: &str, cancel_label: &str) -> bool {
        eprint!("{question} [{confirm_label}/{cancel_label}] ");
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        let answer = answer.trim();
        answer.eq_ignore_ascii_case(confirm_label)
            || answer.eq_ignore_ascii_case("y")
            || answer.eq_ignore_ascii_case("yes")
    }
}

/// `--yes` skips the question.
pub fn prompt(yes: bool) -> Box<dyn ConfirmPrompt> {
    if yes {
        Box::new(FixedAnswer(true))
    } else {
        Box::new(StdinPrompt)
    }
}

pub struct Session {
    pub config: Config,
    pub deck: Deck,
}

impl Session {
    pub fn open(opts: &GlobalOpts) -> CliResult<Self> {
        Self::open_with_clock(opts, Arc::new(SystemClock))
    }

    /// Load the deck and bring it up to date with `clock`, so completions
    /// that happened while no process was running are recorded now.
    pub fn open_with_clock(opts: &GlobalOpts, clock: Arc<dyn Clock>) -> CliResult<Self> {
        let config = opts.load_config()?;
        let persistence = Persistence::new(opts.open_store(&config)?, Arc::new(StderrNotifier));
        let ctx = CardContext {
            clock,
            persistence,
            alarm: Arc::new(TerminalBell),
            gesture: config.gesture.clone(),
        };
        let mut deck = Deck::load(ctx, config.timers.clone());
        let caught_up = deck.poll();
        if !caught_up.is_empty() {
            debug!(count = caught_up.len(), "caught up on elapsed timers");
        }
        Ok(Self { config, deck })
    }

    /// Write staged changes. Failures were already reported on stderr.
    pub fn close(self) {
        let report = self.deck.flush();
        debug!(written = report.written, failed = report.failed.len(), "session closed");
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
