use clap::Subcommand;
use serde::Serialize;
use timerdeck_core::{Deck, Event, SINGLE_GROUP_ID};

use crate::session::{print_json, CliResult, GlobalOpts, Session};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Add a timer (to the single list unless --group is given)
    Add {
        #[arg(long, default_value = SINGLE_GROUP_ID)]
        group: String,
        #[arg(long)]
        name: Option<String>,
        /// Duration in seconds
        #[arg(long)]
        duration: Option<u32>,
    },
    /// List timers grouped by list
    List,
    /// Start or resume a timer
    Start { id: String },
    /// Pause a running timer
    Pause { id: String },
    /// Reset a timer to its full duration
    Reset { id: String },
    /// Start when stopped, pause when running, re-arm when completed
    Toggle { id: String },
    /// Change name, duration, or display options
    Configure {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        hours: Option<u32>,
        #[arg(long)]
        minutes: Option<u32>,
        #[arg(long)]
        seconds: Option<u32>,
        /// Show tenths of a second
        #[arg(long)]
        decimals: Option<bool>,
        /// Ring when the countdown completes
        #[arg(long)]
        alarm: Option<bool>,
    },
    /// Add seconds to a timer in any state
    AddTime { id: String, seconds: f64 },
    /// Delete a timer
    Remove { id: String },
    /// Print a timer's current state
    Status { id: String },
}

#[derive(Serialize)]
struct GroupListing {
    group_id: String,
    name: String,
    timers: Vec<Event>,
}

pub fn run(opts: &GlobalOpts, action: TimerAction) -> CliResult {
    let mut session = Session::open(opts)?;
    let result = execute(&mut session.deck, action);
    session.close();
    result
}

fn execute(deck: &mut Deck, action: TimerAction) -> CliResult {
    match action {
        TimerAction::Add {
            group,
            name,
            duration,
        } => {
            let (id, _) = deck.add_timer(&group)?;
            if name.is_some() || duration.is_some() {
                let card = deck.timer_mut(&id)?;
                let mut edit = card.edit_request();
                if let Some(name) = name {
                    edit.name = name;
                }
                if let Some(secs) = duration {
                    edit.hours = secs / 3600;
                    edit.minutes = (secs % 3600) / 60;
                    edit.seconds = secs % 60;
                }
                if let Err(e) = card.configure(&edit) {
                    // Keep the deck consistent: drop the half-made timer.
                    deck.remove_timer(&id)?;
                    return Err(e.into());
                }
            }
            print_json(&deck.timer(&id)?.snapshot())?;
        }
        TimerAction::List => {
            let listing: Vec<GroupListing> = deck
                .groups()
                .map(|group| GroupListing {
                    group_id: group.id().to_string(),
                    name: group.name().to_string(),
                    timers: group.cards().map(|card| card.snapshot()).collect(),
                })
                .collect();
            print_json(&listing)?;
        }
        TimerAction::Start { id } => {
            let card = deck.timer_mut(&id)?;
            match card.start()? {
                Some(event) => print_json(&event)?,
                None => print_json(&card.snapshot())?,
            }
        }
        TimerAction::Pause { id } => {
            let card = deck.timer_mut(&id)?;
            match card.pause() {
                Some(event) => print_json(&event)?,
                None => print_json(&card.snapshot())?,
            }
        }
        TimerAction::Reset { id } => {
            print_json(&deck.timer_mut(&id)?.reset())?;
        }
        TimerAction::Toggle { id } => {
            let card = deck.timer_mut(&id)?;
            match card.toggle()? {
                Some(event) => print_json(&event)?,
                None => print_json(&card.snapshot())?,
            }
        }
        TimerAction::Configure {
            id,
            name,
            hours,
            minutes,
            seconds,
            decimals,
            alarm,
        } => {
            let card = deck.timer_mut(&id)?;
            let mut edit = card.edit_request();
            if let Some(name) = name {
                edit.name = name;
            }
            if hours.is_some() || minutes.is_some() || seconds.is_some() {
                edit.hours = hours.unwrap_or(0);
                edit.minutes = minutes.unwrap_or(0);
                edit.seconds = seconds.unwrap_or(0);
            }
            if let Some(decimals) = decimals {
                edit.show_decimals = decimals;
            }
            if let Some(alarm) = alarm {
                edit.alarm_enabled = alarm;
            }
            print_json(&card.configure(&edit)?)?;
        }
        TimerAction::AddTime { id, seconds } => {
            print_json(&deck.timer_mut(&id)?.add_time(seconds)?)?;
        }
        TimerAction::Remove { id } => {
            print_json(&deck.remove_timer(&id)?)?;
        }
        TimerAction::Status { id } => {
            print_json(&deck.timer(&id)?.snapshot())?;
        }
    }
    Ok(())
}
