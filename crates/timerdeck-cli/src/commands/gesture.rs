//! Replay recorded pointer events against one timer.
//!
//! The recording keeps its relative timing but is moved so its first event
//! lands at the current time; the deck runs on a clock that follows the
//! replay, so long presses fire exactly where the recording says they do.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use timerdeck_core::{CardEffect, Clock, ManualClock, PointerEvent, SystemClock};
use tracing::debug;

use crate::session::{print_json, CliResult, GlobalOpts, Session};

#[derive(Serialize)]
struct ReplayStep {
    index: usize,
    effect: CardEffect,
}

fn read_events(file: &Path) -> CliResult<Vec<PointerEvent>> {
    let mut raw = String::new();
    if file == Path::new("-") {
        std::io::stdin().read_to_string(&mut raw)?;
    } else {
        raw = std::fs::read_to_string(file)?;
    }
    Ok(serde_json::from_str(&raw)?)
}

pub fn run(opts: &GlobalOpts, timer_id: &str, file: &Path) -> CliResult {
    let mut events = read_events(file)?;
    events.sort_by_key(PointerEvent::at);

    let clock = ManualClock::new(SystemClock.now());
    let mut session = Session::open_with_clock(opts, Arc::new(clock.clone()))?;
    session.deck.timer(timer_id)?;

    let offset = events
        .first()
        .map(|first| clock.now() - first.at())
        .unwrap_or_else(chrono::Duration::zero);

    let mut steps = Vec::new();
    let mut result = Ok(());
    for (index, event) in events.into_iter().enumerate() {
        let event = event.shifted(offset);
        clock.set(event.at());

        // Deadlines that passed between two recorded events fire first.
        match session.deck.timer_mut(timer_id) {
            Ok(card) => {
                for effect in card.poll(event.at()) {
                    steps.push(ReplayStep { index, effect });
                }
            }
            Err(e) => {
                result = Err(e.into());
                break;
            }
        }

        match session.deck.handle_pointer(timer_id, event) {
            Ok(CardEffect::None) => {}
            Ok(effect @ CardEffect::RemoveRequested { .. }) => {
                debug!(index, "timer deleted; stopping replay");
                steps.push(ReplayStep { index, effect });
                break;
            }
            Ok(effect) => steps.push(ReplayStep { index, effect }),
            Err(e) => {
                result = Err(e.into());
                break;
            }
        }
    }

    session.close();
    print_json(&steps)?;
    result
}
