//! Foreground frame loop: keeps timers ticking, rings on completion, and
//! streams state changes as JSON lines.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use timerdeck_core::{run_frames, CardEffect, Clock, SystemClock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::session::{CliResult, GlobalOpts, Session};

pub fn run(opts: &GlobalOpts, group: Option<&str>, follow: bool) -> CliResult {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(watch(opts, group, follow))
}

/// Every group keeps ticking; `group` only narrows what is printed.
async fn watch(opts: &GlobalOpts, group: Option<&str>, follow: bool) -> CliResult {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut session = Session::open_with_clock(opts, clock.clone())?;
    if let Some(group_id) = group {
        session.deck.group(group_id)?;
    }
    let period = Duration::from_millis(session.config.poll.frame_interval_ms);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    info!(frame_ms = period.as_millis() as u64, "watching timers");
    let mut shown: HashMap<String, String> = HashMap::new();
    let mut failure = None;

    let frames = run_frames(clock.as_ref(), period, cancel, |_| {
        let deck = &mut session.deck;
        let effects = deck.poll();
        let changed = !effects.is_empty();
        for (timer_id, effect) in effects {
            let shown_here = group.map_or(true, |g| deck.owner_of(&timer_id) == Some(g));
            match effect {
                CardEffect::Event(event) if shown_here => emit(&event, &mut failure),
                CardEffect::Event(_) => {}
                _ => warn!(%timer_id, "unexpected effect while watching"),
            }
        }

        for watched in deck.groups().filter(|g| group.map_or(true, |id| g.id() == id)) {
            for card in watched.cards() {
                let display = card.engine().display(card.now());
                if shown.get(card.id()) != Some(&display) {
                    shown.insert(card.id().to_string(), display);
                    emit(&card.snapshot(), &mut failure);
                }
            }
        }

        if changed {
            deck.flush();
        }
        if failure.is_some() || (!follow && !deck.any_running()) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })
    .await;

    info!(frames, "watch stopped");
    session.close();
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn emit<T: serde::Serialize>(value: &T, failure: &mut Option<Box<dyn std::error::Error>>) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => *failure = Some(e.into()),
    }
}
