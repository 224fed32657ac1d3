//! Frame loop for hosts without their own render loop.
//!
//! Engines never schedule anything themselves; something has to call
//! `poll` repeatedly. [`run_frames`] does that on a tokio interval until the
//! callback breaks or the token is cancelled.

use std::ops::ControlFlow;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::clock::Clock;

/// Invoke `on_frame` with the clock's current time every `period`.
///
/// Returns the number of frames delivered. Late frames are skipped rather
/// than bunched, since a single poll always catches up on elapsed time.
pub async fn run_frames<F>(
    clock: &dyn Clock,
    period: Duration,
    cancel: CancellationToken,
    mut on_frame: F,
) -> u64
where
    F: FnMut(DateTime<Utc>) -> ControlFlow<()>,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut frames = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(frames, "frame loop cancelled");
                break;
            }
            _ = interval.tick() => {
                frames += 1;
                if on_frame(clock.now()).is_break() {
                    debug!(frames, "frame loop finished");
                    break;
                }
            }
        }
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::timer::{TimerEngine, TimerState};

    #[tokio::test(start_paused = true)]
    async fn stops_when_callback_breaks() {
        let clock = ManualClock::at_epoch();
        let mut seen = 0;
        let frames = run_frames(
            &clock,
            Duration::from_millis(100),
            CancellationToken::new(),
            |_| {
                seen += 1;
                if seen == 5 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        )
        .await;
        assert_eq!(frames, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_stops_before_first_frame() {
        let clock = ManualClock::at_epoch();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let frames = run_frames(&clock, Duration::from_millis(100), cancel, |_| {
            ControlFlow::Continue(())
        })
        .await;
        assert_eq!(frames, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn drives_engine_to_completion() {
        let clock = ManualClock::at_epoch();
        let mut engine = TimerEngine::new("t", "Tea", 1.0);
        engine.start(clock.now()).unwrap();

        let mut completions = 0;
        run_frames(
            &clock,
            Duration::from_millis(100),
            CancellationToken::new(),
            |now| {
                if engine.poll(now).is_some() {
                    completions += 1;
                }
                clock.advance(chrono::Duration::milliseconds(150));
                if engine.state() == TimerState::Completed {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        )
        .await;
        assert_eq!(completions, 1);
        assert_eq!(engine.remaining_at(clock.now()), 0.0);
    }
}
