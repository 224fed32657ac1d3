//! Group orchestration: an ordered registry of timer cards.
//!
//! Display order is insertion order. Aggregate commands visit every member
//! in that order; one member failing never stops the rest.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::card::{CardContext, CardEffect, TimerCard};
use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;
use crate::gesture::PointerEvent;
use crate::storage::{timer_key, TimerDefaults};
use crate::timer::TimerEngine;

/// Id of the built-in list of ungrouped timers.
pub const SINGLE_GROUP_ID: &str = "single";

/// Persisted form of a group: name and member order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub timer_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BroadcastFailure {
    pub timer_id: String,
    pub reason: String,
}

/// Outcome of a start-all/pause-all/reset-all.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BroadcastReport {
    /// Members the command reached, in order.
    pub visited: Vec<String>,
    pub events: Vec<Event>,
    pub failures: Vec<BroadcastFailure>,
}

impl BroadcastReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct TimerGroup {
    id: String,
    name: String,
    cards: IndexMap<String, TimerCard>,
    ctx: CardContext,
    defaults: TimerDefaults,
}

impl TimerGroup {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        ctx: CardContext,
        defaults: TimerDefaults,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            cards: IndexMap::new(),
            ctx,
            defaults,
        }
    }

    /// Rebuild a group from its record, loading each member's timer record.
    /// Members without a readable record come back as fresh default timers.
    pub fn restore(record: &GroupRecord, ctx: CardContext, defaults: TimerDefaults) -> Self {
        let mut group = Self::new(record.id.clone(), record.name.clone(), ctx, defaults);
        for timer_id in &record.timer_ids {
            if group.cards.contains_key(timer_id) {
                continue;
            }
            let engine = match group.ctx.persistence.load::<TimerEngine>(&timer_key(timer_id)) {
                Some(engine) if engine.id() == timer_id => engine.normalized(),
                _ => {
                    debug!(timer_id, "no usable record; restoring defaults");
                    group.default_engine(timer_id.clone())
                }
            };
            let card = TimerCard::restore(engine, group.ctx.clone());
            group.cards.insert(timer_id.clone(), card);
        }
        group
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn contains(&self, timer_id: &str) -> bool {
        self.cards.contains_key(timer_id)
    }

    pub fn timer_ids(&self) -> Vec<String> {
        self.cards.keys().cloned().collect()
    }

    pub fn cards(&self) -> impl Iterator<Item = &TimerCard> {
        self.cards.values()
    }

    pub fn card(&self, timer_id: &str) -> Option<&TimerCard> {
        self.cards.get(timer_id)
    }

    pub fn card_mut(&mut self, timer_id: &str) -> Option<&mut TimerCard> {
        self.cards.get_mut(timer_id)
    }

    pub fn any_running(&self) -> bool {
        self.cards.values().any(|c| c.engine().is_running())
    }

    pub fn record(&self) -> GroupRecord {
        GroupRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            timer_ids: self.timer_ids(),
        }
    }

    // ── Membership ───────────────────────────────────────────────────

    /// Append a new timer with the configured defaults. Returns its id.
    pub fn add_timer(&mut self) -> (String, Event) {
        let timer_id = uuid::Uuid::new_v4().to_string();
        let card = TimerCard::create(self.default_engine(timer_id.clone()), self.ctx.clone());
        self.cards.insert(timer_id.clone(), card);
        info!(group_id = %self.id, %timer_id, "timer added");
        let event = Event::TimerAdded {
            group_id: self.id.clone(),
            timer_id: timer_id.clone(),
            at: self.ctx.clock.now(),
        };
        (timer_id, event)
    }

    /// Detach a timer and delete its record.
    pub fn remove_timer(&mut self, timer_id: &str) -> Result<Event> {
        let card = self
            .cards
            .shift_remove(timer_id)
            .ok_or_else(|| CoreError::timer_not_found(timer_id))?;
        card.forget();
        info!(group_id = %self.id, %timer_id, "timer removed");
        Ok(Event::TimerRemoved {
            group_id: self.id.clone(),
            timer_id: timer_id.to_string(),
            at: self.ctx.clock.now(),
        })
    }

    /// Delete every member's record and empty the group.
    pub fn forget_all(&mut self) -> usize {
        let count = self.cards.len();
        for card in self.cards.values() {
            card.forget();
        }
        self.cards.clear();
        count
    }

    pub fn rename(&mut self, name: &str) -> Result<Event> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName { field: "group name" }.into());
        }
        self.name = name.to_string();
        info!(group_id = %self.id, name, "group renamed");
        Ok(Event::GroupRenamed {
            group_id: self.id.clone(),
            name: self.name.clone(),
            at: self.ctx.clock.now(),
        })
    }

    // ── Aggregate commands ───────────────────────────────────────────

    pub fn start_all(&mut self) -> BroadcastReport {
        self.broadcast("start", TimerCard::start)
    }

    pub fn pause_all(&mut self) -> BroadcastReport {
        self.broadcast("pause", |card| Ok(card.pause()))
    }

    pub fn reset_all(&mut self) -> BroadcastReport {
        self.broadcast("reset", |card| Ok(Some(card.reset())))
    }

    // ── Per-member input ─────────────────────────────────────────────

    /// Route a pointer event to one member. A committed delete removes the
    /// member before returning.
    pub fn handle_pointer(&mut self, timer_id: &str, event: PointerEvent) -> Result<CardEffect> {
        let card = self
            .cards
            .get_mut(timer_id)
            .ok_or_else(|| CoreError::timer_not_found(timer_id))?;
        let effect = card.handle_pointer(event)?;
        if let CardEffect::RemoveRequested { timer_id } = &effect {
            self.remove_timer(timer_id)?;
        }
        Ok(effect)
    }

    /// One frame for every member, in display order.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Vec<(String, CardEffect)> {
        let mut effects = Vec::new();
        for (timer_id, card) in self.cards.iter_mut() {
            for effect in card.poll(now) {
                effects.push((timer_id.clone(), effect));
            }
        }
        effects
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn broadcast<F>(&mut self, command: &str, mut op: F) -> BroadcastReport
    where
        F: FnMut(&mut TimerCard) -> Result<Option<Event>>,
    {
        let mut report = BroadcastReport::default();
        for (timer_id, card) in self.cards.iter_mut() {
            report.visited.push(timer_id.clone());
            match op(card) {
                Ok(Some(event)) => report.events.push(event),
                Ok(None) => {}
                Err(e) => {
                    debug!(group_id = %self.id, %timer_id, command, error = %e, "member skipped");
                    report.failures.push(BroadcastFailure {
                        timer_id: timer_id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        report
    }

    fn default_engine(&self, timer_id: String) -> TimerEngine {
        let mut engine = TimerEngine::new(
            timer_id,
            self.defaults.default_name.clone(),
            self.defaults.default_duration_secs,
        );
        engine.set_show_decimals(self.defaults.show_decimals);
        engine.set_alarm_enabled(self.defaults.alarm_enabled);
        engine
    }
}
