//! The deck: the ungrouped timer list plus every named group.
//!
//! Owns the storage index (`SINGLE_TIMER_DATA`, `GROUPS`) and re-stages it
//! whenever membership or names change. Timer records themselves are staged
//! by their cards.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::card::{CardContext, CardEffect, TimerCard};
use crate::collaborators::ConfirmPrompt;
use crate::error::{CoreError, Result, ValidationError};
use crate::events::Event;
use crate::gesture::PointerEvent;
use crate::group::{BroadcastReport, GroupRecord, TimerGroup, SINGLE_GROUP_ID};
use crate::storage::{FlushReport, TimerDefaults, GROUPS_KEY, SINGLE_TIMER_KEY};

const SINGLE_GROUP_NAME: &str = "Single";
const DEFAULT_GROUP_NAME: &str = "Group";

pub struct Deck {
    singles: TimerGroup,
    groups: IndexMap<String, TimerGroup>,
    ctx: CardContext,
    defaults: TimerDefaults,
}

impl Deck {
    /// An empty deck. Nothing is staged until the first change.
    pub fn new(ctx: CardContext, defaults: TimerDefaults) -> Self {
        Self {
            singles: TimerGroup::new(
                SINGLE_GROUP_ID,
                SINGLE_GROUP_NAME,
                ctx.clone(),
                defaults.clone(),
            ),
            groups: IndexMap::new(),
            ctx,
            defaults,
        }
    }

    /// Rebuild the deck from storage. Absent or unreadable index keys load
    /// as empty lists.
    pub fn load(ctx: CardContext, defaults: TimerDefaults) -> Self {
        let persistence = ctx.persistence.clone();
        let single_ids: Vec<String> = persistence.load(SINGLE_TIMER_KEY).unwrap_or_default();
        let records: Vec<GroupRecord> = persistence.load(GROUPS_KEY).unwrap_or_default();

        let singles = TimerGroup::restore(
            &GroupRecord {
                id: SINGLE_GROUP_ID.to_string(),
                name: SINGLE_GROUP_NAME.to_string(),
                timer_ids: single_ids,
            },
            ctx.clone(),
            defaults.clone(),
        );
        // A timer belongs to the first list that names it.
        let mut claimed: HashSet<String> = singles.timer_ids().into_iter().collect();
        let mut groups = IndexMap::new();
        for mut record in records {
            if record.id == SINGLE_GROUP_ID || groups.contains_key(&record.id) {
                warn!(group_id = %record.id, "skipping duplicate group record");
                continue;
            }
            record.timer_ids.retain(|timer_id| {
                let first = claimed.insert(timer_id.clone());
                if !first {
                    warn!(
                        group_id = %record.id,
                        %timer_id,
                        "skipping timer owned by another group"
                    );
                }
                first
            });
            let group = TimerGroup::restore(&record, ctx.clone(), defaults.clone());
            groups.insert(record.id, group);
        }
        info!(
            singles = singles.len(),
            groups = groups.len(),
            "deck loaded"
        );
        Self {
            singles,
            groups,
            ctx,
            defaults,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn singles(&self) -> &TimerGroup {
        &self.singles
    }

    /// Every group, the single-timer list first.
    pub fn groups(&self) -> impl Iterator<Item = &TimerGroup> {
        std::iter::once(&self.singles).chain(self.groups.values())
    }

    pub fn group(&self, group_id: &str) -> Result<&TimerGroup> {
        if group_id == SINGLE_GROUP_ID {
            return Ok(&self.singles);
        }
        self.groups
            .get(group_id)
            .ok_or_else(|| CoreError::group_not_found(group_id))
    }

    pub fn group_mut(&mut self, group_id: &str) -> Result<&mut TimerGroup> {
        if group_id == SINGLE_GROUP_ID {
            return Ok(&mut self.singles);
        }
        self.groups
            .get_mut(group_id)
            .ok_or_else(|| CoreError::group_not_found(group_id))
    }

    /// Id of the group that owns `timer_id`.
    pub fn owner_of(&self, timer_id: &str) -> Option<&str> {
        self.groups()
            .find(|g| g.contains(timer_id))
            .map(|g| g.id())
    }

    pub fn timer(&self, timer_id: &str) -> Result<&TimerCard> {
        self.groups()
            .find_map(|g| g.card(timer_id))
            .ok_or_else(|| CoreError::timer_not_found(timer_id))
    }

    pub fn timer_mut(&mut self, timer_id: &str) -> Result<&mut TimerCard> {
        std::iter::once(&mut self.singles)
            .chain(self.groups.values_mut())
            .find_map(|g| g.card_mut(timer_id))
            .ok_or_else(|| CoreError::timer_not_found(timer_id))
    }

    pub fn any_running(&self) -> bool {
        self.groups().any(TimerGroup::any_running)
    }

    // ── Groups ───────────────────────────────────────────────────────

    pub fn create_group(&mut self, name: Option<&str>) -> Result<(String, Event)> {
        let name = match name.map(str::trim) {
            Some("") => return Err(ValidationError::EmptyName { field: "group name" }.into()),
            Some(name) => name.to_string(),
            None => DEFAULT_GROUP_NAME.to_string(),
        };
        let group_id = uuid::Uuid::new_v4().to_string();
        let group = TimerGroup::new(
            group_id.clone(),
            name.clone(),
            self.ctx.clone(),
            self.defaults.clone(),
        );
        self.groups.insert(group_id.clone(), group);
        self.stage_index();
        info!(%group_id, %name, "group created");
        let event = Event::GroupCreated {
            group_id: group_id.clone(),
            name,
            at: self.ctx.clock.now(),
        };
        Ok((group_id, event))
    }

    pub fn rename_group(&mut self, group_id: &str, name: &str) -> Result<Event> {
        if group_id == SINGLE_GROUP_ID {
            return Err(ValidationError::BuiltInGroup(group_id.to_string()).into());
        }
        let event = self.group_mut(group_id)?.rename(name)?;
        self.stage_index();
        Ok(event)
    }

    /// Delete a group and every timer in it, after the user confirms.
    /// Returns `Ok(None)` when the user declines.
    pub fn delete_group(
        &mut self,
        group_id: &str,
        prompt: &dyn ConfirmPrompt,
    ) -> Result<Option<Event>> {
        if group_id == SINGLE_GROUP_ID {
            return Err(ValidationError::BuiltInGroup(group_id.to_string()).into());
        }
        let group = self.group(group_id)?;
        let question = format!(
            "Delete group '{}' and its {} timer(s)?",
            group.name(),
            group.len()
        );
        if !prompt.confirm(&question, "Delete", "Cancel") {
            return Ok(None);
        }
        let Some(mut group) = self.groups.shift_remove(group_id) else {
            return Err(CoreError::group_not_found(group_id));
        };
        let timers_removed = group.forget_all();
        self.stage_index();
        info!(%group_id, timers_removed, "group deleted");
        Ok(Some(Event::GroupDeleted {
            group_id: group_id.to_string(),
            timers_removed,
            at: self.ctx.clock.now(),
        }))
    }

    // ── Timers ───────────────────────────────────────────────────────

    pub fn add_timer(&mut self, group_id: &str) -> Result<(String, Event)> {
        let added = self.group_mut(group_id)?.add_timer();
        self.stage_index();
        Ok(added)
    }

    /// Remove a timer from whichever group owns it, deleting its record.
    pub fn remove_timer(&mut self, timer_id: &str) -> Result<Event> {
        let group_id = self
            .owner_of(timer_id)
            .map(str::to_string)
            .ok_or_else(|| CoreError::timer_not_found(timer_id))?;
        let event = self.group_mut(&group_id)?.remove_timer(timer_id)?;
        self.stage_index();
        Ok(event)
    }

    pub fn handle_pointer(&mut self, timer_id: &str, event: PointerEvent) -> Result<CardEffect> {
        let group_id = self
            .owner_of(timer_id)
            .map(str::to_string)
            .ok_or_else(|| CoreError::timer_not_found(timer_id))?;
        let effect = self.group_mut(&group_id)?.handle_pointer(timer_id, event)?;
        if matches!(effect, CardEffect::RemoveRequested { .. }) {
            self.stage_index();
        }
        Ok(effect)
    }

    pub fn start_all(&mut self, group_id: &str) -> Result<BroadcastReport> {
        Ok(self.group_mut(group_id)?.start_all())
    }

    pub fn pause_all(&mut self, group_id: &str) -> Result<BroadcastReport> {
        Ok(self.group_mut(group_id)?.pause_all())
    }

    pub fn reset_all(&mut self, group_id: &str) -> Result<BroadcastReport> {
        Ok(self.group_mut(group_id)?.reset_all())
    }

    /// One frame across the whole deck.
    pub fn poll(&mut self) -> Vec<(String, CardEffect)> {
        let now = self.ctx.clock.now();
        let mut effects = self.singles.poll(now);
        for group in self.groups.values_mut() {
            effects.extend(group.poll(now));
        }
        effects
    }

    /// Wipe all stored data after confirmation and start over empty.
    ///
    /// # Errors
    /// A failed wipe is returned and the in-memory deck is kept as is.
    pub fn clear_all(&mut self, prompt: &dyn ConfirmPrompt) -> Result<Option<Event>> {
        if !prompt.confirm("Delete all timers?", "Delete", "Cancel") {
            return Ok(None);
        }
        self.ctx.persistence.clear()?;
        *self = Deck::new(self.ctx.clone(), self.defaults.clone());
        info!("deck cleared");
        Ok(Some(Event::DeckCleared {
            at: self.ctx.clock.now(),
        }))
    }

    /// Write everything staged so far.
    pub fn flush(&self) -> FlushReport {
        self.ctx.persistence.flush()
    }

    fn stage_index(&self) {
        let persistence = &self.ctx.persistence;
        persistence.stage(SINGLE_TIMER_KEY, &self.singles.timer_ids());
        let records: Vec<GroupRecord> = self.groups.values().map(TimerGroup::record).collect();
        persistence.stage(GROUPS_KEY, &records);
    }
}
