use crate::*;
use tracing::{debug, info};

impl WorldState {
    /// Buffs settle first: card triggers may ask whether a buff is active.
    pub fn check_and_activate(&mut self, events: &mut EventBus) {
        self.check_and_activate_buffs(events);
        self.check_and_activate_cards(events);
    }

    pub fn check_and_activate_buffs(&mut self, events: &mut EventBus) {
        for index in 0..self.buff_collection.len() {
            let def = &self.buff_collection[index];
            if self.buff_is_active(def.id)
                || self.scheduler.manually_removed.contains(&def.id)
                || (def.one_time && self.scheduler.one_time_triggered.contains(&def.id))
            {
                continue;
            }
            if !evaluate_trigger(&def.trigger, &*self) {
                continue;
            }
            let def = def.clone();
            self.activate_buff(&def, events);
        }
    }

    pub fn activate_buff(&mut self, def: &BuffDef, events: &mut EventBus) -> InstanceId {
        let id = self.alloc_instance_id();
        let mut buff = ActiveBuff::from_def(id, def);
        if def.one_time {
            self.scheduler.one_time_triggered.insert(def.id);
        }
        info!(buff = %def.name, instance = %id, "buff activated");
        events.push(Event::BuffApplied {
            name: def.name.clone(),
        });
        self.apply_immediate_effects(&mut buff, events);
        self.active_buffs.push(buff);
        id
    }

    /// Applies a buff's immediate effects once, recording each landed delta.
    pub fn apply_immediate_effects(&mut self, buff: &mut ActiveBuff, events: &mut EventBus) {
        if buff.effects_applied {
            return;
        }
        let ledger = buff.applied_changes.get_or_insert_with(Vec::new);
        for (index, effect) in buff.effects.iter().enumerate() {
            if !effect.is_immediate() {
                continue;
            }
            if let Some(delta) = self.apply_effect(&buff.name, effect, events) {
                ledger.push(AppliedChange {
                    target: effect.target.clone(),
                    delta,
                    effect_index: Some(index),
                });
            }
        }
        buff.effects_applied = true;
    }

    pub fn check_and_activate_cards(&mut self, events: &mut EventBus) {
        for index in 0..self.card_collection.len() {
            let def = &self.card_collection[index];
            if self.card_is_active(def.id)
                || self.scheduler.removed_on_turn.get(&def.id) == Some(&self.current_turn)
            {
                continue;
            }
            if !evaluate_trigger(&def.trigger, &*self) {
                continue;
            }
            let def = def.clone();
            let id = self.alloc_instance_id();
            debug!(card = %def.name, instance = %id, "card available");
            self.active_cards.push(ActiveCard::from_def(id, &def));
            events.push(Event::CardAvailable { name: def.name });
        }
    }

    pub fn deactivate_unavailable_cards(&mut self, events: &mut EventBus) {
        let stale: Vec<InstanceId> = self
            .active_cards
            .iter()
            .filter(|card| !evaluate_trigger(&card.trigger, &*self))
            .map(|card| card.id)
            .collect();
        if stale.is_empty() {
            return;
        }
        let mut kept = Vec::with_capacity(self.active_cards.len());
        for card in std::mem::take(&mut self.active_cards) {
            if stale.contains(&card.id) {
                debug!(card = %card.name, "card unavailable");
                events.push(Event::CardUnavailable { name: card.name });
            } else {
                kept.push(card);
            }
        }
        self.active_cards = kept;
    }
}
