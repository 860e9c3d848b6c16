use super::EngineError;
use crate::*;
use tracing::{debug, info};

impl WorldState {
    /// All immediate costs must be payable in full. Stats never go negative.
    pub fn can_afford(&self, card: &ActiveCard) -> bool {
        card.costs
            .iter()
            .filter(|cost| !cost.is_delayed())
            .all(|cost| {
                let Some(entity) = self.entity(&cost.target) else {
                    return false;
                };
                if entity.current_value >= cost.amount(entity.current_value) {
                    return true;
                }
                match cost.target.kind {
                    EntityKind::Resource => entity.allow_negative,
                    EntityKind::Stat => false,
                }
            })
    }

    pub fn play_card(&mut self, id: InstanceId, events: &mut EventBus) -> Result<(), EngineError> {
        let card = self
            .active_card(id)
            .cloned()
            .ok_or(EngineError::UnknownCard(id))?;
        if !self.can_afford(&card) {
            info!(card = %card.name, "card rejected: cannot afford");
            events.push(Event::CardRejected {
                card: card.name.clone(),
            });
            return Err(EngineError::CannotAfford(card.name));
        }

        for cost in card.costs.iter().filter(|cost| !cost.is_delayed()) {
            let Some(current) = self.value_of(&cost.target) else {
                self.report_missing(&cost.target, &card.name, events);
                continue;
            };
            if let Some(applied) = self.apply_raw_delta(&cost.target, -cost.amount(current)) {
                self.report_change(&cost.target, applied, &card.name, events);
            }
        }
        info!(card = %card.name, turn = self.current_turn, "card played");
        events.push(Event::CardPlayed {
            name: card.name.clone(),
        });

        for (index, cost) in card.costs.iter().enumerate() {
            if cost.is_delayed() {
                self.add_cost_debuff(&card, index, cost, events);
            }
        }

        for effect in &card.effects {
            match effect {
                CardEffect::ClearBuff { buff_name } => {
                    self.clear_buff(buff_name, events);
                }
            }
        }

        self.scheduler
            .removed_on_turn
            .insert(card.definition_id, self.current_turn);
        self.active_cards.retain(|active| active.id != id);
        self.check_and_activate(events);
        Ok(())
    }

    /// One outstanding debuff per card cost; replaying does not stack it.
    fn add_cost_debuff(
        &mut self,
        card: &ActiveCard,
        cost_index: usize,
        cost: &CardCost,
        events: &mut EventBus,
    ) {
        let origin = CostOrigin {
            card: card.definition_id,
            cost_index,
        };
        if self
            .active_buffs
            .iter()
            .any(|buff| buff.origin == Some(origin))
        {
            debug!(card = %card.name, cost_index, "cost debuff already outstanding");
            return;
        }
        let id = self.alloc_instance_id();
        self.active_buffs
            .push(ActiveBuff::cost_debuff(id, card, cost_index, cost));
        events.push(Event::CostDebuffApplied {
            card: card.name.clone(),
            duration: cost.duration,
        });
    }

    /// Reverses and removes the named active buff; it stays down until a reset.
    pub fn clear_buff(&mut self, name: &str, events: &mut EventBus) -> bool {
        let Some(index) = self.active_buffs.iter().position(|buff| buff.name == name) else {
            debug!(buff = name, "nothing to clear");
            return false;
        };
        let buff = self.active_buffs.remove(index);
        self.reverse_buff(&buff, events);
        if let Some(def) = buff.definition_id {
            self.scheduler.manually_removed.insert(def);
        }
        info!(buff = %buff.name, "buff cleared");
        events.push(Event::BuffEnded { name: buff.name });
        true
    }
}
