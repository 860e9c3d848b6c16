use crate::*;
use tracing::{debug, info};

impl WorldState {
    /// Runs the whole end-of-turn sequence. Each step sees the state left by
    /// the one before it.
    pub fn end_turn(&mut self, events: &mut EventBus) {
        self.scheduler.snapshot(&self.resources, &self.stats);
        self.current_turn = self.current_turn.saturating_add(1);
        info!(turn = self.current_turn, "turn started");
        self.announce_turn(events);

        self.tick_buff_durations(events);
        self.scheduler.expire_removal_marks(self.current_turn);
        let reset = self.apply_drift();
        self.process_cyclical(events);
        for resource in self.resources.iter_mut().filter(|entity| !entity.cyclical) {
            apply_caps(resource);
        }
        for stat in self.stats.iter_mut() {
            apply_caps(stat);
        }
        self.apply_end_of_round_effects(events);
        self.reassert_pinned_effects(&reset, events);
        self.deactivate_unavailable_cards(events);
        self.check_and_activate(events);
        self.check_narratives(events);
    }

    fn announce_turn(&self, events: &mut EventBus) {
        events.push(Event::TurnStarted {
            turn: self.current_turn,
            label: self.game_settings.round_label().to_string(),
            message: self.game_settings.round_message().map(str::to_string),
        });
    }

    fn tick_buff_durations(&mut self, events: &mut EventBus) {
        for buff in self.active_buffs.iter_mut().filter(|buff| !buff.is_permanent()) {
            buff.remaining = buff.remaining.saturating_sub(1);
        }
        let (expired, kept): (Vec<ActiveBuff>, Vec<ActiveBuff>) =
            std::mem::take(&mut self.active_buffs)
                .into_iter()
                .partition(|buff| !buff.is_permanent() && buff.remaining == 0);
        self.active_buffs = kept;
        for buff in expired {
            info!(buff = %buff.name, "buff expired");
            events.push(Event::BuffExpired {
                name: buff.name.clone(),
            });
            self.reverse_buff(&buff, events);
        }
    }

    /// Natural drift. Returns the entities that snapped back to their base.
    fn apply_drift(&mut self) -> Vec<EntityRef> {
        let mut reset = Vec::new();
        for kind in EntityKind::ALL {
            for entity in self.store_mut(kind).iter_mut() {
                if entity.reset_every_turn {
                    entity.current_value = entity.base_value;
                    reset.push(EntityRef::new(kind, entity.name.clone()));
                } else if entity.change_per_round != 0.0 {
                    apply_natural_change(entity);
                }
            }
        }
        reset
    }

    fn apply_end_of_round_effects(&mut self, events: &mut EventBus) {
        for index in 0..self.active_buffs.len() {
            let buff = &self.active_buffs[index];
            let name = buff.name.clone();
            let effects: Vec<BuffEffect> = buff
                .effects
                .iter()
                .filter(|effect| !effect.is_immediate())
                .cloned()
                .collect();
            for effect in &effects {
                self.apply_effect(&name, effect, events);
            }
        }
    }

    /// A buff pinning an entity that just reset puts its immediate effect back.
    /// The ledger entry for that effect is replaced, since the reset wiped the
    /// earlier application. Base-setting effects already live in the base the
    /// reset restored, so they are left alone.
    fn reassert_pinned_effects(&mut self, reset: &[EntityRef], events: &mut EventBus) {
        if reset.is_empty() {
            return;
        }
        let epsilon = self.config.change_epsilon;
        for index in 0..self.active_buffs.len() {
            let buff = &self.active_buffs[index];
            if !buff.effects_applied {
                continue;
            }
            let name = buff.name.clone();
            let pinned: Vec<(usize, BuffEffect)> = buff
                .effects
                .iter()
                .enumerate()
                .filter(|(_, effect)| {
                    effect.is_immediate() && !effect.set_base && reset.contains(&effect.target)
                })
                .map(|(effect_index, effect)| (effect_index, effect.clone()))
                .collect();
            for (effect_index, effect) in pinned {
                // A skipped re-apply still records zero: the reset undid the old delta.
                let applied = self
                    .apply_effect_quiet(&name, &effect, events)
                    .unwrap_or(0.0);
                if applied.abs() > epsilon {
                    self.report_change(&effect.target, applied, &name, events);
                }
                let buff = &mut self.active_buffs[index];
                if buff.applied_changes.is_some() {
                    buff.record_reapplied(AppliedChange {
                        target: effect.target.clone(),
                        delta: applied,
                        effect_index: Some(effect_index),
                    });
                }
                debug!(buff = %name, target = %effect.target, applied, "pinned effect reasserted");
            }
        }
    }

    /// Back to turn one with the collections kept. One-time buffs that
    /// already fired stay spent.
    pub fn reset_turn(&mut self, events: &mut EventBus) {
        self.current_turn = 1;
        for kind in EntityKind::ALL {
            for entity in self.store_mut(kind).iter_mut() {
                entity.current_value = entity.base_value;
                apply_caps(entity);
            }
        }
        self.active_cards.clear();
        self.active_buffs.clear();
        self.shown_narratives.clear();
        self.scheduler.clear_removal_marks();
        self.scheduler.prev_resources.clear();
        self.scheduler.prev_stats.clear();
        info!("turn reset");
        self.announce_turn(events);
        self.check_and_activate(events);
        self.check_narratives(events);
    }

    /// Empties the world. Only the engine configuration survives.
    pub fn reset_all(&mut self, events: &mut EventBus) {
        *self = WorldState::new(self.config.clone());
        info!("world reset");
        self.announce_turn(events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buff_expires_after_its_duration_and_reverses() {
        let mut world = WorldState::default();
        world
            .resources
            .insert(NumericEntity::new("Gold", 10.0).with_current(10.0));
        let mut events = EventBus::new();
        world.add_buff(
            BuffDef::new("Loan", Trigger::always())
                .lasting(2)
                .with_effect(BuffEffect::flat(
                    EntityRef::resource("Gold"),
                    50.0,
                    EffectPhase::Immediate,
                ))
                .once(),
            &mut events,
        )
        .expect("add");
        assert_eq!(world.value_of(&EntityRef::resource("Gold")), Some(60.0));
        world.end_turn(&mut events);
        assert!(world.find_active_buff("Loan").is_some());
        world.end_turn(&mut events);
        assert!(world.find_active_buff("Loan").is_none());
        assert_eq!(world.value_of(&EntityRef::resource("Gold")), Some(10.0));
    }

    #[test]
    fn end_of_round_effect_sees_this_turns_drift() {
        let mut world = WorldState::default();
        world.resources.insert(
            NumericEntity::new("Gold", 0.0)
                .with_change(5.0)
                .with_current(0.0),
        );
        world
            .stats
            .insert(NumericEntity::new("Mood", 0.0).with_current(0.0));
        let mut events = EventBus::new();
        world.add_buff(
            BuffDef::new("Payday", Trigger::always()).with_effect(
                BuffEffect::flat(EntityRef::stat("Mood"), 1.0, EffectPhase::EndOfRound).when(
                    EffectCondition::changes_by(EntityRef::resource("Gold"), 5.0),
                ),
            ),
            &mut events,
        )
        .expect("add");
        world.end_turn(&mut events);
        assert_eq!(world.value_of(&EntityRef::stat("Mood")), Some(1.0));
    }

    #[test]
    fn pinned_effect_survives_a_reset_and_reverses_cleanly() {
        let mut world = WorldState::default();
        world.stats.insert(
            NumericEntity::new("Energy", 3.0)
                .resetting_every_turn()
                .with_current(3.0),
        );
        let mut events = EventBus::new();
        world.add_buff(
            BuffDef::new("Coffee", Trigger::always())
                .lasting(3)
                .once()
                .with_effect(BuffEffect::flat(
                    EntityRef::stat("Energy"),
                    2.0,
                    EffectPhase::Immediate,
                )),
            &mut events,
        )
        .expect("add");
        assert_eq!(world.value_of(&EntityRef::stat("Energy")), Some(5.0));
        world.end_turn(&mut events);
        assert_eq!(world.value_of(&EntityRef::stat("Energy")), Some(5.0));
        world.end_turn(&mut events);
        assert_eq!(world.value_of(&EntityRef::stat("Energy")), Some(5.0));
        world.end_turn(&mut events);
        assert!(world.find_active_buff("Coffee").is_none());
        assert_eq!(world.value_of(&EntityRef::stat("Energy")), Some(3.0));
    }

    #[test]
    fn base_setting_buff_holds_steady_across_resets() {
        let mut world = WorldState::default();
        world.stats.insert(
            NumericEntity::new("Energy", 3.0)
                .resetting_every_turn()
                .with_current(3.0),
        );
        let energy = EntityRef::stat("Energy");
        let mut events = EventBus::new();
        world
            .add_buff(
                BuffDef::new("Training", Trigger::always()).with_effect(
                    BuffEffect::flat(energy.clone(), 2.0, EffectPhase::Immediate).setting_base(),
                ),
                &mut events,
            )
            .expect("add");
        for _ in 0..5 {
            world.end_turn(&mut events);
            assert_eq!(world.value_of(&energy), Some(5.0));
            assert_eq!(world.entity(&energy).map(|entity| entity.base_value), Some(5.0));
        }
    }

    #[test]
    fn skipped_reassert_leaves_nothing_to_reverse() {
        let mut world = WorldState::default();
        world.stats.insert(
            NumericEntity::new("Energy", 3.0)
                .resetting_every_turn()
                .with_current(3.0),
        );
        world.resources.insert(
            NumericEntity::new("Gold", 10.0)
                .with_change(-10.0)
                .with_current(10.0),
        );
        let energy = EntityRef::stat("Energy");
        let mut events = EventBus::new();
        world
            .add_buff(
                BuffDef::new("Rich", Trigger::always()).with_effect(
                    BuffEffect::flat(energy.clone(), 2.0, EffectPhase::Immediate).when(
                        EffectCondition::new(
                            EntityRef::resource("Gold"),
                            EffectConditionOp::Above,
                            5.0,
                        ),
                    ),
                ),
                &mut events,
            )
            .expect("add");
        assert_eq!(world.value_of(&energy), Some(5.0));
        world.end_turn(&mut events);
        assert_eq!(world.value_of(&energy), Some(3.0));
        assert!(world.clear_buff("Rich", &mut events));
        assert_eq!(world.value_of(&energy), Some(3.0));
    }

    #[test]
    fn reset_turn_keeps_collections_and_spent_one_time_buffs() {
        let mut world = WorldState::default();
        world
            .resources
            .insert(NumericEntity::new("Gold", 3.0).with_current(3.0));
        let mut events = EventBus::new();
        world.add_buff(
            BuffDef::new("Windfall", Trigger::always())
                .once()
                .with_effect(BuffEffect::flat(
                    EntityRef::resource("Gold"),
                    5.0,
                    EffectPhase::Immediate,
                )),
            &mut events,
        )
        .expect("add");
        world.end_turn(&mut events);
        world.reset_turn(&mut events);
        assert_eq!(world.current_turn, 1);
        assert_eq!(world.buff_collection.len(), 1);
        assert!(world.active_buffs.is_empty());
        assert_eq!(world.value_of(&EntityRef::resource("Gold")), Some(3.0));

        world.reset_all(&mut events);
        assert!(world.resources.is_empty());
        assert!(world.buff_collection.is_empty());
        assert!(world.scheduler.one_time_triggered.is_empty());
    }

    #[test]
    fn turn_banner_uses_round_settings() {
        let mut world = WorldState::default();
        world.game_settings.round_name = "Day".to_string();
        let mut events = EventBus::new();
        world.end_turn(&mut events);
        assert_eq!(
            events.iter().next(),
            Some(&Event::TurnStarted {
                turn: 2,
                label: "Day".to_string(),
                message: None,
            })
        );
    }
}
