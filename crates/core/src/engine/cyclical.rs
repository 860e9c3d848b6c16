use crate::*;
use tracing::{debug, warn};

impl WorldState {
    /// Wraps cyclical resources until a full pass wraps nothing, or the
    /// configured pass limit is hit.
    pub fn process_cyclical(&mut self, events: &mut EventBus) {
        let limit = self.config.cyclical_pass_limit.max(1);
        for pass in 1..=limit {
            let mut wrapped = false;
            for index in 0..self.resources.len() {
                if self.wrap_resource(index, events) {
                    wrapped = true;
                }
            }
            if !wrapped {
                debug!(passes = pass, "cyclical cascade settled");
                return;
            }
        }
        if (0..self.resources.len()).any(|index| self.wrap_target(index).is_some()) {
            warn!(passes = limit, "cyclical cascade did not settle; stopping");
            events.push(Event::CascadeLimitReached { passes: limit });
        }
    }

    fn wrap_target(&self, index: usize) -> Option<f64> {
        let entity = self.resources.get_index(index)?;
        if !entity.cyclical {
            return None;
        }
        let max = entity.cyclical_max()?;
        if entity.change_per_round < 0.0 {
            (entity.current_value < 1.0).then_some(max)
        } else {
            (entity.current_value > max).then_some(entity.base_value)
        }
    }

    fn wrap_resource(&mut self, index: usize, events: &mut EventBus) -> bool {
        let Some(reset_to) = self.wrap_target(index) else {
            return false;
        };
        let Some(entity) = self.resources.get_index_mut(index) else {
            return false;
        };
        entity.current_value = reset_to;
        let source = entity.name.clone();
        let wrap_effects = entity.cyclical_effects.clone();
        events.push(Event::ValueReset {
            target: EntityRef::resource(source.clone()),
            value: reset_to,
        });
        debug!(resource = %source, value = reset_to, "cyclical wrap");

        for effect in &wrap_effects {
            self.fire_wrap_effect(&source, effect, events);
        }
        true
    }

    fn fire_wrap_effect(&mut self, source: &str, effect: &CyclicalEffect, events: &mut EventBus) {
        let Some(target) = self.entity_mut(&effect.target) else {
            self.report_missing(&effect.target, source, events);
            return;
        };
        let before = target.current_value;
        target.current_value += effect.change_type.amount(before, effect.value);
        // Cyclical targets stay uncapped so the next pass can see them overflow.
        if !target.cyclical {
            apply_caps(target);
        }
        let applied = target.current_value - before;
        self.report_change(&effect.target, applied, source, events);

        if let Some(title) = effect.narrative_title.as_ref().filter(|title| !title.is_empty()) {
            let value = effect.show_in_narrative.then(|| {
                let amount = match effect.change_type {
                    ChangeType::Flat => format_change(applied),
                    ChangeType::Percent => format!("{}%", format_change(effect.value)),
                };
                format!("{amount} {}", effect.target.name)
            });
            events.push(Event::NarrativeShown {
                id: None,
                title: title.clone(),
                text: effect.narrative_desc.clone().unwrap_or_default(),
                value,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calendar() -> WorldState {
        let mut world = WorldState::default();
        world.resources.insert(
            NumericEntity::new("Hour", 1.0)
                .with_change(1.0)
                .with_max(24.0, true)
                .cyclical_with(vec![CyclicalEffect {
                    target: EntityRef::resource("Day"),
                    change_type: ChangeType::Flat,
                    value: 1.0,
                    narrative_title: Some("Dawn".to_string()),
                    narrative_desc: None,
                    show_in_narrative: true,
                }])
                .with_current(25.0),
        );
        world.resources.insert(
            NumericEntity::new("Day", 1.0)
                .with_max(2.0, true)
                .cyclical_with(vec![CyclicalEffect {
                    target: EntityRef::resource("Month"),
                    change_type: ChangeType::Flat,
                    value: 1.0,
                    narrative_title: None,
                    narrative_desc: None,
                    show_in_narrative: true,
                }])
                .with_current(2.0),
        );
        world
            .resources
            .insert(NumericEntity::new("Month", 1.0).with_current(1.0));
        world
    }

    #[test]
    fn wrap_cascades_through_the_calendar() {
        let mut world = calendar();
        let mut events = EventBus::new();
        world.process_cyclical(&mut events);
        assert_eq!(world.value_of(&EntityRef::resource("Hour")), Some(1.0));
        assert_eq!(world.value_of(&EntityRef::resource("Day")), Some(1.0));
        assert_eq!(world.value_of(&EntityRef::resource("Month")), Some(2.0));
        assert!(events.iter().any(|event| matches!(
            event,
            Event::NarrativeShown { title, value: Some(value), .. }
                if title == "Dawn" && value == "+1 Day"
        )));
    }

    #[test]
    fn mutual_wraps_stop_at_the_pass_limit() {
        let mut world = WorldState::default();
        world.config.cyclical_pass_limit = 3;
        for (name, other) in [("A", "B"), ("B", "A")] {
            world.resources.insert(
                NumericEntity::new(name, 5.0)
                    .with_change(1.0)
                    .with_max(2.0, true)
                    .cyclical_with(vec![CyclicalEffect {
                        target: EntityRef::resource(other),
                        change_type: ChangeType::Flat,
                        value: 10.0,
                        narrative_title: None,
                        narrative_desc: None,
                        show_in_narrative: false,
                    }])
                    .with_current(3.0),
            );
        }
        let mut events = EventBus::new();
        world.process_cyclical(&mut events);
        assert!(events
            .iter()
            .any(|event| matches!(event, Event::CascadeLimitReached { passes: 3 })));
    }
}
