use crate::*;
use tracing::debug;

impl WorldState {
    /// Shows every narrative whose trigger holds and that has not been shown
    /// yet, unless it is repeatable.
    pub fn check_narratives(&mut self, events: &mut EventBus) {
        let due: Vec<NarrativeDef> = self
            .narrative_collection
            .iter()
            .filter(|def| def.repeatable || !self.shown_narratives.contains(&def.id))
            .filter(|def| evaluate_trigger(&def.trigger, &*self))
            .cloned()
            .collect();
        for def in due {
            debug!(narrative = %def.name, "narrative shown");
            self.shown_narratives.insert(def.id);
            events.push(Event::NarrativeShown {
                id: Some(def.id),
                title: def.name,
                text: def.text,
                value: None,
            });
        }
    }
}
