use crate::*;
use tracing::{debug, warn};

impl WorldState {
    /// Adds `delta` to the target and re-caps. Returns the change that
    /// actually landed, which is what reversal must subtract.
    pub fn apply_raw_delta(&mut self, target: &EntityRef, delta: f64) -> Option<f64> {
        let entity = self.entity_mut(target)?;
        let before = entity.current_value;
        entity.current_value += delta;
        apply_caps(entity);
        Some(entity.current_value - before)
    }

    /// Applies one buff effect. A failed condition makes this a full no-op;
    /// a missing target is reported and skipped.
    pub fn apply_effect(
        &mut self,
        source: &str,
        effect: &BuffEffect,
        events: &mut EventBus,
    ) -> Option<f64> {
        let applied = self.apply_effect_quiet(source, effect, events)?;
        self.report_change(&effect.target, applied, source, events);
        Some(applied)
    }

    pub(crate) fn apply_effect_quiet(
        &mut self,
        source: &str,
        effect: &BuffEffect,
        events: &mut EventBus,
    ) -> Option<f64> {
        if let Some(condition) = &effect.condition {
            if condition.enabled && !self.evaluate_effect_condition(condition) {
                debug!(source, target = %effect.target, "effect condition not met");
                return None;
            }
        }
        let Some(current) = self.value_of(&effect.target) else {
            self.report_missing(&effect.target, source, events);
            return None;
        };
        let raw = effect.effect_type.amount(current, effect.value);
        let applied = self.apply_raw_delta(&effect.target, raw)?;
        if effect.set_base {
            if let Some(entity) = self.entity_mut(&effect.target) {
                entity.base_value = entity.current_value;
            }
        }
        Some(applied)
    }

    pub fn evaluate_effect_condition(&self, condition: &EffectCondition) -> bool {
        let Some(current) = self.value_of(&condition.target) else {
            return false;
        };
        let previous = self.scheduler.previous_value(&condition.target);
        match condition.operator {
            EffectConditionOp::Below => current < condition.value,
            EffectConditionOp::Above => current > condition.value,
            EffectConditionOp::Equal => round_to_cents(current) == round_to_cents(condition.value),
            EffectConditionOp::Changes => previous.is_some_and(|prev| {
                round_to_cents(current - prev) == round_to_cents(condition.change)
            }),
            EffectConditionOp::Gains => previous.is_some_and(|prev| current > prev),
            EffectConditionOp::Loses => previous.is_some_and(|prev| current < prev),
        }
    }

    /// Undoes everything `buff` put on the world by subtracting its ledger.
    pub fn reverse_buff(&mut self, buff: &ActiveBuff, events: &mut EventBus) {
        match &buff.applied_changes {
            Some(ledger) => {
                for change in ledger.iter().rev() {
                    match self.apply_raw_delta(&change.target, -change.delta) {
                        Some(applied) => {
                            self.report_change(&change.target, applied, &buff.name, events)
                        }
                        None => self.report_missing(&change.target, &buff.name, events),
                    }
                }
            }
            None => {
                if !buff.effects_applied {
                    return;
                }
                warn!(buff = %buff.name, "no ledger recorded; reversing by recomputation");
                for effect in buff.effects.iter().filter(|effect| effect.is_immediate()) {
                    let Some(current) = self.value_of(&effect.target) else {
                        self.report_missing(&effect.target, &buff.name, events);
                        continue;
                    };
                    let raw = effect.effect_type.amount(current, effect.value);
                    if let Some(applied) = self.apply_raw_delta(&effect.target, -raw) {
                        self.report_change(&effect.target, applied, &buff.name, events);
                    }
                }
            }
        }
        debug!(buff = %buff.name, "reversed");
    }

    pub(crate) fn report_change(
        &self,
        target: &EntityRef,
        delta: f64,
        source: &str,
        events: &mut EventBus,
    ) {
        if delta == 0.0 {
            return;
        }
        let color = self
            .entity(target)
            .map(|entity| entity.color_logic)
            .unwrap_or_default();
        events.push(Event::ValueChanged {
            target: target.clone(),
            delta,
            source: source.to_string(),
            valence: color.valence(delta),
        });
    }

    pub(crate) fn report_missing(&self, target: &EntityRef, source: &str, events: &mut EventBus) {
        warn!(source, %target, "effect target does not exist; skipped");
        events.push(Event::TargetMissing {
            target: target.clone(),
            source: source.to_string(),
        });
    }
}
