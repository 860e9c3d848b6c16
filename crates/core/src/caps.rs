use crate::NumericEntity;

pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Clamps against hard bounds only. Soft bounds are left to [`apply_natural_change`].
pub fn apply_caps(entity: &mut NumericEntity) {
    entity.current_value = round_to_cents(entity.current_value);

    if let Some(max) = entity.hard_max() {
        if entity.current_value > max {
            entity.current_value = max;
        }
    }

    if entity.allow_negative {
        if let Some(min) = entity.hard_min() {
            if entity.current_value < min {
                entity.current_value = min;
            }
        }
    } else if entity.current_value < 0.0 {
        entity.current_value = 0.0;
    }
}

/// One turn of drift. A soft bound stops drift in its direction of travel but
/// never pulls the value back.
pub fn apply_natural_change(entity: &mut NumericEntity) {
    let change = entity.change_per_round;
    let current = entity.current_value;
    let mut next = current + change;
    if entity.cyclical {
        entity.current_value = next;
        return;
    }

    if let Some(max) = entity.soft_max() {
        if change > 0.0 {
            next = if current < max { next.min(max) } else { current };
        } else if change < 0.0 && current > max {
            next = next.max(max);
        }
    }
    if let Some(min) = entity.soft_min() {
        if change < 0.0 {
            next = if current > min { next.max(min) } else { current };
        } else if change > 0.0 && current < min {
            next = next.min(min);
        }
    }
    entity.current_value = next;
}
