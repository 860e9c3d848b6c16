use crate::lenient::{parse_number_or, parse_whole_or, string_or_number};
use crate::{round_to_cents, EntityKind};
use serde::{Deserialize, Deserializer, Serialize};

/// Threshold used by `custom` logic when no positive count was configured.
pub const DEFAULT_CUSTOM_THRESHOLD: u32 = 2;

/// Read-only view a trigger is evaluated against.
pub trait TriggerContext {
    fn current_turn(&self) -> u32;
    fn entity_value(&self, kind: EntityKind, name: &str) -> Option<f64>;
    fn buff_active(&self, name: &str) -> bool;
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriggerLogic {
    #[default]
    All,
    Any,
    Custom,
}

impl TriggerLogic {
    /// Unknown keywords read as `All`.
    pub fn from_keyword(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "any" | "or" => Self::Any,
            "custom" | "at_least" => Self::Custom,
            _ => Self::All,
        }
    }
}

impl<'de> Deserialize<'de> for TriggerLogic {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::from_keyword).unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConditionCategory {
    Turn,
    Resource,
    Stat,
    Buff,
}

impl ConditionCategory {
    pub fn entity_kind(self) -> Option<EntityKind> {
        match self {
            Self::Resource => Some(EntityKind::Resource),
            Self::Stat => Some(EntityKind::Stat),
            Self::Turn | Self::Buff => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConditionOperator {
    #[default]
    #[serde(rename = ">=", alias = "gte")]
    AtLeast,
    #[serde(rename = "<=", alias = "lte")]
    AtMost,
    #[serde(rename = "=", alias = "eq")]
    Equal,
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "inactive")]
    Inactive,
}

impl ConditionOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::AtLeast => ">=",
            Self::AtMost => "<=",
            Self::Equal => "=",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    fn compare(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::AtLeast => lhs >= rhs,
            Self::AtMost => lhs <= rhs,
            Self::Equal => round_to_cents(lhs) == round_to_cents(rhs),
            Self::Active | Self::Inactive => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub category: ConditionCategory,
    #[serde(default)]
    pub operator: ConditionOperator,
    #[serde(default)]
    pub target: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub value: String,
}

impl Condition {
    pub fn turn(operator: ConditionOperator, turn: u32) -> Self {
        Self {
            category: ConditionCategory::Turn,
            operator,
            target: String::new(),
            value: turn.to_string(),
        }
    }

    pub fn entity(
        kind: EntityKind,
        name: impl Into<String>,
        operator: ConditionOperator,
        value: f64,
    ) -> Self {
        let category = match kind {
            EntityKind::Resource => ConditionCategory::Resource,
            EntityKind::Stat => ConditionCategory::Stat,
        };
        Self {
            category,
            operator,
            target: name.into(),
            value: crate::lenient::format_number(value),
        }
    }

    pub fn buff_active(name: impl Into<String>) -> Self {
        Self {
            category: ConditionCategory::Buff,
            operator: ConditionOperator::Active,
            target: name.into(),
            value: String::new(),
        }
    }

    pub fn buff_inactive(name: impl Into<String>) -> Self {
        Self {
            operator: ConditionOperator::Inactive,
            ..Self::buff_active(name)
        }
    }

    /// Maps the flat `type` keywords of older saves (`resource_gte`, `buff_active`, ...).
    pub fn from_legacy(kind: &str, target: &str, value: &str) -> Self {
        let (category, operator) = match kind.trim().to_lowercase().as_str() {
            "turn" | "turn_gte" | "immediate" => (ConditionCategory::Turn, ConditionOperator::AtLeast),
            "turn_lte" => (ConditionCategory::Turn, ConditionOperator::AtMost),
            "turn_eq" => (ConditionCategory::Turn, ConditionOperator::Equal),
            "resource_gte" => (ConditionCategory::Resource, ConditionOperator::AtLeast),
            "resource_lte" => (ConditionCategory::Resource, ConditionOperator::AtMost),
            "stat_gte" => (ConditionCategory::Stat, ConditionOperator::AtLeast),
            "stat_lte" => (ConditionCategory::Stat, ConditionOperator::AtMost),
            "buff_active" => (ConditionCategory::Buff, ConditionOperator::Active),
            "buff_inactive" => (ConditionCategory::Buff, ConditionOperator::Inactive),
            _ => (ConditionCategory::Turn, ConditionOperator::AtLeast),
        };
        // Older targets carry a `kind:` prefix; only the name is kept.
        let target = match target.split_once(':') {
            Some((_, name)) => name.to_string(),
            None => target.to_string(),
        };
        Self {
            category,
            operator,
            target,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    #[serde(default)]
    pub logic: TriggerLogic,
    #[serde(default)]
    pub custom_value: u32,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Trigger {
    pub fn always() -> Self {
        Self::default()
    }

    pub fn all(conditions: Vec<Condition>) -> Self {
        Self {
            logic: TriggerLogic::All,
            custom_value: 0,
            conditions,
        }
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        Self {
            logic: TriggerLogic::Any,
            ..Self::all(conditions)
        }
    }

    pub fn at_least(count: u32, conditions: Vec<Condition>) -> Self {
        Self {
            logic: TriggerLogic::Custom,
            custom_value: count,
            conditions,
        }
    }

    pub fn threshold(&self) -> usize {
        if self.custom_value == 0 {
            DEFAULT_CUSTOM_THRESHOLD as usize
        } else {
            self.custom_value as usize
        }
    }
}

pub fn evaluate_condition<C>(condition: &Condition, ctx: &C) -> bool
where
    C: TriggerContext + ?Sized,
{
    match condition.category {
        ConditionCategory::Turn => {
            let threshold = parse_whole_or(&condition.value, 1);
            condition
                .operator
                .compare(f64::from(ctx.current_turn()), threshold as f64)
        }
        ConditionCategory::Resource | ConditionCategory::Stat => {
            let Some(kind) = condition.category.entity_kind() else {
                return false;
            };
            let Some(current) = ctx.entity_value(kind, &condition.target) else {
                return false;
            };
            let threshold = parse_number_or(&condition.value, 0.0);
            condition.operator.compare(current, threshold)
        }
        ConditionCategory::Buff => {
            if condition.target.is_empty() {
                return false;
            }
            match condition.operator {
                ConditionOperator::Active => ctx.buff_active(&condition.target),
                ConditionOperator::Inactive => !ctx.buff_active(&condition.target),
                _ => false,
            }
        }
    }
}

/// An empty condition list holds vacuously.
pub fn evaluate_trigger<C>(trigger: &Trigger, ctx: &C) -> bool
where
    C: TriggerContext + ?Sized,
{
    if trigger.conditions.is_empty() {
        return true;
    }
    let total = trigger.conditions.len();
    let passed = trigger
        .conditions
        .iter()
        .filter(|condition| evaluate_condition(condition, ctx))
        .count();
    match trigger.logic {
        TriggerLogic::All => passed == total,
        TriggerLogic::Any => passed > 0,
        TriggerLogic::Custom => passed >= trigger.threshold(),
    }
}
