use crate::EntityRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    #[default]
    Flat,
    Percent,
}

impl ChangeType {
    /// Percent is always taken of the value at apply time, never of the base.
    pub fn amount(self, current: f64, value: f64) -> f64 {
        match self {
            Self::Flat => value,
            Self::Percent => current * (value / 100.0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EffectPhase {
    #[default]
    Immediate,
    EndOfRound,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EffectConditionOp {
    #[serde(rename = "<")]
    Below,
    #[serde(rename = ">")]
    Above,
    #[serde(rename = "=")]
    Equal,
    /// This turn's movement equals `change` exactly.
    #[serde(rename = "changes")]
    Changes,
    #[serde(rename = "gains")]
    Gains,
    #[serde(rename = "loses")]
    Loses,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EffectCondition {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub target: EntityRef,
    pub operator: EffectConditionOp,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub change: f64,
}

fn enabled_by_default() -> bool {
    true
}

impl EffectCondition {
    pub fn new(target: EntityRef, operator: EffectConditionOp, value: f64) -> Self {
        Self {
            enabled: true,
            target,
            operator,
            value,
            change: 0.0,
        }
    }

    pub fn changes_by(target: EntityRef, change: f64) -> Self {
        Self {
            change,
            ..Self::new(target, EffectConditionOp::Changes, 0.0)
        }
    }
}

/// A targeted numeric change carried by a buff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuffEffect {
    pub target: EntityRef,
    #[serde(default)]
    pub effect_type: ChangeType,
    #[serde(default)]
    pub value: f64,
    #[serde(default, rename = "trigger")]
    pub phase: EffectPhase,
    #[serde(default)]
    pub condition: Option<EffectCondition>,
    #[serde(default)]
    pub set_base: bool,
}

impl BuffEffect {
    pub fn flat(target: EntityRef, value: f64, phase: EffectPhase) -> Self {
        Self {
            target,
            effect_type: ChangeType::Flat,
            value,
            phase,
            condition: None,
            set_base: false,
        }
    }

    pub fn percent(target: EntityRef, value: f64, phase: EffectPhase) -> Self {
        Self {
            effect_type: ChangeType::Percent,
            ..Self::flat(target, value, phase)
        }
    }

    pub fn when(mut self, condition: EffectCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn setting_base(mut self) -> Self {
        self.set_base = true;
        self
    }

    pub fn is_immediate(&self) -> bool {
        self.phase == EffectPhase::Immediate
    }
}

/// A debit paid when a card is played; `duration > 0` defers it into a debuff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardCost {
    pub target: EntityRef,
    #[serde(default)]
    pub cost_type: ChangeType,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub duration: u32,
}

impl CardCost {
    pub fn flat(target: EntityRef, value: f64) -> Self {
        Self {
            target,
            cost_type: ChangeType::Flat,
            value,
            duration: 0,
        }
    }

    pub fn over_turns(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    pub fn is_delayed(&self) -> bool {
        self.duration > 0
    }

    /// Costs always debit, whatever sign was entered.
    pub fn amount(&self, current: f64) -> f64 {
        self.cost_type.amount(current, self.value.abs())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardEffect {
    ClearBuff {
        #[serde(rename = "buffName", default)]
        buff_name: String,
    },
}

/// The change that actually landed on a target, after clamping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppliedChange {
    pub target: EntityRef,
    pub delta: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect_index: Option<usize>,
}
