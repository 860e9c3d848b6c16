use crate::{BuffEffect, CardCost, CardEffect, Trigger};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(transparent)]
pub struct DefinitionId(pub u64);

impl fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "def#{}", self.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardDef {
    #[serde(default)]
    pub id: DefinitionId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(default)]
    pub costs: Vec<CardCost>,
    #[serde(default)]
    pub effects: Vec<CardEffect>,
}

impl CardDef {
    pub fn new(name: impl Into<String>, trigger: Trigger) -> Self {
        Self {
            name: name.into(),
            trigger,
            ..Self::default()
        }
    }

    pub fn with_cost(mut self, cost: CardCost) -> Self {
        self.costs.push(cost);
        self
    }

    pub fn clearing(mut self, buff_name: impl Into<String>) -> Self {
        self.effects.push(CardEffect::ClearBuff {
            buff_name: buff_name.into(),
        });
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuffDef {
    #[serde(default)]
    pub id: DefinitionId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub trigger: Trigger,
    /// Turns the buff stays active; 0 means until cleared.
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub one_time: bool,
    #[serde(default)]
    pub effects: Vec<BuffEffect>,
}

impl BuffDef {
    pub fn new(name: impl Into<String>, trigger: Trigger) -> Self {
        Self {
            name: name.into(),
            trigger,
            ..Self::default()
        }
    }

    pub fn with_effect(mut self, effect: BuffEffect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn lasting(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    pub fn once(mut self) -> Self {
        self.one_time = true;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeDef {
    #[serde(default)]
    pub id: DefinitionId,
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub repeatable: bool,
    #[serde(default)]
    pub trigger: Trigger,
}

impl NarrativeDef {
    pub fn new(name: impl Into<String>, text: impl Into<String>, trigger: Trigger) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            trigger,
            ..Self::default()
        }
    }
}
