use crate::migrate::upgrade;
use chrono::{DateTime, Utc};
use restrack_core::{
    BuffEffect, CardCost, CardEffect, NarrativeDef, NumericEntity, Trigger, WorldState,
};
use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

pub const SAVE_VERSION: u64 = 3;
pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported save version {found} (expected at most {})", SAVE_VERSION)]
    UnsupportedVersion { found: u64 },
    #[error("malformed save: {0}")]
    Malformed(String),
}

/// The persisted blob: every world field at the top level plus `version`.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedState {
    pub version: u64,
    pub world: WorldState,
}

impl SavedState {
    pub fn capture(world: &WorldState) -> Self {
        Self {
            version: SAVE_VERSION,
            world: world.clone(),
        }
    }

    pub fn to_value(&self) -> Result<Value, StoreError> {
        let mut value = serde_json::to_value(&self.world)?;
        match value.as_object_mut() {
            Some(map) => {
                map.insert("version".to_string(), Value::from(self.version));
                Ok(value)
            }
            None => Err(StoreError::Malformed("world did not serialise to an object".into())),
        }
    }

    /// Reads any supported blob, migrating older shapes first.
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        upgrade(value)
    }
}

impl Serialize for SavedState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value()
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SavedState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(D::Error::custom)
    }
}

/// Shareable snapshot: current values and definitions, no bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub game: ExportedGame,
    pub collection: ExportedCollection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportedGame {
    pub current_turn: u32,
    pub resources: Vec<NumericEntity>,
    pub stats: Vec<NumericEntity>,
    pub active_buffs: Vec<ExportedActiveBuff>,
    pub active_cards: Vec<ExportedActiveCard>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportedActiveBuff {
    pub name: String,
    pub description: String,
    pub duration: u32,
    pub remaining: u32,
    pub effects: Vec<BuffEffect>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportedActiveCard {
    pub name: String,
    pub description: String,
    pub costs: Vec<CardCost>,
    pub effects: Vec<CardEffect>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportedCollection {
    pub buffs: Vec<ExportedBuffDef>,
    pub cards: Vec<ExportedCardDef>,
    pub narratives: Vec<ExportedNarrative>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportedBuffDef {
    pub name: String,
    pub description: String,
    pub duration: u32,
    pub one_time: bool,
    pub trigger: Trigger,
    pub effects: Vec<BuffEffect>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportedCardDef {
    pub name: String,
    pub description: String,
    pub trigger: Trigger,
    pub costs: Vec<CardCost>,
    pub effects: Vec<CardEffect>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExportedNarrative {
    pub name: String,
    pub text: String,
    pub repeatable: bool,
    pub trigger: Trigger,
}

impl From<&NarrativeDef> for ExportedNarrative {
    fn from(def: &NarrativeDef) -> Self {
        Self {
            name: def.name.clone(),
            text: def.text.clone(),
            repeatable: def.repeatable,
            trigger: def.trigger.clone(),
        }
    }
}

pub fn export_snapshot(world: &WorldState) -> ExportSnapshot {
    export_snapshot_at(world, Utc::now())
}

pub fn export_snapshot_at(world: &WorldState, exported_at: DateTime<Utc>) -> ExportSnapshot {
    let game = ExportedGame {
        current_turn: world.current_turn,
        resources: world.resources.iter().cloned().collect(),
        stats: world.stats.iter().cloned().collect(),
        active_buffs: world
            .active_buffs
            .iter()
            .map(|buff| ExportedActiveBuff {
                name: buff.name.clone(),
                description: buff.description.clone(),
                duration: buff.duration,
                remaining: buff.remaining,
                effects: buff.effects.clone(),
            })
            .collect(),
        active_cards: world
            .active_cards
            .iter()
            .map(|card| ExportedActiveCard {
                name: card.name.clone(),
                description: card.description.clone(),
                costs: card.costs.clone(),
                effects: card.effects.clone(),
            })
            .collect(),
    };
    let collection = ExportedCollection {
        buffs: world
            .buff_collection
            .iter()
            .map(|def| ExportedBuffDef {
                name: def.name.clone(),
                description: def.description.clone(),
                duration: def.duration,
                one_time: def.one_time,
                trigger: def.trigger.clone(),
                effects: def.effects.clone(),
            })
            .collect(),
        cards: world
            .card_collection
            .iter()
            .map(|def| ExportedCardDef {
                name: def.name.clone(),
                description: def.description.clone(),
                trigger: def.trigger.clone(),
                costs: def.costs.clone(),
                effects: def.effects.clone(),
            })
            .collect(),
        narratives: world
            .narrative_collection
            .iter()
            .map(ExportedNarrative::from)
            .collect(),
    };
    ExportSnapshot {
        version: EXPORT_VERSION.to_string(),
        exported_at,
        game,
        collection,
    }
}
