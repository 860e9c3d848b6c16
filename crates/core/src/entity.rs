use crate::ChangeType;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Resource,
    Stat,
}

impl EntityKind {
    pub const ALL: [Self; 2] = [Self::Resource, Self::Stat];

    pub fn label(self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Stat => "stat",
        }
    }

    pub fn from_keyword(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "resource" | "resources" | "res" => Some(Self::Resource),
            "stat" | "stats" => Some(Self::Stat),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Names a resource or stat. Built once at the edge, never re-parsed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub name: String,
}

impl EntityRef {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn resource(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Resource, name)
    }

    pub fn stat(name: impl Into<String>) -> Self {
        Self::new(EntityKind::Stat, name)
    }

    /// Parses the `kind:name` form used by older saves and by the CLI.
    pub fn parse_composite(value: &str) -> Option<Self> {
        let (kind, name) = value.split_once(':')?;
        let kind = EntityKind::from_keyword(kind)?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self::new(kind, name))
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// Presentation hint for whether a change reads as good news.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ColorLogic {
    #[default]
    Default,
    NegativeIsGood,
    Neutral,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Valence {
    Good,
    Bad,
    Neutral,
}

impl ColorLogic {
    pub fn valence(self, delta: f64) -> Valence {
        let good = match self {
            Self::Neutral => return Valence::Neutral,
            Self::NegativeIsGood => delta < 0.0,
            Self::Default => delta > 0.0,
        };
        if good {
            Valence::Good
        } else {
            Valence::Bad
        }
    }
}

/// Side effect fired when a cyclical resource wraps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CyclicalEffect {
    pub target: EntityRef,
    #[serde(default)]
    pub change_type: ChangeType,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub narrative_title: Option<String>,
    #[serde(default)]
    pub narrative_desc: Option<String>,
    #[serde(default = "default_true")]
    pub show_in_narrative: bool,
}

fn default_true() -> bool {
    true
}

/// A resource or a stat: a named number with drift, caps and reset rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NumericEntity {
    pub name: String,
    #[serde(default)]
    pub current_value: f64,
    #[serde(default)]
    pub base_value: f64,
    #[serde(default)]
    pub change_per_round: f64,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub is_hard_cap: bool,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub is_min_hard_cap: bool,
    #[serde(default)]
    pub allow_negative: bool,
    #[serde(default)]
    pub reset_every_turn: bool,
    #[serde(default)]
    pub color_logic: ColorLogic,
    #[serde(default)]
    pub cyclical: bool,
    #[serde(default)]
    pub cyclical_effects: Vec<CyclicalEffect>,
}

impl NumericEntity {
    pub fn new(name: impl Into<String>, base_value: f64) -> Self {
        Self {
            name: name.into(),
            current_value: base_value,
            base_value,
            ..Self::default()
        }
    }

    pub fn with_change(mut self, change_per_round: f64) -> Self {
        self.change_per_round = change_per_round;
        self
    }

    pub fn with_max(mut self, max_value: f64, hard: bool) -> Self {
        self.max_value = Some(max_value);
        self.is_hard_cap = hard;
        self
    }

    pub fn with_min(mut self, min_value: f64, hard: bool) -> Self {
        self.allow_negative = true;
        self.min_value = Some(min_value);
        self.is_min_hard_cap = hard;
        self
    }

    pub fn with_current(mut self, current_value: f64) -> Self {
        self.current_value = current_value;
        self
    }

    pub fn allowing_negative(mut self) -> Self {
        self.allow_negative = true;
        self
    }

    pub fn resetting_every_turn(mut self) -> Self {
        self.reset_every_turn = true;
        self
    }

    pub fn cyclical_with(mut self, effects: Vec<CyclicalEffect>) -> Self {
        self.cyclical = true;
        self.cyclical_effects = effects;
        self
    }

    pub fn hard_max(&self) -> Option<f64> {
        self.max_value.filter(|_| self.is_hard_cap)
    }

    pub fn soft_max(&self) -> Option<f64> {
        self.max_value.filter(|_| !self.is_hard_cap)
    }

    /// Lower bound only applies when the entity may go negative.
    pub fn hard_min(&self) -> Option<f64> {
        self.min_value
            .filter(|_| self.allow_negative && self.is_min_hard_cap)
    }

    pub fn soft_min(&self) -> Option<f64> {
        self.min_value
            .filter(|_| self.allow_negative && !self.is_min_hard_cap)
    }

    /// Wrap point of a cyclical resource; a zero or missing max disables wrapping.
    pub fn cyclical_max(&self) -> Option<f64> {
        if !self.cyclical {
            return None;
        }
        self.max_value.filter(|max| *max != 0.0)
    }
}

/// Name-indexed store that keeps insertion order for display.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct EntityStore {
    items: Vec<NumericEntity>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.items.iter().position(|item| item.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&NumericEntity> {
        self.items.iter().find(|item| item.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut NumericEntity> {
        self.items.iter_mut().find(|item| item.name == name)
    }

    pub fn get_index(&self, index: usize) -> Option<&NumericEntity> {
        self.items.get(index)
    }

    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut NumericEntity> {
        self.items.get_mut(index)
    }

    /// Returns false and leaves the store untouched when the name is taken.
    pub fn insert(&mut self, entity: NumericEntity) -> bool {
        if self.contains(&entity.name) {
            return false;
        }
        self.items.push(entity);
        true
    }

    pub fn replace(&mut self, name: &str, entity: NumericEntity) -> bool {
        match self.get_mut(name) {
            Some(slot) => {
                *slot = entity;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<NumericEntity> {
        let index = self.position(name)?;
        Some(self.items.remove(index))
    }

    pub fn move_item(&mut self, from: usize, to: usize) -> bool {
        if from >= self.items.len() || to >= self.items.len() {
            return false;
        }
        let item = self.items.remove(from);
        self.items.insert(to, item);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &NumericEntity> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut NumericEntity> {
        self.items.iter_mut()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.name.as_str())
    }
}

impl FromIterator<NumericEntity> for EntityStore {
    fn from_iter<I: IntoIterator<Item = NumericEntity>>(iter: I) -> Self {
        let mut store = Self::new();
        for entity in iter {
            store.insert(entity);
        }
        store
    }
}
