use crate::{
    AppliedChange, BuffDef, BuffEffect, CardCost, CardDef, CardEffect, DefinitionId, EffectPhase,
    EngineConfig, EntityKind, EntityRef, EntityStore, GameSettings, NarrativeDef, NumericEntity,
    Trigger, TriggerContext,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(transparent)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveCard {
    pub id: InstanceId,
    pub definition_id: DefinitionId,
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

impl ActiveCard {
    pub fn from_def(id: InstanceId, def: &CardDef) -> Self {
        Self {
            id,
            definition_id: def.id,
            name: def.name.clone(),
            description: def.description.clone(),
            trigger: def.trigger.clone(),
            costs: def.costs.clone(),
            effects: def.effects.clone(),
        }
    }
}

/// Which card cost a synthetic debuff was created for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CostOrigin {
    pub card: DefinitionId,
    pub cost_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveBuff {
    pub id: InstanceId,
    #[serde(default)]
    pub definition_id: Option<DefinitionId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub effects: Vec<BuffEffect>,
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub remaining: u32,
    #[serde(default)]
    pub effects_applied: bool,
    /// Exact post-clamp deltas this instance put on the world. `None` marks
    /// data saved before the ledger existed; reversal then recomputes.
    #[serde(default)]
    pub applied_changes: Option<Vec<AppliedChange>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<CostOrigin>,
}

impl ActiveBuff {
    pub fn from_def(id: InstanceId, def: &BuffDef) -> Self {
        Self {
            id,
            definition_id: Some(def.id),
            name: def.name.clone(),
            description: def.description.clone(),
            effects: def.effects.clone(),
            duration: def.duration,
            remaining: def.duration,
            effects_applied: false,
            applied_changes: Some(Vec::new()),
            origin: None,
        }
    }

    pub fn cost_debuff(id: InstanceId, card: &ActiveCard, cost_index: usize, cost: &CardCost) -> Self {
        let effect = BuffEffect {
            effect_type: cost.cost_type,
            ..BuffEffect::flat(cost.target.clone(), -cost.value.abs(), EffectPhase::EndOfRound)
        };
        Self {
            id,
            definition_id: None,
            name: format!("{}: Cost", card.name),
            description: format!("Cost from playing {}", card.name),
            effects: vec![effect],
            duration: cost.duration,
            remaining: cost.duration,
            effects_applied: true,
            applied_changes: Some(Vec::new()),
            origin: Some(CostOrigin {
                card: card.definition_id,
                cost_index,
            }),
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.duration == 0
    }

    /// Replaces the ledger entry for `effect_index`, or appends one.
    pub fn record_reapplied(&mut self, change: AppliedChange) {
        let ledger = self.applied_changes.get_or_insert_with(Vec::new);
        match ledger
            .iter_mut()
            .find(|entry| entry.effect_index.is_some() && entry.effect_index == change.effect_index)
        {
            Some(entry) => *entry = change,
            None => ledger.push(change),
        }
    }
}

/// Scheduler bookkeeping kept apart from the definitions it gates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SchedulerState {
    pub removed_on_turn: BTreeMap<DefinitionId, u32>,
    pub manually_removed: BTreeSet<DefinitionId>,
    pub one_time_triggered: BTreeSet<DefinitionId>,
    pub prev_resources: BTreeMap<String, f64>,
    pub prev_stats: BTreeMap<String, f64>,
    pub next_instance_id: u64,
    pub next_definition_id: u64,
}

impl SchedulerState {
    pub fn snapshot(&mut self, resources: &EntityStore, stats: &EntityStore) {
        self.prev_resources = resources
            .iter()
            .map(|entity| (entity.name.clone(), entity.current_value))
            .collect();
        self.prev_stats = stats
            .iter()
            .map(|entity| (entity.name.clone(), entity.current_value))
            .collect();
    }

    pub fn previous_value(&self, target: &EntityRef) -> Option<f64> {
        self.prev_for(target.kind).get(&target.name).copied()
    }

    /// Card markers stamped on an earlier turn no longer block activation.
    pub fn expire_removal_marks(&mut self, current_turn: u32) {
        self.removed_on_turn.retain(|_, turn| *turn >= current_turn);
    }

    pub fn clear_removal_marks(&mut self) {
        self.removed_on_turn.clear();
        self.manually_removed.clear();
    }

    pub fn forget(&mut self, id: DefinitionId) {
        self.removed_on_turn.remove(&id);
        self.manually_removed.remove(&id);
        self.one_time_triggered.remove(&id);
    }

    pub fn forget_entity(&mut self, target: &EntityRef) {
        match target.kind {
            EntityKind::Resource => self.prev_resources.remove(&target.name),
            EntityKind::Stat => self.prev_stats.remove(&target.name),
        };
    }

    fn prev_for(&self, kind: EntityKind) -> &BTreeMap<String, f64> {
        match kind {
            EntityKind::Resource => &self.prev_resources,
            EntityKind::Stat => &self.prev_stats,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WorldState {
    pub current_turn: u32,
    pub resources: EntityStore,
    pub stats: EntityStore,
    pub card_collection: Vec<CardDef>,
    pub buff_collection: Vec<BuffDef>,
    pub narrative_collection: Vec<NarrativeDef>,
    pub active_cards: Vec<ActiveCard>,
    pub active_buffs: Vec<ActiveBuff>,
    pub shown_narratives: BTreeSet<DefinitionId>,
    pub game_settings: GameSettings,
    pub scheduler: SchedulerState,
    #[serde(skip)]
    pub config: EngineConfig,
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl WorldState {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            current_turn: 1,
            resources: EntityStore::new(),
            stats: EntityStore::new(),
            card_collection: Vec::new(),
            buff_collection: Vec::new(),
            narrative_collection: Vec::new(),
            active_cards: Vec::new(),
            active_buffs: Vec::new(),
            shown_narratives: BTreeSet::new(),
            game_settings: GameSettings::default(),
            scheduler: SchedulerState::default(),
            config,
        }
    }

    pub fn store(&self, kind: EntityKind) -> &EntityStore {
        match kind {
            EntityKind::Resource => &self.resources,
            EntityKind::Stat => &self.stats,
        }
    }

    pub fn store_mut(&mut self, kind: EntityKind) -> &mut EntityStore {
        match kind {
            EntityKind::Resource => &mut self.resources,
            EntityKind::Stat => &mut self.stats,
        }
    }

    pub fn entity(&self, target: &EntityRef) -> Option<&NumericEntity> {
        self.store(target.kind).get(&target.name)
    }

    pub fn entity_mut(&mut self, target: &EntityRef) -> Option<&mut NumericEntity> {
        self.store_mut(target.kind).get_mut(&target.name)
    }

    pub fn value_of(&self, target: &EntityRef) -> Option<f64> {
        self.entity(target).map(|entity| entity.current_value)
    }

    pub fn card_def(&self, id: DefinitionId) -> Option<&CardDef> {
        self.card_collection.iter().find(|def| def.id == id)
    }

    pub fn buff_def(&self, id: DefinitionId) -> Option<&BuffDef> {
        self.buff_collection.iter().find(|def| def.id == id)
    }

    pub fn narrative_def(&self, id: DefinitionId) -> Option<&NarrativeDef> {
        self.narrative_collection.iter().find(|def| def.id == id)
    }

    pub fn active_card(&self, id: InstanceId) -> Option<&ActiveCard> {
        self.active_cards.iter().find(|card| card.id == id)
    }

    pub fn find_active_card(&self, name: &str) -> Option<&ActiveCard> {
        self.active_cards.iter().find(|card| card.name == name)
    }

    pub fn find_active_buff(&self, name: &str) -> Option<&ActiveBuff> {
        self.active_buffs.iter().find(|buff| buff.name == name)
    }

    pub fn card_is_active(&self, id: DefinitionId) -> bool {
        self.active_cards.iter().any(|card| card.definition_id == id)
    }

    pub fn buff_is_active(&self, id: DefinitionId) -> bool {
        self.active_buffs
            .iter()
            .any(|buff| buff.definition_id == Some(id))
    }

    pub fn alloc_instance_id(&mut self) -> InstanceId {
        self.scheduler.next_instance_id += 1;
        InstanceId(self.scheduler.next_instance_id)
    }

    pub fn alloc_definition_id(&mut self) -> DefinitionId {
        self.scheduler.next_definition_id += 1;
        DefinitionId(self.scheduler.next_definition_id)
    }

    /// Moves the id counters past anything already present, e.g. after loading
    /// a hand-written world.
    pub fn sync_id_counters(&mut self) {
        let max_def = self
            .card_collection
            .iter()
            .map(|def| def.id.0)
            .chain(self.buff_collection.iter().map(|def| def.id.0))
            .chain(self.narrative_collection.iter().map(|def| def.id.0))
            .max()
            .unwrap_or(0);
        let max_instance = self
            .active_cards
            .iter()
            .map(|card| card.id.0)
            .chain(self.active_buffs.iter().map(|buff| buff.id.0))
            .max()
            .unwrap_or(0);
        self.scheduler.next_definition_id = self.scheduler.next_definition_id.max(max_def);
        self.scheduler.next_instance_id = self.scheduler.next_instance_id.max(max_instance);
    }
}

impl TriggerContext for WorldState {
    fn current_turn(&self) -> u32 {
        self.current_turn
    }

    fn entity_value(&self, kind: EntityKind, name: &str) -> Option<f64> {
        self.store(kind).get(name).map(|entity| entity.current_value)
    }

    fn buff_active(&self, name: &str) -> bool {
        self.find_active_buff(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_reapplied_replaces_matching_entry() {
        let def = BuffDef::new("Pin", Trigger::always());
        let mut buff = ActiveBuff::from_def(InstanceId(1), &def);
        let target = EntityRef::resource("Gold");
        buff.record_reapplied(AppliedChange {
            target: target.clone(),
            delta: 5.0,
            effect_index: Some(0),
        });
        buff.record_reapplied(AppliedChange {
            target: target.clone(),
            delta: 3.0,
            effect_index: Some(0),
        });
        buff.record_reapplied(AppliedChange {
            target,
            delta: 1.0,
            effect_index: Some(1),
        });
        let ledger = buff.applied_changes.unwrap_or_default();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger[0].delta, 3.0);
    }

    #[test]
    fn removal_marks_expire_after_their_turn() {
        let mut scheduler = SchedulerState::default();
        scheduler.removed_on_turn.insert(DefinitionId(1), 3);
        scheduler.expire_removal_marks(3);
        assert!(scheduler.removed_on_turn.contains_key(&DefinitionId(1)));
        scheduler.expire_removal_marks(4);
        assert!(scheduler.removed_on_turn.is_empty());
    }

    #[test]
    fn world_serialises_scheduler_with_string_keys() {
        let mut world = WorldState::default();
        world.scheduler.removed_on_turn.insert(DefinitionId(7), 2);
        world.scheduler.one_time_triggered.insert(DefinitionId(9));
        let json = serde_json::to_string(&world).expect("serialise");
        let back: WorldState = serde_json::from_str(&json).expect("deserialise");
        assert_eq!(back.scheduler, world.scheduler);
        assert_eq!(back.current_turn, 1);
    }

    #[test]
    fn sync_id_counters_skips_existing_ids() {
        let mut world = WorldState::default();
        let mut def = CardDef::new("Trade", Trigger::always());
        def.id = DefinitionId(12);
        world.card_collection.push(def);
        world.sync_id_counters();
        assert_eq!(world.alloc_definition_id(), DefinitionId(13));
    }
}
