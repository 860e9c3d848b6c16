//! Upgrades older save blobs to the current shape before typed decoding.
//!
//! Unversioned blobs use flat `targetType`/`targetName` pairs, `type`-keyword
//! trigger conditions, timestamp ids and bookkeeping flags stored on the
//! definitions themselves. Everything is rewritten on the raw JSON so the
//! typed model never sees the old layout.

use crate::schema::{SavedState, StoreError, SAVE_VERSION};
use restrack_core::{Condition, EntityKind, WorldState};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

pub fn upgrade(value: Value) -> Result<SavedState, StoreError> {
    let Value::Object(mut map) = value else {
        return Err(StoreError::Malformed("expected a JSON object".into()));
    };
    let version = read_version(map.remove("version"))?;
    if version > SAVE_VERSION {
        return Err(StoreError::UnsupportedVersion { found: version });
    }
    if version < SAVE_VERSION {
        debug!(from = version, to = SAVE_VERSION, "migrating save");
        migrate_legacy(&mut map);
    }
    let mut world: WorldState = serde_json::from_value(Value::Object(map))?;
    world.sync_id_counters();
    Ok(SavedState {
        version: SAVE_VERSION,
        world,
    })
}

fn read_version(raw: Option<Value>) -> Result<u64, StoreError> {
    match raw {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(number)) => number
            .as_u64()
            .ok_or_else(|| StoreError::Malformed(format!("bad version {number}"))),
        Some(Value::String(text)) => text
            .trim()
            .parse()
            .map_err(|_| StoreError::Malformed(format!("bad version {text:?}"))),
        Some(other) => Err(StoreError::Malformed(format!("bad version {other}"))),
    }
}

#[derive(Default)]
struct Scheduler {
    removed_on_turn: BTreeMap<u64, u64>,
    manually_removed: BTreeSet<u64>,
    one_time_triggered: BTreeSet<u64>,
    prev_resources: BTreeMap<String, f64>,
    prev_stats: BTreeMap<String, f64>,
}

const DEFINITION_COLLECTIONS: [&str; 3] = ["cardCollection", "buffCollection", "narrativeCollection"];

/// Old id (as JSON text) to new id, per collection.
type IdMap = HashMap<String, u64>;

fn migrate_legacy(map: &mut Map<String, Value>) {
    let mut scheduler = Scheduler::default();

    for kind in EntityKind::ALL {
        let (key, prev) = match kind {
            EntityKind::Resource => ("resources", &mut scheduler.prev_resources),
            EntityKind::Stat => ("stats", &mut scheduler.prev_stats),
        };
        for entity in objects_mut(map, key) {
            migrate_entity(entity, prev);
        }
    }

    let mut next_id = highest_definition_id(map);
    let cards = renumber_definitions(map, "cardCollection", &mut next_id);
    let buffs = renumber_definitions(map, "buffCollection", &mut next_id);
    let narratives = renumber_definitions(map, "narrativeCollection", &mut next_id);

    for def in objects_mut(map, "cardCollection") {
        let id = def_id(def);
        if let Some(turn) = def.remove("_removedOnTurn").and_then(|turn| turn.as_u64()) {
            scheduler.removed_on_turn.insert(id, turn);
        }
        def.remove("_manuallyRemoved");
        migrate_trigger(def);
        migrate_costs(def);
        migrate_card_effects(def);
    }
    for def in objects_mut(map, "buffCollection") {
        let id = def_id(def);
        if take_flag(def, "_manuallyRemoved") {
            scheduler.manually_removed.insert(id);
        }
        if take_flag(def, "_oneTimeTriggered") {
            scheduler.one_time_triggered.insert(id);
        }
        def.remove("_removedOnTurn");
        migrate_trigger(def);
        migrate_buff_effects(def);
    }
    for def in objects_mut(map, "narrativeCollection") {
        migrate_trigger(def);
    }

    let mut instance = 0;
    for card in objects_mut(map, "activeCards") {
        instance += 1;
        card.insert("id".into(), json!(instance));
        let definition = remap_reference(card.remove("collectionId"), &cards);
        if !card.contains_key("definitionId") {
            card.insert("definitionId".into(), json!(definition.unwrap_or(0)));
        }
        migrate_trigger(card);
        migrate_costs(card);
        migrate_card_effects(card);
    }
    for buff in objects_mut(map, "activeBuffs") {
        instance += 1;
        buff.insert("id".into(), json!(instance));
        if let Some(raw) = buff.remove("collectionId") {
            let definition = remap_reference(Some(raw), &buffs);
            buff.insert("definitionId".into(), json!(definition));
        }
        if let Some(remaining) = buff.remove("currentValue") {
            buff.entry("remaining").or_insert(remaining);
        }
        buff.remove("fromCard");
        buff.remove("_effectsApplied");
        buff.insert("effectsApplied".into(), Value::Bool(true));
        if let Some(ledger) = buff.remove("_appliedChanges") {
            if let Some(entries) = migrate_ledger(ledger) {
                buff.insert("appliedChanges".into(), Value::Array(entries));
            }
        }
        migrate_trigger(buff);
        migrate_buff_effects(buff);
    }

    if let Some(Value::Array(shown)) = map.get_mut("shownNarratives") {
        let kept: Vec<Value> = shown
            .iter()
            .filter_map(|raw| narratives.get(&raw.to_string()).map(|id| json!(id)))
            .collect();
        *shown = kept;
    }

    let mut merged = match map.remove("scheduler") {
        Some(Value::Object(existing)) => existing,
        _ => Map::new(),
    };
    merged
        .entry("removedOnTurn")
        .or_insert_with(|| json!(scheduler.removed_on_turn));
    merged
        .entry("manuallyRemoved")
        .or_insert_with(|| json!(scheduler.manually_removed));
    merged
        .entry("oneTimeTriggered")
        .or_insert_with(|| json!(scheduler.one_time_triggered));
    merged
        .entry("prevResources")
        .or_insert_with(|| json!(scheduler.prev_resources));
    merged
        .entry("prevStats")
        .or_insert_with(|| json!(scheduler.prev_stats));
    map.insert("scheduler".into(), Value::Object(merged));
}

fn objects_mut<'a>(
    map: &'a mut Map<String, Value>,
    key: &str,
) -> impl Iterator<Item = &'a mut Map<String, Value>> {
    map.get_mut(key)
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object_mut)
}

fn def_id(def: &Map<String, Value>) -> u64 {
    def.get("id").and_then(Value::as_u64).unwrap_or(0)
}

fn take_flag(object: &mut Map<String, Value>, key: &str) -> bool {
    matches!(object.remove(key), Some(Value::Bool(true)))
}

fn highest_definition_id(map: &mut Map<String, Value>) -> u64 {
    let mut highest = 0;
    for key in DEFINITION_COLLECTIONS {
        for def in objects_mut(map, key) {
            highest = highest.max(def_id(def));
        }
    }
    highest
}

/// Keeps positive whole ids that are unique within the collection; every
/// other id is replaced past the highest id seen so far.
fn renumber_definitions(map: &mut Map<String, Value>, key: &str, next_id: &mut u64) -> IdMap {
    let mut mapping = IdMap::new();
    let mut kept = BTreeSet::new();
    let mut pending = Vec::new();
    for (index, def) in objects_mut(map, key).enumerate() {
        let raw = def.get("id").cloned().unwrap_or(Value::Null);
        match raw.as_u64().filter(|id| *id > 0) {
            Some(id) if kept.insert(id) => {
                mapping.insert(raw.to_string(), id);
                *next_id = (*next_id).max(id);
            }
            _ => pending.push(index),
        }
    }
    for (index, def) in objects_mut(map, key).enumerate() {
        if !pending.contains(&index) {
            continue;
        }
        *next_id += 1;
        let raw = def.insert("id".into(), json!(*next_id));
        if let Some(raw) = raw.filter(|raw| !raw.is_null()) {
            mapping.entry(raw.to_string()).or_insert(*next_id);
        }
        debug!(collection = key, id = *next_id, "definition renumbered");
    }
    mapping
}

fn remap_reference(raw: Option<Value>, mapping: &IdMap) -> Option<u64> {
    let raw = raw.filter(|raw| !raw.is_null())?;
    let found = mapping.get(&raw.to_string()).copied();
    if found.is_none() {
        warn!(reference = %raw, "dangling definition reference dropped");
    }
    found
}

fn migrate_entity(entity: &mut Map<String, Value>, prev: &mut BTreeMap<String, f64>) {
    if let Some(flag) = entity.remove("negativeIsGood") {
        let logic = if flag.as_bool() == Some(true) {
            "negative_is_good"
        } else {
            "default"
        };
        entity.entry("colorLogic").or_insert_with(|| json!(logic));
    }
    let hard = entity.remove("hardCap").filter(|cap| !cap.is_null());
    let soft = entity.remove("softCap").filter(|cap| !cap.is_null());
    if !entity.contains_key("maxValue") {
        if let Some(cap) = hard {
            entity.insert("maxValue".into(), cap);
            entity.insert("isHardCap".into(), Value::Bool(true));
        } else if let Some(cap) = soft {
            entity.insert("maxValue".into(), cap);
            entity.insert("isHardCap".into(), Value::Bool(false));
        }
    }
    let name = entity
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if let Some(value) = entity.remove("_prevValue").and_then(|value| value.as_f64()) {
        prev.insert(name, value);
    }
    if let Some(Value::Array(effects)) = entity.get_mut("cyclicalEffects") {
        for effect in effects.iter_mut().filter_map(Value::as_object_mut) {
            migrate_target(effect, "targetType", "targetName", "target");
        }
    }
}

/// Folds a `targetType`/`targetName` pair into a structured reference.
fn migrate_target(object: &mut Map<String, Value>, kind_key: &str, name_key: &str, into: &str) {
    let kind = object.remove(kind_key);
    let name = object.remove(name_key);
    if object.contains_key(into) {
        return;
    }
    let kind = kind
        .as_ref()
        .and_then(Value::as_str)
        .and_then(EntityKind::from_keyword);
    let name = name.as_ref().and_then(Value::as_str).map(str::trim);
    match (kind, name) {
        (Some(kind), Some(name)) if !name.is_empty() => {
            object.insert(into.into(), json!({ "kind": kind, "name": name }));
        }
        _ => warn!("reference without a usable target"),
    }
}

fn migrate_trigger(def: &mut Map<String, Value>) {
    let trigger_type = def.remove("triggerType");
    let trigger_value = def.remove("triggerValue");
    if !def.get("trigger").is_some_and(Value::is_object) {
        if trigger_type.is_none() && trigger_value.is_none() {
            return;
        }
        let kind = trigger_type
            .as_ref()
            .and_then(Value::as_str)
            .filter(|kind| !kind.is_empty() && *kind != "immediate")
            .unwrap_or("turn")
            .to_string();
        let value = trigger_value
            .as_ref()
            .map(value_text)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| "1".to_string());
        def.insert(
            "trigger".into(),
            json!({
                "logic": "all",
                "customValue": 1,
                "conditions": [{ "type": kind, "value": value, "target": "" }],
            }),
        );
    }
    let Some(Value::Object(trigger)) = def.get_mut("trigger") else {
        return;
    };
    if let Some(raw) = trigger.get("customValue") {
        let count = value_text(raw)
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .unwrap_or(0.0)
            .max(0.0)
            .trunc() as u64;
        trigger.insert("customValue".into(), json!(count));
    }
    if let Some(Value::Array(conditions)) = trigger.get_mut("conditions") {
        for condition in conditions.iter_mut() {
            let Some(object) = condition.as_object() else {
                continue;
            };
            if object.contains_key("category") {
                continue;
            }
            let text = |key: &str| object.get(key).map(value_text).unwrap_or_default();
            let legacy = Condition::from_legacy(&text("type"), &text("target"), &text("value"));
            if let Ok(value) = serde_json::to_value(legacy) {
                *condition = value;
            }
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn migrate_buff_effects(def: &mut Map<String, Value>) {
    let Some(Value::Array(effects)) = def.get_mut("effects") else {
        return;
    };
    for effect in effects.iter_mut().filter_map(Value::as_object_mut) {
        migrate_target(effect, "targetType", "targetName", "target");
        if let Some(Value::Object(condition)) = effect.get_mut("condition") {
            migrate_target(condition, "targetType", "targetName", "target");
        }
        if effect
            .get("condition")
            .and_then(Value::as_object)
            .is_some_and(|condition| !condition.contains_key("target"))
        {
            effect.remove("condition");
        }
    }
    effects.retain(|effect| effect.get("target").is_some());
}

fn migrate_costs(def: &mut Map<String, Value>) {
    let Some(Value::Array(costs)) = def.get_mut("costs") else {
        return;
    };
    for cost in costs.iter_mut().filter_map(Value::as_object_mut) {
        migrate_target(cost, "targetType", "targetName", "target");
    }
    costs.retain(|cost| cost.get("target").is_some());
}

fn migrate_card_effects(def: &mut Map<String, Value>) {
    let Some(Value::Array(effects)) = def.get_mut("effects") else {
        return;
    };
    effects.retain(|effect| {
        let kind = effect.get("type").and_then(Value::as_str);
        if kind != Some("clear_buff") {
            warn!(kind = ?kind, "unsupported card effect dropped");
            return false;
        }
        true
    });
}

/// An empty legacy ledger meant "recompute on removal", so it maps to no ledger.
fn migrate_ledger(raw: Value) -> Option<Vec<Value>> {
    let Value::Array(entries) = raw else {
        return None;
    };
    let converted: Vec<Value> = entries
        .into_iter()
        .filter_map(|entry| {
            let Value::Object(mut entry) = entry else {
                return None;
            };
            migrate_target(&mut entry, "targetType", "targetName", "target");
            let delta = entry.remove("change").or_else(|| entry.remove("delta"))?;
            let target = entry.remove("target")?;
            Some(json!({ "target": target, "delta": delta }))
        })
        .collect();
    if converted.is_empty() {
        None
    } else {
        Some(converted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restrack_core::{ConditionCategory, ConditionOperator, DefinitionId, EntityRef};

    fn legacy_blob() -> Value {
        json!({
            "currentTurn": 4,
            "resources": [{
                "name": "Gold",
                "currentValue": 30,
                "baseValue": 0,
                "changePerRound": 5,
                "hardCap": 100,
                "negativeIsGood": false,
                "_prevValue": 25
            }],
            "stats": [{ "name": "Stress", "currentValue": 2, "softCap": 10, "negativeIsGood": true }],
            "cardCollection": [{
                "id": 1700000000000u64,
                "name": "Trade",
                "triggerType": "turn",
                "triggerValue": 2,
                "costs": [{ "targetType": "resource", "targetName": "Gold", "costType": "flat", "value": 10, "duration": 0 }],
                "effects": [],
                "_removedOnTurn": 4
            }],
            "buffCollection": [{
                "id": 1700000000001u64,
                "name": "Blessing",
                "duration": 3,
                "oneTime": true,
                "_oneTimeTriggered": true,
                "trigger": {
                    "logic": "custom",
                    "customValue": "2",
                    "conditions": [
                        { "type": "resource_gte", "target": "resource:Gold", "value": "20" },
                        { "type": "turn_eq", "target": "", "value": "4" }
                    ]
                },
                "effects": [{ "targetType": "stat", "targetName": "Stress", "effectType": "flat", "value": -1, "trigger": "immediate" }]
            }],
            "narrativeCollection": [{ "id": 1700000000002.5f64, "name": "Dawn", "text": "Light.", "trigger": { "logic": "all", "conditions": [] } }],
            "activeCards": [],
            "activeBuffs": [{
                "id": 1700000000003.25f64,
                "collectionId": 1700000000001u64,
                "name": "Blessing",
                "duration": 3,
                "currentValue": 2,
                "effects": [{ "targetType": "stat", "targetName": "Stress", "effectType": "flat", "value": -1, "trigger": "immediate" }],
                "_appliedChanges": [{ "targetType": "stat", "targetName": "Stress", "change": -1 }]
            }],
            "shownNarratives": [1700000000002.5f64],
            "gameSettings": { "roundName": "Day" }
        })
    }

    #[test]
    fn legacy_blob_upgrades_to_current_shape() {
        let saved = upgrade(legacy_blob()).expect("upgrade");
        let world = saved.world;
        assert_eq!(saved.version, SAVE_VERSION);
        assert_eq!(world.current_turn, 4);

        let gold = world.resources.get("Gold").expect("gold");
        assert_eq!(gold.max_value, Some(100.0));
        assert!(gold.is_hard_cap);
        let stress = world.stats.get("Stress").expect("stress");
        assert_eq!(stress.max_value, Some(10.0));
        assert!(!stress.is_hard_cap);
        assert_eq!(world.scheduler.previous_value(&EntityRef::resource("Gold")), Some(25.0));

        let card = &world.card_collection[0];
        assert_eq!(card.id, DefinitionId(1_700_000_000_000));
        assert_eq!(card.trigger.conditions[0].category, ConditionCategory::Turn);
        assert_eq!(card.costs[0].target, EntityRef::resource("Gold"));
        assert_eq!(world.scheduler.removed_on_turn.get(&card.id), Some(&4));

        let buff = &world.buff_collection[0];
        assert_eq!(buff.trigger.custom_value, 2);
        assert_eq!(buff.trigger.conditions[0].target, "Gold");
        assert_eq!(buff.trigger.conditions[1].operator, ConditionOperator::Equal);
        assert!(world.scheduler.one_time_triggered.contains(&buff.id));

        let active = &world.active_buffs[0];
        assert_eq!(active.definition_id, Some(buff.id));
        assert_eq!(active.remaining, 2);
        assert!(active.effects_applied);
        assert_eq!(active.applied_changes.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn fractional_ids_are_renumbered_and_references_follow() {
        let world = upgrade(legacy_blob()).expect("upgrade").world;
        let dawn = world.narrative_collection[0].id;
        assert_eq!(dawn, DefinitionId(1_700_000_000_002));
        assert!(world.shown_narratives.contains(&dawn));
        assert_eq!(world.active_buffs[0].id.0, 1);
    }

    #[test]
    fn empty_legacy_ledger_means_recompute() {
        let mut blob = legacy_blob();
        blob["activeBuffs"][0]["_appliedChanges"] = json!([]);
        let world = upgrade(blob).expect("upgrade").world;
        assert_eq!(world.active_buffs[0].applied_changes, None);
    }

    #[test]
    fn future_versions_are_refused() {
        let result = upgrade(json!({ "version": SAVE_VERSION + 1 }));
        assert!(matches!(
            result,
            Err(StoreError::UnsupportedVersion { found }) if found == SAVE_VERSION + 1
        ));
    }

    #[test]
    fn non_objects_are_malformed() {
        assert!(matches!(upgrade(json!([1, 2])), Err(StoreError::Malformed(_))));
    }
}
