use super::EngineError;
use crate::*;
use tracing::{debug, info};

fn checked_name(name: &str) -> Result<(), EngineError> {
    if name.trim().is_empty() {
        Err(EngineError::EmptyName)
    } else {
        Ok(())
    }
}

impl WorldState {
    pub fn add_entity(&mut self, kind: EntityKind, entity: NumericEntity) -> Result<(), EngineError> {
        checked_name(&entity.name)?;
        let name = entity.name.clone();
        if !self.store_mut(kind).insert(entity) {
            return Err(EngineError::DuplicateEntity { kind, name });
        }
        debug!(%kind, %name, "entity added");
        Ok(())
    }

    /// Replaces the entity in place. Renaming does not follow references.
    pub fn update_entity(
        &mut self,
        kind: EntityKind,
        name: &str,
        entity: NumericEntity,
    ) -> Result<(), EngineError> {
        checked_name(&entity.name)?;
        let store = self.store_mut(kind);
        if entity.name != name && store.contains(&entity.name) {
            return Err(EngineError::DuplicateEntity {
                kind,
                name: entity.name,
            });
        }
        if !store.replace(name, entity) {
            return Err(EngineError::UnknownEntity {
                kind,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Definitions that mention the entity keep their dangling reference and
    /// fail soft. Ledger entries for it are dropped so a later reversal can't
    /// land on a new entity that reuses the name.
    pub fn remove_entity(
        &mut self,
        kind: EntityKind,
        name: &str,
    ) -> Result<NumericEntity, EngineError> {
        let removed = self
            .store_mut(kind)
            .remove(name)
            .ok_or_else(|| EngineError::UnknownEntity {
                kind,
                name: name.to_string(),
            })?;
        let target = EntityRef::new(kind, name);
        for buff in &mut self.active_buffs {
            if let Some(ledger) = buff.applied_changes.as_mut() {
                ledger.retain(|change| change.target != target);
            }
        }
        self.scheduler.forget_entity(&target);
        info!(%target, "entity removed");
        Ok(removed)
    }

    pub fn reorder_entities(
        &mut self,
        kind: EntityKind,
        from: usize,
        to: usize,
    ) -> Result<(), EngineError> {
        let store = self.store_mut(kind);
        let len = store.len();
        if from >= len {
            return Err(EngineError::InvalidIndex(from));
        }
        if to >= len {
            return Err(EngineError::InvalidIndex(to));
        }
        store.move_item(from, to);
        Ok(())
    }

    /// Stores a new card and makes it playable right away if its trigger holds.
    pub fn add_card(
        &mut self,
        mut def: CardDef,
        events: &mut EventBus,
    ) -> Result<DefinitionId, EngineError> {
        checked_name(&def.name)?;
        def.id = self.alloc_definition_id();
        let id = def.id;
        let available = evaluate_trigger(&def.trigger, &*self);
        self.card_collection.push(def.clone());
        if available {
            let instance = self.alloc_instance_id();
            self.active_cards.push(ActiveCard::from_def(instance, &def));
            events.push(Event::CardAvailable { name: def.name });
        }
        Ok(id)
    }

    pub fn update_card(&mut self, id: DefinitionId, mut def: CardDef) -> Result<(), EngineError> {
        checked_name(&def.name)?;
        let slot = self
            .card_collection
            .iter_mut()
            .find(|existing| existing.id == id)
            .ok_or(EngineError::UnknownDefinition(id))?;
        def.id = id;
        *slot = def.clone();
        for active in self
            .active_cards
            .iter_mut()
            .filter(|active| active.definition_id == id)
        {
            active.name = def.name.clone();
            active.description = def.description.clone();
            active.trigger = def.trigger.clone();
            active.costs = def.costs.clone();
            active.effects = def.effects.clone();
        }
        Ok(())
    }

    pub fn remove_card(&mut self, id: DefinitionId) -> Result<CardDef, EngineError> {
        let index = self
            .card_collection
            .iter()
            .position(|def| def.id == id)
            .ok_or(EngineError::UnknownDefinition(id))?;
        let def = self.card_collection.remove(index);
        self.active_cards.retain(|active| active.definition_id != id);
        self.scheduler.forget(id);
        Ok(def)
    }

    /// Stores a new buff and activates it at once if its trigger holds.
    pub fn add_buff(
        &mut self,
        mut def: BuffDef,
        events: &mut EventBus,
    ) -> Result<DefinitionId, EngineError> {
        checked_name(&def.name)?;
        def.id = self.alloc_definition_id();
        let id = def.id;
        self.buff_collection.push(def.clone());
        if evaluate_trigger(&def.trigger, &*self) {
            self.activate_buff(&def, events);
        }
        Ok(id)
    }

    /// The active instance picks up the new effects, but its ledger still
    /// describes what the old ones applied.
    pub fn update_buff(&mut self, id: DefinitionId, mut def: BuffDef) -> Result<(), EngineError> {
        checked_name(&def.name)?;
        let slot = self
            .buff_collection
            .iter_mut()
            .find(|existing| existing.id == id)
            .ok_or(EngineError::UnknownDefinition(id))?;
        def.id = id;
        *slot = def.clone();
        for active in self
            .active_buffs
            .iter_mut()
            .filter(|active| active.definition_id == Some(id))
        {
            active.name = def.name.clone();
            active.description = def.description.clone();
            active.effects = def.effects.clone();
        }
        Ok(())
    }

    pub fn remove_buff(
        &mut self,
        id: DefinitionId,
        events: &mut EventBus,
    ) -> Result<BuffDef, EngineError> {
        let index = self
            .buff_collection
            .iter()
            .position(|def| def.id == id)
            .ok_or(EngineError::UnknownDefinition(id))?;
        let def = self.buff_collection.remove(index);
        let (removed, kept): (Vec<ActiveBuff>, Vec<ActiveBuff>) =
            std::mem::take(&mut self.active_buffs)
                .into_iter()
                .partition(|active| active.definition_id == Some(id));
        self.active_buffs = kept;
        for active in removed {
            self.reverse_buff(&active, events);
            events.push(Event::BuffEnded { name: active.name });
        }
        self.scheduler.forget(id);
        Ok(def)
    }

    pub fn add_narrative(&mut self, mut def: NarrativeDef) -> Result<DefinitionId, EngineError> {
        checked_name(&def.name)?;
        def.id = self.alloc_definition_id();
        let id = def.id;
        self.narrative_collection.push(def);
        Ok(id)
    }

    pub fn update_narrative(
        &mut self,
        id: DefinitionId,
        mut def: NarrativeDef,
    ) -> Result<(), EngineError> {
        checked_name(&def.name)?;
        let slot = self
            .narrative_collection
            .iter_mut()
            .find(|existing| existing.id == id)
            .ok_or(EngineError::UnknownDefinition(id))?;
        def.id = id;
        *slot = def;
        Ok(())
    }

    pub fn remove_narrative(&mut self, id: DefinitionId) -> Result<NarrativeDef, EngineError> {
        let index = self
            .narrative_collection
            .iter()
            .position(|def| def.id == id)
            .ok_or(EngineError::UnknownDefinition(id))?;
        self.shown_narratives.remove(&id);
        Ok(self.narrative_collection.remove(index))
    }
}
