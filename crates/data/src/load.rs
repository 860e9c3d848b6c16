use crate::schema::SavedState;
use anyhow::Context;
use restrack_core::{EngineConfig, WorldState};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::info;

/// A missing file means the defaults; a present but broken one is an error.
pub fn load_engine_config(path: &Path) -> anyhow::Result<EngineConfig> {
    if !path.exists() {
        return Ok(EngineConfig::default());
    }
    let config: EngineConfig = load_json(path)?;
    if config.cyclical_pass_limit == 0 {
        anyhow::bail!("{}: cyclicalPassLimit must be at least 1", path.display());
    }
    Ok(config)
}

/// Reads a world file in any supported save shape. Hand-written worlds may
/// leave out ids, `version` and all bookkeeping.
pub fn world_from_file(path: &Path, config: EngineConfig) -> anyhow::Result<WorldState> {
    let value: Value = load_json(path)?;
    let saved =
        SavedState::from_value(value).with_context(|| format!("upgrade {}", path.display()))?;
    let mut world = saved.world;
    world.config = config;
    info!(
        path = %path.display(),
        resources = world.resources.len(),
        stats = world.stats.len(),
        cards = world.card_collection.len(),
        buffs = world.buff_collection.len(),
        narratives = world.narrative_collection.len(),
        "world loaded"
    );
    Ok(world)
}

fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value = serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(value)
}
