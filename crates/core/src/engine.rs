use crate::{DefinitionId, EntityKind, InstanceId};
use thiserror::Error;

mod activation;
mod cards;
mod cyclical;
mod editor;
mod effect;
mod narrative;
mod turn;

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("no active card {0}")]
    UnknownCard(InstanceId),
    #[error("cannot afford to play {0}")]
    CannotAfford(String),
    #[error("no definition {0}")]
    UnknownDefinition(DefinitionId),
    #[error("no {kind} named {name:?}")]
    UnknownEntity { kind: EntityKind, name: String },
    #[error("a {kind} named {name:?} already exists")]
    DuplicateEntity { kind: EntityKind, name: String },
    #[error("name must not be empty")]
    EmptyName,
    #[error("no entry at position {0}")]
    InvalidIndex(usize),
}
