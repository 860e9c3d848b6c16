use crate::lenient::format_number;
use crate::{round_to_cents, DefinitionId, EntityRef, Valence};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    TurnStarted {
        turn: u32,
        label: String,
        message: Option<String>,
    },
    ValueChanged {
        target: EntityRef,
        delta: f64,
        source: String,
        valence: Valence,
    },
    ValueReset {
        target: EntityRef,
        value: f64,
    },
    BuffApplied { name: String },
    BuffExpired { name: String },
    BuffEnded { name: String },
    CostDebuffApplied { card: String, duration: u32 },
    CardAvailable { name: String },
    CardUnavailable { name: String },
    CardPlayed { name: String },
    CardRejected { card: String },
    TargetMissing { target: EntityRef, source: String },
    NarrativeShown {
        id: Option<DefinitionId>,
        title: String,
        text: String,
        value: Option<String>,
    },
    CascadeLimitReached { passes: u32 },
}

#[derive(Debug, Default)]
pub struct EventBus {
    queue: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.queue.push(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.queue.drain(..)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Signed two-decimal rendering used in the activity log, e.g. `+2.5` or `-3`.
pub fn format_change(delta: f64) -> String {
    let sign = if delta > 0.0 { "+" } else { "" };
    format!("{sign}{}", format_number(round_to_cents(delta)))
}
