//! Turn-based resource simulation. Keep this crate free of IO and platform concerns.

pub mod caps;
pub mod config;
pub mod content;
pub mod effects;
pub mod engine;
pub mod entity;
pub mod events;
pub(crate) mod lenient;
pub mod state;
pub mod trigger;

pub use caps::*;
pub use config::*;
pub use content::*;
pub use effects::*;
pub use engine::*;
pub use entity::*;
pub use events::*;
pub use state::*;
pub use trigger::*;
