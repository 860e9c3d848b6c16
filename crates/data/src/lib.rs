//! Persistence, migration and export for tracker worlds.

pub mod load;
pub mod migrate;
pub mod schema;
pub mod store;

pub use load::*;
pub use migrate::upgrade;
pub use schema::*;
pub use store::*;
