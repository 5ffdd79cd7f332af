pub mod config;
pub mod connected;
pub mod engine;
pub mod error;
pub mod join;
pub mod joinable;
pub mod sql;

// Re-export the types most callers need
pub use config::EngineConfig;
pub use connected::ConnectedRelation;
pub use engine::{Connection, Relation};
pub use error::{DuckPlusError, Result, Side};
pub use join::{AsofDirection, AsofSpec, JoinKind, JoinSpec, RelationJoins, Tolerance};
pub use joinable::Joinable;
