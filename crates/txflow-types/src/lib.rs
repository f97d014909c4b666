//! Shared types for the txflow workspace.
//!
//! This crate holds the data model that every other crate speaks: lifecycle
//! phases, the rendering value threaded through transaction pipelines, the
//! error taxonomy, operation events, the transaction envelope types exchanged
//! with wallet and chain collaborators, and the pure raw log extraction layer.

pub mod coin;
pub mod errors;
pub mod events;
pub mod phase;
pub mod raw_log;
pub mod rendering;
pub mod tx;

pub use coin::*;
pub use errors::*;
pub use events::*;
pub use phase::*;
pub use raw_log::*;
pub use rendering::*;
pub use tx::*;
