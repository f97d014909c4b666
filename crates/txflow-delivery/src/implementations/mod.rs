//! Delivery collaborator implementations.
//!
//! Available implementations:
//! - `memory`: scriptable in-process chain implementing both boundaries
//! - `lcd`: tx info queries against a Cosmos LCD endpoint

pub mod lcd;
pub mod memory;

pub use lcd::LcdTxInfoSource;
pub use memory::{InMemoryChain, ScriptedTx};
