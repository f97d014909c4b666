//! Transaction pipelines and the operation broadcast registry.
//!
//! A transaction operation (stake, withdraw, ...) is a [`TxPipeline`]: an
//! ordered list of [`Stage`]s threading a [`TxResultRendering`] from
//! `Broadcast` to a terminal phase, bound to a [`TxHelper`] that produces
//! receipts and failure renderings. [`Operation`] runs such a pipeline under
//! a cancellation handle and reports every phase to the process-wide
//! [`OperationBroadcaster`].
//!
//! [`TxResultRendering`]: txflow_types::TxResultRendering

pub mod abort;
pub mod error;
pub mod event_bus;
pub mod helper;
pub mod lifecycle;
pub mod operation;
pub mod pickers;
pub mod pipeline;
pub mod registry;
pub mod stages;
pub mod tx_pipeline;
pub mod utils;

pub use abort::{AbortController, RegisteredAbort};
pub use error::CoreError;
pub use event_bus::{EventBus, OperationNotice};
pub use helper::{ErrorReporter, TxHelper};
pub use lifecycle::PhaseCursor;
pub use operation::{Operation, OperationContext, OperationOptions};
pub use pickers::{pick_governance_stake_result, pick_withdraw_result};
pub use pipeline::{stage_fn, stage_sync, timeout, Pipeline, PipelineValue, Stage};
pub use registry::{Broadcasting, OperationBroadcaster, Subscriber, Unsubscribe};
pub use tx_pipeline::{TxDeps, TxPipeline};
