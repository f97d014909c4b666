//! Runs one operation against the shared registry.
//!
//! An [`Operation`] wires a pipeline factory to an [`OperationBroadcaster`]:
//!
//! 1. install a fresh [`AbortController`] for the id (aborting any run
//!    still holding the id);
//! 2. publish the `Broadcast` entry and dispatch `Started` and the first
//!    phase;
//! 3. run the pipeline, racing it against the controller, broadcasting
//!    every intermediate rendering and dispatching each new phase once;
//! 4. record the terminal rendering, dispatch `Succeeded` or `Failed`, and
//!    release the controller.
//!
//! A run whose id has been taken over by a newer run stops writing to the
//! registry. An explicitly cancelled run records a `Fail` rendering with the
//! `Cancelled` code.

use crate::abort::{AbortController, RegisteredAbort};
use crate::error::CoreError;
use crate::lifecycle::PhaseCursor;
use crate::registry::OperationBroadcaster;
use crate::tx_pipeline::TxPipeline;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};
use txflow_delivery::AbortSignal;
use txflow_types::{
	OperationEvent, OperationResult, OperationStatus, TxError, TxErrorCode, TxResultRendering,
	TxStreamPhase,
};

/// Builds the pipeline for one run.
pub type PipelineFactory = Arc<dyn Fn(&OperationContext) -> TxPipeline + Send + Sync>;

/// Called with `(operation_id, rendering)` after a run succeeded.
pub type SuccessCallback = Arc<dyn Fn(&str, &TxResultRendering) + Send + Sync>;

/// Per-run values handed to the pipeline factory.
#[derive(Clone)]
pub struct OperationContext {
	id: String,
	abort: Arc<RegisteredAbort>,
}

impl OperationContext {
	pub fn id(&self) -> &str {
		&self.id
	}

	/// Signal for stages that wait, such as confirmation polling.
	pub fn abort_signal(&self) -> Arc<dyn AbortSignal> {
		self.abort.clone()
	}
}

#[derive(Clone)]
pub struct OperationOptions {
	kind: String,
	factory: PipelineFactory,
	on_tx_succeed: Option<SuccessCallback>,
}

impl OperationOptions {
	pub fn new<F>(kind: impl Into<String>, factory: F) -> Self
	where
		F: Fn(&OperationContext) -> TxPipeline + Send + Sync + 'static,
	{
		Self {
			kind: kind.into(),
			factory: Arc::new(factory),
			on_tx_succeed: None,
		}
	}

	pub fn on_tx_succeed<F>(mut self, callback: F) -> Self
	where
		F: Fn(&str, &TxResultRendering) + Send + Sync + 'static,
	{
		self.on_tx_succeed = Some(Arc::new(callback));
		self
	}

	pub fn kind(&self) -> &str {
		&self.kind
	}
}

/// Releases the run's controller on every exit path, including when the
/// run's future is dropped.
struct ControllerGuard {
	registry: OperationBroadcaster,
	id: String,
	controller: AbortController,
}

impl Drop for ControllerGuard {
	fn drop(&mut self) {
		if self.registry.remove_abort_controller_if(&self.id, &self.controller) {
			debug!("Released abort controller for {}", self.id);
		}
	}
}

#[derive(Clone)]
pub struct Operation {
	registry: OperationBroadcaster,
	options: OperationOptions,
}

impl Operation {
	pub fn new(registry: OperationBroadcaster, options: OperationOptions) -> Self {
		Self { registry, options }
	}

	pub fn registry(&self) -> &OperationBroadcaster {
		&self.registry
	}

	pub fn kind(&self) -> &str {
		self.options.kind()
	}

	/// Runs the operation as a new task.
	pub fn spawn(&self, id: impl Into<String>) -> Result<JoinHandle<TxResultRendering>, CoreError> {
		let id = id.into();
		if id.is_empty() {
			return Err(CoreError::InvalidOperation("operation id must not be empty".into()));
		}

		let operation = self.clone();
		Ok(tokio::spawn(async move { operation.execute(id).await }))
	}

	/// Runs the operation to completion and returns its terminal rendering.
	#[instrument(skip(self), fields(kind = %self.options.kind))]
	pub async fn execute(&self, id: String) -> TxResultRendering {
		let controller = AbortController::new();
		self.registry.set_abort_controller(&id, controller.clone());
		let _guard = ControllerGuard {
			registry: self.registry.clone(),
			id: id.clone(),
			controller: controller.clone(),
		};

		let context = OperationContext {
			id: id.clone(),
			abort: Arc::new(RegisteredAbort::new(
				self.registry.clone(),
				id.clone(),
				controller.clone(),
			)),
		};
		let pipeline = (self.options.factory)(&context);
		let total = pipeline.len();
		info!("Starting operation {} ({} stages)", id, total);

		let mut cursor = PhaseCursor::new();
		let mut completed = 0;

		self.registry.broadcast(
			&id,
			OperationResult::in_progress(0, total),
			TxResultRendering::new(),
		);
		self.registry.dispatch(
			&id,
			&OperationEvent::Started {
				kind: self.options.kind.clone(),
			},
		);
		self.report_phase(&id, &mut cursor, TxStreamPhase::Broadcast);

		let token = controller.token();
		let rendering = {
			let observe = |index: usize, rendering: &TxResultRendering| {
				completed = index + 1;
				if rendering.is_terminal() || controller.is_aborted() {
					return;
				}
				if !self.registry.broadcast_as(
					&id,
					&controller,
					false,
					OperationResult::in_progress(completed, total),
					rendering.clone(),
				) {
					return;
				}
				self.report_phase(&id, &mut cursor, rendering.phase());
			};

			tokio::select! {
				rendering = pipeline.run_observed(observe) => rendering,
				_ = token.cancelled() => {
					debug!("Operation {} aborted while running", id);
					pipeline.helper().catch_tx_error(&TxError::Cancelled(id.clone()))
				}
			}
		};

		let status = match (rendering.phase(), rendering.error().map(|e| e.code)) {
			(TxStreamPhase::Succeed, _) => OperationStatus::Done,
			(_, Some(TxErrorCode::Cancelled)) => OperationStatus::Aborted,
			_ => OperationStatus::Fault,
		};
		if !self.registry.broadcast_as(
			&id,
			&controller,
			true,
			OperationResult::finished(status, completed, total),
			rendering.clone(),
		) {
			info!("Operation {} was superseded, leaving the registry to the newer run", id);
			return rendering;
		}

		if cursor.advance(rendering.phase()) {
			let event = match rendering.error() {
				Some(failure) => OperationEvent::Failed {
					failure: failure.clone(),
				},
				None => OperationEvent::Succeeded {
					receipts: rendering.receipts().to_vec(),
				},
			};
			self.registry.dispatch(&id, &event);
		}

		if rendering.phase() == TxStreamPhase::Succeed {
			if let Some(callback) = &self.options.on_tx_succeed {
				callback(&id, &rendering);
			}
		}

		info!("Operation {} finished in phase {} ({:?})", id, rendering.phase(), status);
		rendering
	}

	fn report_phase(&self, id: &str, cursor: &mut PhaseCursor, phase: TxStreamPhase) {
		if cursor.advance(phase) {
			self.registry
				.dispatch(id, &OperationEvent::PhaseChanged { phase });
		}
	}
}
