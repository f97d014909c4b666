//! Transaction pipelines over [`TxResultRendering`].
//!
//! [`TxPipeline`] is the catch boundary: whatever its stages do, `run`
//! returns a rendering, and that rendering is always terminal. Stage errors
//! and panics become `Fail` renderings built by the bound [`TxHelper`].

use crate::helper::TxHelper;
use crate::pipeline::{timeout, Pipeline, PipelineValue, Stage};
use crate::stages::{create_tx_options, poll_tx_info, post_tx};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use txflow_delivery::{AbortSignal, ConfirmationPoller, TxPoster};
use txflow_types::{TxError, TxResultRendering, TxStreamPhase};

impl PipelineValue for TxResultRendering {
	fn is_terminal(&self) -> bool {
		TxResultRendering::is_terminal(self)
	}
}

pub struct TxPipeline {
	pipeline: Pipeline<TxResultRendering>,
	helper: Arc<TxHelper>,
}

impl TxPipeline {
	pub fn new(pipeline: Pipeline<TxResultRendering>, helper: Arc<TxHelper>) -> Self {
		Self { pipeline, helper }
	}

	pub fn name(&self) -> &str {
		self.pipeline.name()
	}

	pub fn len(&self) -> usize {
		self.pipeline.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pipeline.is_empty()
	}

	pub fn helper(&self) -> &Arc<TxHelper> {
		&self.helper
	}

	pub async fn run(&self) -> TxResultRendering {
		self.run_observed(|_, _| {}).await
	}

	/// Runs from a fresh `Broadcast` rendering, reporting every intermediate
	/// rendering to `observe`.
	pub async fn run_observed<F>(&self, observe: F) -> TxResultRendering
	where
		F: FnMut(usize, &TxResultRendering) + Send,
	{
		match self.pipeline.run_observed(TxResultRendering::new(), observe).await {
			Ok(rendering) if rendering.is_terminal() => {
				info!(pipeline = %self.name(), "Finished in phase {}", rendering.phase());
				rendering
			}
			Ok(rendering) => {
				warn!(
					pipeline = %self.name(),
					"Stages ended in non-terminal phase {}",
					rendering.phase()
				);
				self.helper.catch_tx_error(&TxError::Unexpected(format!(
					"pipeline ended in phase {}",
					rendering.phase()
				)))
			}
			Err(error) => {
				let rendering = self.helper.catch_tx_error(&error);
				info!(
					pipeline = %self.name(),
					"Finished in phase {} ({})",
					TxStreamPhase::Fail,
					error.code()
				);
				rendering
			}
		}
	}
}

/// Collaborators shared by every standard transaction pipeline.
#[derive(Clone)]
pub struct TxDeps {
	poster: Arc<dyn TxPoster>,
	poller: ConfirmationPoller,
	gas_adjustment: Decimal,
	post_timeout: Duration,
}

impl TxDeps {
	pub const DEFAULT_POST_TIMEOUT: Duration = Duration::from_secs(120);

	pub fn new(poster: Arc<dyn TxPoster>, poller: ConfirmationPoller) -> Self {
		Self {
			poster,
			poller,
			gas_adjustment: Decimal::ONE,
			post_timeout: Self::DEFAULT_POST_TIMEOUT,
		}
	}

	pub fn with_gas_adjustment(mut self, gas_adjustment: Decimal) -> Self {
		self.gas_adjustment = gas_adjustment;
		self
	}

	pub fn with_post_timeout(mut self, post_timeout: Duration) -> Self {
		self.post_timeout = post_timeout;
		self
	}

	/// Builds `create_tx_options -> post_tx -> poll_tx_info -> picker`.
	pub fn build(
		&self,
		name: &str,
		helper: Arc<TxHelper>,
		msgs: Vec<serde_json::Value>,
		operation_id: &str,
		abort: Arc<dyn AbortSignal>,
		picker: impl Stage<TxResultRendering> + 'static,
	) -> TxPipeline {
		let pipeline = Pipeline::builder(name)
			.stage(create_tx_options(msgs, self.gas_adjustment, helper.clone()))
			.stage(timeout(
				post_tx(self.poster.clone(), helper.clone()),
				self.post_timeout,
			))
			.stage(poll_tx_info(self.poller.clone(), operation_id, abort))
			.stage(picker)
			.build();

		TxPipeline::new(pipeline, helper)
	}
}
