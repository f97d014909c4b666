//! Ordered composition of asynchronous stages.
//!
//! A [`Pipeline`] threads one value through its stages strictly in order.
//! Each stage consumes the previous output and returns either the next value
//! or a [`TxError`]; the first error ends the run and is returned unchanged.
//! Panics inside a stage are caught and surface as [`TxError::Unexpected`].

use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{debug, warn};
use txflow_types::TxError;

/// Value threaded through a pipeline.
pub trait PipelineValue: Send + 'static {
	/// A terminal value ends the run early without running later stages.
	fn is_terminal(&self) -> bool {
		false
	}
}

/// A single transform step in a pipeline.
#[async_trait]
pub trait Stage<T: PipelineValue>: Send + Sync {
	/// Stage name for logging.
	fn name(&self) -> &str;

	async fn execute(&self, input: T) -> Result<T, TxError>;
}

/// Stage backed by an async closure.
pub struct FnStage<F> {
	name: String,
	f: F,
}

/// Creates a stage from an async closure.
pub fn stage_fn<T, F, Fut>(name: impl Into<String>, f: F) -> FnStage<F>
where
	T: PipelineValue,
	F: Fn(T) -> Fut + Send + Sync,
	Fut: Future<Output = Result<T, TxError>> + Send + 'static,
{
	FnStage {
		name: name.into(),
		f,
	}
}

#[async_trait]
impl<T, F, Fut> Stage<T> for FnStage<F>
where
	T: PipelineValue,
	F: Fn(T) -> Fut + Send + Sync,
	Fut: Future<Output = Result<T, TxError>> + Send + 'static,
{
	fn name(&self) -> &str {
		&self.name
	}

	async fn execute(&self, input: T) -> Result<T, TxError> {
		(self.f)(input).await
	}
}

/// Stage backed by a synchronous closure, for pure steps such as result
/// parsing.
pub struct SyncStage<F> {
	name: String,
	f: F,
}

pub fn stage_sync<T, F>(name: impl Into<String>, f: F) -> SyncStage<F>
where
	T: PipelineValue,
	F: Fn(T) -> Result<T, TxError> + Send + Sync,
{
	SyncStage {
		name: name.into(),
		f,
	}
}

#[async_trait]
impl<T, F> Stage<T> for SyncStage<F>
where
	T: PipelineValue,
	F: Fn(T) -> Result<T, TxError> + Send + Sync,
{
	fn name(&self) -> &str {
		&self.name
	}

	async fn execute(&self, input: T) -> Result<T, TxError> {
		(self.f)(input)
	}
}

/// Bounds the execution time of the wrapped stage.
pub struct Timeout<S> {
	inner: S,
	after: Duration,
}

/// Fails with [`TxError::StageTimeout`] when `inner` does not finish within
/// `after`.
pub fn timeout<S>(inner: S, after: Duration) -> Timeout<S> {
	Timeout { inner, after }
}

#[async_trait]
impl<T, S> Stage<T> for Timeout<S>
where
	T: PipelineValue,
	S: Stage<T>,
{
	fn name(&self) -> &str {
		self.inner.name()
	}

	async fn execute(&self, input: T) -> Result<T, TxError> {
		tokio::time::timeout(self.after, self.inner.execute(input))
			.await
			.map_err(|_| TxError::StageTimeout {
				stage: self.inner.name().to_string(),
				after_ms: self.after.as_millis() as u64,
			})?
	}
}

/// Ordered list of stages run by a single `run` combinator.
pub struct Pipeline<T: PipelineValue> {
	name: String,
	stages: Vec<Box<dyn Stage<T>>>,
}

pub struct PipelineBuilder<T: PipelineValue> {
	name: String,
	stages: Vec<Box<dyn Stage<T>>>,
}

impl<T: PipelineValue> PipelineBuilder<T> {
	pub fn stage(mut self, stage: impl Stage<T> + 'static) -> Self {
		self.stages.push(Box::new(stage));
		self
	}

	pub fn build(self) -> Pipeline<T> {
		Pipeline {
			name: self.name,
			stages: self.stages,
		}
	}
}

impl<T: PipelineValue> Pipeline<T> {
	pub fn builder(name: impl Into<String>) -> PipelineBuilder<T> {
		PipelineBuilder {
			name: name.into(),
			stages: Vec::new(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn len(&self) -> usize {
		self.stages.len()
	}

	pub fn is_empty(&self) -> bool {
		self.stages.is_empty()
	}

	pub fn stage_names(&self) -> Vec<&str> {
		self.stages.iter().map(|stage| stage.name()).collect()
	}

	pub async fn run(&self, input: T) -> Result<T, TxError> {
		self.run_observed(input, |_, _| {}).await
	}

	/// Runs every stage in order, calling `observe(index, value)` after each
	/// stage that succeeds.
	pub async fn run_observed<F>(&self, input: T, mut observe: F) -> Result<T, TxError>
	where
		F: FnMut(usize, &T) + Send,
	{
		let total = self.stages.len();
		let mut value = input;

		for (index, stage) in self.stages.iter().enumerate() {
			debug!(
				pipeline = %self.name,
				"Executing stage {}/{}: {}",
				index + 1,
				total,
				stage.name()
			);

			value = match AssertUnwindSafe(stage.execute(value)).catch_unwind().await {
				Ok(Ok(next)) => next,
				Ok(Err(error)) => {
					warn!(pipeline = %self.name, "Stage {} failed: {}", stage.name(), error);
					return Err(error);
				}
				Err(payload) => {
					let message = panic_message(&*payload);
					warn!(pipeline = %self.name, "Stage {} panicked: {}", stage.name(), message);
					return Err(TxError::Unexpected(format!(
						"stage {} panicked: {}",
						stage.name(),
						message
					)));
				}
			};

			observe(index, &value);

			if value.is_terminal() && index + 1 < total {
				debug!(
					pipeline = %self.name,
					"Stage {} produced a terminal value, skipping {} remaining stages",
					stage.name(),
					total - index - 1
				);
				return Ok(value);
			}
		}

		Ok(value)
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&str>() {
		message.to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"unknown panic".to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::{Arc, Mutex};

	#[derive(Debug, Clone, PartialEq)]
	struct Trace(Vec<&'static str>);

	impl PipelineValue for Trace {
		fn is_terminal(&self) -> bool {
			self.0.last() == Some(&"done")
		}
	}

	/// Appends its label and counts invocations.
	struct Recording {
		label: &'static str,
		calls: Arc<AtomicUsize>,
		fail: bool,
	}

	impl Recording {
		fn new(label: &'static str) -> (Self, Arc<AtomicUsize>) {
			let calls = Arc::new(AtomicUsize::new(0));
			(
				Self {
					label,
					calls: calls.clone(),
					fail: false,
				},
				calls,
			)
		}

		fn failing(label: &'static str) -> (Self, Arc<AtomicUsize>) {
			let (mut stage, calls) = Self::new(label);
			stage.fail = true;
			(stage, calls)
		}
	}

	#[async_trait]
	impl Stage<Trace> for Recording {
		fn name(&self) -> &str {
			self.label
		}

		async fn execute(&self, mut input: Trace) -> Result<Trace, TxError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			tokio::task::yield_now().await;
			if self.fail {
				return Err(TxError::Submission(self.label.to_string()));
			}
			input.0.push(self.label);
			Ok(input)
		}
	}

	#[tokio::test]
	async fn test_stages_run_in_order() {
		let (a, a_calls) = Recording::new("a");
		let (b, b_calls) = Recording::new("b");
		let (c, c_calls) = Recording::new("c");

		let pipeline = Pipeline::builder("ordered").stage(a).stage(b).stage(c).build();
		let result = pipeline.run(Trace(vec![])).await.unwrap();

		assert_eq!(result, Trace(vec!["a", "b", "c"]));
		for calls in [a_calls, b_calls, c_calls] {
			assert_eq!(calls.load(Ordering::SeqCst), 1);
		}
	}

	#[tokio::test]
	async fn test_failure_short_circuits() {
		let (a, a_calls) = Recording::new("a");
		let (b, b_calls) = Recording::failing("b");
		let (c, c_calls) = Recording::new("c");

		let pipeline = Pipeline::builder("failing").stage(a).stage(b).stage(c).build();
		let err = pipeline.run(Trace(vec![])).await.unwrap_err();

		assert_eq!(err, TxError::Submission("b".into()));
		assert_eq!(a_calls.load(Ordering::SeqCst), 1);
		assert_eq!(b_calls.load(Ordering::SeqCst), 1);
		assert_eq!(c_calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_terminal_value_short_circuits() {
		let (c, c_calls) = Recording::new("c");
		let pipeline = Pipeline::builder("terminal")
			.stage(stage_sync("finish", |mut trace: Trace| {
				trace.0.push("done");
				Ok(trace)
			}))
			.stage(c)
			.build();

		let result = pipeline.run(Trace(vec![])).await.unwrap();
		assert!(result.is_terminal());
		assert_eq!(c_calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_panic_becomes_unexpected() {
		let (c, c_calls) = Recording::new("c");
		let pipeline = Pipeline::builder("panicking")
			.stage(stage_sync("explode", |_: Trace| -> Result<Trace, TxError> {
				panic!("malformed log")
			}))
			.stage(c)
			.build();

		let err = pipeline.run(Trace(vec![])).await.unwrap_err();
		assert!(matches!(err, TxError::Unexpected(ref message) if message.contains("malformed log")));
		assert_eq!(c_calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_observer_sees_each_stage() {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let (a, _) = Recording::new("a");
		let (b, _) = Recording::new("b");

		let pipeline = Pipeline::builder("observed").stage(a).stage(b).build();
		let sink = seen.clone();
		pipeline
			.run_observed(Trace(vec![]), move |index, value| {
				sink.lock().unwrap().push((index, value.0.len()));
			})
			.await
			.unwrap();

		assert_eq!(*seen.lock().unwrap(), vec![(0, 1), (1, 2)]);
	}

	#[tokio::test]
	async fn test_async_closure_stage() {
		let pipeline = Pipeline::builder("closures")
			.stage(stage_fn("async", |mut trace: Trace| async move {
				tokio::task::yield_now().await;
				trace.0.push("async");
				Ok(trace)
			}))
			.build();

		assert_eq!(pipeline.stage_names(), vec!["async"]);
		assert_eq!(pipeline.run(Trace(vec![])).await.unwrap(), Trace(vec!["async"]));
	}

	#[tokio::test]
	async fn test_empty_pipeline_returns_input() {
		let pipeline: Pipeline<Trace> = Pipeline::builder("empty").build();
		assert!(pipeline.is_empty());
		assert_eq!(pipeline.run(Trace(vec!["x"])).await.unwrap(), Trace(vec!["x"]));
	}

	#[tokio::test(start_paused = true)]
	async fn test_timeout_wrapper() {
		let slow = stage_fn("post", |trace: Trace| async move {
			tokio::time::sleep(Duration::from_secs(300)).await;
			Ok(trace)
		});
		let pipeline = Pipeline::builder("timeout")
			.stage(timeout(slow, Duration::from_secs(120)))
			.build();

		let err = pipeline.run(Trace(vec![])).await.unwrap_err();
		assert_eq!(
			err,
			TxError::StageTimeout {
				stage: "post".into(),
				after_ms: 120_000
			}
		);
	}
}
