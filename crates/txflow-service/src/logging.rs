//! Tracing subscriber setup.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` wins over `level` when set.
pub fn setup_tracing(level: &str, json: bool) -> Result<()> {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
	let registry = tracing_subscriber::registry().with(env_filter);

	if json {
		registry.with(fmt::layer().json()).try_init()?;
	} else {
		registry.with(fmt::layer()).try_init()?;
	}

	Ok(())
}
