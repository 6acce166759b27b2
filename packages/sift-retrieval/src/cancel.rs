use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};

use crate::{Error, Result};

/// Cooperative cancellation shared between a caller and an in-flight query.
///
/// The pipeline checks it before every stage; work already finished for the current stage is
/// discarded rather than merged.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
	cancelled: Arc<AtomicBool>,
}
impl CancellationToken {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.cancelled.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancelled.load(Ordering::SeqCst)
	}

	pub fn check(&self, stage: &'static str) -> Result<()> {
		if self.is_cancelled() {
			tracing::info!(stage, "Query cancelled.");

			return Err(Error::Cancelled { stage });
		}

		Ok(())
	}
}
