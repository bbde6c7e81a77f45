//! Process-wide "initialization completed" signal

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Latch flipped once partner initialization has finished.
///
/// Clones observe the same latch.
#[derive(Clone, Debug)]
pub struct InitializationSignal {
	sender: Arc<watch::Sender<bool>>,
}

impl InitializationSignal {
	pub fn new() -> Self {
		let (sender, _) = watch::channel(false);
		Self {
			sender: Arc::new(sender),
		}
	}

	/// A signal that is already complete
	pub fn completed() -> Self {
		let signal = Self::new();
		signal.mark_complete();
		signal
	}

	pub fn mark_complete(&self) {
		if !self.sender.send_replace(true) {
			info!("Mediation initialization completed");
		}
	}

	pub fn is_complete(&self) -> bool {
		*self.sender.borrow()
	}

	/// Resolve once the signal is complete
	pub async fn wait(&self) {
		let mut receiver = self.sender.subscribe();
		// The sender lives as long as `self`, so the channel cannot close here
		let _ = receiver.wait_for(|complete| *complete).await;
	}
}

impl Default for InitializationSignal {
	fn default() -> Self {
		Self::new()
	}
}
