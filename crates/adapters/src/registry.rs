//! Registry of partner adapters keyed by partner identifier

use std::sync::Arc;

use dashmap::DashMap;
use mediation_types::{AdapterError, AdapterResult, PartnerAdapter, PartnerIdentity};
use tracing::{debug, info};

/// Thread-safe registry of partner adapters
#[derive(Debug, Clone, Default)]
pub struct PartnerRegistry {
	adapters: Arc<DashMap<String, Arc<dyn PartnerAdapter>>>,
}

impl PartnerRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register an adapter under its own partner identifier
	pub fn register(&self, adapter: Arc<dyn PartnerAdapter>) -> AdapterResult<()> {
		let partner_id = adapter.partner_id().to_string();
		if partner_id.is_empty() {
			return Err(AdapterError::InvalidConfiguration {
				partner_id,
				reason: "partner identifier must not be empty".to_string(),
			});
		}

		if self.adapters.contains_key(&partner_id) {
			return Err(AdapterError::InvalidConfiguration {
				partner_id,
				reason: "adapter already registered".to_string(),
			});
		}

		info!(
			"Registered partner adapter {} ({})",
			partner_id,
			adapter.partner_info().version_string()
		);
		self.adapters.insert(partner_id, adapter);
		Ok(())
	}

	pub fn get(&self, partner_id: &str) -> Option<Arc<dyn PartnerAdapter>> {
		let adapter = self.adapters.get(partner_id).map(|entry| entry.value().clone());
		if adapter.is_none() {
			debug!("No partner adapter registered for {}", partner_id);
		}
		adapter
	}

	/// Snapshot of every registered adapter
	pub fn all(&self) -> Vec<Arc<dyn PartnerAdapter>> {
		self.adapters
			.iter()
			.map(|entry| entry.value().clone())
			.collect()
	}

	/// Identities of every registered adapter
	pub fn identities(&self) -> Vec<PartnerIdentity> {
		self.adapters
			.iter()
			.map(|entry| entry.value().partner_info().clone())
			.collect()
	}

	pub fn len(&self) -> usize {
		self.adapters.len()
	}

	pub fn is_empty(&self) -> bool {
		self.adapters.is_empty()
	}
}
