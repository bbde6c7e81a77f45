//! Partner adapter fixtures

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ad_mediation::mocks::MockPartnerAdapter;
use ad_mediation::{Bid, PartnerAdapter, PartnerRegistry, QueueEvent, QueueEventSink};
use async_trait::async_trait;

/// Named mock adapters registered together
#[allow(dead_code)]
pub struct PartnerSet {
	pub registry: PartnerRegistry,
	adapters: HashMap<String, Arc<MockPartnerAdapter>>,
}

impl PartnerSet {
	pub fn new(filling: &[&str], failing: &[&str]) -> Self {
		let registry = PartnerRegistry::new();
		let mut adapters = HashMap::new();

		let scripted = filling
			.iter()
			.map(|id| MockPartnerAdapter::filling(id))
			.chain(failing.iter().map(|id| MockPartnerAdapter::failing(id)));
		for adapter in scripted {
			let adapter = Arc::new(adapter);
			registry
				.register(adapter.clone())
				.expect("register mock adapter");
			adapters.insert(adapter.partner_id().to_string(), adapter);
		}

		Self { registry, adapters }
	}

	#[allow(dead_code)]
	pub fn adapter(&self, partner_id: &str) -> Arc<MockPartnerAdapter> {
		Arc::clone(&self.adapters[partner_id])
	}

	#[allow(dead_code)]
	pub fn all(&self) -> Vec<Arc<MockPartnerAdapter>> {
		self.adapters.values().cloned().collect()
	}

	#[allow(dead_code)]
	pub fn load_calls(&self, partner_id: &str) -> usize {
		self.adapters[partner_id].load_calls()
	}
}

/// Ranked bids, one per partner, sharing an auction id
#[allow(dead_code)]
pub fn bids_for(partners: &[&str]) -> Vec<Bid> {
	partners
		.iter()
		.enumerate()
		.map(|(rank, partner)| {
			Bid::new(
				format!("bid-{rank}"),
				*partner,
				format!("{partner}-placement"),
				"auction-e2e",
			)
			.with_price(10.0 - rank as f64)
		})
		.collect()
}

/// Queue event sink keeping every event
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingEventSink {
	events: Mutex<Vec<(&'static str, QueueEvent)>>,
}

impl RecordingEventSink {
	#[allow(dead_code)]
	pub fn events(&self) -> Vec<(&'static str, QueueEvent)> {
		self.events.lock().unwrap().clone()
	}
}

#[async_trait]
impl QueueEventSink for RecordingEventSink {
	async fn queue_started(&self, event: QueueEvent) {
		self.events.lock().unwrap().push(("started", event));
	}

	async fn queue_stopped(&self, event: QueueEvent) {
		self.events.lock().unwrap().push(("stopped", event));
	}
}
