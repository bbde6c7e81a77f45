//! Waterfall E2E tests
//!
//! Runs the bid fulfillment operation over a partner registry of
//! call-tracking mock adapters.

mod mocks;

use std::sync::Arc;
use std::time::Duration;

use ad_mediation::service::{FulfillError, PartnerAdLoader};
use ad_mediation::{AdFormat, AdapterError, BidFulfillOperation, LoadRequest};

use crate::mocks::{bids_for, PartnerSet};

fn operation(partners: &PartnerSet, order: &[&str]) -> BidFulfillOperation {
	let loader: Arc<dyn PartnerAdLoader> = Arc::new(partners.registry.clone());
	BidFulfillOperation::new(
		bids_for(order),
		LoadRequest::new("home", AdFormat::Interstitial),
		loader,
		None,
	)
}

#[tokio::test]
async fn test_stops_at_first_filling_partner() {
	let partners = PartnerSet::new(&["gamma", "delta"], &["alpha", "beta"]);

	let fulfilled = operation(&partners, &["alpha", "beta", "gamma", "delta"])
		.run()
		.await
		.unwrap();

	assert_eq!(fulfilled.winning_bid.partner_id, "gamma");
	assert_eq!(fulfilled.winning_bid.identifier, "bid-2");
	assert_eq!(fulfilled.bids.len(), 4);
	let failed: Vec<&str> = fulfilled
		.runner_ups
		.iter()
		.map(|failure| failure.partner_id.as_str())
		.collect();
	assert_eq!(failed, vec!["alpha", "beta"]);

	assert_eq!(partners.load_calls("alpha"), 1);
	assert_eq!(partners.load_calls("beta"), 1);
	assert_eq!(partners.load_calls("gamma"), 1);
	assert_eq!(partners.load_calls("delta"), 0);
}

#[tokio::test]
async fn test_all_partners_failing_reports_every_bid() {
	let partners = PartnerSet::new(&[], &["alpha", "beta", "gamma"]);

	let error = operation(&partners, &["alpha", "beta", "gamma"])
		.run()
		.await
		.unwrap_err();

	let failures = match error {
		FulfillError::AllBidsFailed { failures } => failures,
		other => panic!("expected every bid to fail, got {:?}", other),
	};
	assert_eq!(failures.len(), 3);
	assert!(failures
		.iter()
		.all(|failure| matches!(failure.error, AdapterError::NoFill { .. })));
	for partner in ["alpha", "beta", "gamma"] {
		assert_eq!(partners.load_calls(partner), 1);
	}
}

#[tokio::test]
async fn test_unregistered_partner_is_skipped() {
	let partners = PartnerSet::new(&["beta"], &[]);

	let fulfilled = operation(&partners, &["unknown", "beta"])
		.run()
		.await
		.unwrap();

	assert_eq!(fulfilled.winning_bid.partner_id, "beta");
	assert!(matches!(
		fulfilled.runner_ups[0].error,
		AdapterError::PartnerNotFound { .. }
	));
}

#[tokio::test]
async fn test_partner_request_carries_bid_details() {
	let partners = PartnerSet::new(&["alpha"], &[]);

	let fulfilled = operation(&partners, &["alpha"]).run().await.unwrap();

	let requests = partners.adapter("alpha").requests();
	assert_eq!(requests.len(), 1);
	assert_eq!(requests[0].partner_placement, "alpha-placement");
	assert_eq!(requests[0].mediation_placement, "home");
	assert_eq!(requests[0].bid_identifier, "bid-0");
	assert_eq!(requests[0].load_id, fulfilled.partner_ad.load_id());
}

#[tokio::test]
async fn test_cancelled_waterfall_attempts_nothing_further() {
	let partners = PartnerSet::new(&[], &["alpha", "beta"]);
	let operation = operation(&partners, &["alpha", "beta"]);
	let token = operation.cancellation_token();
	token.cancel();

	let error = operation.run().await.unwrap_err();

	assert_eq!(error, FulfillError::Cancelled);
	assert_eq!(partners.load_calls("alpha"), 0);
	assert_eq!(partners.load_calls("beta"), 0);
}

#[tokio::test]
async fn test_ad_arriving_after_cancellation_is_invalidated() {
	let registry = ad_mediation::PartnerRegistry::new();
	let slow = Arc::new(
		ad_mediation::mocks::MockPartnerAdapter::filling("slow")
			.with_load_delay(Duration::from_millis(200)),
	);
	registry.register(slow.clone()).unwrap();
	let loader: Arc<dyn PartnerAdLoader> = Arc::new(registry);

	let operation = BidFulfillOperation::new(
		bids_for(&["slow"]),
		LoadRequest::new("home", AdFormat::Interstitial),
		loader,
		None,
	);
	let token = operation.cancellation_token();
	let running = tokio::spawn(operation.run());
	tokio::time::sleep(Duration::from_millis(50)).await;
	token.cancel();

	let error = running.await.unwrap().unwrap_err();

	assert_eq!(error, FulfillError::Cancelled);
	assert_eq!(slow.ads().len(), 1);
	assert!(slow.ads()[0].is_invalidated());
}
