//! Ad queue E2E tests
//!
//! Queues built through `MediationBuilder`, filled over HTTP from a mock
//! auction server and mock partner adapters, on the tokio dispatcher.

mod mocks;

use std::sync::Arc;
use std::time::Duration;

use ad_mediation::mocks::MockPartnerAdapter;
use ad_mediation::{AdFormat, Mediation, MediationBuilder, Settings};

use crate::mocks::{wait_until, MockAuctionServer, RecordingEventSink, ScriptedResponse};

const PATIENCE: Duration = Duration::from_secs(3);

struct Harness {
	server: MockAuctionServer,
	alpha: Arc<MockPartnerAdapter>,
	events: Arc<RecordingEventSink>,
	mediation: Mediation,
}

async fn harness(fallback: ScriptedResponse, configure: impl FnOnce(&mut Settings)) -> Harness {
	let server = MockAuctionServer::spawn(fallback).await;
	let mut settings = server.settings();
	settings.queue.max_queue_size = 3;
	settings.queue.default_capacity = 2;
	configure(&mut settings);

	let alpha = Arc::new(MockPartnerAdapter::filling("alpha"));
	let events = Arc::new(RecordingEventSink::default());
	let mediation = MediationBuilder::from_config(settings)
		.with_adapter(alpha.clone())
		.with_event_sink(events.clone())
		.build()
		.expect("build mediation core");

	Harness {
		server,
		alpha,
		events,
		mediation,
	}
}

fn filling() -> ScriptedResponse {
	ScriptedResponse::bids("auction-q", &["alpha"])
}

#[tokio::test]
async fn test_queue_fills_after_initialization() {
	let h = harness(filling(), |_| {}).await;
	let queue = h.mediation.queue("home", AdFormat::Interstitial).unwrap();

	queue.start();
	tokio::time::sleep(Duration::from_millis(100)).await;
	assert!(!queue.is_running());
	assert_eq!(h.server.request_count(), 0);

	h.mediation.mark_initialized();
	assert!(wait_until(PATIENCE, || queue.number_of_ads_ready() == 2).await);
	tokio::time::sleep(Duration::from_millis(100)).await;
	assert_eq!(h.server.request_count(), 2);

	let queue_id = queue.queue_id().unwrap();
	for request in h.server.requests() {
		assert_eq!(request.header("x-mediation-queue-id"), Some(queue_id.as_str()));
		assert_eq!(request.body["ext"]["queue_id"], queue_id.as_str());
	}

	assert!(wait_until(PATIENCE, || h.events.events().len() == 1).await);
	let (kind, event) = &h.events.events()[0];
	assert_eq!(*kind, "started");
	assert_eq!(event.placement, "home");
	assert_eq!(event.queue_id, queue_id);
	assert_eq!(event.queue_capacity, 2);
	assert_eq!(event.actual_max_queue_size, 3);
}

#[tokio::test]
async fn test_next_ad_is_oldest_and_slot_refills() {
	let h = harness(filling(), |_| {}).await;
	h.mediation.mark_initialized();
	let queue = h.mediation.queue("home", AdFormat::Interstitial).unwrap();
	queue.start();
	assert!(wait_until(PATIENCE, || queue.number_of_ads_ready() == 2).await);

	let first_load = h.server.requests()[0]
		.header("x-mediation-load-id")
		.map(str::to_string);
	let ad = queue.next_ad().unwrap();
	assert_eq!(Some(ad.load_id().to_string()), first_load);

	assert!(wait_until(PATIENCE, || h.server.request_count() == 3).await);
	assert!(wait_until(PATIENCE, || queue.number_of_ads_ready() == 2).await);
}

#[tokio::test]
async fn test_stop_emits_event_and_halts_refill() {
	let h = harness(filling(), |_| {}).await;
	h.mediation.mark_initialized();
	let queue = h.mediation.queue("home", AdFormat::Interstitial).unwrap();
	queue.start();
	assert!(wait_until(PATIENCE, || queue.number_of_ads_ready() == 2).await);

	queue.stop();
	assert!(wait_until(PATIENCE, || h.events.events().len() == 2).await);
	let (kind, event) = &h.events.events()[1];
	assert_eq!(*kind, "stopped");
	assert_eq!(event.ads_ready, 2);

	assert!(queue.next_ad().is_some());
	tokio::time::sleep(Duration::from_millis(200)).await;
	assert_eq!(queue.number_of_ads_ready(), 1);
	assert_eq!(h.server.request_count(), 2);
}

#[tokio::test]
async fn test_failed_load_waits_for_penalty() {
	let h = harness(ScriptedResponse::no_bid(), |_| {}).await;
	h.mediation.mark_initialized();
	let queue = h.mediation.queue("home", AdFormat::Rewarded).unwrap();
	queue.start();

	assert!(wait_until(PATIENCE, || h.server.request_count() == 1).await);
	tokio::time::sleep(Duration::from_millis(300)).await;

	assert_eq!(h.server.request_count(), 1);
	assert!(queue.is_running());
	assert_eq!(queue.number_of_ads_ready(), 0);
}

#[tokio::test]
async fn test_lowered_ceiling_evicts_oldest_ads() {
	let h = harness(filling(), |settings| {
		settings.queue.default_capacity = 3;
	})
	.await;
	h.mediation.mark_initialized();
	let queue = h.mediation.queue("home", AdFormat::Interstitial).unwrap();
	queue.start();
	assert!(wait_until(PATIENCE, || queue.number_of_ads_ready() == 3).await);

	h.mediation.set_max_queue_size(1);
	assert_eq!(queue.queue_capacity(), 1);
	assert!(wait_until(PATIENCE, || queue.number_of_ads_ready() == 1).await);

	let ads = h.alpha.ads();
	assert!(ads[0].is_invalidated());
	assert!(ads[1].is_invalidated());
	assert!(!ads[2].is_invalidated());

	tokio::time::sleep(Duration::from_millis(200)).await;
	assert_eq!(queue.number_of_ads_ready(), 1);
	assert_eq!(h.server.request_count(), 3);
}

#[tokio::test]
async fn test_partner_expiration_removes_and_refills() {
	let h = harness(filling(), |settings| {
		settings.queue.default_capacity = 1;
	})
	.await;
	h.mediation.mark_initialized();
	let queue = h.mediation.queue("home", AdFormat::Interstitial).unwrap();
	queue.start();
	assert!(wait_until(PATIENCE, || queue.number_of_ads_ready() == 1).await);

	let load_id = h.alpha.requests()[0].load_id.clone();
	assert!(h.alpha.expire(&load_id));

	assert!(wait_until(PATIENCE, || h.server.request_count() == 2).await);
	assert!(wait_until(PATIENCE, || queue.number_of_ads_ready() == 1).await);
	assert!(h.alpha.ads()[0].is_invalidated());
	assert_ne!(queue.next_ad().unwrap().load_id(), load_id);
}

#[tokio::test]
async fn test_registry_hands_out_one_queue_per_placement() {
	let h = harness(filling(), |_| {}).await;

	let first = h.mediation.queue("home", AdFormat::Interstitial).unwrap();
	let second = h.mediation.queue("home", AdFormat::Rewarded).unwrap();

	assert!(first.ptr_eq(&second));
	assert!(h.mediation.queue("", AdFormat::Banner).is_err());
	assert_eq!(h.mediation.registry().placements(), vec!["home"]);
}

#[tokio::test]
async fn test_shutdown_stops_every_queue() {
	let h = harness(filling(), |_| {}).await;
	h.mediation.mark_initialized();
	let home = h.mediation.queue("home", AdFormat::Interstitial).unwrap();
	let level = h.mediation.queue("level-end", AdFormat::Rewarded).unwrap();
	home.start();
	level.start();
	assert!(wait_until(PATIENCE, || home.is_running() && level.is_running()).await);

	h.mediation.shutdown();

	assert!(wait_until(PATIENCE, || !home.is_running() && !level.is_running()).await);
	assert!(wait_until(PATIENCE, || {
		h.events
			.events()
			.iter()
			.filter(|(kind, _)| *kind == "stopped")
			.count()
			== 2
	})
	.await);
}
