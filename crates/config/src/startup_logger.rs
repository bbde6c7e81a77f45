//! Startup logging for the mediation core

use std::env;
use tracing::info;

use crate::Settings;

/// Logs service information at startup
pub fn log_service_info() {
	let service_name = "ad-mediation";
	let service_version = env!("CARGO_PKG_VERSION");

	info!("=== Ad Mediation Core Starting ===");
	info!("Service: {} v{}", service_name, service_version);
	info!("Platform: {} ({})", env::consts::OS, env::consts::ARCH);

	if let Ok(rust_log) = env::var("RUST_LOG") {
		info!("Log Level: {}", rust_log);
	}

	info!(
		"Started at: {}",
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
	);
}

/// Logs the effective settings, one line per section
pub fn log_settings(settings: &Settings) {
	info!(
		"Auction: endpoint={}, timeout={}ms, rate_limiting={}",
		settings.auction.endpoint,
		settings.auction.request_timeout_ms,
		settings.auction.rate_limiting_enabled
	);
	info!(
		"Loading: load_timeout={}ms, partner_token_timeout={}ms",
		settings.loading.load_timeout_ms, settings.loading.partner_token_timeout_ms
	);
	info!(
		"Queues: max_size={}, default_capacity={}, ttl={}s, penalty={}s, events={}",
		settings.queue.max_queue_size,
		settings.queue.default_capacity,
		settings.queue.ttl_secs,
		settings.queue.penalty_delay_secs,
		settings.queue.events_endpoint.as_deref().unwrap_or("disabled")
	);
}

/// Logs shutdown information
pub fn log_service_shutdown() {
	info!("Ad Mediation Core Shutting Down");
	info!(
		"Shutdown at: {}",
		chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
	);
}
