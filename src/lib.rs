//! Ad Mediation Library
//!
//! Runtime core of an in-app ad mediation client: server-side auctions,
//! the bid fulfillment waterfall and per-placement queues of pre-loaded ads.
//!
//! [`MediationBuilder`] wires the pieces together:
//!
//! ```no_run
//! use ad_mediation::{AdFormat, LoadRequest, MediationBuilder};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let mediation = MediationBuilder::new().build()?;
//! mediation.mark_initialized();
//!
//! let ad = mediation
//! 	.load_ad(LoadRequest::new("home", AdFormat::Interstitial), None)
//! 	.await?;
//! println!("loaded {} from {}", ad.load_id(), ad.partner_id());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

// Core domain types
pub use mediation_types::{
	serde_json, AdFormat, AdSize, AdapterError, AdapterResult, AuctionTransport, Bid, BidFailure,
	LoadRequest, LoadedAd, MediationError, MediationResult, NoopQueueEventSink, PartnerAd,
	PartnerAdDelegate, PartnerAdLoadRequest, PartnerAdapter, PartnerIdentity, PreBidRequest,
	QueueEvent, QueueEventSink, TransportError,
};

// Service layer
pub use mediation_service::{
	AdQueue, AdQueueDelegate, AuctionService, BidFulfillOperation, DispatchQueue,
	InitializationSignal, QueueError, QueueRegistry, RateLimiter, RequestContext,
	RequestContextProvider, ResumableTimer, StaticContextProvider, TaskDispatcher,
	TokioDispatcher,
};

// Adapters
pub use mediation_adapters::{HttpAuctionTransport, HttpQueueEventClient, PartnerRegistry};

// Config
pub use mediation_config::{load_config, log_service_info, LogFormat, LoggingSettings, Settings};

use mediation_config::{log_service_shutdown, log_settings};

pub mod types {
	pub use mediation_types::*;
}

pub mod service {
	pub use mediation_service::*;
}

pub mod adapters {
	pub use mediation_adapters::*;
}

pub mod config {
	pub use mediation_config::*;
}

pub mod mocks;

// Re-export external dependencies for adapter implementations
pub use async_trait;

use mediation_config::ConfigValidationError;
use mediation_service::{
	AdLoader, AdapterPartnerInfoCollector, DispatchError, MediationAdLoader, PartnerAdLoader,
};

/// Errors raised while assembling a [`Mediation`]
#[derive(Error, Debug)]
pub enum BuildError {
	#[error("Invalid settings: {0}")]
	Settings(#[from] ConfigValidationError),

	#[error("Failed to register partner adapter: {0}")]
	Adapter(#[from] AdapterError),

	#[error("Failed to create HTTP client: {0}")]
	Transport(#[from] TransportError),

	#[error("No dispatcher available: {0}")]
	Dispatcher(#[from] DispatchError),
}

/// Builder pattern for configuring the mediation core
#[derive(Default)]
pub struct MediationBuilder {
	settings: Option<Settings>,
	adapters: Vec<Arc<dyn PartnerAdapter>>,
	transport: Option<Arc<dyn AuctionTransport>>,
	events: Option<Arc<dyn QueueEventSink>>,
	context: Option<Arc<dyn RequestContextProvider>>,
	dispatcher: Option<Arc<dyn TaskDispatcher>>,
}

impl MediationBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Start from settings, typically the output of [`load_config`]
	pub fn from_config(settings: Settings) -> Self {
		Self::new().with_settings(settings)
	}

	pub fn with_settings(mut self, settings: Settings) -> Self {
		self.settings = Some(settings);
		self
	}

	pub fn settings(&self) -> Option<&Settings> {
		self.settings.as_ref()
	}

	/// Register a partner adapter. Duplicates are reported by [`build`](Self::build).
	pub fn with_adapter(mut self, adapter: Arc<dyn PartnerAdapter>) -> Self {
		self.adapters.push(adapter);
		self
	}

	/// Replace the HTTP auction transport
	pub fn with_transport(mut self, transport: Arc<dyn AuctionTransport>) -> Self {
		self.transport = Some(transport);
		self
	}

	/// Replace the queue event sink. Defaults to HTTP delivery when
	/// `queue.events_endpoint` is set, otherwise events are dropped.
	pub fn with_event_sink(mut self, events: Arc<dyn QueueEventSink>) -> Self {
		self.events = Some(events);
		self
	}

	/// Supply app, device, user and regulatory context for bid requests
	pub fn with_context_provider(mut self, context: Arc<dyn RequestContextProvider>) -> Self {
		self.context = Some(context);
		self
	}

	/// Replace the dispatcher. Defaults to a [`TokioDispatcher`] on the
	/// current runtime.
	pub fn with_dispatcher(mut self, dispatcher: Arc<dyn TaskDispatcher>) -> Self {
		self.dispatcher = Some(dispatcher);
		self
	}

	/// Assemble every service. Must run inside a tokio runtime unless a
	/// dispatcher was supplied.
	pub fn build(self) -> Result<Mediation, BuildError> {
		let settings = self.settings.unwrap_or_default();
		settings.validate()?;
		log_settings(&settings);

		let dispatcher: Arc<dyn TaskDispatcher> = match self.dispatcher {
			Some(dispatcher) => dispatcher,
			None => Arc::new(TokioDispatcher::current()?),
		};

		let partners = PartnerRegistry::new();
		for adapter in self.adapters {
			partners.register(adapter)?;
		}

		let transport: Arc<dyn AuctionTransport> = match self.transport {
			Some(transport) => transport,
			None => Arc::new(HttpAuctionTransport::new(&settings.auction, &settings.app)?),
		};

		let events: Arc<dyn QueueEventSink> = match (self.events, &settings.queue.events_endpoint) {
			(Some(events), _) => events,
			(None, Some(endpoint)) => Arc::new(HttpQueueEventClient::new(
				endpoint,
				&settings.app.sdk_version,
			)?),
			(None, None) => Arc::new(NoopQueueEventSink),
		};

		let context = self
			.context
			.unwrap_or_else(|| Arc::new(StaticContextProvider::new(RequestContext::default())));

		let rate_limiter = Arc::new(RateLimiter::new(settings.auction.default_rate_limit()));
		let partner_info = Arc::new(AdapterPartnerInfoCollector::new(
			partners.clone(),
			Arc::clone(&dispatcher),
			settings.loading.partner_token_timeout(),
		));
		let auction = Arc::new(AuctionService::new(
			transport,
			partner_info,
			context,
			rate_limiter,
			settings.auction.clone(),
			settings.app.sdk_version.clone(),
		));

		let partner_loader: Arc<dyn PartnerAdLoader> = Arc::new(partners.clone());
		let loader: Arc<dyn AdLoader> = Arc::new(MediationAdLoader::new(
			Arc::clone(&auction),
			partner_loader,
			Arc::clone(&dispatcher),
			settings.loading.load_timeout(),
		));

		let initialization = InitializationSignal::new();
		let events_enabled = settings.queue.events_endpoint.is_some();
		let queues = QueueRegistry::new(
			&settings.queue,
			Arc::clone(&loader),
			Arc::clone(&dispatcher),
			initialization.clone(),
			events,
		);

		info!(
			"Mediation core ready with {} partner adapter(s), queue events {}",
			partners.len(),
			if events_enabled { "enabled" } else { "disabled" }
		);

		Ok(Mediation {
			settings,
			partners,
			auction,
			loader,
			queues,
			initialization,
			dispatcher,
		})
	}
}

/// Assembled mediation core
pub struct Mediation {
	settings: Settings,
	partners: PartnerRegistry,
	auction: Arc<AuctionService>,
	loader: Arc<dyn AdLoader>,
	queues: QueueRegistry,
	initialization: InitializationSignal,
	dispatcher: Arc<dyn TaskDispatcher>,
}

impl Mediation {
	pub fn builder() -> MediationBuilder {
		MediationBuilder::new()
	}

	/// Install the global tracing subscriber described by `logging`.
	///
	/// `RUST_LOG` overrides the configured level. Returns `false` when a
	/// subscriber was already installed.
	pub fn init_tracing(logging: &LoggingSettings) -> bool {
		let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
			.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

		let installed = match logging.format {
			LogFormat::Json => {
				let subscriber = tracing_subscriber::fmt().json().with_env_filter(env_filter);
				if logging.structured {
					subscriber.with_target(true).with_thread_ids(true).try_init()
				} else {
					subscriber.try_init()
				}
			},
			LogFormat::Pretty => {
				let subscriber = tracing_subscriber::fmt()
					.pretty()
					.with_env_filter(env_filter);
				if logging.structured {
					subscriber.with_target(true).with_thread_ids(true).try_init()
				} else {
					subscriber.try_init()
				}
			},
			LogFormat::Compact => {
				let subscriber = tracing_subscriber::fmt()
					.compact()
					.with_env_filter(env_filter);
				if logging.structured {
					subscriber.with_target(true).with_thread_ids(true).try_init()
				} else {
					subscriber.try_init()
				}
			},
		}
		.is_ok();

		if installed {
			log_service_info();
			info!(
				"Logging configuration applied: level={}, format={:?}, structured={}",
				logging.level, logging.format, logging.structured
			);
		}
		installed
	}

	pub fn settings(&self) -> &Settings {
		&self.settings
	}

	pub fn partners(&self) -> &PartnerRegistry {
		&self.partners
	}

	pub fn dispatcher(&self) -> &Arc<dyn TaskDispatcher> {
		&self.dispatcher
	}

	/// Signal that partner initialization finished. Deferred queue starts
	/// proceed and direct loads are accepted from now on.
	pub fn mark_initialized(&self) {
		self.initialization.mark_complete();
	}

	pub fn is_initialized(&self) -> bool {
		self.initialization.is_complete()
	}

	/// Run one auction and waterfall for `request`
	pub async fn load_ad(
		&self,
		request: LoadRequest,
		delegate: Option<Arc<dyn PartnerAdDelegate>>,
	) -> MediationResult<LoadedAd> {
		if !self.initialization.is_complete() {
			return Err(MediationError::NotInitialized {
				reason: "partner initialization has not completed".to_string(),
			});
		}
		self.loader.load(request, delegate).await
	}

	/// Remaining load cooldown advised by the server for `placement`
	pub fn time_until_next_load_is_allowed(&self, placement: &str) -> Duration {
		self.auction
			.rate_limiter()
			.time_until_next_load_is_allowed(placement)
	}

	/// Queue of `placement`, created with `format` on first use
	pub fn queue(&self, placement: &str, format: AdFormat) -> Result<AdQueue, QueueError> {
		self.queues.queue(placement, format)
	}

	/// Apply a server-advised ceiling to every queue
	pub fn set_max_queue_size(&self, max_queue_size: usize) {
		self.queues.set_max_queue_size(max_queue_size);
	}

	pub fn registry(&self) -> &QueueRegistry {
		&self.queues
	}

	/// Stop every queue. Queued ads stay available until they expire.
	pub fn shutdown(&self) {
		for placement in self.queues.placements() {
			if let Some(queue) = self.queues.get(&placement) {
				queue.stop();
			}
		}
		log_service_shutdown();
	}
}
