//! Shared-counter circuit breaker for third-party OAuth providers.
//!
//! Per-provider health lives in a memcached-compatible store; an admission gate sits in front
//! of provider traffic and every provider call feeds its outcome back into the counters.
//!
//! Data flows leaf-first through the modules:
//!
//! - [`store`]: the [`CounterStore`](store::CounterStore) contract plus in-memory and memcached
//!   backends;
//! - [`tracker`]: per-service enabled flag and success/failure counters;
//! - [`gate`]: admit/reject decisions for inbound requests targeting a provider;
//! - [`feedback`]: classification of provider call outcomes, fed back into the tracker;
//! - [`provider`]: the adapter capability interfaces and their registry.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod config;
pub mod error;
pub mod feedback;
pub mod gate;
pub mod obs;
pub mod provider;
pub mod store;
pub mod tracker;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and fixtures for tests; enabled via `cfg(test)` or the `test`
	//! crate feature.

	pub use crate::_prelude::*;

	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use crate::{
		config::{StatusConfig, ThresholdConfig},
		error::{BackendError, ErrorPayload},
		feedback::Services,
		gate::RequestGate,
		provider::{
			AccessContext, AccessOutcome, Account, AdapterFuture, GetContactsOptions, MessageOptions,
			ProviderKind, ProviderRegistry, ProviderReply, Requester, Responder,
		},
		store::{CounterStore, MemoryStore},
		tracker::ServiceHealthTracker,
	};

	/// How a [`StubProvider`] answers its next calls.
	#[derive(Clone, Debug)]
	pub enum Behavior {
		/// Answer with a result (requests) or a completed profile (access flow).
		Succeed(Value),
		/// Answer normally but with an application-level error payload.
		Reject(ErrorPayload),
		/// Raise a definitive provider failure.
		Fail(BackendError),
		/// Hand control back through a redirect.
		Redirect(Url),
	}

	/// Provider adapter whose answers are scripted by the test; clones share the script and
	/// the call counter.
	#[derive(Clone, Debug)]
	pub struct StubProvider {
		domain: &'static str,
		behavior: Arc<parking_lot::Mutex<Behavior>>,
		calls: Arc<AtomicUsize>,
	}
	impl StubProvider {
		/// Creates a stub answering as `kind` with `behavior`.
		pub fn new(kind: ProviderKind, behavior: Behavior) -> Self {
			Self {
				domain: kind.domain(),
				behavior: Arc::new(parking_lot::Mutex::new(behavior)),
				calls: Arc::new(AtomicUsize::new(0)),
			}
		}

		/// Replaces the scripted answer for subsequent calls.
		pub fn set(&self, behavior: Behavior) {
			*self.behavior.lock() = behavior;
		}

		/// Number of adapter calls seen so far.
		pub fn calls(&self) -> usize {
			self.calls.load(Ordering::SeqCst)
		}

		fn next(&self) -> Behavior {
			self.calls.fetch_add(1, Ordering::SeqCst);

			self.behavior.lock().clone()
		}

		fn reply(&self) -> Result<ProviderReply, BackendError> {
			match self.next() {
				Behavior::Succeed(value) => Ok(ProviderReply::ok(value)),
				Behavior::Reject(payload) => Ok(ProviderReply::failed(payload)),
				Behavior::Fail(e) => Err(e),
				Behavior::Redirect(url) => Ok(ProviderReply::ok(Value::String(url.into()))),
			}
		}

		fn access(&self) -> Result<AccessOutcome, BackendError> {
			match self.next() {
				Behavior::Succeed(value) => Ok(AccessOutcome::Completed(value)),
				Behavior::Reject(payload) => Ok(AccessOutcome::Failed(payload)),
				Behavior::Fail(e) => Err(e),
				Behavior::Redirect(url) => Ok(AccessOutcome::Redirect(url)),
			}
		}
	}
	impl Requester for StubProvider {
		fn name(&self) -> &str {
			self.domain
		}

		fn sendmessage<'a>(
			&'a self,
			_account: &'a Account,
			_message: &'a str,
			_options: &'a MessageOptions,
		) -> AdapterFuture<'a, ProviderReply> {
			Box::pin(async move { self.reply() })
		}

		fn getcontacts<'a>(
			&'a self,
			_account: &'a Account,
			_options: &'a GetContactsOptions,
		) -> AdapterFuture<'a, ProviderReply> {
			Box::pin(async move { self.reply() })
		}
	}
	impl Responder for StubProvider {
		fn name(&self) -> &str {
			self.domain
		}

		fn request_access<'a>(
			&'a self,
			_ctx: &'a mut AccessContext,
		) -> AdapterFuture<'a, AccessOutcome> {
			Box::pin(async move { self.access() })
		}

		fn verify<'a>(&'a self, _ctx: &'a mut AccessContext) -> AdapterFuture<'a, AccessOutcome> {
			Box::pin(async move { self.access() })
		}
	}

	/// Builds a configuration gating `services` with the parallel `thresholds`.
	pub fn policy_config<S, T>(services: S, thresholds: T) -> StatusConfig
	where
		S: IntoIterator,
		S::Item: Into<String>,
		T: IntoIterator<Item = f64>,
	{
		StatusConfig::new(ThresholdConfig::new(services, thresholds))
	}

	/// Constructs a tracker backed by a fresh in-memory store.
	pub fn memory_tracker(config: &StatusConfig) -> (ServiceHealthTracker, MemoryStore) {
		let store = MemoryStore::default();
		let shared: Arc<dyn CounterStore> = Arc::new(store.clone());

		(ServiceHealthTracker::new(shared, config), store)
	}

	/// Constructs a gate over a fresh in-memory tracker and returns both.
	pub fn memory_gate(config: &StatusConfig) -> (RequestGate, ServiceHealthTracker) {
		let (tracker, _) = memory_tracker(config);
		let gate = RequestGate::new(tracker.clone(), config)
			.expect("Gate fixture configuration should be valid.");

		(gate, tracker)
	}

	/// Registers every stub as both requester and responder for its provider.
	pub fn stub_registry(providers: &[(ProviderKind, StubProvider)]) -> Arc<ProviderRegistry> {
		let builder = providers.iter().fold(ProviderRegistry::builder(), |builder, (kind, stub)| {
			builder.requester(*kind, stub.clone()).responder(*kind, stub.clone())
		});

		Arc::new(builder.build())
	}

	/// Constructs the [`Services`] facade over stub providers and a fresh in-memory tracker.
	pub fn memory_services(
		config: &StatusConfig,
		providers: &[(ProviderKind, StubProvider)],
	) -> (Services, ServiceHealthTracker) {
		let (tracker, _) = memory_tracker(config);
		let services = Services::new(config, tracker.clone(), stub_registry(providers))
			.expect("Every configured provider should be registered in the fixture.");

		(services, tracker)
	}

	/// Account record used by provider calls in tests.
	pub fn test_account() -> Account {
		serde_json::json!({ "domain": "twitter.com", "userid": "42", "username": "someone" })
	}

	/// Callback URL handed to access flows in tests.
	pub fn test_callback() -> Url {
		Url::parse("https://app.example.com/verify").expect("Callback fixture URL should parse.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use http;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _, tower as _};
