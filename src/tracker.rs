//! Per-service health records kept in the shared counter store.
//!
//! A record is three independent keys: the enabled flag (no TTL) and the success and
//! failure counters (each with its own TTL, refreshed only when that key is written).
//! A record counts as initialized once its flag key exists; absent counters read as zero.

// self
use crate::{
	_prelude::*,
	config::StatusConfig,
	obs,
	store::{CounterStore, ServiceField, StoreError, service_key},
};

/// Classified result of one provider call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// The provider answered with a result.
	Success,
	/// The provider signalled a definitive failure.
	Failure,
	/// The provider handed control back through a redirect.
	Redirect,
}
impl Outcome {
	/// Returns `true` for outcomes folded into the success counter.
	pub const fn is_success(self) -> bool {
		!matches!(self, Outcome::Failure)
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Success => "success",
			Outcome::Failure => "failure",
			Outcome::Redirect => "redirect",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Snapshot of one service record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
	/// Gating flag; disabled services are always rejected.
	pub enabled: bool,
	/// Successes observed within the counter TTL window.
	pub successes: u64,
	/// Failures observed within the counter TTL window.
	pub failures: u64,
}
impl ServiceStatus {
	/// State of a freshly initialized (or unreadable) record.
	pub const FRESH: Self = Self { enabled: true, successes: 0, failures: 0 };

	/// Success-to-failure ratio, or `None` when no failure has been observed.
	pub fn ratio(&self) -> Option<f64> {
		(self.failures != 0).then(|| self.successes as f64 / self.failures as f64)
	}
}
impl From<ServiceStatus> for (bool, u64, u64) {
	fn from(status: ServiceStatus) -> Self {
		(status.enabled, status.successes, status.failures)
	}
}

/// Owns the enabled flag and the success/failure counters of every service.
///
/// The tracker holds no in-process state besides configuration; concurrent callers,
/// including other processes sharing the store, only meet in the store's single-key
/// operations.
#[derive(Clone)]
pub struct ServiceHealthTracker {
	store: Arc<dyn CounterStore>,
	services: Vec<String>,
	ttl: Duration,
}
impl ServiceHealthTracker {
	/// Creates a tracker for the configured services.
	pub fn new(store: Arc<dyn CounterStore>, config: &StatusConfig) -> Self {
		Self { store, services: config.policy.services.clone(), ttl: config.ttl() }
	}

	/// Services this tracker was configured with.
	pub fn services(&self) -> &[String] {
		&self.services
	}

	/// Underlying counter store.
	pub fn store(&self) -> &Arc<dyn CounterStore> {
		&self.store
	}

	/// Touches every configured service once, initializing those whose flag key is absent.
	pub async fn prime(&self) -> Result<()> {
		for service in &self.services {
			let flag = service_key(service, ServiceField::Enabled);

			if self.store.get(&flag).await?.is_none() {
				self.initialize(service).await?;
			}
		}

		Ok(())
	}

	/// Resets a record: enabled, both counters zero with a fresh TTL.
	pub async fn initialize(&self, service: &str) -> Result<()> {
		self.set_flag(service, true).await?;
		self.seed(service, ServiceField::Successes, 0).await?;
		self.seed(service, ServiceField::Failures, 0).await?;

		Ok(())
	}

	/// Re-enables a service without touching its counters.
	pub async fn enable(&self, service: &str) -> Result<()> {
		self.set_flag(service, true).await
	}

	/// Disables a service without touching its counters.
	pub async fn disable(&self, service: &str) -> Result<()> {
		self.set_flag(service, false).await
	}

	/// Reads a record, lazily initializing it when its flag key is absent.
	///
	/// Only transport failures surface, as [`StoreError::Read`].
	pub async fn get_status(&self, service: &str) -> Result<ServiceStatus> {
		let enabled = match self.store.get(&service_key(service, ServiceField::Enabled)).await? {
			Some(flag) => flag != 0,
			None => {
				if let Err(e) = self.initialize(service).await {
					let e = as_store_error(e);

					obs::lazy_initialize_failed(service, &e);
				}

				true
			},
		};
		let successes =
			self.store.get(&service_key(service, ServiceField::Successes)).await?.unwrap_or(0);
		let failures =
			self.store.get(&service_key(service, ServiceField::Failures)).await?.unwrap_or(0);

		Ok(ServiceStatus { enabled, successes, failures })
	}

	/// Counts one call outcome and returns the new value of the affected counter.
	///
	/// An expired counter is reseeded to `1` and the opposite counter reset to `0`; that
	/// path never surfaces an error of its own.
	pub async fn update_status(&self, service: &str, success: bool) -> Result<u64> {
		let (field, other) = if success {
			(ServiceField::Successes, ServiceField::Failures)
		} else {
			(ServiceField::Failures, ServiceField::Successes)
		};
		let key = service_key(service, field);

		match self.store.increment(&key).await {
			Ok(value) => Ok(value),
			Err(StoreError::KeyExpired { .. }) => {
				obs::counter_reseeded(service, &key);
				self.seed(service, field, 1).await?;
				self.seed(service, other, 0).await?;

				Ok(1)
			},
			Err(e) => Err(e.into()),
		}
	}

	/// Folds a classified outcome into the counters.
	pub async fn record(&self, service: &str, outcome: Outcome) -> Result<u64> {
		self.update_status(service, outcome.is_success()).await
	}

	async fn set_flag(&self, service: &str, enabled: bool) -> Result<()> {
		let key = service_key(service, ServiceField::Enabled);

		self.store.set(&key, u64::from(enabled), None).await.map_err(as_write)?;

		Ok(())
	}

	async fn seed(&self, service: &str, field: ServiceField, value: u64) -> Result<()> {
		let key = service_key(service, field);

		self.store.set(&key, value, Some(self.ttl)).await.map_err(as_write)?;

		Ok(())
	}
}
impl Debug for ServiceHealthTracker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ServiceHealthTracker")
			.field("services", &self.services)
			.field("ttl", &self.ttl)
			.finish()
	}
}

// Writes only ever fail as writes, whatever the backend reported.
fn as_write(e: StoreError) -> Error {
	match e {
		StoreError::Write { .. } => e.into(),
		other => StoreError::write(other).into(),
	}
}

fn as_store_error(e: Error) -> StoreError {
	match e {
		Error::Storage(e) => e,
		other => StoreError::write(other),
	}
}
