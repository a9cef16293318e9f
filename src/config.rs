//! Explicit configuration values passed into tracker, gate, and feedback constructors.
//!
//! Nothing in the crate reads process-wide state; callers deserialize (or build) a
//! [`StatusConfig`], validate it once, and hand clones to the components that need it.

// self
use crate::{_prelude::*, error::ConfigError};

/// Parallel `services[i] ↔ thresholds[i]` table consulted by the gate.
///
/// Ordering is significant: the threshold at index `i` belongs to the service at index `i`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
	/// Service (provider domain) identifiers under gate policy.
	pub services: Vec<String>,
	/// Minimum success-to-failure ratio for the service at the same index.
	pub thresholds: Vec<f64>,
}
impl ThresholdConfig {
	/// Creates a table from parallel arrays.
	pub fn new<S, T>(services: S, thresholds: T) -> Self
	where
		S: IntoIterator,
		S::Item: Into<String>,
		T: IntoIterator<Item = f64>,
	{
		Self {
			services: services.into_iter().map(Into::into).collect(),
			thresholds: thresholds.into_iter().collect(),
		}
	}

	/// Returns the index of a configured service.
	pub fn position(&self, service: &str) -> Option<usize> {
		self.services.iter().position(|s| s == service)
	}

	/// Returns the ratio threshold for a configured service.
	pub fn threshold(&self, service: &str) -> Option<f64> {
		self.position(service).and_then(|i| self.thresholds.get(i).copied())
	}

	/// Returns `true` when the service is under gate policy.
	pub fn contains(&self, service: &str) -> bool {
		self.position(service).is_some()
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.services.len() != self.thresholds.len() {
			return Err(ConfigError::ThresholdMismatch {
				services: self.services.len(),
				thresholds: self.thresholds.len(),
			});
		}

		for (service, value) in self.services.iter().zip(&self.thresholds) {
			if service.is_empty() || service.chars().any(|c| c.is_whitespace() || c.is_control()) {
				return Err(ConfigError::InvalidServiceName { service: service.clone() });
			}
			if !value.is_finite() || *value < 0. {
				return Err(ConfigError::InvalidThreshold { service: service.clone(), value: *value });
			}
		}

		Ok(())
	}
}

/// Complete configuration for the health subsystem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
	/// Counter-store endpoints as `host:port` pairs.
	pub endpoints: Vec<String>,
	/// TTL applied to success/failure counters, in seconds.
	pub ttl_secs: u64,
	/// Services under gate policy and their ratio thresholds.
	#[serde(flatten)]
	pub policy: ThresholdConfig,
	/// `Retry-After` hint sent with gate rejections, in seconds.
	pub retry_after_secs: u64,
	/// Request header naming the target service.
	pub target_header: String,
	/// Whether provider call outcomes are fed back into the counters.
	pub feedback_enabled: bool,
	/// Upper bound for a single counter-store round trip, in milliseconds.
	pub io_timeout_ms: u64,
	/// Maximum pooled connections per counter-store endpoint.
	pub pool_size: usize,
	/// Timeout handed to provider adapters for outbound calls, in seconds.
	pub provider_timeout_secs: u64,
}
impl StatusConfig {
	/// Default counter-store endpoint.
	pub const DEFAULT_ENDPOINT: &'static str = "127.0.0.1:11211";
	/// Default gate header.
	pub const DEFAULT_TARGET_HEADER: &'static str = "X-Target-Domain";
	/// Largest relative TTL the store protocol accepts (30 days).
	pub const MAX_TTL_SECS: u64 = 60 * 60 * 24 * 30;

	/// Creates a configuration gating the provided services with default settings.
	pub fn new(policy: ThresholdConfig) -> Self {
		Self { policy, ..Default::default() }
	}

	/// Parses and validates a JSON document.
	pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
		Self::from_json_slice(json.as_bytes())
	}

	/// Parses and validates a JSON document from raw bytes.
	pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
		let mut de = serde_json::Deserializer::from_slice(bytes);
		let config: Self = serde_path_to_error::deserialize(&mut de)?;

		config.validate()?;

		Ok(config)
	}

	/// Checks invariants that cannot be expressed in the type system.
	pub fn validate(&self) -> Result<(), ConfigError> {
		self.policy.validate()?;

		if self.endpoints.is_empty() {
			return Err(ConfigError::NoEndpoints);
		}
		for endpoint in &self.endpoints {
			let valid = endpoint
				.rsplit_once(':')
				.is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());

			if !valid {
				return Err(ConfigError::InvalidEndpoint { endpoint: endpoint.clone() });
			}
		}
		if self.pool_size == 0 {
			return Err(ConfigError::InvalidPoolSize);
		}
		if self.ttl_secs > Self::MAX_TTL_SECS {
			return Err(ConfigError::TtlOutOfRange { secs: self.ttl_secs, max: Self::MAX_TTL_SECS });
		}
		if http::HeaderName::from_bytes(self.target_header.as_bytes()).is_err() {
			return Err(ConfigError::InvalidTargetHeader { header: self.target_header.clone() });
		}

		Ok(())
	}

	/// Counter TTL.
	pub fn ttl(&self) -> Duration {
		Duration::seconds(self.ttl_secs as i64)
	}

	/// `Retry-After` hint.
	pub fn retry_after(&self) -> Duration {
		Duration::seconds(self.retry_after_secs as i64)
	}

	/// Per-call counter-store timeout.
	pub fn io_timeout(&self) -> std::time::Duration {
		std::time::Duration::from_millis(self.io_timeout_ms)
	}

	/// Provider adapter timeout.
	pub fn provider_timeout(&self) -> std::time::Duration {
		std::time::Duration::from_secs(self.provider_timeout_secs)
	}

	/// Replaces the counter-store endpoints.
	pub fn with_endpoints<I>(mut self, endpoints: I) -> Self
	where
		I: IntoIterator,
		I::Item: Into<String>,
	{
		self.endpoints = endpoints.into_iter().map(Into::into).collect();

		self
	}

	/// Overrides the counter TTL in seconds.
	pub fn with_ttl_secs(mut self, secs: u64) -> Self {
		self.ttl_secs = secs;

		self
	}

	/// Overrides the `Retry-After` hint in seconds.
	pub fn with_retry_after_secs(mut self, secs: u64) -> Self {
		self.retry_after_secs = secs;

		self
	}

	/// Overrides the gate header name.
	pub fn with_target_header(mut self, header: impl Into<String>) -> Self {
		self.target_header = header.into();

		self
	}

	/// Overrides the per-endpoint connection pool size.
	pub fn with_pool_size(mut self, size: usize) -> Self {
		self.pool_size = size;

		self
	}

	/// Enables or disables outcome feedback.
	pub fn with_feedback_enabled(mut self, enabled: bool) -> Self {
		self.feedback_enabled = enabled;

		self
	}
}
impl Default for StatusConfig {
	fn default() -> Self {
		Self {
			endpoints: vec![Self::DEFAULT_ENDPOINT.into()],
			ttl_secs: 600,
			policy: ThresholdConfig::default(),
			retry_after_secs: 600,
			target_header: Self::DEFAULT_TARGET_HEADER.into(),
			feedback_enabled: true,
			io_timeout_ms: 250,
			pool_size: 16,
			provider_timeout_secs: 30,
		}
	}
}
