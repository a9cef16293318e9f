//! Crate-level error types shared across the store, tracker, gate, and feedback layers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Counter-store failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// No provider adapter is registered for the requested domain.
	#[error("No provider is registered for domain `{domain}`.")]
	DomainNotRegistered {
		/// Domain that failed to resolve.
		domain: String,
	},
}
impl Error {
	/// Builds a [`Error::DomainNotRegistered`] for the provided domain.
	pub fn domain_not_registered(domain: impl Into<String>) -> Self {
		Self::DomainNotRegistered { domain: domain.into() }
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Configuration document could not be parsed.
	#[error("Configuration is malformed at `{path}`.")]
	Parse {
		/// Path of the offending field inside the document.
		path: String,
		/// Underlying parsing failure.
		#[source]
		source: serde_json::Error,
	},
	/// HTTP client for provider adapters could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},

	/// `services` and `thresholds` must be parallel arrays.
	#[error("Configured {services} services but {thresholds} thresholds.")]
	ThresholdMismatch {
		/// Number of configured services.
		services: usize,
		/// Number of configured thresholds.
		thresholds: usize,
	},
	/// Threshold must be a finite, non-negative ratio.
	#[error("Threshold for `{service}` must be a finite non-negative number, got {value}.")]
	InvalidThreshold {
		/// Service the threshold belongs to.
		service: String,
		/// Rejected value.
		value: f64,
	},
	/// A service name is empty or contains whitespace (it becomes part of store keys).
	#[error("Service name `{service}` is not a valid store key component.")]
	InvalidServiceName {
		/// Rejected service name.
		service: String,
	},
	/// At least one counter-store endpoint is required.
	#[error("At least one counter-store endpoint is required.")]
	NoEndpoints,
	/// Endpoint is not a `host:port` pair.
	#[error("Counter-store endpoint `{endpoint}` is not a host:port pair.")]
	InvalidEndpoint {
		/// Rejected endpoint string.
		endpoint: String,
	},
	/// Each endpoint needs room for at least one pooled connection.
	#[error("Counter-store pool size must be at least 1.")]
	InvalidPoolSize,
	/// The connection pool for a counter-store endpoint could not be built.
	#[error("Counter-store pool for `{endpoint}` could not be built: {message}.")]
	PoolBuild {
		/// Endpoint the pool serves.
		endpoint: String,
		/// Builder failure.
		message: String,
	},
	/// Counter TTL exceeds the relative-expiration range of the store protocol.
	#[error("Counter TTL of {secs}s exceeds the {max}s relative-expiration limit.")]
	TtlOutOfRange {
		/// Requested TTL in seconds.
		secs: u64,
		/// Largest supported TTL in seconds.
		max: u64,
	},
	/// The gate header name is not a valid HTTP header name.
	#[error("Target header `{header}` is not a valid HTTP header name.")]
	InvalidTargetHeader {
		/// Rejected header name.
		header: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<serde_path_to_error::Error<serde_json::Error>> for ConfigError {
	fn from(e: serde_path_to_error::Error<serde_json::Error>) -> Self {
		let path = e.path().to_string();

		Self::Parse { path, source: e.into_inner() }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Definitive failure signal raised by a provider adapter.
///
/// The feedback layer records it as a failure and converts it into an
/// [`ErrorPayload`]; it never escapes [`crate::feedback::Services`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[error("Provider `{provider}` failed with code {code}: {message}.")]
pub struct BackendError {
	/// Provider domain reporting the failure.
	pub provider: String,
	/// Numeric error code (HTTP status when available, provider code otherwise).
	pub code: u16,
	/// Human-readable error message.
	pub message: String,
	/// HTTP status returned by the provider, when the failure came from a response.
	pub status: Option<u16>,
}
impl BackendError {
	/// Default code used when a provider failure carries no HTTP status.
	pub const DEFAULT_CODE: u16 = 500;

	/// Creates a new backend error with the default code and no status.
	pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			provider: provider.into(),
			code: Self::DEFAULT_CODE,
			message: message.into(),
			status: None,
		}
	}

	/// Attaches the HTTP status returned by the provider; the status also becomes the code.
	pub fn with_status(mut self, status: u16) -> Self {
		self.status = Some(status);
		self.code = status;

		self
	}

	/// Overrides the numeric error code.
	pub fn with_code(mut self, code: u16) -> Self {
		self.code = code;

		self
	}

	/// Maps a reqwest failure raised while talking to a provider.
	#[cfg(feature = "reqwest")]
	pub fn from_reqwest(provider: impl Into<String>, e: &ReqwestError) -> Self {
		let err = Self::new(provider, e.to_string());

		match e.status() {
			Some(status) => err.with_status(status.as_u16()),
			None if e.is_timeout() => err.with_code(504),
			None => err.with_code(503),
		}
	}
}

/// Structured error body returned in place of a provider result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
	/// Numeric error code.
	pub code: u16,
	/// Human-readable error message.
	pub message: String,
	/// Provider domain the error relates to.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub provider: Option<String>,
	/// HTTP status returned by the provider, if any.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub status: Option<u16>,
}
impl ErrorPayload {
	/// Creates an application-level payload (e.g. invalid user input).
	pub fn new(code: u16, message: impl Into<String>) -> Self {
		Self { code, message: message.into(), provider: None, status: None }
	}

	/// Tags the payload with the provider domain.
	pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
		self.provider = Some(provider.into());

		self
	}
}
impl From<BackendError> for ErrorPayload {
	fn from(e: BackendError) -> Self {
		Self { code: e.code, message: e.message, provider: Some(e.provider), status: e.status }
	}
}
