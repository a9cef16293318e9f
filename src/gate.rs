//! Admission control consulted before inbound work targeting a provider is processed.
//!
//! The gate reads the target service from a request header. Targets outside the configured
//! policy pass through untouched. For configured targets the gate rejects when the service
//! is disabled, or when it has observed failures and its success-to-failure ratio is below
//! the configured threshold. An unreachable counter store never blocks traffic.

// crates.io
use http::{
	HeaderMap, HeaderName, HeaderValue, Response, StatusCode,
	header::{CONTENT_TYPE, RETRY_AFTER},
};
// self
use crate::{
	_prelude::*,
	config::{StatusConfig, ThresholdConfig},
	error::ConfigError,
	obs,
	tracker::{ServiceHealthTracker, ServiceStatus},
};

/// Body sent with every rejection.
pub const UNAVAILABLE_BODY: &str = "The service is unavailable";

/// Verdict for one unit of inbound work.
#[derive(Clone, Debug, PartialEq)]
pub enum GateDecision {
	/// Forward the request unchanged.
	Admit,
	/// Answer with a 503 instead of forwarding.
	Reject(RejectReason),
}
impl GateDecision {
	/// Returns `true` for [`GateDecision::Admit`].
	pub fn is_admit(&self) -> bool {
		matches!(self, GateDecision::Admit)
	}

	/// Returns a stable label suitable for metric fields.
	pub fn as_str(&self) -> &'static str {
		match self {
			GateDecision::Admit => "admit",
			GateDecision::Reject(RejectReason::Disabled) => "reject_disabled",
			GateDecision::Reject(RejectReason::RatioBelowThreshold { .. }) => "reject_ratio",
		}
	}
}

/// Why a request was rejected.
#[derive(Clone, Debug, PartialEq)]
pub enum RejectReason {
	/// The service was disabled by an operator.
	Disabled,
	/// The observed success-to-failure ratio is below the configured threshold.
	RatioBelowThreshold {
		/// Observed ratio.
		ratio: f64,
		/// Configured minimum.
		threshold: f64,
	},
}

/// Applies the admission rule to a record snapshot.
pub fn decide(status: &ServiceStatus, threshold: f64) -> GateDecision {
	if !status.enabled {
		return GateDecision::Reject(RejectReason::Disabled);
	}

	match status.ratio() {
		Some(ratio) if ratio < threshold =>
			GateDecision::Reject(RejectReason::RatioBelowThreshold { ratio, threshold }),
		_ => GateDecision::Admit,
	}
}

/// Circuit-breaker gate backed by a [`ServiceHealthTracker`].
#[derive(Clone, Debug)]
pub struct RequestGate {
	tracker: ServiceHealthTracker,
	policy: ThresholdConfig,
	target_header: HeaderName,
	retry_after: HeaderValue,
}
impl RequestGate {
	/// Creates a gate enforcing the configured thresholds.
	pub fn new(tracker: ServiceHealthTracker, config: &StatusConfig) -> Result<Self, ConfigError> {
		let target_header = HeaderName::from_bytes(config.target_header.as_bytes())
			.map_err(|_| ConfigError::InvalidTargetHeader { header: config.target_header.clone() })?;

		Ok(Self {
			tracker,
			policy: config.policy.clone(),
			target_header,
			retry_after: HeaderValue::from(config.retry_after_secs),
		})
	}

	/// Tracker consulted by the gate.
	pub fn tracker(&self) -> &ServiceHealthTracker {
		&self.tracker
	}

	/// Header naming the target service.
	pub fn target_header(&self) -> &HeaderName {
		&self.target_header
	}

	/// Extracts the target service from request headers; non-UTF-8 values count as absent.
	pub fn target<'h>(&self, headers: &'h HeaderMap) -> Option<&'h str> {
		headers.get(&self.target_header).and_then(|value| value.to_str().ok())
	}

	/// Decides admission for a request carrying the provided headers.
	pub async fn evaluate_headers(&self, headers: &HeaderMap) -> GateDecision {
		self.evaluate(self.target(headers)).await
	}

	/// Decides admission for a request targeting `target`.
	pub async fn evaluate(&self, target: Option<&str>) -> GateDecision {
		let Some((service, threshold)) = target.and_then(|service| {
			self.policy.threshold(service).map(|threshold| (service, threshold))
		}) else {
			return GateDecision::Admit;
		};
		let status = match self.tracker.get_status(service).await {
			Ok(status) => status,
			Err(e) => {
				if let Error::Storage(e) = &e {
					obs::status_unreadable(service, e);
				}

				ServiceStatus::FRESH
			},
		};
		let decision = decide(&status, threshold);

		obs::record_gate_decision(service, &decision);

		decision
	}

	/// Builds the uniform rejection: 503, `Retry-After`, plain-text body.
	pub fn rejection_response(&self) -> Response<String> {
		let mut response = Response::new(UNAVAILABLE_BODY.to_owned());

		*response.status_mut() = StatusCode::SERVICE_UNAVAILABLE;

		let headers = response.headers_mut();

		headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
		headers.insert(RETRY_AFTER, self.retry_after.clone());

		response
	}
}

/// Axum middleware enforcing a shared [`RequestGate`].
///
/// Install with `axum::middleware::from_fn_with_state(Arc::new(gate), gate_middleware)`.
#[cfg(feature = "axum")]
pub async fn gate_middleware(
	axum::extract::State(gate): axum::extract::State<Arc<RequestGate>>,
	request: axum::extract::Request,
	next: axum::middleware::Next,
) -> axum::response::Response {
	match gate.evaluate_headers(request.headers()).await {
		GateDecision::Admit => next.run(request).await,
		GateDecision::Reject(_) => gate.rejection_response().map(axum::body::Body::from),
	}
}
