// std
use std::sync::Arc;
// crates.io
use http::{HeaderMap, HeaderValue, StatusCode, header::RETRY_AFTER};
// self
use provider_status::{
	_preludet::*,
	gate::{GateDecision, RejectReason, RequestGate, UNAVAILABLE_BODY},
	store::{CounterStore, StoreError, StoreFuture},
	tracker::ServiceHealthTracker,
};

fn targeting(service: &str) -> HeaderMap {
	let mut headers = HeaderMap::new();

	headers.insert(
		"x-target-domain",
		HeaderValue::from_str(service).expect("Service fixture should be a valid header value."),
	);

	headers
}

struct UnreachableStore;
impl CounterStore for UnreachableStore {
	fn get<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, Option<u64>> {
		Box::pin(async { Err(StoreError::read("connection refused")) })
	}

	fn set<'a>(
		&'a self,
		_key: &'a str,
		_value: u64,
		_ttl: Option<time::Duration>,
	) -> StoreFuture<'a, ()> {
		Box::pin(async { Err(StoreError::write("connection refused")) })
	}

	fn increment<'a>(&'a self, _key: &'a str) -> StoreFuture<'a, u64> {
		Box::pin(async { Err(StoreError::write("connection refused")) })
	}
}

#[tokio::test]
async fn ratio_threshold_trips_and_operator_flag_overrides() {
	let config = policy_config(["a", "b", "c"], [0.5, 0.9, 0.1]);
	let (gate, tracker) = memory_gate(&config);
	let headers = targeting("a");

	tracker.initialize("a").await.expect("Initializing a service should succeed.");

	for _ in 0..10 {
		tracker.update_status("a", true).await.expect("Success update should succeed.");
	}
	for _ in 0..20 {
		tracker.update_status("a", false).await.expect("Failure update should succeed.");
	}

	assert_eq!(gate.evaluate_headers(&headers).await, GateDecision::Admit);

	for _ in 0..20 {
		tracker.update_status("a", false).await.expect("Failure update should succeed.");
	}

	assert_eq!(
		gate.evaluate_headers(&headers).await,
		GateDecision::Reject(RejectReason::RatioBelowThreshold { ratio: 0.25, threshold: 0.5 })
	);

	let response = gate.rejection_response();

	assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
	assert_eq!(response.headers()[RETRY_AFTER], "600");
	assert_eq!(response.body(), UNAVAILABLE_BODY);

	tracker.initialize("a").await.expect("Initializing a service should succeed.");
	tracker.disable("a").await.expect("Disabling a service should succeed.");

	assert_eq!(
		gate.evaluate_headers(&headers).await,
		GateDecision::Reject(RejectReason::Disabled)
	);

	tracker.enable("a").await.expect("Enabling a service should succeed.");

	assert!(gate.evaluate_headers(&headers).await.is_admit());
}

#[tokio::test]
async fn other_services_are_judged_by_their_own_thresholds() {
	let config = policy_config(["a", "b", "c"], [0.5, 0.9, 0.1]);
	let (gate, tracker) = memory_gate(&config);

	for service in ["b", "c"] {
		tracker.initialize(service).await.expect("Initializing a service should succeed.");

		for _ in 0..2 {
			tracker.update_status(service, true).await.expect("Success update should succeed.");
		}
		for _ in 0..10 {
			tracker.update_status(service, false).await.expect("Failure update should succeed.");
		}
	}

	assert!(!gate.evaluate(Some("b")).await.is_admit());
	assert!(gate.evaluate(Some("c")).await.is_admit());
}

#[tokio::test]
async fn untargeted_or_unconfigured_requests_pass_through() {
	let config = policy_config(["a"], [0.5]);
	let (gate, tracker) = memory_gate(&config);

	tracker.disable("z").await.expect("Disabling a service should succeed.");

	assert!(gate.evaluate_headers(&HeaderMap::new()).await.is_admit());
	assert!(gate.evaluate_headers(&targeting("z")).await.is_admit());

	let mut binary = HeaderMap::new();

	binary.insert(
		"x-target-domain",
		HeaderValue::from_bytes(b"\xffa").expect("Opaque header bytes should be accepted."),
	);

	assert!(gate.evaluate_headers(&binary).await.is_admit());
}

#[tokio::test]
async fn first_request_lazily_initializes_record() {
	let config = policy_config(["a"], [0.5]);
	let (gate, tracker) = memory_gate(&config);

	assert!(gate.evaluate(Some("a")).await.is_admit());
	assert_eq!(
		<(bool, u64, u64)>::from(
			tracker.get_status("a").await.expect("Reading a status should succeed.")
		),
		(true, 0, 0)
	);
}

#[tokio::test]
async fn unreachable_store_fails_open() {
	let config = policy_config(["a"], [0.5]);
	let tracker = ServiceHealthTracker::new(Arc::new(UnreachableStore), &config);
	let gate = RequestGate::new(tracker, &config).expect("Gate configuration should be valid.");

	assert!(gate.evaluate_headers(&targeting("a")).await.is_admit());
}

#[tokio::test]
async fn custom_header_and_retry_hint_are_honored() {
	let config = policy_config(["a"], [0.5])
		.with_target_header("X-Provider")
		.with_retry_after_secs(30);
	let (gate, tracker) = memory_gate(&config);
	let mut headers = HeaderMap::new();

	headers.insert("x-provider", HeaderValue::from_static("a"));
	tracker.disable("a").await.expect("Disabling a service should succeed.");

	assert!(!gate.evaluate_headers(&headers).await.is_admit());
	assert!(gate.evaluate_headers(&targeting("a")).await.is_admit());
	assert_eq!(gate.rejection_response().headers()[RETRY_AFTER], "30");
}
