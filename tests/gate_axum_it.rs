#![cfg(feature = "axum")]

// std
use std::sync::Arc;
// crates.io
use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode, header::RETRY_AFTER},
	middleware,
	routing::post,
};
use tower::ServiceExt;
// self
use provider_status::{
	_preludet::*,
	gate::{RequestGate, UNAVAILABLE_BODY, gate_middleware},
};

fn app(gate: RequestGate) -> Router {
	Router::new()
		.route("/send", post(|| async { "sent" }))
		.layer(middleware::from_fn_with_state(Arc::new(gate), gate_middleware))
}

fn request(target: &str) -> Request<Body> {
	Request::post("/send")
		.header("X-Target-Domain", target)
		.body(Body::empty())
		.expect("Request fixture should build.")
}

async fn body_text(body: Body) -> String {
	let bytes = body::to_bytes(body, usize::MAX).await.expect("Body should be readable.");

	String::from_utf8(bytes.to_vec()).expect("Body should be UTF-8.")
}

#[tokio::test]
async fn healthy_service_reaches_the_handler() {
	let config = policy_config(["twitter.com"], [0.5]);
	let (gate, tracker) = memory_gate(&config);

	tracker.initialize("twitter.com").await.expect("Initializing a service should succeed.");

	let response =
		app(gate).oneshot(request("twitter.com")).await.expect("Router should always respond.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(body_text(response.into_body()).await, "sent");
}

#[tokio::test]
async fn disabled_service_is_answered_with_503() {
	let config = policy_config(["twitter.com"], [0.5]);
	let (gate, tracker) = memory_gate(&config);

	tracker.disable("twitter.com").await.expect("Disabling a service should succeed.");

	let router = app(gate);
	let response =
		router.clone().oneshot(request("twitter.com")).await.expect("Router should always respond.");

	assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
	assert_eq!(response.headers()[RETRY_AFTER], "600");
	assert_eq!(body_text(response.into_body()).await, UNAVAILABLE_BODY);

	let response =
		router.oneshot(request("facebook.com")).await.expect("Router should always respond.");

	assert_eq!(response.status(), StatusCode::OK);
}
