#![cfg(feature = "reqwest")]

// std
use std::time::Duration as StdDuration;
// crates.io
use httpmock::prelude::*;
use reqwest::{Client, header::CONTENT_TYPE};
use serde_json::{Value, json};
// self
use provider_status::{
	_preludet::*,
	error::BackendError,
	feedback::Services,
	provider::{
		AccessContext, AccessOutcome, Account, AdapterFuture, GetContactsOptions, MessageOptions,
		ProviderKind, ProviderRegistry, ProviderReply, Requester, Responder, provider_http_client,
	},
	tracker::{ServiceHealthTracker, ServiceStatus},
};

const TWITTER: &str = "twitter.com";

/// Requester posting to a mock provider API over reqwest.
struct HttpRequester {
	client: Client,
	base: String,
}
impl HttpRequester {
	async fn call(&self, path: &str, body: Value) -> Result<ProviderReply, BackendError> {
		let response = self
			.client
			.post(format!("{}{path}", self.base))
			.header(CONTENT_TYPE, "application/json")
			.body(body.to_string())
			.send()
			.await
			.and_then(|response| response.error_for_status())
			.map_err(|e| BackendError::from_reqwest(TWITTER, &e))?;
		let bytes = response.bytes().await.map_err(|e| BackendError::from_reqwest(TWITTER, &e))?;
		let value = serde_json::from_slice::<Value>(&bytes)
			.map_err(|e| BackendError::new(TWITTER, e.to_string()).with_code(502))?;

		Ok(ProviderReply::ok(value))
	}
}
impl Requester for HttpRequester {
	fn name(&self) -> &str {
		TWITTER
	}

	fn sendmessage<'a>(
		&'a self,
		_account: &'a Account,
		message: &'a str,
		_options: &'a MessageOptions,
	) -> AdapterFuture<'a, ProviderReply> {
		Box::pin(self.call("/statuses/update", json!({ "status": message })))
	}

	fn getcontacts<'a>(
		&'a self,
		_account: &'a Account,
		options: &'a GetContactsOptions,
	) -> AdapterFuture<'a, ProviderReply> {
		Box::pin(self.call("/friends", json!({ "start": options.start, "page": options.page })))
	}
}
impl Responder for HttpRequester {
	fn name(&self) -> &str {
		TWITTER
	}

	fn request_access<'a>(
		&'a self,
		ctx: &'a mut AccessContext,
	) -> AdapterFuture<'a, AccessOutcome> {
		Box::pin(async move { Ok(AccessOutcome::Redirect(ctx.callback.clone())) })
	}

	fn verify<'a>(&'a self, _ctx: &'a mut AccessContext) -> AdapterFuture<'a, AccessOutcome> {
		Box::pin(async { Ok(AccessOutcome::Completed(json!({ "verified": true }))) })
	}
}

fn services(server: &MockServer, provider_timeout_secs: u64) -> (Services, ServiceHealthTracker) {
	let mut config = policy_config([TWITTER], [0.5]);

	config.provider_timeout_secs = provider_timeout_secs;

	let client = provider_http_client(&config).expect("Provider HTTP client should build.");
	let (tracker, _) = memory_tracker(&config);
	let registry = ProviderRegistry::builder()
		.requester(ProviderKind::Twitter, HttpRequester {
			client: client.clone(),
			base: server.base_url(),
		})
		.responder(ProviderKind::Twitter, HttpRequester { client, base: server.base_url() })
		.build();
	let services = Services::new(&config, tracker.clone(), registry.into())
		.expect("Twitter should be registered.");

	(services, tracker)
}

#[tokio::test]
async fn provider_http_status_becomes_error_code_and_failure() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/statuses/update");
			then.status(502).body("bad gateway");
		})
		.await;
	let (services, tracker) = services(&server, 5);

	tracker.initialize(TWITTER).await.expect("Initializing a service should succeed.");

	let reply = services
		.sendmessage(TWITTER, &test_account(), "hello", &MessageOptions::new())
		.await
		.expect("Registered domains should resolve.");

	mock.assert_calls_async(1).await;

	let error = reply.error.expect("HTTP failures should surface as an error payload.");

	assert_eq!(reply.result, None);
	assert_eq!(error.code, 502);
	assert_eq!(error.status, Some(502));
	assert_eq!(
		tracker.get_status(TWITTER).await.expect("Reading a status should succeed."),
		ServiceStatus { enabled: true, successes: 0, failures: 1 }
	);
}

#[tokio::test]
async fn provider_json_result_counts_as_success() {
	let server = MockServer::start_async().await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/friends").json_body(json!({ "start": 0, "page": 25 }));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"contacts\":[{\"name\":\"someone\"}]}");
		})
		.await;
	let (services, tracker) = services(&server, 5);

	tracker.initialize(TWITTER).await.expect("Initializing a service should succeed.");

	let reply = services
		.getcontacts(TWITTER, &test_account(), &GetContactsOptions::default())
		.await
		.expect("Registered domains should resolve.");

	mock.assert_calls_async(1).await;

	assert_eq!(reply.result, Some(json!({ "contacts": [{ "name": "someone" }] })));
	assert_eq!(
		tracker.get_status(TWITTER).await.expect("Reading a status should succeed.").successes,
		1
	);
}

#[tokio::test]
async fn provider_timeout_maps_to_gateway_timeout() {
	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(POST).path("/statuses/update");
			then.status(200).delay(StdDuration::from_secs(3)).body("{}");
		})
		.await;

	let (services, tracker) = services(&server, 1);

	tracker.initialize(TWITTER).await.expect("Initializing a service should succeed.");

	let reply = services
		.sendmessage(TWITTER, &test_account(), "hello", &MessageOptions::new())
		.await
		.expect("Registered domains should resolve.");

	assert_eq!(reply.error.map(|e| e.code), Some(504));
	assert_eq!(
		tracker.get_status(TWITTER).await.expect("Reading a status should succeed.").failures,
		1
	);
}
