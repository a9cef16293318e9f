//! Outcome feedback around provider calls.
//!
//! [`Feedback`] is the strategy object that runs one adapter call, classifies how it ended,
//! and folds the classification into the [`ServiceHealthTracker`]. [`Services`] is the
//! facade applications call; it resolves adapters through the [`ProviderRegistry`] and
//! routes every provider operation through [`Feedback::observe`].
//!
//! Classification:
//!
//! - the adapter raised a [`BackendError`] → failure; the error becomes an [`ErrorPayload`]
//!   result and never escapes;
//! - the adapter answered with a redirect → success; the redirect is returned unchanged;
//! - the adapter answered normally → success only when a non-null result is present;
//!   application errors such as bad user input leave the counters alone.

// self
use crate::{
	_prelude::*,
	config::StatusConfig,
	error::{BackendError, ErrorPayload},
	obs::{self, CallSpan, Operation},
	provider::{
		AccessContext, AccessOutcome, Account, GetContactsOptions, MessageOptions, ProviderRegistry,
		ProviderReply,
	},
	store::StoreError,
	tracker::{Outcome, ServiceHealthTracker},
};

/// Values returned by adapter calls that the feedback layer knows how to classify.
pub trait Classify
where
	Self: Sized,
{
	/// Outcome to record, or `None` when the value says nothing about provider health.
	fn outcome(&self) -> Option<Outcome>;

	/// Converts a backend failure into a regular value of this type.
	fn from_backend_error(error: BackendError) -> Self;
}
impl Classify for ProviderReply {
	fn outcome(&self) -> Option<Outcome> {
		// A `null` result carries no answer from the provider.
		matches!(self.result, Some(ref value) if !value.is_null()).then_some(Outcome::Success)
	}

	fn from_backend_error(error: BackendError) -> Self {
		ProviderReply::failed(error)
	}
}
impl Classify for AccessOutcome {
	fn outcome(&self) -> Option<Outcome> {
		match self {
			AccessOutcome::Completed(_) => Some(Outcome::Success),
			AccessOutcome::Redirect(_) => Some(Outcome::Redirect),
			AccessOutcome::Failed(_) => None,
		}
	}

	fn from_backend_error(error: BackendError) -> Self {
		AccessOutcome::Failed(ErrorPayload::from(error))
	}
}

/// Runs adapter calls and feeds their classified outcomes into the tracker.
#[derive(Clone, Debug)]
pub struct Feedback {
	tracker: ServiceHealthTracker,
	enabled: bool,
}
impl Feedback {
	/// Creates a feedback recorder; when `enabled` is false the tracker is never updated.
	pub fn new(tracker: ServiceHealthTracker, enabled: bool) -> Self {
		Self { tracker, enabled }
	}

	/// Returns `true` when outcomes are recorded.
	pub fn is_enabled(&self) -> bool {
		self.enabled
	}

	/// Tracker updated by this recorder.
	pub fn tracker(&self) -> &ServiceHealthTracker {
		&self.tracker
	}

	/// Awaits `call`, records its outcome for `service`, and returns a plain value.
	pub async fn observe<T, F>(&self, service: &str, operation: Operation, call: F) -> T
	where
		T: Classify,
		F: Future<Output = Result<T, BackendError>>,
	{
		let span = CallSpan::new(service, operation);

		span.instrument(async move {
			let (value, outcome) = match call.await {
				Ok(value) => {
					let outcome = value.outcome();

					(value, outcome)
				},
				Err(e) => (T::from_backend_error(e), Some(Outcome::Failure)),
			};

			if let Some(outcome) = outcome {
				self.record(service, outcome).await;
			}

			value
		})
		.await
	}

	async fn record(&self, service: &str, outcome: Outcome) {
		if !self.enabled {
			return;
		}

		obs::record_feedback(service, outcome);

		// Counters are best-effort; a lost update must not hide the provider's answer.
		if let Err(e) = self.tracker.record(service, outcome).await {
			match e {
				Error::Storage(e) => obs::update_lost(service, &e),
				other => obs::update_lost(service, &StoreError::write(other)),
			}
		}
	}
}

/// Application-facing facade over the provider registry with outcome feedback.
#[derive(Clone, Debug)]
pub struct Services {
	registry: Arc<ProviderRegistry>,
	feedback: Feedback,
}
impl Services {
	/// Creates the facade; every configured service must have both adapters registered.
	pub fn new(
		config: &StatusConfig,
		tracker: ServiceHealthTracker,
		registry: Arc<ProviderRegistry>,
	) -> Result<Self> {
		if let Some(missing) = config.policy.services.iter().find(|s| !registry.supports(s)) {
			return Err(Error::domain_not_registered(missing.as_str()));
		}

		Ok(Self { registry, feedback: Feedback::new(tracker, config.feedback_enabled) })
	}

	/// Tracker receiving the feedback.
	pub fn tracker(&self) -> &ServiceHealthTracker {
		self.feedback.tracker()
	}

	/// Feedback recorder used for every call.
	pub fn feedback(&self) -> &Feedback {
		&self.feedback
	}

	/// Publishes a message through the provider serving `domain`.
	pub async fn sendmessage(
		&self,
		domain: &str,
		account: &Account,
		message: &str,
		options: &MessageOptions,
	) -> Result<ProviderReply> {
		let requester = self.registry.requester(domain)?;

		Ok(self
			.feedback
			.observe(domain, Operation::SendMessage, requester.sendmessage(account, message, options))
			.await)
	}

	/// Lists contacts through the provider serving `domain`.
	pub async fn getcontacts(
		&self,
		domain: &str,
		account: &Account,
		options: &GetContactsOptions,
	) -> Result<ProviderReply> {
		let requester = self.registry.requester(domain)?;

		Ok(self
			.feedback
			.observe(domain, Operation::GetContacts, requester.getcontacts(account, options))
			.await)
	}

	/// Starts the access flow with the provider serving `domain`.
	pub async fn request_access(&self, domain: &str, ctx: &mut AccessContext) -> Result<AccessOutcome> {
		let responder = self.registry.responder(domain)?;

		Ok(self.feedback.observe(domain, Operation::RequestAccess, responder.request_access(ctx)).await)
	}

	/// Completes the access flow with the provider serving `domain`.
	pub async fn verify(&self, domain: &str, ctx: &mut AccessContext) -> Result<AccessOutcome> {
		let responder = self.registry.responder(domain)?;

		Ok(self.feedback.observe(domain, Operation::Verify, responder.verify(ctx)).await)
	}
}
