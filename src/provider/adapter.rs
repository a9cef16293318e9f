//! Capability interfaces implemented by provider adapters, and the values they return.
//!
//! The health core only inspects three things about a call: whether the adapter raised a
//! [`BackendError`], whether it handed control back through a redirect, and whether a
//! non-null result came back.

// self
use crate::{
	_prelude::*,
	error::{BackendError, ErrorPayload},
};

/// Boxed future returned by adapter operations.
pub type AdapterFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BackendError>> + 'a + Send>>;

/// Stored account credentials and profile, opaque to this crate.
pub type Account = Value;

/// Free-form message fields (`to`, `subject`, `title`, `link`, ...).
pub type MessageOptions = BTreeMap<String, String>;

/// Outbound API surface of a provider: publishing and contact listing.
pub trait Requester
where
	Self: Send + Sync,
{
	/// Domain this adapter serves.
	fn name(&self) -> &str;

	/// Publishes `message` on behalf of `account`.
	fn sendmessage<'a>(
		&'a self,
		account: &'a Account,
		message: &'a str,
		options: &'a MessageOptions,
	) -> AdapterFuture<'a, ProviderReply>;

	/// Lists contacts of `account`.
	fn getcontacts<'a>(
		&'a self,
		account: &'a Account,
		options: &'a GetContactsOptions,
	) -> AdapterFuture<'a, ProviderReply>;
}

/// Access (authorization) surface of a provider.
pub trait Responder
where
	Self: Send + Sync,
{
	/// Domain this adapter serves.
	fn name(&self) -> &str;

	/// Starts the access flow, normally answering with [`AccessOutcome::Redirect`].
	fn request_access<'a>(&'a self, ctx: &'a mut AccessContext) -> AdapterFuture<'a, AccessOutcome>;

	/// Completes the access flow, normally answering with [`AccessOutcome::Completed`].
	fn verify<'a>(&'a self, ctx: &'a mut AccessContext) -> AdapterFuture<'a, AccessOutcome>;
}

/// The `(result, error)` pair returned by requester calls.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderReply {
	/// Provider result; `None` means the call produced nothing.
	pub result: Option<Value>,
	/// Application-level error (e.g. invalid user input).
	pub error: Option<ErrorPayload>,
}
impl ProviderReply {
	/// Successful reply carrying a result.
	pub fn ok(result: Value) -> Self {
		Self { result: Some(result), error: None }
	}

	/// Reply carrying only an error payload.
	pub fn failed(error: impl Into<ErrorPayload>) -> Self {
		Self { result: None, error: Some(error.into()) }
	}

	/// Splits into the `(result, error)` pair.
	pub fn into_pair(self) -> (Option<Value>, Option<ErrorPayload>) {
		(self.result, self.error)
	}
}

/// Outcome of an access-flow step.
#[derive(Clone, Debug, PartialEq)]
pub enum AccessOutcome {
	/// The flow finished and produced a profile.
	Completed(Value),
	/// The user agent must be sent to this URL; always propagated unchanged.
	Redirect(Url),
	/// The flow failed for an application-level reason.
	Failed(ErrorPayload),
}

/// Inbound request state handed to responders.
#[derive(Clone, Debug)]
pub struct AccessContext {
	/// Query/form parameters of the inbound request.
	pub params: BTreeMap<String, String>,
	/// Absolute URL the provider should send the user back to.
	pub callback: Url,
	/// Per-user session values the flow may read and write.
	pub session: BTreeMap<String, Value>,
}
impl AccessContext {
	/// Creates a context with no parameters and an empty session.
	pub fn new(callback: Url) -> Self {
		Self { params: BTreeMap::new(), callback, session: BTreeMap::new() }
	}

	/// Adds one request parameter.
	pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.insert(key.into(), value.into());

		self
	}
}

/// Paging options for [`Requester::getcontacts`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetContactsOptions {
	/// Offset of the first contact.
	pub start: u32,
	/// Page size.
	pub page: u32,
	/// Optional provider-side group filter.
	pub group: Option<String>,
}
impl Default for GetContactsOptions {
	fn default() -> Self {
		Self { start: 0, page: 25, group: None }
	}
}
