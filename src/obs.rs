//! Optional observability helpers for the gate and feedback layers.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit spans named `provider_status.feedback` with the `provider` and
//!   `operation` fields, plus warn-level events when the counter store misbehaves.
//! - Enable `metrics` to increment `provider_status_gate_total` (labeled by `service` +
//!   `decision`) and `provider_status_feedback_total` (labeled by `service` + `outcome`). The
//!   feedback counter only moves while feedback recording is enabled.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Provider operations wrapped by the feedback layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Publishing a message through a provider.
	SendMessage,
	/// Listing a user's contacts.
	GetContacts,
	/// Starting the access (authorization) flow.
	RequestAccess,
	/// Completing the access flow.
	Verify,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::SendMessage => "sendmessage",
			Operation::GetContacts => "getcontacts",
			Operation::RequestAccess => "request_access",
			Operation::Verify => "verify",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
