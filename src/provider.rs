//! Provider-facing capability contracts (adapters) and the startup-built registry.
//!
//! Provider adapters (request signing, field mapping) live outside this crate. They plug in
//! through [`Requester`] and [`Responder`], and a [`ProviderRegistry`] resolves them by
//! domain for the closed set of [`ProviderKind`]s.

pub mod adapter;
pub mod registry;

pub use adapter::*;
pub use registry::*;

// self
use crate::_prelude::*;
#[cfg(feature = "reqwest")] use crate::{config::StatusConfig, error::ConfigError};

/// Providers the crate knows how to route to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
	/// Facebook Graph API.
	Facebook,
	/// Twitter API.
	Twitter,
	/// LinkedIn API.
	LinkedIn,
	/// Google (consumer and Apps accounts).
	Google,
	/// Yahoo API.
	Yahoo,
}
impl ProviderKind {
	/// Every supported provider.
	pub const ALL: [Self; 5] = [
		ProviderKind::Facebook,
		ProviderKind::Twitter,
		ProviderKind::LinkedIn,
		ProviderKind::Google,
		ProviderKind::Yahoo,
	];

	/// Canonical domain used as the service identifier.
	pub const fn domain(self) -> &'static str {
		match self {
			ProviderKind::Facebook => "facebook.com",
			ProviderKind::Twitter => "twitter.com",
			ProviderKind::LinkedIn => "linkedin.com",
			ProviderKind::Google => "google.com",
			ProviderKind::Yahoo => "yahoo.com",
		}
	}

	/// Resolves a domain, including aliases such as `googleapps.com`.
	pub fn from_domain(domain: &str) -> Option<Self> {
		match domain {
			"googleapps.com" => Some(ProviderKind::Google),
			other => Self::ALL.into_iter().find(|kind| kind.domain() == other),
		}
	}
}
impl Display for ProviderKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.domain())
	}
}
impl FromStr for ProviderKind {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_domain(s).ok_or_else(|| Error::domain_not_registered(s))
	}
}

/// Builds the reqwest client provider adapters should use, bounded by the configured timeout.
#[cfg(feature = "reqwest")]
pub fn provider_http_client(config: &StatusConfig) -> Result<ReqwestClient, ConfigError> {
	Ok(ReqwestClient::builder().timeout(config.provider_timeout()).build()?)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn domains_resolve_including_aliases() {
		for kind in ProviderKind::ALL {
			assert_eq!(ProviderKind::from_domain(kind.domain()), Some(kind));
		}

		assert_eq!(ProviderKind::from_domain("googleapps.com"), Some(ProviderKind::Google));
		assert_eq!(ProviderKind::from_domain("myspace.com"), None);
	}

	#[test]
	fn unknown_domain_parses_into_registration_error() {
		let err = "a".parse::<ProviderKind>().expect_err("Unknown domains should not parse.");

		assert!(matches!(err, Error::DomainNotRegistered { ref domain } if domain == "a"));
	}
}
