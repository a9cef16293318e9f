//! Startup-built, read-only lookup from provider domains to adapters.

// self
use crate::{
	_prelude::*,
	provider::{ProviderKind, Requester, Responder},
};

/// Frozen mapping from [`ProviderKind`] to its adapters.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
	requesters: HashMap<ProviderKind, Arc<dyn Requester>>,
	responders: HashMap<ProviderKind, Arc<dyn Responder>>,
}
impl ProviderRegistry {
	/// Starts an empty registry builder.
	pub fn builder() -> ProviderRegistryBuilder {
		ProviderRegistryBuilder::default()
	}

	/// Resolves the requester serving `domain`.
	pub fn requester(&self, domain: &str) -> Result<&Arc<dyn Requester>> {
		ProviderKind::from_domain(domain)
			.and_then(|kind| self.requesters.get(&kind))
			.ok_or_else(|| Error::domain_not_registered(domain))
	}

	/// Resolves the responder serving `domain`.
	pub fn responder(&self, domain: &str) -> Result<&Arc<dyn Responder>> {
		ProviderKind::from_domain(domain)
			.and_then(|kind| self.responders.get(&kind))
			.ok_or_else(|| Error::domain_not_registered(domain))
	}

	/// Returns `true` when both a requester and a responder serve `domain`.
	pub fn supports(&self, domain: &str) -> bool {
		self.requester(domain).is_ok() && self.responder(domain).is_ok()
	}

	/// Canonical domains with at least one registered adapter, in [`ProviderKind`] order.
	pub fn domains(&self) -> Vec<&'static str> {
		ProviderKind::ALL
			.into_iter()
			.filter(|kind| self.requesters.contains_key(kind) || self.responders.contains_key(kind))
			.map(ProviderKind::domain)
			.collect()
	}
}
impl Debug for ProviderRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderRegistry").field("domains", &self.domains()).finish()
	}
}

/// Builder for [`ProviderRegistry`] values.
#[derive(Default)]
pub struct ProviderRegistryBuilder {
	registry: ProviderRegistry,
}
impl ProviderRegistryBuilder {
	/// Registers (or replaces) the requester for `kind`.
	pub fn requester(mut self, kind: ProviderKind, requester: impl 'static + Requester) -> Self {
		self.registry.requesters.insert(kind, Arc::new(requester));

		self
	}

	/// Registers (or replaces) the responder for `kind`.
	pub fn responder(mut self, kind: ProviderKind, responder: impl 'static + Responder) -> Self {
		self.registry.responders.insert(kind, Arc::new(responder));

		self
	}

	/// Freezes the registry.
	pub fn build(self) -> ProviderRegistry {
		self.registry
	}
}
impl Debug for ProviderRegistryBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ProviderRegistryBuilder").field("registry", &self.registry).finish()
	}
}
