// self
use crate::{_prelude::*, obs::Operation, store::StoreError};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedCall<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedCall<F> = F;

/// Span wrapped around a feedback-observed provider call.
#[derive(Clone, Debug)]
pub struct CallSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a new span tagged with the provider + operation.
	pub fn new(provider: &str, operation: Operation) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("provider_status.feedback", provider, operation = operation.as_str());

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (provider, operation);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedCall<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// The gate could not read a service record and let the request through.
pub fn status_unreadable(service: &str, error: &StoreError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(service, %error, "service status unreadable, failing open");
	#[cfg(not(feature = "tracing"))]
	let _ = (service, error);
}

/// A missing flag key could not be re-created while reading a status.
pub fn lazy_initialize_failed(service: &str, error: &StoreError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(service, %error, "lazy service initialization failed");
	#[cfg(not(feature = "tracing"))]
	let _ = (service, error);
}

/// A counter increment was dropped; statistics are best-effort.
pub fn update_lost(service: &str, error: &StoreError) {
	#[cfg(feature = "tracing")]
	tracing::warn!(service, %error, "service status update lost");
	#[cfg(not(feature = "tracing"))]
	let _ = (service, error);
}

/// An expired counter was reseeded together with its opposite counter.
pub fn counter_reseeded(service: &str, key: &str) {
	#[cfg(feature = "tracing")]
	tracing::debug!(service, key, "expired counter reseeded");
	#[cfg(not(feature = "tracing"))]
	let _ = (service, key);
}
