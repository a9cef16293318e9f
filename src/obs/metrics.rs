// self
use crate::{gate::GateDecision, tracker::Outcome};

/// Records a gate verdict via the global metrics recorder (when enabled).
pub fn record_gate_decision(service: &str, decision: &GateDecision) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"provider_status_gate_total",
			"service" => service.to_owned(),
			"decision" => decision.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (service, decision);
	}
}

/// Records a classified provider call outcome (when enabled).
pub fn record_feedback(service: &str, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"provider_status_feedback_total",
			"service" => service.to_owned(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (service, outcome);
	}
}
