// self
use crate::obs::{CacheTier, FlowKind, FlowOutcome};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"nullbox_access_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records which cache tier answered a lookup (when enabled).
pub fn record_cache_lookup(tier: CacheTier) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("nullbox_access_cache_total", "tier" => tier.as_str()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = tier;
	}
}
