// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for access-token resolution.
#[derive(Debug, Default)]
pub struct ExchangeMetrics {
	exchanges: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	hot_hits: AtomicU64,
	durable_hits: AtomicU64,
	joins: AtomicU64,
}
impl ExchangeMetrics {
	/// Number of access requests dispatched to the identity provider.
	pub fn exchanges(&self) -> u64 {
		self.exchanges.load(Ordering::Relaxed)
	}

	/// Number of dispatched access requests that produced a token.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Number of dispatched access requests that failed.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Lookups answered by the hot tier (including the re-check under the registry lock).
	pub fn hot_hits(&self) -> u64 {
		self.hot_hits.load(Ordering::Relaxed)
	}

	/// Lookups answered by the durable tier.
	pub fn durable_hits(&self) -> u64 {
		self.durable_hits.load(Ordering::Relaxed)
	}

	/// Lookups that joined an exchange another caller had already registered.
	pub fn joins(&self) -> u64 {
		self.joins.load(Ordering::Relaxed)
	}

	pub(crate) fn record_exchange(&self) {
		self.exchanges.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_hot_hit(&self) {
		self.hot_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_durable_hit(&self) {
		self.durable_hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_join(&self) {
		self.joins.fetch_add(1, Ordering::Relaxed);
	}
}
