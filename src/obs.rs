//! Optional observability helpers for token flows and cache lookups.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `nullbox_access.flow` with the `flow` and
//!   `stage` (call site) fields, plus debug events for cache hits and swallowed storage errors.
//! - Enable `metrics` to increment the `nullbox_access_flow_total` counter for every
//!   attempt/success/failure, labeled by `flow` + `outcome`, and `nullbox_access_cache_total`
//!   labeled by `tier`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Token and API operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// External identity token traded for a first-party identity token at login.
	TokenExchange,
	/// Identity token traded for an audience-scoped access token.
	AccessRequest,
	/// Identity token renewed through the refresh grant.
	SessionRefresh,
	/// Bearer-decorated downstream API call.
	ApiRequest,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::TokenExchange => "token_exchange",
			FlowKind::AccessRequest => "access_request",
			FlowKind::SessionRefresh => "session_refresh",
			FlowKind::ApiRequest => "api_request",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a flow.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Cache tier that answered an access-token lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheTier {
	/// In-process hot tier.
	Hot,
	/// Per-session durable tier.
	Durable,
	/// Joined an in-flight exchange started by another caller.
	InFlight,
	/// Nothing cached; a new exchange was started.
	Miss,
}
impl CacheTier {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheTier::Hot => "hot",
			CacheTier::Durable => "durable",
			CacheTier::InFlight => "in_flight",
			CacheTier::Miss => "miss",
		}
	}
}
impl Display for CacheTier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
