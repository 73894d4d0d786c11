//! Short-lived access tokens and the rules that assign their effective expiry.

// self
// crates.io
use time::PrimitiveDateTime;
// self
use crate::{_prelude::*, auth::{TokenSecret, decode_claims}};

/// Source the effective expiry of an access token was derived from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirySource {
	/// The token's own `exp` claim, minus skew.
	Claim,
	/// The provider's `expiresIn` duration, minus skew.
	ExpiresIn,
	/// The fixed fallback validity window.
	Default,
}

/// Rules for turning an access response into an absolute expiry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpiryPolicy {
	/// Margin subtracted from nominal expiries to absorb clock drift and request latency.
	pub skew: Duration,
	/// Validity window used when neither an `exp` claim nor `expiresIn` is available.
	pub default_ttl: Duration,
}
impl ExpiryPolicy {
	/// Default skew (15 seconds).
	pub const DEFAULT_SKEW: Duration = Duration::seconds(15);
	/// Default fallback validity window (55 minutes).
	pub const DEFAULT_TTL: Duration = Duration::minutes(55);

	/// Resolves the effective expiry for `token`.
	///
	/// Precedence: `exp` claim minus skew, then `now + max(0, expires_in - skew)`, then
	/// `now + default_ttl` (no skew applied to the fallback).
	pub fn resolve(
		&self,
		token: &str,
		expires_in: Option<i64>,
		now: OffsetDateTime,
	) -> (OffsetDateTime, ExpirySource) {
		if let Some(exp) = decode_claims(token).and_then(|claims| claims.exp()) {
			let expires_at =
				exp.checked_sub(self.skew).unwrap_or_else(|| clamp(!self.skew.is_negative()));

			return (expires_at, ExpirySource::Claim);
		}
		if let Some(secs) = expires_in {
			let lifetime = Duration::seconds(secs)
				.checked_sub(self.skew)
				.unwrap_or(if secs > 0 { Duration::MAX } else { Duration::ZERO })
				.max(Duration::ZERO);

			return (saturating_add(now, lifetime), ExpirySource::ExpiresIn);
		}

		(saturating_add(now, self.default_ttl), ExpirySource::Default)
	}
}
impl Default for ExpiryPolicy {
	fn default() -> Self {
		Self { skew: Self::DEFAULT_SKEW, default_ttl: Self::DEFAULT_TTL }
	}
}

fn saturating_add(instant: OffsetDateTime, delta: Duration) -> OffsetDateTime {
	instant.checked_add(delta).unwrap_or_else(|| clamp(delta.is_negative()))
}

// Earliest or latest representable instant.
fn clamp(earliest: bool) -> OffsetDateTime {
	if earliest { PrimitiveDateTime::MIN.assume_utc() } else { PrimitiveDateTime::MAX.assume_utc() }
}

/// Access token bound to one audience + scope set.
///
/// `expires_at` is the effective expiry: skew has already been folded in, so the token is
/// usable strictly before that instant and never at or after it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
	/// Token secret; callers must avoid logging it.
	pub secret: TokenSecret,
	/// Effective expiry instant.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Creates a token with an already-resolved effective expiry.
	pub fn new(secret: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { secret: TokenSecret::new(secret), expires_at }
	}

	/// Creates a token and resolves its expiry with `policy`.
	pub fn issue(
		secret: impl Into<String>,
		expires_in: Option<i64>,
		policy: &ExpiryPolicy,
		now: OffsetDateTime,
	) -> Self {
		let secret = secret.into();
		let (expires_at, _) = policy.resolve(&secret, expires_in, now);

		Self::new(secret, expires_at)
	}

	/// Returns the raw token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		self.secret.expose()
	}

	/// Returns `true` when the token may still be used at `instant`.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at
	}

	/// Time left before the token stops being served from cache.
	pub fn remaining(&self, instant: OffsetDateTime) -> Duration {
		(self.expires_at - instant).max(Duration::ZERO)
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("secret", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
