//! Access-token resolution: hot tier, durable tier, single-flight exchange.
//!
//! [`TokenResolver::access_token`] returns a token for an `(audience, scopes, subject)` key. A
//! valid hot-tier entry is returned without touching the network; otherwise the durable tier is
//! consulted and, on a miss, exactly one `POST` to the access request endpoint runs per key no
//! matter how many callers ask concurrently. The exchange writes the hot tier before it
//! settles, then mirrors the token to the durable tier. Durable-tier failures are never surfaced:
//! a failed read is a miss and a failed write leaves the token in the hot tier only.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Audience, IdentityToken, ScopeSet},
	cache::CacheKey,
	error::{ConfigError, ExchangeError},
	flows::{Entered, ExecutionMode, TokenResolver},
	http::HttpTransport,
	oauth::TransportErrorMapper,
	obs::{self, CacheTier, FlowKind, FlowOutcome, FlowSpan},
};

#[derive(Serialize)]
struct AccessRequest<'a> {
	audience: &'a str,
	scopes: &'a [String],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessResponse {
	access_token: String,
	#[serde(default)]
	expires_in: Option<f64>,
}

impl<C, M> TokenResolver<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns an access token for `audience` + `scope` on behalf of `identity`.
	///
	/// In [`ExecutionMode::NonInteractive`] every call performs a direct exchange and nothing is
	/// cached.
	pub async fn access_token(
		&self,
		identity: &IdentityToken,
		audience: &Audience,
		scope: &ScopeSet,
	) -> Result<AccessToken> {
		if self.config().mode == ExecutionMode::NonInteractive {
			return self.request_access(identity, audience, scope).await;
		}

		let key = CacheKey::new(audience, scope, &identity.subject());

		if let Some(token) = self.hot.get_fresh(&key, self.now()) {
			self.record_lookup(CacheTier::Hot);

			return Ok(token);
		}
		if let Some(token) = self.read_durable(&key).await {
			self.hot.insert(key, token.clone());
			self.record_lookup(CacheTier::Durable);

			return Ok(token);
		}

		let flight = match self.flights.enter(&key, || self.hot.get_fresh(&key, self.now())) {
			Entered::Ready(token) => {
				self.record_lookup(CacheTier::Hot);

				return Ok(token);
			},
			Entered::Flight(flight) => flight,
		};

		self.record_lookup(if flight.joined() { CacheTier::InFlight } else { CacheTier::Miss });

		let key = &key;

		flight
			.run(move || async move {
				let token = self.request_access(identity, audience, scope).await?;

				self.hot.insert(key.clone(), token.clone());
				self.write_durable(key, &token).await;

				Ok(token)
			})
			.await
	}

	/// Performs one access request without consulting or populating any cache tier.
	pub async fn request_access(
		&self,
		identity: &IdentityToken,
		audience: &Audience,
		scope: &ScopeSet,
	) -> Result<AccessToken> {
		const KIND: FlowKind = FlowKind::AccessRequest;

		let span = FlowSpan::new(KIND, "request_access");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.metrics.record_exchange();

		let result = span
			.instrument(async move {
				let url = self.descriptor.access_request_url()?;
				let body = serde_json::to_vec(&AccessRequest {
					audience: audience.as_ref(),
					scopes: scope.as_slice(),
				})
				.map_err(ConfigError::from)?;
				let request = super::json_post(&url, identity.secret(), body)?;
				let response = self.dispatch(KIND, request).await?;

				super::ensure_success(KIND, &response)?;

				let payload = super::parse_json::<AccessResponse>(KIND, &response)?;

				if payload.access_token.is_empty() {
					return Err(ExchangeError::MissingToken {
						operation: KIND.as_str(),
						field: "accessToken",
					}
					.into());
				}

				Ok(AccessToken::issue(
					payload.access_token,
					// `as` saturates; NaN becomes zero.
					payload.expires_in.map(|secs| secs as i64),
					&self.config().expiry,
					self.now(),
				))
			})
			.await;

		match &result {
			Ok(_) => {
				self.metrics.record_success();
				obs::record_flow_outcome(KIND, FlowOutcome::Success);
			},
			Err(_) => {
				self.metrics.record_failure();
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}

	async fn read_durable(&self, key: &CacheKey) -> Option<AccessToken> {
		let durable = self.durable.as_ref()?;

		match durable.read(key, self.now()).await {
			Ok(token) => token,
			Err(err) => {
				obs::note_swallowed(FlowKind::AccessRequest, "durable_read", &err);

				None
			},
		}
	}

	async fn write_durable(&self, key: &CacheKey, token: &AccessToken) {
		let Some(durable) = self.durable.as_ref() else {
			return;
		};

		if let Err(err) = durable.write(key, token).await {
			obs::note_swallowed(FlowKind::AccessRequest, "durable_write", &err);
		}
	}

	fn record_lookup(&self, tier: CacheTier) {
		match tier {
			CacheTier::Hot => self.metrics.record_hot_hit(),
			CacheTier::Durable => self.metrics.record_durable_hit(),
			CacheTier::InFlight => self.metrics.record_join(),
			CacheTier::Miss => {},
		}

		obs::record_cache_lookup(tier);
	}
}
