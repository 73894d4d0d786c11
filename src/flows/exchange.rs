//! Login completion: trade the external provider's identity token for a first-party one.

// self
use crate::{
	_prelude::*,
	auth::{IdentityToken, Session, TokenSecret, UserProfile},
	error::ExchangeError,
	flows::TokenResolver,
	http::HttpTransport,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeResponse {
	id_token: String,
}

impl<C, M> TokenResolver<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Exchanges `external_id_token` for this system's identity token and opens a session.
	///
	/// The session records the descriptor as its login provider and carries a [`UserProfile`]
	/// projected from the new token's claims.
	pub async fn exchange_identity_token(&self, external_id_token: &str) -> Result<Session> {
		const KIND: FlowKind = FlowKind::TokenExchange;

		let span = FlowSpan::new(KIND, "exchange_identity_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let url = self.descriptor.token_exchange_url()?;
				let request =
					super::json_post(&url, &TokenSecret::new(external_id_token), Vec::new())?;
				let response = self.dispatch(KIND, request).await?;

				super::ensure_success(KIND, &response)?;

				let payload = super::parse_json::<ExchangeResponse>(KIND, &response)?;

				if payload.id_token.is_empty() {
					return Err(ExchangeError::MissingToken {
						operation: KIND.as_str(),
						field: "idToken",
					}
					.into());
				}

				let id_token = IdentityToken::new(payload.id_token);
				let profile =
					id_token.claims().map(|claims| UserProfile::from_claims(&claims)).unwrap_or_default();

				Ok(Session::authenticated(id_token, None)
					.with_provider(self.descriptor.id.clone())
					.with_user(profile))
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}
}
