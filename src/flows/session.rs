//! Session refresh guard: keep the identity token ahead of its expiry.
//!
//! [`TokenResolver::ensure_session_fresh`] is advisory housekeeping run before navigation. It
//! never blocks access-token resolution, which does not re-check identity freshness itself.

// self
use crate::{
	_prelude::*,
	auth::{ProviderId, Session, SessionTokens},
	flows::TokenResolver,
	http::HttpTransport,
	oauth::{RefreshFacade, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Outcome of [`TokenResolver::ensure_session_fresh`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionStatus {
	/// The session holds no identity token; nothing was checked.
	Anonymous,
	/// The identity token is valid beyond the refresh window.
	Fresh,
	/// The identity token was renewed through the refresh grant.
	Refreshed,
	/// The session was cleared; the user must sign in again with `provider`.
	Reauthenticate {
		/// Provider to send the user back to.
		provider: ProviderId,
	},
}
impl SessionStatus {
	/// Route that restarts login, for [`SessionStatus::Reauthenticate`].
	pub fn redirect_path(&self) -> Option<String> {
		match self {
			Self::Reauthenticate { provider } => Some(format!("/auth/{provider}")),
			_ => None,
		}
	}
}

impl<C, M> TokenResolver<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Refreshes `session`'s identity token when its expiry is unknown or within the refresh
	/// window.
	///
	/// A missing refresh token or a failed refresh clears the session and reports
	/// [`SessionStatus::Reauthenticate`]. Only configuration problems (e.g. no refresh endpoint)
	/// surface as errors; the session is left untouched in that case.
	pub async fn ensure_session_fresh(&self, session: &mut Session) -> Result<SessionStatus> {
		const KIND: FlowKind = FlowKind::SessionRefresh;

		let Some(identity) = session.identity() else {
			return Ok(SessionStatus::Anonymous);
		};
		let deadline = self.now() + self.config().refresh_window;

		if identity.expires_at().is_some_and(|exp| exp > deadline) {
			return Ok(SessionStatus::Fresh);
		}

		let provider = session.provider.clone().unwrap_or_else(|| self.descriptor.id.clone());
		let Some(refresh_token) = session.refresh_token().cloned() else {
			session.clear();

			return Ok(SessionStatus::Reauthenticate { provider });
		};
		let facade = <RefreshFacade<C, M>>::from_descriptor(
			&self.descriptor,
			self.http_client.clone(),
			self.transport_mapper.clone(),
		)?;
		let span = FlowSpan::new(KIND, "ensure_session_fresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		match span.instrument(facade.refresh(&refresh_token)).await {
			Ok(refreshed) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Success);

				session.tokens = Some(SessionTokens {
					id_token: refreshed.id_token,
					refresh_token: Some(refreshed.refresh_token.unwrap_or(refresh_token)),
				});

				Ok(SessionStatus::Refreshed)
			},
			Err(err) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				obs::note_swallowed(KIND, "refresh", &err);
				session.clear();

				Ok(SessionStatus::Reauthenticate { provider })
			},
		}
	}
}
