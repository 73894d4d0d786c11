//! Server-side session record holding the user's identity credentials.

// self
use crate::{
	_prelude::*,
	auth::{IdentityToken, ProviderId, TokenSecret, UserProfile},
};

/// Tokens kept in the session store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
	/// Identity token minted at login (or by the last refresh).
	pub id_token: IdentityToken,
	/// Refresh token used by the session guard, when the provider issued one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
}

/// Session record for one user agent.
///
/// An empty session (no tokens) is anonymous. The session guard replaces `tokens` on refresh and
/// calls [`Session::clear`] when the user must sign in again.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	/// Identity credentials; `None` once cleared.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tokens: Option<SessionTokens>,
	/// Provider used to sign in; reauthentication redirects back to it.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub provider: Option<ProviderId>,
	/// Profile projected at login.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user: Option<UserProfile>,
	/// Login instant.
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub logged_in_at: Option<OffsetDateTime>,
}
impl Session {
	/// Creates a session holding `id_token` and an optional refresh token.
	pub fn authenticated(id_token: IdentityToken, refresh_token: Option<&str>) -> Self {
		Self {
			tokens: Some(SessionTokens {
				id_token,
				refresh_token: refresh_token.map(TokenSecret::new),
			}),
			logged_in_at: Some(OffsetDateTime::now_utc()),
			..Default::default()
		}
	}

	/// Records the provider the user signed in with.
	pub fn with_provider(mut self, provider: ProviderId) -> Self {
		self.provider = Some(provider);

		self
	}

	/// Attaches a projected user profile.
	pub fn with_user(mut self, user: UserProfile) -> Self {
		self.user = Some(user);

		self
	}

	/// Current identity token, if any.
	pub fn identity(&self) -> Option<&IdentityToken> {
		self.tokens.as_ref().map(|tokens| &tokens.id_token)
	}

	/// Current refresh token, if any.
	pub fn refresh_token(&self) -> Option<&TokenSecret> {
		self.tokens.as_ref().and_then(|tokens| tokens.refresh_token.as_ref())
	}

	/// Returns `true` when no identity token is present.
	pub fn is_anonymous(&self) -> bool {
		self.tokens.is_none()
	}

	/// Drops every credential and profile field, keeping only the login provider.
	pub fn clear(&mut self) {
		let provider = self.provider.take();

		*self = Self { provider, ..Default::default() };
	}
}
