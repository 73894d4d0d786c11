//! Long-lived identity tokens minted at login.

// self
use crate::{
	_prelude::*,
	auth::{Claims, Subject, TokenSecret, decode_claims},
};

/// Identity token proving the user authenticated; the input to every access exchange.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityToken(TokenSecret);
impl IdentityToken {
	/// Wraps a raw identity token.
	pub fn new(token: impl Into<String>) -> Self {
		Self(TokenSecret::new(token))
	}

	/// Returns the raw token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		self.0.expose()
	}

	/// Redacted secret view.
	pub fn secret(&self) -> &TokenSecret {
		&self.0
	}

	/// Best-effort claim set; `None` for malformed tokens.
	pub fn claims(&self) -> Option<Claims> {
		decode_claims(self.expose())
	}

	/// Subject used for cache keys, falling back to [`Subject::placeholder`].
	pub fn subject(&self) -> Subject {
		self.claims()
			.and_then(|claims| claims.sub().map(Subject::from_claim))
			.unwrap_or_else(Subject::placeholder)
	}

	/// `exp` claim, when readable.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.claims().and_then(|claims| claims.exp())
	}
}
impl Debug for IdentityToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("IdentityToken").field(&"<redacted>").finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
	// self
	use super::*;

	#[test]
	fn subject_reads_sub_claim() {
		let payload = URL_SAFE_NO_PAD.encode(r#"{"sub":"user-42","exp":1735693200}"#);
		let token = IdentityToken::new(format!("e30.{payload}.sig"));

		assert_eq!(token.subject().as_ref(), "user-42");
		assert_eq!(token.expires_at(), Some(time::macros::datetime!(2025-01-01 01:00 UTC)));
	}

	#[test]
	fn malformed_tokens_use_placeholder_subject() {
		let token = IdentityToken::new("not-a-jwt");

		assert_eq!(token.subject(), Subject::placeholder());
		assert!(token.expires_at().is_none());
	}

	fn token_for(sub: &str) -> IdentityToken {
		let payload = URL_SAFE_NO_PAD.encode(serde_json::json!({ "sub": sub }).to_string());

		IdentityToken::new(format!("e30.{payload}.sig"))
	}

	#[test]
	fn unusual_subject_claims_stay_distinct() {
		let alice = token_for(&format!("alice-{}", "x".repeat(130)));
		let bob = token_for(&format!("bob-{}", "x".repeat(130)));
		let spaced = token_for("has space");

		assert_ne!(alice.subject(), bob.subject());
		assert_ne!(alice.subject(), Subject::placeholder());
		assert_eq!(spaced.subject().as_ref(), "has space");
		assert_eq!(token_for("").subject(), Subject::placeholder());
	}
}
