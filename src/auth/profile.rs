//! User profile projected from identity-token claims at login.

// self
use crate::{_prelude::*, auth::Claims};

/// WS-Federation claim carrying the display name.
pub const NAME_CLAIM: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name";
/// WS-Federation claim carrying the e-mail address.
pub const EMAIL_CLAIM: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress";
/// Custom claim carrying the account lifecycle status.
pub const USER_STATUS_CLAIM: &str = "https://nullbox.email/claims/user/status";
/// Permission granting restricted-area access.
pub const RESTRICTED_ACCESS_PERMISSION: &str = "restricted_access";

/// Feature flags derived from claims.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFlags {
	/// The `permissions` claim includes `restricted_access`.
	pub restricted_access: bool,
	/// The account is still `new` and must finish onboarding.
	pub profile_incomplete: bool,
}

/// Display-oriented user profile stored alongside the session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	/// Subject identifier.
	pub id: Option<String>,
	/// Display name.
	pub name: Option<String>,
	/// Upper-cased first letters of each word in `name`.
	pub initials: Option<String>,
	/// E-mail address.
	pub email: Option<String>,
	/// Derived feature flags.
	pub flags: UserFlags,
	/// Raw account status claim.
	pub status: Option<String>,
}
impl UserProfile {
	/// Projects the profile fields out of `claims`.
	pub fn from_claims(claims: &Claims) -> Self {
		let name = claims.string(NAME_CLAIM).map(ToOwned::to_owned);
		let status = claims.string(USER_STATUS_CLAIM).map(ToOwned::to_owned);

		Self {
			id: claims.sub().map(ToOwned::to_owned),
			initials: name.as_deref().map(initials),
			name,
			email: claims.string(EMAIL_CLAIM).map(ToOwned::to_owned),
			flags: UserFlags {
				restricted_access: claims.contains("permissions", RESTRICTED_ACCESS_PERMISSION),
				profile_incomplete: status.as_deref() == Some("new"),
			},
			status,
		}
	}

	/// Route a freshly signed-in user lands on: onboarding until the profile is complete.
	pub fn landing_path(&self) -> &'static str {
		if self.flags.profile_incomplete { "/on-boarding" } else { "/" }
	}
}

fn initials(name: &str) -> String {
	name.split_whitespace().filter_map(|word| word.chars().next()).flat_map(char::to_uppercase).collect()
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn claims(value: serde_json::Value) -> Claims {
		match value {
			serde_json::Value::Object(map) => Claims(map),
			_ => panic!("Fixture must be an object."),
		}
	}

	#[test]
	fn projects_named_claims() {
		let profile = UserProfile::from_claims(&claims(json!({
			"sub": "user-1",
			NAME_CLAIM: "ada lovelace",
			EMAIL_CLAIM: "ada@example.com",
			"permissions": ["restricted_access"],
			USER_STATUS_CLAIM: "new",
		})));

		assert_eq!(profile.id.as_deref(), Some("user-1"));
		assert_eq!(profile.name.as_deref(), Some("ada lovelace"));
		assert_eq!(profile.initials.as_deref(), Some("AL"));
		assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
		assert!(profile.flags.restricted_access);
		assert!(profile.flags.profile_incomplete);
		assert_eq!(profile.status.as_deref(), Some("new"));
		assert_eq!(profile.landing_path(), "/on-boarding");
	}

	#[test]
	fn missing_claims_leave_fields_empty() {
		let profile = UserProfile::from_claims(&claims(json!({ USER_STATUS_CLAIM: "active" })));

		assert!(profile.name.is_none());
		assert!(profile.initials.is_none());
		assert_eq!(profile.flags, UserFlags::default());
		assert_eq!(profile.status.as_deref(), Some("active"));
		assert_eq!(profile.landing_path(), "/");
	}
}
