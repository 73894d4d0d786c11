//! Strongly typed identifiers used to build cache keys and describe providers.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty or whitespace.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (audience, subject, provider).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (audience, subject, provider).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (audience, subject, provider).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! { Audience, "Identifier of the resource server an access token is minted for.", "Audience" }
def_id! { Subject, "Subject (`sub` claim) of an identity token.", "Subject" }
def_id! { ProviderId, "Identifier for an identity provider descriptor.", "Provider" }

impl Subject {
	/// Subject used when an identity token's claims cannot be read.
	pub const PLACEHOLDER: &'static str = "user";

	/// Returns the placeholder subject so malformed identity tokens still map to a stable key.
	pub fn placeholder() -> Self {
		Self(Self::PLACEHOLDER.to_owned())
	}

	/// Subject taken verbatim from a `sub` claim.
	///
	/// Claim values are not subject to identifier validation: two distinct non-empty claims always
	/// yield distinct subjects. Only an empty claim maps to the placeholder.
	pub fn from_claim(sub: &str) -> Self {
		if sub.is_empty() { Self::placeholder() } else { Self(sub.to_owned()) }
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identifiers_reject_whitespace_and_empty() {
		assert!(Audience::new(" nullbox").is_err(), "Leading whitespace must be rejected.");
		assert!(Audience::new("nullbox ").is_err(), "Trailing whitespace must be rejected.");

		let audience = Audience::new("nullbox").expect("Audience fixture should be valid.");

		assert_eq!(audience.as_ref(), "nullbox");
		assert!(Subject::new("").is_err());
		assert!(ProviderId::new("with space").is_err());
	}

	#[test]
	fn serde_round_trip_enforces_validation() {
		let audience: Audience =
			serde_json::from_str("\"nullbox-api\"").expect("Audience should deserialize.");

		assert_eq!(audience.as_ref(), "nullbox-api");
		assert!(serde_json::from_str::<Audience>("\"with space\"").is_err());
	}

	#[test]
	fn unicode_whitespace_and_length_limits() {
		let nbsp = format!("user{}id", '\u{00A0}');

		assert!(Subject::new(&nbsp).is_err());

		let exact = "a".repeat(IDENTIFIER_MAX_LEN);

		Subject::new(&exact).expect("Exact length should succeed.");

		assert!(Subject::new("a".repeat(IDENTIFIER_MAX_LEN + 1)).is_err());
	}

	#[test]
	fn placeholder_subject_is_stable() {
		assert_eq!(Subject::placeholder().as_ref(), "user");
		assert_eq!(Subject::placeholder(), Subject::new("user").expect("Placeholder is valid."));
	}

	#[test]
	fn borrow_supports_fast_lookup() {
		let map: HashMap<Audience, u8> = HashMap::from_iter([(
			Audience::new("nullbox").expect("Audience used for lookup should be valid."),
			7_u8,
		)]);

		assert_eq!(map.get("nullbox"), Some(&7));
	}
}
