//! Best-effort claim extraction from three-segment bearer tokens.
//!
//! Nothing here verifies signatures. Tokens reaching this module were already validated by the
//! identity provider that issued them; the decoder only reads the payload so expiries and
//! subjects can be estimated. Any malformed input degrades to "no claims" instead of an error.

// crates.io
use base64::{
	Engine as _,
	engine::{
		DecodePaddingMode,
		general_purpose::{GeneralPurpose, GeneralPurposeConfig},
	},
};
use serde_json::{Map, Value};
// self
use crate::_prelude::*;

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
	&base64::alphabet::URL_SAFE,
	GeneralPurposeConfig::new()
		.with_encode_padding(false)
		.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Loosely typed claim set decoded from a token payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Claims(pub Map<String, Value>);
impl Claims {
	/// Raw claim lookup.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.0.get(name)
	}

	/// String claim lookup; non-string values are ignored.
	pub fn string(&self, name: &str) -> Option<&str> {
		self.get(name).and_then(Value::as_str)
	}

	/// `sub` claim, when present and non-empty.
	pub fn sub(&self) -> Option<&str> {
		self.string("sub").filter(|sub| !sub.is_empty())
	}

	/// `exp` claim as an absolute instant.
	///
	/// Fractional values are truncated to whole seconds.
	pub fn exp(&self) -> Option<OffsetDateTime> {
		let value = self.get("exp")?;
		let secs = value.as_i64().or_else(|| value.as_f64().map(|secs| secs as i64))?;

		OffsetDateTime::from_unix_timestamp(secs).ok()
	}

	/// Whether a string-array claim (or a single string claim) contains `needle`.
	pub fn contains(&self, name: &str, needle: &str) -> bool {
		match self.get(name) {
			Some(Value::Array(values)) => values.iter().any(|value| value.as_str() == Some(needle)),
			Some(Value::String(value)) => value == needle,
			_ => false,
		}
	}
}

/// Decodes the payload segment of `token` into a claim set.
///
/// Returns `None` when the token does not have exactly three dot-separated segments, the middle
/// segment is not base64url, or it does not hold a JSON object.
pub fn decode_claims(token: &str) -> Option<Claims> {
	let mut segments = token.split('.');
	let (Some(_header), Some(payload), Some(_signature), None) =
		(segments.next(), segments.next(), segments.next(), segments.next())
	else {
		return None;
	};
	let bytes = URL_SAFE_LENIENT.decode(payload).ok()?;

	match serde_json::from_slice(&bytes).ok()? {
		Value::Object(map) => Some(Claims(map)),
		_ => None,
	}
}
