//! Path-template expansion for downstream API endpoints.

// self
use crate::{_prelude::*, error::ConfigError};

/// Expands `template` against `base`.
///
/// Every `:name` segment is replaced by the matching entry of `path_params` (first match wins)
/// and percent-encoded as a single segment. A value of `.` or `..` is rejected instead of being
/// resolved against the preceding segments.
///
/// Query pairs are appended in order; a template without query pairs yields no `?`. Keys and
/// values use `application/x-www-form-urlencoded` escaping except that a space is written as
/// `%20`, never `+`.
pub fn build_url(
	base: &Url,
	template: &str,
	path_params: &[(String, String)],
	query: &[(String, String)],
) -> Result<Url, ConfigError> {
	let mut url = base.clone();

	{
		let mut segments =
			url.path_segments_mut().map_err(|_| ConfigError::CannotBeABase { url: base.to_string() })?;

		segments.pop_if_empty();

		for segment in template.split('/').filter(|segment| !segment.is_empty()) {
			match segment.strip_prefix(':') {
				Some(name) => {
					let value = path_params
						.iter()
						.find_map(|(key, value)| (key == name).then_some(value.as_str()))
						.ok_or_else(|| ConfigError::MissingPathParam {
							name: name.to_owned(),
							template: template.to_owned(),
						})?;

					if matches!(value, "." | "..") {
						return Err(ConfigError::DotSegmentPathParam {
							name: name.to_owned(),
							template: template.to_owned(),
						});
					}

					segments.push(value);
				},
				None => {
					segments.push(segment);
				},
			}
		}
	}

	if !query.is_empty() {
		let encoded = query
			.iter()
			.map(|(key, value)| format!("{}={}", encode_component(key), encode_component(value)))
			.collect::<Vec<_>>()
			.join("&");

		url.set_query(Some(&encoded));
	}

	Ok(url)
}

// A literal `+` is already escaped as `%2B`, so every remaining `+` stands for a space.
fn encode_component(raw: &str) -> String {
	url::form_urlencoded::byte_serialize(raw.as_bytes()).collect::<String>().replace('+', "%20")
}
