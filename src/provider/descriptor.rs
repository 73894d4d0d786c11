//! Provider descriptor data structures shared by every flow.

/// Builder API for assembling provider descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::{
	_prelude::*,
	auth::{Audience, ProviderId, ScopeSet},
	error::ConfigError,
};

/// Immutable provider descriptor consumed by the resolver.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Descriptor identifier; also the provider a reauthenticating user is sent back to.
	pub id: ProviderId,
	/// Base URL every API path and token path is resolved against.
	pub api_base: Url,
	/// Path of the login token exchange operation.
	pub token_exchange_path: String,
	/// Path of the access request operation.
	pub access_request_path: String,
	/// Token endpoint used by the `refresh_token` grant.
	pub refresh_endpoint: Option<Url>,
	/// Public client identifier sent with the refresh grant.
	pub client_id: String,
	/// Scopes requested when refreshing the identity token.
	pub refresh_scopes: ScopeSet,
	/// Audience used when a request does not name one.
	pub default_audience: Audience,
}
impl ProviderDescriptor {
	/// Default login token exchange path.
	pub const DEFAULT_TOKEN_EXCHANGE_PATH: &'static str = "/v1/tokens/exchange";
	/// Default access request path.
	pub const DEFAULT_ACCESS_REQUEST_PATH: &'static str = "/v1/tokens/access";
	/// Default audience.
	pub const DEFAULT_AUDIENCE: &'static str = "nullbox";
	/// Default refresh scopes.
	pub const DEFAULT_REFRESH_SCOPES: [&'static str; 4] =
		["openid", "profile", "email", "offline_access"];

	/// Creates a new builder for the provided identifier.
	pub fn builder(id: ProviderId) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(id)
	}

	/// Absolute URL of the login token exchange operation.
	pub fn token_exchange_url(&self) -> Result<Url, ConfigError> {
		self.resolve(&self.token_exchange_path)
	}

	/// Absolute URL of the access request operation.
	pub fn access_request_url(&self) -> Result<Url, ConfigError> {
		self.resolve(&self.access_request_path)
	}

	/// Joins `path` onto the API base, keeping any path prefix the base carries.
	pub fn resolve(&self, path: &str) -> Result<Url, ConfigError> {
		let mut url = self.api_base.clone();

		{
			let mut segments = url
				.path_segments_mut()
				.map_err(|_| ConfigError::CannotBeABase { url: self.api_base.to_string() })?;

			segments.pop_if_empty();
			segments.extend(path.split('/').filter(|segment| !segment.is_empty()));
		}

		Ok(url)
	}
}
