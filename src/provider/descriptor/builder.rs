// self
use crate::{
	_prelude::*,
	auth::{Audience, IdentifierError, ProviderId, ScopeSet, ScopeValidationError},
	provider::ProviderDescriptor,
};

/// Errors raised while constructing or validating descriptors.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ProviderDescriptorError {
	/// The API base URL is mandatory.
	#[error("Missing API base URL.")]
	MissingApiBase,
	/// The refresh grant needs a public client identifier.
	#[error("Missing client identifier.")]
	MissingClientId,
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// The API base URL cannot carry path segments.
	#[error("The API base URL cannot be used as a base: {url}.")]
	CannotBeABase {
		/// Offending URL.
		url: String,
	},
	/// Operation paths must be absolute.
	#[error("The {name} path must start with `/`: {path}.")]
	RelativePath {
		/// Which path failed validation.
		name: &'static str,
		/// Offending path.
		path: String,
	},
	/// Refresh scopes failed normalization.
	#[error("Refresh scopes are invalid: {0}")]
	InvalidScope(#[from] ScopeValidationError),
	/// Default audience failed validation.
	#[error("Default audience is invalid: {0}")]
	InvalidAudience(#[from] IdentifierError),
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	/// Identifier for the descriptor being constructed.
	pub id: ProviderId,
	/// API base URL.
	pub api_base: Option<Url>,
	/// Login token exchange path.
	pub token_exchange_path: String,
	/// Access request path.
	pub access_request_path: String,
	/// Optional refresh token endpoint.
	pub refresh_endpoint: Option<Url>,
	/// Public client identifier.
	pub client_id: Option<String>,
	/// Scopes requested by the refresh grant.
	pub refresh_scopes: Vec<String>,
	/// Default audience.
	pub default_audience: String,
}
impl ProviderDescriptorBuilder {
	/// Creates a new builder seeded with the provided identifier and default paths.
	pub fn new(id: ProviderId) -> Self {
		Self {
			id,
			api_base: None,
			token_exchange_path: ProviderDescriptor::DEFAULT_TOKEN_EXCHANGE_PATH.into(),
			access_request_path: ProviderDescriptor::DEFAULT_ACCESS_REQUEST_PATH.into(),
			refresh_endpoint: None,
			client_id: None,
			refresh_scopes: ProviderDescriptor::DEFAULT_REFRESH_SCOPES
				.iter()
				.map(|scope| (*scope).to_owned())
				.collect(),
			default_audience: ProviderDescriptor::DEFAULT_AUDIENCE.into(),
		}
	}

	/// Sets the API base URL.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Overrides the login token exchange path.
	pub fn token_exchange_path(mut self, path: impl Into<String>) -> Self {
		self.token_exchange_path = path.into();

		self
	}

	/// Overrides the access request path.
	pub fn access_request_path(mut self, path: impl Into<String>) -> Self {
		self.access_request_path = path.into();

		self
	}

	/// Sets the refresh token endpoint.
	pub fn refresh_endpoint(mut self, url: Url) -> Self {
		self.refresh_endpoint = Some(url);

		self
	}

	/// Sets the public client identifier.
	pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
		self.client_id = Some(client_id.into());

		self
	}

	/// Replaces the refresh scopes.
	pub fn refresh_scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.refresh_scopes = scopes.into_iter().map(Into::into).collect();

		self
	}

	/// Overrides the default audience.
	pub fn default_audience(mut self, audience: impl Into<String>) -> Self {
		self.default_audience = audience.into();

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let api_base = self.api_base.ok_or(ProviderDescriptorError::MissingApiBase)?;
		let client_id = self
			.client_id
			.filter(|id| !id.trim().is_empty())
			.ok_or(ProviderDescriptorError::MissingClientId)?;
		let descriptor = ProviderDescriptor {
			id: self.id,
			api_base,
			token_exchange_path: self.token_exchange_path,
			access_request_path: self.access_request_path,
			refresh_endpoint: self.refresh_endpoint,
			client_id,
			refresh_scopes: ScopeSet::new(self.refresh_scopes)?,
			default_audience: Audience::new(self.default_audience)?,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ProviderDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		validate_endpoint("api_base", &self.api_base)?;

		if self.api_base.cannot_be_a_base() {
			return Err(ProviderDescriptorError::CannotBeABase { url: self.api_base.to_string() });
		}
		if let Some(refresh) = self.refresh_endpoint.as_ref() {
			validate_endpoint("refresh", refresh)?;
		}

		validate_path("token_exchange", &self.token_exchange_path)?;
		validate_path("access_request", &self.access_request_path)?;

		Ok(())
	}
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	let loopback = matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "[::1]"));

	if url.scheme() == "https" || (url.scheme() == "http" && loopback) {
		Ok(())
	} else {
		Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	}
}

fn validate_path(name: &'static str, path: &str) -> Result<(), ProviderDescriptorError> {
	if path.starts_with('/') {
		Ok(())
	} else {
		Err(ProviderDescriptorError::RelativePath { name, path: path.to_owned() })
	}
}
