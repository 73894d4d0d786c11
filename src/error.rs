//! Crate-level error types shared by the resolver, the session guard, stores, and API calls.
//!
//! Every error is `Clone` so a failed single-flight exchange can be delivered to each caller
//! that was waiting on it.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Durable-tier storage failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Identity provider answered a token call with a failure.
	#[error(transparent)]
	Exchange(#[from] ExchangeError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Downstream API call returned a non-success status.
	#[error(transparent)]
	Api(#[from] ApiError),

	/// No identity token is present in the session; nothing was dispatched.
	#[error("User is not authenticated.")]
	AuthenticationRequired,
	/// Response body could not be decoded into the expected shape.
	#[error("The {operation} response could not be decoded.")]
	ResponseParse {
		/// Operation label (see [`crate::obs::FlowKind`]).
		operation: &'static str,
		/// HTTP status code of the undecodable response.
		status: u16,
		/// Structured parsing failure.
		#[source]
		source: Arc<serde_path_to_error::Error<serde_json::Error>>,
	},
}
impl Error {
	/// HTTP-equivalent status code carried by the error, when one applies.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::AuthenticationRequired => Some(401),
			Self::Api(err) => Some(err.status),
			Self::Exchange(ExchangeError::Rejected { status, .. }) => Some(*status),
			Self::ResponseParse { status, .. } => Some(*status),
			_ => None,
		}
	}

	/// Whether the failure should propagate to a global error boundary instead of being handled
	/// locally.
	pub fn is_fatal(&self) -> bool {
		match self {
			Self::Api(err) => err.fatal,
			_ => false,
		}
	}
}

/// Configuration and validation failures.
#[derive(Clone, Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: SharedError,
	},
	/// HTTP request construction failed.
	#[error("HTTP request could not be constructed.")]
	HttpRequest {
		/// Underlying `http` builder failure.
		#[source]
		source: Arc<oauth2::http::Error>,
	},
	/// A configured or derived URL is invalid.
	#[error("The {name} URL is invalid.")]
	InvalidUrl {
		/// Which URL failed to parse.
		name: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The API base URL cannot carry path segments (e.g. `mailto:`).
	#[error("The API base URL cannot be used as a base: {url}.")]
	CannotBeABase {
		/// Offending base URL.
		url: String,
	},
	/// A `:name` placeholder in an endpoint template has no value.
	#[error("Path parameter `{name}` is missing for endpoint `{template}`.")]
	MissingPathParam {
		/// Placeholder name without the leading colon.
		name: String,
		/// Endpoint template being expanded.
		template: String,
	},
	/// A path parameter is a `.` or `..` dot-segment, which URL normalization would resolve away.
	#[error("Path parameter `{name}` for endpoint `{template}` is a dot-segment.")]
	DotSegmentPathParam {
		/// Placeholder name without the leading colon.
		name: String,
		/// Endpoint template being expanded.
		template: String,
	},
	/// Request body could not be serialized as JSON.
	#[error("Request body could not be serialized.")]
	RequestBody {
		/// Underlying serializer failure.
		#[source]
		source: Arc<serde_json::Error>,
	},
	/// Descriptor has no refresh endpoint configured.
	#[error("Descriptor `{descriptor}` has no refresh endpoint configured.")]
	MissingRefreshEndpoint {
		/// Provider identifier string.
		descriptor: String,
	},
	/// Requested scopes cannot be normalized.
	#[error("Requested scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Identifier validation failed.
	#[error("Identifier is invalid.")]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// Provider descriptor validation failed.
	#[error("Provider descriptor is invalid.")]
	InvalidDescriptor(#[from] crate::provider::ProviderDescriptorError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Arc::new(src) }
	}
}
impl From<oauth2::http::Error> for ConfigError {
	fn from(e: oauth2::http::Error) -> Self {
		Self::HttpRequest { source: Arc::new(e) }
	}
}
impl From<serde_json::Error> for ConfigError {
	fn from(e: serde_json::Error) -> Self {
		Self::RequestBody { source: Arc::new(e) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures reported by the identity provider's token endpoints.
#[derive(Clone, Debug, ThisError)]
pub enum ExchangeError {
	/// Endpoint answered with a non-success status.
	#[error("The {operation} endpoint rejected the request ({status}): {message}.")]
	Rejected {
		/// Operation label (see [`crate::obs::FlowKind`]).
		operation: &'static str,
		/// HTTP status code.
		status: u16,
		/// Provider-supplied message, or the status reason.
		message: String,
	},
	/// Endpoint answered successfully but omitted a required token.
	#[error("The {operation} response is missing `{field}`.")]
	MissingToken {
		/// Operation label.
		operation: &'static str,
		/// Missing response field.
		field: &'static str,
	},
}

/// Transport-level failures (network, IO).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {operation}.")]
	Network {
		/// Operation label.
		operation: &'static str,
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// Request exceeded the configured timeout.
	#[error("Request timed out while calling {operation}.")]
	Timeout {
		/// Operation label.
		operation: &'static str,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[source] Arc<std::io::Error>),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(operation: &'static str, src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { operation, source: Arc::new(src) }
	}
}
impl From<std::io::Error> for TransportError {
	fn from(e: std::io::Error) -> Self {
		Self::Io(Arc::new(e))
	}
}

/// Uniform error raised for failed downstream API responses.
#[derive(Clone, Debug, PartialEq, ThisError)]
#[error("{message}")]
pub struct ApiError {
	/// HTTP status code.
	pub status: u16,
	/// Human-readable message extracted from the problem payload.
	pub message: String,
	/// Raw JSON payload (`null` when absent or not JSON).
	pub payload: serde_json::Value,
	/// `true` for server-side failures (status >= 500).
	pub fatal: bool,
}
