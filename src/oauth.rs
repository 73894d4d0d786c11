//! `oauth2` client facade for the refresh grant plus the transport error mapping seam.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, Client, ClientId, EndpointNotSet, EndpointSet, ExtraTokenFields, HttpClientError,
	RefreshToken, RequestTokenError, Scope, StandardRevocableToken, StandardTokenResponse,
	TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse, BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	auth::{IdentityToken, ScopeSet, TokenSecret},
	error::{ConfigError, ExchangeError, TransportError},
	http::{HttpTransport, ResponseMetadata, ResponseMetadataSlot},
	obs::FlowKind,
	provider::ProviderDescriptor,
};

/// Extra fields carried by OpenID Connect token responses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenFields {
	/// Renewed identity token.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id_token: Option<String>,
}
impl ExtraTokenFields for IdTokenFields {}

type RefreshTokenResponse = StandardTokenResponse<IdTokenFields, BasicTokenType>;
type RefreshClient = Client<
	BasicErrorResponse,
	RefreshTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointSet,
>;

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted while running `flow`.
	fn map_transport_error(&self, flow: FlowKind, error: HttpClientError<E>) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, flow: FlowKind, err: HttpClientError<ReqwestError>) -> Error {
		let operation = flow.as_str();

		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(flow, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::from(inner).into(),
			HttpClientError::Other(message) =>
				TransportError::network(operation, std::io::Error::other(message)).into(),
			_ => TransportError::network(operation, std::io::Error::other("unknown HTTP client error"))
				.into(),
		}
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(flow: FlowKind, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransportError::Timeout { operation: flow.as_str() }.into();
	}

	TransportError::network(flow.as_str(), err).into()
}

/// Tokens returned by a successful refresh grant.
#[derive(Clone, Debug)]
pub struct RefreshedTokens {
	/// New identity token.
	pub id_token: IdentityToken,
	/// Rotated refresh token, when the provider issued one.
	pub refresh_token: Option<TokenSecret>,
}

/// Public-client `refresh_token` grant against the descriptor's refresh endpoint.
pub(crate) struct RefreshFacade<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: RefreshClient,
	scope: ScopeSet,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> RefreshFacade<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_descriptor(
		descriptor: &ProviderDescriptor,
		http_client: Arc<C>,
		error_mapper: Arc<M>,
	) -> Result<Self> {
		let endpoint = descriptor.refresh_endpoint.as_ref().ok_or_else(|| {
			ConfigError::MissingRefreshEndpoint { descriptor: descriptor.id.to_string() }
		})?;
		let token_url = TokenUrl::from_url(endpoint.clone());
		let oauth_client = Client::new(ClientId::new(descriptor.client_id.clone()))
			.set_token_uri(token_url)
			.set_auth_type(AuthType::RequestBody);

		Ok(Self {
			oauth_client,
			scope: descriptor.refresh_scopes.clone(),
			http_client,
			error_mapper,
		})
	}

	pub(crate) async fn refresh(&self, refresh_token: &TokenSecret) -> Result<RefreshedTokens> {
		const KIND: FlowKind = FlowKind::SessionRefresh;

		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let secret = RefreshToken::new(refresh_token.expose().to_owned());
		let mut request = self.oauth_client.exchange_refresh_token(&secret);

		for scope in self.scope.iter() {
			request = request.add_scope(Scope::new(scope.to_owned()));
		}

		let response = request
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(meta.take(), err, self.error_mapper.as_ref()))?;
		let id_token = response
			.extra_fields()
			.id_token
			.clone()
			.ok_or(ExchangeError::MissingToken { operation: KIND.as_str(), field: "id_token" })?;

		Ok(RefreshedTokens {
			id_token: IdentityToken::new(id_token),
			refresh_token: response
				.refresh_token()
				.map(|token| TokenSecret::new(token.secret().to_owned())),
		})
	}
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	const KIND: FlowKind = FlowKind::SessionRefresh;

	let status = meta.and_then(|meta| meta.status);

	match err {
		RequestTokenError::ServerResponse(response) =>
			map_server_response_error(response, status),
		RequestTokenError::Request(error) => mapper.map_transport_error(KIND, error),
		RequestTokenError::Parse(error, _body) => Error::ResponseParse {
			operation: KIND.as_str(),
			status: status.unwrap_or_default(),
			source: Arc::new(error),
		},
		RequestTokenError::Other(message) => ExchangeError::Rejected {
			operation: KIND.as_str(),
			status: status.unwrap_or_default(),
			message,
		}
		.into(),
	}
}

// RFC 6749 error responses use 400 unless the provider says otherwise.
fn map_server_response_error(response: BasicErrorResponse, status: Option<u16>) -> Error {
	let message = response
		.error_description()
		.cloned()
		.unwrap_or_else(|| response.error().as_ref().to_string());

	ExchangeError::Rejected {
		operation: FlowKind::SessionRefresh.as_str(),
		status: status.unwrap_or(400),
		message,
	}
	.into()
}
