//! Token resolution flows built on a shared [`TokenResolver`].
//!
//! `access` trades identity tokens for cached access tokens, `exchange` mints the first-party
//! identity token at login, and `session` keeps that identity token fresh through the refresh
//! grant.

pub mod access;
pub mod exchange;
pub mod session;
pub mod single_flight;

mod metrics;

pub use access::*;
pub use exchange::*;
pub use metrics::ExchangeMetrics;
pub use session::*;
pub use single_flight::*;

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest, HttpResponse,
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ExpiryPolicy, TokenSecret},
	cache::{CacheKey, Clock, DurableTier, HotCache, SystemClock},
	error::{ConfigError, ExchangeError},
	http::HttpTransport,
	oauth::TransportErrorMapper,
	obs::FlowKind,
	provider::ProviderDescriptor,
	store::SessionStorage,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Resolver specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenResolver = TokenResolver<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Where the resolver runs, which decides whether caching is safe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
	/// Long-lived client context: both cache tiers and single-flight are used.
	#[default]
	Interactive,
	/// One-shot rendering on behalf of a client: every call performs a direct exchange.
	NonInteractive,
}

/// Tunables for token resolution and the session guard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
	/// Skew and fallback lifetime used when resolving access-token expiries.
	#[serde(flatten)]
	pub expiry: ExpiryPolicy,
	/// The session guard refreshes identity tokens expiring within this window.
	pub refresh_window: Duration,
	/// Per-request timeout applied by the default reqwest transport.
	pub exchange_timeout: Duration,
	/// Execution mode.
	pub mode: ExecutionMode,
}
impl ResolverConfig {
	/// Default identity-token refresh window (60 seconds).
	pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::seconds(60);
	/// Default exchange timeout (30 seconds).
	pub const DEFAULT_EXCHANGE_TIMEOUT: Duration = Duration::seconds(30);

	/// Switches to [`ExecutionMode::NonInteractive`].
	pub fn non_interactive(mut self) -> Self {
		self.mode = ExecutionMode::NonInteractive;

		self
	}
}
impl Default for ResolverConfig {
	fn default() -> Self {
		Self {
			expiry: ExpiryPolicy::default(),
			refresh_window: Self::DEFAULT_REFRESH_WINDOW,
			exchange_timeout: Self::DEFAULT_EXCHANGE_TIMEOUT,
			mode: ExecutionMode::default(),
		}
	}
}

/// Resolves access tokens and identity sessions against a single provider descriptor.
///
/// The resolver owns the hot cache tier, the optional durable tier, and the in-flight registry,
/// so concurrent callers sharing one resolver (by reference or `Arc`) share cached tokens and
/// never duplicate an exchange for the same key.
pub struct TokenResolver<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Provider descriptor that defines the API base and token endpoints.
	pub descriptor: ProviderDescriptor,
	/// Shared counters for access-token resolution.
	pub metrics: Arc<ExchangeMetrics>,
	config: ResolverConfig,
	hot: HotCache,
	durable: Option<DurableTier>,
	flights: SingleFlight<CacheKey, Result<AccessToken>>,
	clock: Arc<dyn Clock>,
}
impl<C, M> TokenResolver<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a resolver that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		descriptor: ProviderDescriptor,
		config: ResolverConfig,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			descriptor,
			metrics: Default::default(),
			config,
			hot: HotCache::default(),
			durable: None,
			flights: SingleFlight::new(),
			clock: Arc::new(SystemClock),
		}
	}

	/// Attaches the per-session durable tier.
	pub fn with_durable_store(mut self, storage: Arc<dyn SessionStorage>) -> Self {
		self.durable = Some(DurableTier::new(storage));

		self
	}

	/// Replaces the clock used for expiry decisions.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Active configuration.
	pub fn config(&self) -> &ResolverConfig {
		&self.config
	}

	/// Hot cache tier.
	pub fn hot_cache(&self) -> &HotCache {
		&self.hot
	}

	/// Number of keys with an exchange in flight.
	pub fn in_flight(&self) -> usize {
		self.flights.in_flight()
	}

	pub(crate) fn now(&self) -> OffsetDateTime {
		self.clock.now()
	}

	/// Sends `request` through the transport, mapping transport failures for `flow`.
	pub(crate) async fn dispatch(&self, flow: FlowKind, request: HttpRequest) -> Result<HttpResponse> {
		let handle = self.http_client.handle();

		handle.call(request).await.map_err(|err| self.transport_mapper.map_transport_error(flow, err))
	}
}
#[cfg(feature = "reqwest")]
impl TokenResolver<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a resolver with its own reqwest transport honoring `config.exchange_timeout`.
	pub fn new(descriptor: ProviderDescriptor, config: ResolverConfig) -> Result<Self> {
		let http_client = ReqwestHttpClient::with_timeout(config.exchange_timeout.unsigned_abs())?;

		Ok(Self::with_http_client(
			descriptor,
			config,
			http_client,
			Arc::new(ReqwestTransportErrorMapper),
		))
	}
}
impl<C, M> Debug for TokenResolver<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenResolver")
			.field("descriptor", &self.descriptor)
			.field("config", &self.config)
			.field("durable", &self.durable.is_some())
			.field("in_flight", &self.flights.in_flight())
			.finish()
	}
}

#[derive(Deserialize)]
struct ProblemDetails {
	detail: Option<String>,
	title: Option<String>,
}

/// Builds a bearer-authenticated JSON `POST`.
pub(crate) fn json_post(url: &Url, bearer: &TokenSecret, body: Vec<u8>) -> Result<HttpRequest> {
	Request::builder()
		.method(Method::POST)
		.uri(url.as_str())
		.header(AUTHORIZATION, bearer.bearer())
		.header(CONTENT_TYPE, "application/json")
		.header(ACCEPT, "application/json")
		.body(body)
		.map_err(|err| ConfigError::from(err).into())
}

/// Rejects non-2xx token endpoint responses.
pub(crate) fn ensure_success(flow: FlowKind, response: &HttpResponse) -> Result<()> {
	let status = response.status();

	if status.is_success() {
		return Ok(());
	}

	let problem = serde_json::from_slice::<ProblemDetails>(response.body()).ok();
	let message = problem
		.and_then(|problem| problem.detail.or(problem.title))
		.or_else(|| status.canonical_reason().map(ToOwned::to_owned))
		.unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

	Err(ExchangeError::Rejected { operation: flow.as_str(), status: status.as_u16(), message }.into())
}

/// Decodes a JSON body, keeping the path of the first offending field.
pub(crate) fn parse_json<T>(flow: FlowKind, response: &HttpResponse) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(response.body());

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| Error::ResponseParse {
		operation: flow.as_str(),
		status: response.status().as_u16(),
		source: Arc::new(source),
	})
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::StatusCode;
	// self
	use super::*;

	fn response(status: u16, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() = StatusCode::from_u16(status).expect("Status fixture should be valid.");

		response
	}

	#[test]
	fn config_defaults_fill_missing_fields() {
		let config: ResolverConfig = serde_json::from_str(r#"{"mode":"non_interactive"}"#)
			.expect("Partial config should deserialize.");

		assert_eq!(config.mode, ExecutionMode::NonInteractive);
		assert_eq!(config.refresh_window, ResolverConfig::DEFAULT_REFRESH_WINDOW);
		assert_eq!(config.exchange_timeout, ResolverConfig::DEFAULT_EXCHANGE_TIMEOUT);
		assert_eq!(config.expiry, ExpiryPolicy::default());
		assert_eq!(ResolverConfig::default().non_interactive(), config);
	}

	#[test]
	fn rejected_exchanges_prefer_problem_detail() {
		let err = ensure_success(FlowKind::AccessRequest, &response(403, r#"{"title":"Forbidden scope"}"#))
			.expect_err("Non-success statuses must be rejected.");

		assert!(matches!(
			err,
			Error::Exchange(ExchangeError::Rejected { status: 403, ref message, .. })
				if message == "Forbidden scope"
		));
		assert!(ensure_success(FlowKind::AccessRequest, &response(200, "{}")).is_ok());
	}

	#[test]
	fn parse_failures_keep_status() {
		#[derive(Debug, Deserialize)]
		struct Body {
			#[allow(dead_code)]
			value: u32,
		}

		let err = parse_json::<Body>(FlowKind::TokenExchange, &response(200, r#"{"value":"x"}"#))
			.expect_err("Mismatched body must fail.");

		assert!(matches!(err, Error::ResponseParse { operation: "token_exchange", status: 200, .. }));
	}
}
