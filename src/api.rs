//! Bearer-decorated calls to the nullbox API.
//!
//! [`ApiClient`] expands an [`ApiRequest`] against the descriptor's API base, resolves an access
//! token through the shared [`TokenResolver`], attaches it as a bearer credential, and turns
//! non-success responses into [`ApiError`] values unless the request's hooks handle them first.

pub mod endpoint;
pub mod resources;

pub use resources::*;

// crates.io
use oauth2::{
	HttpRequest, HttpResponse,
	http::{
		Method, Request, StatusCode,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{Audience, ScopeSet, Session},
	error::{ApiError, ConfigError},
	flows::TokenResolver,
	http::HttpTransport,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

type OnRequest = Arc<dyn Fn(&mut HttpRequest) -> Result<()> + Send + Sync>;
type OnResponse = Arc<dyn Fn(&HttpResponse) + Send + Sync>;
type OnResponseError = Arc<dyn Fn(&HttpResponse) -> Error + Send + Sync>;

/// Per-request interception points.
#[derive(Clone, Default)]
pub struct RequestHooks {
	on_request: Option<OnRequest>,
	on_response: Option<OnResponse>,
	on_response_error: Option<OnResponseError>,
}
impl RequestHooks {
	/// Runs after the bearer header is attached; may mutate or veto the request.
	pub fn on_request<F>(mut self, hook: F) -> Self
	where
		F: 'static + Fn(&mut HttpRequest) -> Result<()> + Send + Sync,
	{
		self.on_request = Some(Arc::new(hook));

		self
	}

	/// Observes every response, successful or not.
	pub fn on_response<F>(mut self, hook: F) -> Self
	where
		F: 'static + Fn(&HttpResponse) + Send + Sync,
	{
		self.on_response = Some(Arc::new(hook));

		self
	}

	/// Replaces the default error policy for non-success responses.
	///
	/// The returned error is surfaced unchanged in place of [`default_error`]. A non-success
	/// response always fails the call.
	pub fn on_response_error<F>(mut self, hook: F) -> Self
	where
		F: 'static + Fn(&HttpResponse) -> Error + Send + Sync,
	{
		self.on_response_error = Some(Arc::new(hook));

		self
	}
}
impl Debug for RequestHooks {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RequestHooks")
			.field("on_request", &self.on_request.is_some())
			.field("on_response", &self.on_response.is_some())
			.field("on_response_error", &self.on_response_error.is_some())
			.finish()
	}
}

/// Description of one downstream API call.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path template; `:name` segments are filled from [`ApiRequest::path_params`].
	pub template: String,
	/// Placeholder values in insertion order.
	pub path_params: Vec<(String, String)>,
	/// Query pairs in insertion order.
	pub query: Vec<(String, String)>,
	/// Serialized JSON body.
	pub body: Option<Vec<u8>>,
	/// Audience override; the descriptor's default audience applies otherwise.
	pub audience: Option<Audience>,
	/// Scopes the access token must carry.
	pub scopes: ScopeSet,
	/// Interception hooks.
	pub hooks: RequestHooks,
}
impl ApiRequest {
	/// Starts a request for `template`.
	pub fn new(method: Method, template: impl Into<String>) -> Self {
		Self {
			method,
			template: template.into(),
			path_params: Vec::new(),
			query: Vec::new(),
			body: None,
			audience: None,
			scopes: ScopeSet::default(),
			hooks: RequestHooks::default(),
		}
	}

	/// `GET` shortcut.
	pub fn get(template: impl Into<String>) -> Self {
		Self::new(Method::GET, template)
	}

	/// `POST` shortcut.
	pub fn post(template: impl Into<String>) -> Self {
		Self::new(Method::POST, template)
	}

	/// `PATCH` shortcut.
	pub fn patch(template: impl Into<String>) -> Self {
		Self::new(Method::PATCH, template)
	}

	/// Binds the `:name` placeholder.
	pub fn path_param(mut self, name: impl Into<String>, value: impl Display) -> Self {
		self.path_params.push((name.into(), value.to_string()));

		self
	}

	/// Appends a query pair; `None` values are dropped.
	pub fn query<V>(mut self, name: impl Into<String>, value: Option<V>) -> Self
	where
		V: Display,
	{
		if let Some(value) = value {
			self.query.push((name.into(), value.to_string()));
		}

		self
	}

	/// Serializes `body` as the JSON payload.
	pub fn json<T>(mut self, body: &T) -> Result<Self>
	where
		T: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(body).map_err(ConfigError::from)?);

		Ok(self)
	}

	/// Overrides the audience.
	pub fn audience(mut self, audience: Audience) -> Self {
		self.audience = Some(audience);

		self
	}

	/// Sets the required scopes.
	pub fn scopes(mut self, scopes: ScopeSet) -> Self {
		self.scopes = scopes;

		self
	}

	/// Installs interception hooks.
	pub fn hooks(mut self, hooks: RequestHooks) -> Self {
		self.hooks = hooks;

		self
	}
}

/// Sends [`ApiRequest`]s with bearer credentials from a shared [`TokenResolver`].
pub struct ApiClient<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	resolver: Arc<TokenResolver<C, M>>,
}
impl<C, M> ApiClient<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Wraps a shared resolver.
	pub fn new(resolver: Arc<TokenResolver<C, M>>) -> Self {
		Self { resolver }
	}

	/// Underlying resolver.
	pub fn resolver(&self) -> &TokenResolver<C, M> {
		&self.resolver
	}

	/// Sends `request` and decodes the JSON response into `T`.
	///
	/// An empty body decodes as `null`, so `()` and `Option<_>` work for bodiless responses.
	pub async fn send<T>(&self, session: &Session, request: ApiRequest) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let response = self.send_raw(session, request).await?;

		decode_body(&response)
	}

	/// Sends `request` and discards the response body.
	pub async fn execute(&self, session: &Session, request: ApiRequest) -> Result<()> {
		self.send::<IgnoredAny>(session, request).await.map(|_| ())
	}

	/// Sends `request` and returns the raw response once the error policy accepted it.
	pub async fn send_raw(&self, session: &Session, request: ApiRequest) -> Result<HttpResponse> {
		const KIND: FlowKind = FlowKind::ApiRequest;

		let span = FlowSpan::new(KIND, "send");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.dispatch_request(session, request)).await;

		obs::record_flow_outcome(
			KIND,
			if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure },
		);

		result
	}

	async fn dispatch_request(&self, session: &Session, request: ApiRequest) -> Result<HttpResponse> {
		let identity = session.identity().ok_or(Error::AuthenticationRequired)?;
		let resolver = &self.resolver;
		let url = endpoint::build_url(
			&resolver.descriptor.api_base,
			&request.template,
			&request.path_params,
			&request.query,
		)?;
		let audience = request.audience.as_ref().unwrap_or(&resolver.descriptor.default_audience);
		let token = resolver.access_token(identity, audience, &request.scopes).await?;
		let mut builder = Request::builder()
			.method(request.method.clone())
			.uri(url.as_str())
			.header(AUTHORIZATION, token.secret.bearer())
			.header(ACCEPT, "application/json");

		if request.body.is_some() {
			builder = builder.header(CONTENT_TYPE, "application/json");
		}

		let mut http_request =
			builder.body(request.body.unwrap_or_default()).map_err(ConfigError::from)?;

		if let Some(hook) = &request.hooks.on_request {
			hook(&mut http_request)?;
		}

		let response = resolver.dispatch(FlowKind::ApiRequest, http_request).await?;

		if let Some(hook) = &request.hooks.on_response {
			hook(&response);
		}
		if !response.status().is_success() {
			return Err(match &request.hooks.on_response_error {
				Some(hook) => hook(&response),
				None => default_error(&response).into(),
			});
		}

		Ok(response)
	}
}
impl<C, M> Clone for ApiClient<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn clone(&self) -> Self {
		Self { resolver: self.resolver.clone() }
	}
}
impl<C, M> Debug for ApiClient<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient").field("resolver", &self.resolver).finish()
	}
}

/// Builds the [`ApiError`] raised for a non-success response when no hook overrides it.
pub fn default_error(response: &HttpResponse) -> ApiError {
	let status = response.status();
	let payload = serde_json::from_slice::<Value>(response.body()).unwrap_or(Value::Null);
	let message = ["detail", "title"]
		.into_iter()
		.find_map(|field| payload.get(field).and_then(Value::as_str))
		.map(ToOwned::to_owned)
		.or_else(|| status.canonical_reason().map(ToOwned::to_owned))
		.unwrap_or_else(|| fallback_message(status).to_owned());

	ApiError { status: status.as_u16(), message, payload, fatal: status.is_server_error() }
}

fn fallback_message(status: StatusCode) -> &'static str {
	match status.as_u16() {
		401 => "Unauthorized",
		404 => "Not found",
		code if code >= 500 => "Server error",
		_ => "Request failed",
	}
}

fn decode_body<T>(response: &HttpResponse) -> Result<T>
where
	T: DeserializeOwned,
{
	let body = response.body();
	let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) { b"null" } else { body };
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| Error::ResponseParse {
		operation: FlowKind::ApiRequest.as_str(),
		status: response.status().as_u16(),
		source: Arc::new(source),
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn response(status: u16, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() = StatusCode::from_u16(status).expect("Status fixture should be valid.");

		response
	}

	#[test]
	fn problem_detail_wins_over_title() {
		let err = default_error(&response(404, r#"{"title":"Missing","detail":"mailbox not found"}"#));

		assert_eq!(err.status, 404);
		assert_eq!(err.message, "mailbox not found");
		assert!(!err.fatal);
		assert_eq!(err.payload["title"], "Missing");
	}

	#[test]
	fn title_then_reason_then_fallback() {
		assert_eq!(default_error(&response(409, r#"{"title":"Conflict here"}"#)).message, "Conflict here");
		assert_eq!(default_error(&response(409, r#"{"detail":42}"#)).message, "Conflict");

		let unknown = default_error(&response(599, ""));

		assert_eq!(unknown.message, "Server error");
		assert!(unknown.fatal);
		assert_eq!(unknown.payload, Value::Null);
		assert_eq!(fallback_message(StatusCode::from_u16(499).expect("Valid status.")), "Request failed");
		assert_eq!(fallback_message(StatusCode::UNAUTHORIZED), "Unauthorized");
	}

	#[test]
	fn empty_bodies_decode_as_null() {
		decode_body::<()>(&response(204, "")).expect("Empty body should decode as unit.");

		let value: Option<Value> = decode_body(&response(200, "  ")).expect("Blank body should decode.");

		assert!(value.is_none());
	}

	#[test]
	fn undecodable_bodies_report_the_path() {
		#[derive(Debug, Deserialize)]
		struct Mailbox {
			#[allow(dead_code)]
			id: String,
		}

		let err = decode_body::<Mailbox>(&response(200, r#"{"id":7}"#))
			.expect_err("Mismatched body must fail.");

		assert!(matches!(err, Error::ResponseParse { status: 200, .. }));
	}

	#[test]
	fn builder_drops_absent_query_values() {
		let request = ApiRequest::get("/:version/dashboard")
			.path_param("version", "v1")
			.query("mailboxId", Some("m-1"))
			.query::<&str>("aliasId", None)
			.query("number", Some(7));

		assert_eq!(request.query, vec![
			("mailboxId".to_owned(), "m-1".to_owned()),
			("number".to_owned(), "7".to_owned()),
		]);
		assert!(format!("{:?}", request.hooks).contains("on_request: false"));
	}
}
