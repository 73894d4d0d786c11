// std
use std::time::Duration as StdDuration;
// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse, http::StatusCode,
};
use serde_json::json;
// self
use nullbox_access::{
	_preludet::*,
	auth::{Audience, ScopeSet},
	error::TransportError,
	flows::{ResolverConfig, TokenResolver},
	http::{HttpTransport, ResponseMetadata, ResponseMetadataSlot},
	oauth::TransportErrorMapper,
	obs::FlowKind,
};

#[derive(Clone, Default)]
struct FakeTransport {
	calls: CallCounter,
	fail: bool,
}
impl HttpTransport for FakeTransport {
	type Handle = FakeHandle;
	type TransportError = std::io::Error;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		FakeHandle { transport: self.clone(), slot }
	}
}

struct FakeHandle {
	transport: FakeTransport,
	slot: ResponseMetadataSlot,
}
impl<'c> AsyncHttpClient<'c> for FakeHandle {
	type Error = HttpClientError<std::io::Error>;
	type Future = Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			let n = self.transport.calls.hit();

			assert_eq!(request.uri().path(), "/v1/tokens/access");

			tokio::time::sleep(StdDuration::from_millis(20)).await;

			if self.transport.fail {
				return Err(HttpClientError::Io(std::io::Error::other("connection reset")));
			}

			let body = json!({ "accessToken": format!("fake-{n}"), "expiresIn": 600 }).to_string();
			let mut response = HttpResponse::new(body.into_bytes());

			*response.status_mut() = StatusCode::OK;
			self.slot.store(ResponseMetadata { status: Some(200) });

			Ok(response)
		})
	}
}

struct FakeMapper;
impl TransportErrorMapper<std::io::Error> for FakeMapper {
	fn map_transport_error(
		&self,
		flow: FlowKind,
		error: HttpClientError<std::io::Error>,
	) -> Error {
		TransportError::network(flow.as_str(), std::io::Error::other(error.to_string())).into()
	}
}

fn resolver(transport: FakeTransport) -> Arc<TokenResolver<FakeTransport, FakeMapper>> {
	Arc::new(TokenResolver::with_http_client(
		test_descriptor("https://api.nullbox.test"),
		ResolverConfig::default(),
		transport,
		Arc::new(FakeMapper),
	))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn spawned_callers_share_one_exchange() {
	let transport = FakeTransport::default();
	let resolver = resolver(transport.clone());
	let identity = identity_token("user-mt", OffsetDateTime::now_utc());
	let audience = Audience::new("nullbox").expect("Audience fixture should be valid.");
	let scope = ScopeSet::new(["nullbox.dashboard.read-all"]).expect("Scope fixture should be valid.");
	let tasks = (0..16)
		.map(|_| {
			let (resolver, identity, audience, scope) =
				(resolver.clone(), identity.clone(), audience.clone(), scope.clone());

			tokio::spawn(async move { resolver.access_token(&identity, &audience, &scope).await })
		})
		.collect::<Vec<_>>();

	for task in tasks {
		let token = task
			.await
			.expect("Task should not panic.")
			.expect("Every caller should receive a token.");

		assert_eq!(token.expose(), "fake-1");
	}

	assert_eq!(transport.calls.get(), 1);
	assert_eq!(resolver.in_flight(), 0);
}

#[tokio::test]
async fn transport_failures_pass_through_the_mapper() {
	let transport = FakeTransport { fail: true, ..Default::default() };
	let resolver = resolver(transport.clone());
	let identity = identity_token("user-down", OffsetDateTime::now_utc());
	let audience = Audience::new("nullbox").expect("Audience fixture should be valid.");
	let scope = ScopeSet::default();
	let (a, b) = tokio::join!(
		resolver.access_token(&identity, &audience, &scope),
		resolver.access_token(&identity, &audience, &scope),
	);

	for result in [a, b] {
		let err = result.expect_err("Transport failures must surface.");

		assert!(matches!(
			err,
			Error::Transport(TransportError::Network { operation: "access_request", .. })
		));
	}

	assert_eq!(transport.calls.get(), 1);
	assert_eq!(resolver.metrics.failures(), 1);
}
