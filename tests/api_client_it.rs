// crates.io
use httpmock::prelude::*;
use serde_json::{Value, json};
// self
use nullbox_access::{
	_preludet::*,
	api::{ApiClient, ApiRequest, DashboardKind, DashboardQuery, RequestHooks, mailboxes},
	auth::Session,
	error::ApiError,
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
};

const ACCESS_PATH: &str = "/v1/tokens/access";

async fn mock_access<'a>(server: &'a MockServer, token: &str) -> httpmock::Mock<'a> {
	let token = token.to_owned();

	server
		.mock_async(move |when, then| {
			when.method(POST).path(ACCESS_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "accessToken": token, "expiresIn": 3600 }));
		})
		.await
}

fn client_for(server: &MockServer) -> ApiClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	let (resolver, _) = build_reqwest_test_resolver(&server.base_url());

	ApiClient::new(Arc::new(resolver))
}

#[tokio::test]
async fn requests_carry_bearer_and_decode_json() -> color_eyre::Result<()> {
	let server = MockServer::start_async().await;
	let access = mock_access(&server, "at-mailbox").await;
	let api = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/v1/mailboxes/mb-1")
				.header("authorization", "Bearer at-mailbox");
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "id": "mb-1", "name": "Inbox" }));
		})
		.await;
	let client = client_for(&server);
	let session = session_for("user-1", None);
	let body: Value = client.send(&session, mailboxes::get("mb-1")?).await?;
	let again: Value = client.send(&session, mailboxes::get("mb-1")?).await?;

	access.assert_calls_async(1).await;
	api.assert_calls_async(2).await;

	assert_eq!(body["name"], "Inbox");
	assert_eq!(again, body);

	Ok(())
}

#[tokio::test]
async fn query_filters_and_json_bodies_are_sent() {
	let server = MockServer::start_async().await;
	let _access = mock_access(&server, "at-dash").await;
	let dashboard = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/v1/dashboard")
				.query_param("mailboxId", "mb-1")
				.query_param("type", "Hourly")
				.query_param("number", "24");
			then.status(200).header("content-type", "application/json").body("[]");
		})
		.await;
	let update = server
		.mock_async(|when, then| {
			when.method(PATCH)
				.path("/v1/mailboxes/mb-1")
				.header("content-type", "application/json")
				.json_body(json!({ "enabled": false }));
			then.status(204);
		})
		.await;
	let client = client_for(&server);
	let session = session_for("user-2", None);
	let query = DashboardQuery {
		mailbox_id: Some("mb-1".into()),
		number: Some(24),
		kind: Some(DashboardKind::Hourly),
		..Default::default()
	};
	let stats: Vec<Value> = client
		.send(&session, nullbox_access::api::dashboard(&query).expect("Request should build."))
		.await
		.expect("Dashboard call should succeed.");

	client
		.execute(
			&session,
			mailboxes::update("mb-1", &json!({ "enabled": false })).expect("Request should build."),
		)
		.await
		.expect("Bodiless responses should decode.");

	dashboard.assert_calls_async(1).await;
	update.assert_calls_async(1).await;

	assert!(stats.is_empty());
}

#[tokio::test]
async fn anonymous_sessions_fail_before_any_exchange() {
	let server = MockServer::start_async().await;
	let access = mock_access(&server, "never").await;
	let client = client_for(&server);
	let err = client
		.execute(&Session::default(), mailboxes::list().expect("Request should build."))
		.await
		.expect_err("Anonymous sessions must be rejected.");

	access.assert_calls_async(0).await;

	assert!(matches!(err, Error::AuthenticationRequired));
	assert_eq!(err.status(), Some(401));
	assert_eq!(client.resolver().metrics.exchanges(), 0);
}

#[tokio::test]
async fn problem_details_shape_api_errors() {
	let server = MockServer::start_async().await;
	let _access = mock_access(&server, "at-err").await;
	let _missing = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/mailboxes/absent");
			then.status(404)
				.header("content-type", "application/problem+json")
				.json_body(json!({ "title": "Not Found", "detail": "mailbox not found" }));
		})
		.await;
	let _down = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/mailboxes");
			then.status(503);
		})
		.await;
	let client = client_for(&server);
	let session = session_for("user-3", None);
	let err = client
		.execute(&session, mailboxes::get("absent").expect("Request should build."))
		.await
		.expect_err("404 must surface as an API error.");
	let Error::Api(api) = &err else {
		panic!("Expected an API error, got {err:?}.");
	};

	assert_eq!((api.status, api.message.as_str(), api.fatal), (404, "mailbox not found", false));
	assert_eq!(api.payload["title"], "Not Found");

	let err = client
		.execute(&session, mailboxes::list().expect("Request should build."))
		.await
		.expect_err("503 must surface as an API error.");

	assert!(err.is_fatal());
	assert_eq!(err.status(), Some(503));
	assert!(matches!(
		err,
		Error::Api(ref api) if api.message == "Service Unavailable" && api.payload == Value::Null
	));
}

#[tokio::test]
async fn hooks_mutate_requests_and_override_error_policy() {
	let server = MockServer::start_async().await;
	let _access = mock_access(&server, "at-hooks").await;
	let traced = server
		.mock_async(|when, then| {
			when.method(GET).path("/v1/mailboxes").header("x-trace", "abc");
			then.status(418).json_body(json!({ "detail": "teapot" }));
		})
		.await;
	let client = client_for(&server);
	let session = session_for("user-4", None);
	let observed = CallCounter::default();
	let seen = observed.clone();
	let observe = RequestHooks::default()
		.on_request(|request| {
			request.headers_mut().insert("x-trace", "abc".parse().expect("Header value is valid."));

			Ok(())
		})
		.on_response(move |_| {
			seen.hit();
		});
	let err = client
		.execute(&session, mailboxes::list().expect("Request should build.").hooks(observe))
		.await
		.expect_err("Without an error hook the default policy applies.");

	assert!(matches!(err, Error::Api(ref api) if api.status == 418 && api.message == "teapot"));
	assert_eq!(observed.get(), 1);

	let replace = RequestHooks::default()
		.on_request(|request| {
			request.headers_mut().insert("x-trace", "abc".parse().expect("Header value is valid."));

			Ok(())
		})
		.on_response_error(|response| {
			Error::Api(ApiError {
				status: response.status().as_u16(),
				message: "custom".into(),
				payload: Value::Null,
				fatal: true,
			})
		});
	let err = client
		.send::<Value>(&session, mailboxes::list().expect("Request should build.").hooks(replace))
		.await
		.expect_err("A non-success response must fail even with an error hook.");

	traced.assert_calls_async(2).await;

	assert_eq!(err.to_string(), "custom");
	assert!(err.is_fatal());
}

#[tokio::test]
async fn custom_templates_and_audiences_resolve_against_the_base() {
	let server = MockServer::start_async().await;
	let access = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(ACCESS_PATH)
				.json_body(json!({ "audience": "billing", "scopes": [] }));
			then.status(200)
				.header("content-type", "application/json")
				.json_body(json!({ "accessToken": "at-billing" }));
		})
		.await;
	let invoice = server
		.mock_async(|when, then| {
			when.method(GET).path("/v2/invoices/inv-9").header("authorization", "Bearer at-billing");
			then.status(200).json_body(json!(null));
		})
		.await;
	let client = client_for(&server);
	let request = ApiRequest::get("/:version/invoices/:id")
		.path_param("version", "v2")
		.path_param("id", "inv-9")
		.audience(
			nullbox_access::auth::Audience::new("billing").expect("Audience fixture should be valid."),
		);
	let body: Option<Value> = client
		.send(&session_for("user-5", None), request)
		.await
		.expect("Custom request should succeed.");

	access.assert_calls_async(1).await;
	invoice.assert_calls_async(1).await;

	assert!(body.is_none());

	let err = client
		.execute(&session_for("user-5", None), ApiRequest::get("/:version/invoices"))
		.await
		.expect_err("Unbound placeholders must fail before dispatch.");

	assert!(matches!(err, Error::Config(_)));
}
