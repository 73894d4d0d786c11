//! Access-token broker for the nullbox dashboard: trade a session's identity token for
//! audience-scoped access tokens, cache them across two tiers, coalesce concurrent exchanges,
//! and decorate outgoing API calls with bearer credentials.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod cache;
pub mod error;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for unit and integration tests; enabled via `cfg(test)`
	//! or the `test` feature.

	pub use crate::_prelude::*;

	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
	// self
	use crate::{
		auth::{IdentityToken, ProviderId, Session},
		cache::Clock,
		flows::{ResolverConfig, TokenResolver},
		http::ReqwestHttpClient,
		oauth::ReqwestTransportErrorMapper,
		provider::ProviderDescriptor,
		store::MemoryStore,
	};

	/// Resolver type alias used by reqwest-backed tests.
	pub type ReqwestTestResolver = TokenResolver<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Builds a reqwest HTTP client that tolerates the self-signed certificates a local mock
	/// server may present.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a descriptor whose API base (and refresh endpoint) point at `base`.
	pub fn test_descriptor(base: &str) -> ProviderDescriptor {
		let base = Url::parse(base).expect("Failed to parse test API base URL.");
		let refresh = base.join("/oauth2/token").expect("Failed to derive test refresh endpoint.");

		ProviderDescriptor::builder(
			ProviderId::new("entraexternal").expect("Failed to build test provider identifier."),
		)
		.api_base(base)
		.refresh_endpoint(refresh)
		.client_id("dashboard-client")
		.build()
		.expect("Failed to build test provider descriptor.")
	}

	/// Constructs an interactive [`TokenResolver`] backed by an in-memory durable tier and the
	/// reqwest transport used across integration tests.
	pub fn build_reqwest_test_resolver(base: &str) -> (ReqwestTestResolver, Arc<MemoryStore>) {
		let storage = Arc::new(MemoryStore::default());
		let resolver = TokenResolver::with_http_client(
			test_descriptor(base),
			ResolverConfig::default(),
			test_reqwest_http_client(),
			Arc::new(ReqwestTransportErrorMapper),
		)
		.with_durable_store(storage.clone());

		(resolver, storage)
	}

	/// Encodes an unsigned three-segment token carrying `claims` as its payload.
	pub fn unsigned_token(claims: serde_json::Value) -> String {
		let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
		let payload = URL_SAFE_NO_PAD.encode(claims.to_string());

		format!("{header}.{payload}.signature")
	}

	/// Identity token for `sub` that expires one hour after `now`.
	pub fn identity_token(sub: &str, now: OffsetDateTime) -> IdentityToken {
		let exp = (now + Duration::hours(1)).unix_timestamp();

		IdentityToken::new(unsigned_token(serde_json::json!({ "sub": sub, "exp": exp })))
	}

	/// Session holding an identity token (and optional refresh token) for `sub`.
	pub fn session_for(sub: &str, refresh_token: Option<&str>) -> Session {
		Session::authenticated(identity_token(sub, OffsetDateTime::now_utc()), refresh_token)
	}

	/// Clock that only moves when told to.
	#[derive(Debug)]
	pub struct ManualClock(Mutex<OffsetDateTime>);
	impl ManualClock {
		/// Starts the clock at `now`.
		pub fn new(now: OffsetDateTime) -> Self {
			Self(Mutex::new(now))
		}

		/// Moves the clock forward by `delta`.
		pub fn advance(&self, delta: Duration) {
			*self.0.lock() += delta;
		}

		/// Pins the clock to `instant`.
		pub fn set(&self, instant: OffsetDateTime) {
			*self.0.lock() = instant;
		}
	}
	impl Clock for ManualClock {
		fn now(&self) -> OffsetDateTime {
			*self.0.lock()
		}
	}

	/// Shared call counter for fake transports.
	#[derive(Clone, Debug, Default)]
	pub struct CallCounter(Arc<AtomicUsize>);
	impl CallCounter {
		/// Records one call and returns the new total.
		pub fn hit(&self) -> usize {
			self.0.fetch_add(1, Ordering::SeqCst) + 1
		}

		/// Number of recorded calls.
		pub fn get(&self) -> usize {
			self.0.load(Ordering::SeqCst)
		}
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::Hash,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
