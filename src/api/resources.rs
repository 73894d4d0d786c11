//! Request builders for the dashboard's API endpoints.
//!
//! Each builder binds the path template and the scope the endpoint demands; bodies stay
//! caller-defined.

// self
use crate::{_prelude::*, api::ApiRequest, auth::ScopeSet};

/// API version segment used by every endpoint.
pub const API_VERSION: &str = "v1";

const MAILBOXES: &str = "/:version/mailboxes";
const MAILBOX: &str = "/:version/mailboxes/:id";
const ALIASES: &str = "/:version/mailboxes/:mailboxId/aliases";
const ALIAS: &str = "/:version/mailboxes/:mailboxId/aliases/:id";
const DASHBOARD: &str = "/:version/dashboard";
const ONBOARD_USER: &str = "/:version/on-board/user";

fn scoped(request: ApiRequest, scope: &str) -> Result<ApiRequest> {
	let scopes = ScopeSet::new([scope]).map_err(crate::error::ConfigError::from)?;

	Ok(request.path_param("version", API_VERSION).scopes(scopes))
}

/// Mailbox endpoints.
pub mod mailboxes {
	// self
	use super::*;

	/// `POST /v1/mailboxes`.
	pub fn create<T>(body: &T) -> Result<ApiRequest>
	where
		T: ?Sized + Serialize,
	{
		scoped(ApiRequest::post(MAILBOXES), "nullbox.mailbox.create")?.json(body)
	}

	/// `GET /v1/mailboxes`.
	pub fn list() -> Result<ApiRequest> {
		scoped(ApiRequest::get(MAILBOXES), "nullbox.mailbox.read-all")
	}

	/// `GET /v1/mailboxes/:id`.
	pub fn get(id: &str) -> Result<ApiRequest> {
		Ok(scoped(ApiRequest::get(MAILBOX), "nullbox.mailbox.read")?.path_param("id", id))
	}

	/// `PATCH /v1/mailboxes/:id`.
	pub fn update<T>(id: &str, body: &T) -> Result<ApiRequest>
	where
		T: ?Sized + Serialize,
	{
		scoped(ApiRequest::patch(MAILBOX), "nullbox.mailbox.update")?.path_param("id", id).json(body)
	}
}

/// Alias endpoints, nested under a mailbox.
pub mod aliases {
	// self
	use super::*;

	/// `POST /v1/mailboxes/:mailboxId/aliases`.
	pub fn create<T>(mailbox_id: &str, body: &T) -> Result<ApiRequest>
	where
		T: ?Sized + Serialize,
	{
		scoped(ApiRequest::post(ALIASES), "nullbox.alias.create")?
			.path_param("mailboxId", mailbox_id)
			.json(body)
	}

	/// `GET /v1/mailboxes/:mailboxId/aliases`.
	pub fn list(mailbox_id: &str) -> Result<ApiRequest> {
		Ok(scoped(ApiRequest::get(ALIASES), "nullbox.alias.read-all")?
			.path_param("mailboxId", mailbox_id))
	}

	/// `GET /v1/mailboxes/:mailboxId/aliases/:id`.
	pub fn get(mailbox_id: &str, id: &str) -> Result<ApiRequest> {
		Ok(scoped(ApiRequest::get(ALIAS), "nullbox.alias.read")?
			.path_param("mailboxId", mailbox_id)
			.path_param("id", id))
	}

	/// `PATCH /v1/mailboxes/:mailboxId/aliases/:id`.
	pub fn update<T>(mailbox_id: &str, id: &str, body: &T) -> Result<ApiRequest>
	where
		T: ?Sized + Serialize,
	{
		scoped(ApiRequest::patch(ALIAS), "nullbox.alias.update")?
			.path_param("mailboxId", mailbox_id)
			.path_param("id", id)
			.json(body)
	}
}

/// Bucket size of dashboard statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DashboardKind {
	/// One bucket per hour.
	Hourly,
	/// One bucket per day.
	Daily,
}
impl Display for DashboardKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(match self {
			Self::Hourly => "Hourly",
			Self::Daily => "Daily",
		})
	}
}

/// Filters for the dashboard statistics endpoint; unset fields are omitted from the query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DashboardQuery {
	/// Restrict to one alias.
	pub alias_id: Option<String>,
	/// Restrict to one mailbox.
	pub mailbox_id: Option<String>,
	/// Number of buckets.
	pub number: Option<u32>,
	/// Bucket size.
	pub kind: Option<DashboardKind>,
}

/// `GET /v1/dashboard`.
pub fn dashboard(query: &DashboardQuery) -> Result<ApiRequest> {
	Ok(scoped(ApiRequest::get(DASHBOARD), "nullbox.dashboard.read-all")?
		.query("aliasId", query.alias_id.as_deref())
		.query("mailboxId", query.mailbox_id.as_deref())
		.query("number", query.number)
		.query("type", query.kind))
}

/// `POST /v1/on-board/user`.
pub fn onboard_user<T>(body: &T) -> Result<ApiRequest>
where
	T: ?Sized + Serialize,
{
	scoped(ApiRequest::post(ONBOARD_USER), "nullbox.user.on-board")?.json(body)
}
