//! Two-tier access-token cache: an in-process hot tier plus a per-session durable tier.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Audience, ScopeSet, Subject},
	store::{SessionStorage, StoreError},
};

const KEY_PREFIX: &str = "access";
const VALUE_SUFFIX: &str = ":v";
const EXPIRY_SUFFIX: &str = ":e";

/// Source of the current instant.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Current UTC instant.
	fn now(&self) -> OffsetDateTime;
}

/// [`Clock`] backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Identity of one cached access token: `access:<audience>:<scopes>:<subject>`.
///
/// Scopes come from a normalized [`ScopeSet`], so request order and duplicates never produce a
/// different key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);
impl CacheKey {
	/// Builds the key for `audience` + `scope` on behalf of `subject`.
	pub fn new(audience: &Audience, scope: &ScopeSet, subject: &Subject) -> Self {
		Self(format!("{KEY_PREFIX}:{audience}:{}:{subject}", scope.normalized()))
	}

	/// String form of the key.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Durable item holding the token value.
	pub fn value_key(&self) -> String {
		format!("{}{VALUE_SUFFIX}", self.0)
	}

	/// Durable item holding the expiry as unix milliseconds.
	pub fn expiry_key(&self) -> String {
		format!("{}{EXPIRY_SUFFIX}", self.0)
	}
}
impl Debug for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "CacheKey({})", self.0)
	}
}
impl Display for CacheKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Process-wide tier; entries are evicted lazily when read after expiry.
#[derive(Debug, Default)]
pub struct HotCache(RwLock<HashMap<CacheKey, AccessToken>>);
impl HotCache {
	/// Returns the cached token when it is still valid at `now`.
	pub fn get_fresh(&self, key: &CacheKey, now: OffsetDateTime) -> Option<AccessToken> {
		match self.0.read().get(key) {
			Some(token) if token.is_valid_at(now) => return Some(token.clone()),
			Some(_) => {},
			None => return None,
		}

		let mut guard = self.0.write();

		// Another writer may have replaced the stale entry between the two locks.
		match guard.get(key) {
			Some(token) if token.is_valid_at(now) => Some(token.clone()),
			Some(_) => {
				guard.remove(key);

				None
			},
			None => None,
		}
	}

	/// Stores `token` under `key`, replacing any previous entry.
	pub fn insert(&self, key: CacheKey, token: AccessToken) {
		self.0.write().insert(key, token);
	}

	/// Drops the entry for `key`.
	pub fn remove(&self, key: &CacheKey) -> Option<AccessToken> {
		self.0.write().remove(key)
	}

	/// Number of entries, expired ones included.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when the tier holds nothing.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Drops every entry.
	pub fn clear(&self) {
		self.0.write().clear();
	}
}

/// Session-scoped tier persisted as two string items per key.
#[derive(Clone)]
pub struct DurableTier(Arc<dyn SessionStorage>);
impl DurableTier {
	/// Wraps a session storage backend.
	pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
		Self(storage)
	}

	/// Reads the token for `key`.
	///
	/// Missing halves, unparsable expiries, and tokens no longer valid at `now` all read as a miss.
	pub async fn read(
		&self,
		key: &CacheKey,
		now: OffsetDateTime,
	) -> Result<Option<AccessToken>, StoreError> {
		let Some(value) = self.0.get_item(&key.value_key()).await? else {
			return Ok(None);
		};
		let Some(expires_at) = self.0.get_item(&key.expiry_key()).await?.and_then(|raw| parse_millis(&raw))
		else {
			return Ok(None);
		};
		let token = AccessToken::new(value, expires_at);

		Ok(token.is_valid_at(now).then_some(token))
	}

	/// Writes `token` under `key`.
	pub async fn write(&self, key: &CacheKey, token: &AccessToken) -> Result<(), StoreError> {
		self.0.set_item(&key.value_key(), token.expose().to_owned()).await?;
		self.0.set_item(&key.expiry_key(), format_millis(token.expires_at)).await
	}

	/// Removes both items for `key`.
	pub async fn remove(&self, key: &CacheKey) -> Result<(), StoreError> {
		self.0.remove_item(&key.value_key()).await?;
		self.0.remove_item(&key.expiry_key()).await
	}
}
impl Debug for DurableTier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("DurableTier(..)")
	}
}

fn format_millis(instant: OffsetDateTime) -> String {
	(instant.unix_timestamp_nanos() / 1_000_000).to_string()
}

fn parse_millis(raw: &str) -> Option<OffsetDateTime> {
	let millis = raw.trim().parse::<i128>().ok()?;

	OffsetDateTime::from_unix_timestamp_nanos(millis.checked_mul(1_000_000)?).ok()
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::store::MemoryStore;

	fn key(scopes: &[&str]) -> CacheKey {
		CacheKey::new(
			&Audience::new("nullbox").expect("Audience fixture should be valid."),
			&ScopeSet::new(scopes.iter().copied()).expect("Scope fixture should be valid."),
			&Subject::new("user-1").expect("Subject fixture should be valid."),
		)
	}

	#[test]
	fn key_ignores_scope_order_and_duplicates() {
		let lhs = key(&["nullbox.mailbox.read", "nullbox.alias.read"]);
		let rhs = key(&["nullbox.alias.read", "nullbox.mailbox.read", "nullbox.alias.read"]);

		assert_eq!(lhs, rhs);
		assert_eq!(lhs.as_str(), "access:nullbox:nullbox.alias.read nullbox.mailbox.read:user-1");
		assert_eq!(lhs.value_key(), format!("{lhs}:v"));
		assert_eq!(lhs.expiry_key(), format!("{lhs}:e"));
	}

	#[test]
	fn hot_tier_evicts_expired_entries_on_read() {
		let cache = HotCache::default();
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let key = key(&["nullbox.mailbox.read"]);

		cache.insert(key.clone(), AccessToken::new("token", now + Duration::minutes(1)));

		assert!(cache.get_fresh(&key, now).is_some());
		assert!(cache.get_fresh(&key, now + Duration::minutes(1)).is_none());
		assert!(cache.is_empty(), "Expired entry should be evicted by the failed read.");
	}

	#[tokio::test]
	async fn durable_tier_round_trips_millisecond_expiry() {
		let storage = Arc::new(MemoryStore::default());
		let tier = DurableTier::new(storage.clone());
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let key = key(&["nullbox.mailbox.read"]);
		let token = AccessToken::new("token", now + Duration::milliseconds(90_500));

		tier.write(&key, &token).await.expect("Durable write should succeed.");

		assert_eq!(storage.snapshot(&key.value_key()).as_deref(), Some("token"));
		assert_eq!(storage.snapshot(&key.expiry_key()).as_deref(), Some("1735689690500"));
		assert_eq!(tier.read(&key, now).await.expect("Durable read should succeed."), Some(token));
		assert_eq!(
			tier.read(&key, now + Duration::milliseconds(90_500))
				.await
				.expect("Durable read should succeed."),
			None
		);
	}

	#[tokio::test]
	async fn durable_tier_treats_partial_or_corrupt_items_as_miss() {
		let storage = Arc::new(MemoryStore::default());
		let tier = DurableTier::new(storage.clone());
		let now = macros::datetime!(2025-01-01 00:00 UTC);
		let key = key(&["nullbox.mailbox.read"]);

		storage.set_item(&key.value_key(), "token".into()).await.expect("Write should succeed.");

		assert_eq!(tier.read(&key, now).await.expect("Read should succeed."), None);

		storage.set_item(&key.expiry_key(), "soon".into()).await.expect("Write should succeed.");

		assert_eq!(tier.read(&key, now).await.expect("Read should succeed."), None);

		tier.remove(&key).await.expect("Remove should succeed.");

		assert!(storage.is_empty());
	}
}
