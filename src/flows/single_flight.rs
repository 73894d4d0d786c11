//! Keyed single-flight registry: at most one in-flight exchange per key.
//!
//! Callers [`enter`](SingleFlight::enter) the registry with a re-check closure that runs under the
//! registry lock, so a value published between the caller's own cache lookup and registration is
//! never missed. Every caller then drives [`Flight::run`]; the first to poll runs the exchange and
//! the rest await its outcome. If that caller is dropped mid-exchange, a waiting caller takes over.
//! Registry entries disappear as soon as the outcome is published or the last caller goes away.

// crates.io
use async_lock::OnceCell;
// self
use crate::_prelude::*;

struct Slot<V> {
	cell: Arc<OnceCell<V>>,
	callers: usize,
}

/// Registry of pending exchanges keyed by `K`, each settling to a `V` shared by all callers.
pub struct SingleFlight<K, V>
where
	K: Eq + Hash,
{
	slots: Mutex<HashMap<K, Slot<V>>>,
}
impl<K, V> SingleFlight<K, V>
where
	K: Clone + Eq + Hash,
{
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self { slots: Mutex::new(HashMap::new()) }
	}

	/// Number of keys with a pending exchange.
	pub fn in_flight(&self) -> usize {
		self.slots.lock().len()
	}

	/// Joins the pending exchange for `key`, if there is one.
	pub fn get(&self, key: &K) -> Option<Flight<'_, K, V>> {
		let mut slots = self.slots.lock();
		let slot = slots.get_mut(key).filter(|slot| !slot.cell.is_initialized())?;

		slot.callers += 1;

		Some(Flight { registry: self, key: key.clone(), cell: slot.cell.clone(), joined: true })
	}

	/// Registers a new exchange for `key`, displacing any previous registration.
	pub fn set(&self, key: &K) -> Flight<'_, K, V> {
		let mut slots = self.slots.lock();

		self.register(&mut slots, key)
	}

	/// Removes the registration for `key`; returns `false` when nothing was registered.
	///
	/// Callers still holding a [`Flight`] for the removed entry keep sharing its outcome.
	pub fn clear(&self, key: &K) -> bool {
		self.slots.lock().remove(key).is_some()
	}

	/// Atomic get-or-set for `key`.
	///
	/// `recheck` runs while the registry lock is held; returning `Some` short-circuits with
	/// [`Entered::Ready`] and registers nothing.
	pub fn enter<T>(&self, key: &K, recheck: impl FnOnce() -> Option<T>) -> Entered<'_, K, V, T> {
		let mut slots = self.slots.lock();

		if let Some(ready) = recheck() {
			return Entered::Ready(ready);
		}

		match slots.get_mut(key) {
			// A settled entry that was not yet deregistered is no longer authoritative.
			Some(slot) if !slot.cell.is_initialized() => {
				slot.callers += 1;

				Entered::Flight(Flight {
					registry: self,
					key: key.clone(),
					cell: slot.cell.clone(),
					joined: true,
				})
			},
			_ => Entered::Flight(self.register(&mut slots, key)),
		}
	}

	fn register(&self, slots: &mut HashMap<K, Slot<V>>, key: &K) -> Flight<'_, K, V> {
		let cell = Arc::new(OnceCell::new());

		slots.insert(key.clone(), Slot { cell: cell.clone(), callers: 1 });

		Flight { registry: self, key: key.clone(), cell, joined: false }
	}
}
impl<K, V> Default for SingleFlight<K, V>
where
	K: Clone + Eq + Hash,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<K, V> Debug for SingleFlight<K, V>
where
	K: Eq + Hash,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SingleFlight").field("in_flight", &self.slots.lock().len()).finish()
	}
}

/// Result of [`SingleFlight::enter`].
pub enum Entered<'a, K, V, T>
where
	K: Eq + Hash,
{
	/// The re-check found a usable value; no exchange is needed.
	Ready(T),
	/// The caller holds a registration for the key.
	Flight(Flight<'a, K, V>),
}

/// One caller's registration for an in-flight exchange.
pub struct Flight<'a, K, V>
where
	K: Eq + Hash,
{
	registry: &'a SingleFlight<K, V>,
	key: K,
	cell: Arc<OnceCell<V>>,
	joined: bool,
}
impl<K, V> Flight<'_, K, V>
where
	K: Eq + Hash,
	V: Clone,
{
	/// `true` when another caller registered the exchange first.
	pub fn joined(&self) -> bool {
		self.joined
	}

	/// Runs `exchange` if nobody else is, otherwise waits for the shared outcome.
	pub async fn run<F, Fut>(self, exchange: F) -> V
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = V>,
	{
		let value = self.cell.get_or_init(exchange).await.clone();

		self.settle();

		value
	}

	fn settle(&self) {
		let mut slots = self.registry.slots.lock();
		let ours = slots.get(&self.key).is_some_and(|slot| Arc::ptr_eq(&slot.cell, &self.cell));

		if ours {
			slots.remove(&self.key);
		}
	}
}
impl<K, V> Drop for Flight<'_, K, V>
where
	K: Eq + Hash,
{
	fn drop(&mut self) {
		let mut slots = self.registry.slots.lock();
		let abandoned = match slots.get_mut(&self.key) {
			Some(slot) if Arc::ptr_eq(&slot.cell, &self.cell) => {
				slot.callers -= 1;

				slot.callers == 0
			},
			_ => false,
		};

		if abandoned {
			slots.remove(&self.key);
		}
	}
}
