//! Thread-safe in-memory [`CounterStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{CounterStore, StoreError, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<String, Entry>>>;

#[derive(Clone, Copy, Debug)]
struct Entry {
	value: u64,
	expires_at: Option<OffsetDateTime>,
}
impl Entry {
	fn is_live(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_none_or(|at| now < at)
	}
}

/// Storage backend that keeps counters in-process and honors TTLs lazily on access.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Drops a key as if its TTL had elapsed.
	pub fn expire(&self, key: &str) {
		self.0.write().remove(key);
	}

	/// Returns the number of live keys.
	pub fn len(&self) -> usize {
		let now = OffsetDateTime::now_utc();

		self.0.read().values().filter(|e| e.is_live(now)).count()
	}

	/// Returns `true` when no live key is stored.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn get_now(map: &StoreMap, key: &str) -> Option<u64> {
		let now = OffsetDateTime::now_utc();
		let mut guard = map.write();

		match guard.get(key) {
			Some(entry) if entry.is_live(now) => Some(entry.value),
			Some(_) => {
				guard.remove(key);

				None
			},
			None => None,
		}
	}

	fn set_now(map: &StoreMap, key: &str, value: u64, ttl: Option<Duration>) {
		let expires_at = ttl.filter(|ttl| ttl.is_positive()).map(|ttl| OffsetDateTime::now_utc() + ttl);

		map.write().insert(key.to_owned(), Entry { value, expires_at });
	}

	fn increment_now(map: &StoreMap, key: &str) -> Result<u64, StoreError> {
		let now = OffsetDateTime::now_utc();
		let mut guard = map.write();

		match guard.get_mut(key) {
			Some(entry) if entry.is_live(now) => {
				entry.value = entry.value.wrapping_add(1);

				Ok(entry.value)
			},
			Some(_) => {
				guard.remove(key);

				Err(StoreError::KeyExpired { key: key.to_owned() })
			},
			None => Err(StoreError::KeyExpired { key: key.to_owned() }),
		}
	}
}
impl CounterStore for MemoryStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<u64>> {
		Box::pin(async move { Ok(Self::get_now(&self.0, key)) })
	}

	fn set<'a>(&'a self, key: &'a str, value: u64, ttl: Option<Duration>) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			Self::set_now(&self.0, key, value, ttl);

			Ok(())
		})
	}

	fn increment<'a>(&'a self, key: &'a str) -> StoreFuture<'a, u64> {
		Box::pin(async move { Self::increment_now(&self.0, key) })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn increment_requires_seeded_key() {
		let store = MemoryStore::default();
		let err = store.increment("k").await.expect_err("Unseeded key should not increment.");

		assert_eq!(err, StoreError::KeyExpired { key: "k".into() });

		store.set("k", 41, None).await.expect("Seeding should succeed.");

		assert_eq!(store.increment("k").await.expect("Seeded key should increment."), 42);
		assert_eq!(store.get("k").await.expect("Read should succeed."), Some(42));
	}

	#[tokio::test]
	async fn elapsed_ttl_reads_as_absent() {
		let store = MemoryStore::default();

		store
			.set("short", 1, Some(Duration::milliseconds(20)))
			.await
			.expect("Seeding should succeed.");
		store.set("forever", 1, None).await.expect("Seeding should succeed.");
		tokio::time::sleep(std::time::Duration::from_millis(60)).await;

		assert_eq!(store.get("short").await.expect("Read should succeed."), None);
		assert!(matches!(store.increment("short").await, Err(StoreError::KeyExpired { .. })));
		assert_eq!(store.get("forever").await.expect("Read should succeed."), Some(1));
		assert_eq!(store.len(), 1);
	}

	#[tokio::test]
	async fn increment_keeps_original_deadline() {
		let store = MemoryStore::default();

		store
			.set("k", 0, Some(Duration::milliseconds(40)))
			.await
			.expect("Seeding should succeed.");
		tokio::time::sleep(std::time::Duration::from_millis(20)).await;
		store.increment("k").await.expect("Live key should increment.");
		tokio::time::sleep(std::time::Duration::from_millis(40)).await;

		assert_eq!(store.get("k").await.expect("Read should succeed."), None);
	}

	#[tokio::test]
	async fn expire_simulates_ttl_elapse() {
		let store = MemoryStore::default();

		store.set("k", 3, None).await.expect("Seeding should succeed.");
		store.expire("k");

		assert!(store.is_empty());
		assert_eq!(store.get("k").await.expect("Read should succeed."), None);
	}
}
