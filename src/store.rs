//! Counter-store contract and built-in implementations.
//!
//! The store is a shared, TTL-capable key-value cache holding integer values. It offers
//! single-key atomicity only: callers touching more than one key must tolerate partial
//! success.

#[cfg(feature = "memcache")] pub mod memcache;
pub mod memory;

#[cfg(feature = "memcache")] pub use memcache::MemcacheStore;
pub use memory::MemoryStore;

// self
use crate::_prelude::*;

/// Boxed future returned by [`CounterStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by counter stores.
///
/// Implementations must fail fast on contention or transport trouble rather than queue.
pub trait CounterStore
where
	Self: Send + Sync,
{
	/// Reads a value; `None` covers both "never written" and "TTL elapsed".
	///
	/// Fails with [`StoreError::Read`] on transport failure.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<u64>>;

	/// Writes a value, optionally expiring after `ttl`; `None` never expires.
	///
	/// Fails with [`StoreError::Write`] on transport failure.
	fn set<'a>(&'a self, key: &'a str, value: u64, ttl: Option<Duration>) -> StoreFuture<'a, ()>;

	/// Atomically adds one to an existing value and returns the new value.
	///
	/// Fails with [`StoreError::KeyExpired`] when the key is absent and with
	/// [`StoreError::Write`] on transport failure. The key's TTL is left untouched.
	fn increment<'a>(&'a self, key: &'a str) -> StoreFuture<'a, u64>;
}

/// Error type produced by [`CounterStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Reading from the store failed.
	#[error("Counter store read failed: {message}.")]
	Read {
		/// Human-readable error payload.
		message: String,
	},
	/// Writing to the store failed.
	#[error("Counter store write failed: {message}.")]
	Write {
		/// Human-readable error payload.
		message: String,
	},
	/// The incremented key does not exist (TTL elapsed or never seeded).
	#[error("Counter `{key}` has expired.")]
	KeyExpired {
		/// Key that was missing.
		key: String,
	},
}
impl StoreError {
	/// Builds a [`StoreError::Read`].
	pub fn read(message: impl Display) -> Self {
		Self::Read { message: message.to_string() }
	}

	/// Builds a [`StoreError::Write`].
	pub fn write(message: impl Display) -> Self {
		Self::Write { message: message.to_string() }
	}
}

/// The three store keys backing one service record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ServiceField {
	/// Enabled flag (`1`/`0`), never expires.
	Enabled,
	/// Success counter, expires after the configured TTL.
	Successes,
	/// Failure counter, expires after the configured TTL.
	Failures,
}
impl ServiceField {
	/// Returns the key suffix.
	pub const fn as_str(self) -> &'static str {
		match self {
			ServiceField::Enabled => "on",
			ServiceField::Successes => "succ",
			ServiceField::Failures => "fail",
		}
	}
}

/// Builds the store key for one field of a service record: `service:<name>:<field>`.
pub fn service_key(service: &str, field: ServiceField) -> String {
	format!("service:{service}:{}", field.as_str())
}
