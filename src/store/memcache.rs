//! Networked [`CounterStore`] speaking the memcached binary protocol.
//!
//! Keys are spread over the configured endpoints with a stable hash so every process
//! instance routes a given key to the same node. Each node owns a bounded connection pool;
//! a saturated pool fails the call immediately instead of queueing it, and every round trip
//! is bounded by the configured I/O timeout.

pub mod protocol;

// std
use std::{
	io,
	sync::atomic::{AtomicU32, Ordering},
	time::Duration as StdDuration,
};
// crates.io
use bytes::BytesMut;
use deadpool::{
	Runtime,
	managed::{self, Metrics, Object, Pool, PoolError, RecycleError, RecycleResult},
};
use sha2::{Digest, Sha256};
use tokio::{
	io::{AsyncReadExt, AsyncWriteExt},
	net::TcpStream,
	time,
};
// self
use crate::{
	_prelude::*,
	config::StatusConfig,
	error::ConfigError,
	store::{
		CounterStore, StoreError, StoreFuture,
		memcache::protocol::{HEADER_LEN, ProtocolError, Request, Response, ResponseHeader, Status},
	},
};

/// Counter store backed by one or more memcached-compatible servers.
#[derive(Debug)]
pub struct MemcacheStore {
	nodes: Vec<Node>,
	io_timeout: StdDuration,
	opaque: AtomicU32,
}
impl MemcacheStore {
	/// Creates a store for `host:port` endpoints with up to `pool_size` connections per
	/// endpoint; no connection is opened until first use.
	pub fn new<I>(
		endpoints: I,
		io_timeout: StdDuration,
		pool_size: usize,
	) -> Result<Self, ConfigError>
	where
		I: IntoIterator,
		I::Item: Into<String>,
	{
		if pool_size == 0 {
			return Err(ConfigError::InvalidPoolSize);
		}

		let nodes = endpoints
			.into_iter()
			.map(|endpoint| Node::new(endpoint.into(), io_timeout, pool_size))
			.collect::<Result<Vec<_>, _>>()?;

		if nodes.is_empty() {
			return Err(ConfigError::NoEndpoints);
		}

		Ok(Self { nodes, io_timeout, opaque: AtomicU32::new(0) })
	}

	/// Creates a store from validated configuration.
	pub fn from_config(config: &StatusConfig) -> Result<Self, ConfigError> {
		config.validate()?;

		Self::new(config.endpoints.iter().cloned(), config.io_timeout(), config.pool_size)
	}

	/// Endpoint that owns `key`.
	pub fn endpoint_for(&self, key: &str) -> &str {
		&self.node_for(key).addr
	}

	fn node_for(&self, key: &str) -> &Node {
		if self.nodes.len() == 1 {
			return &self.nodes[0];
		}

		let digest = Sha256::digest(key.as_bytes());
		let mut prefix = [0u8; 8];

		prefix.copy_from_slice(&digest[..8]);

		&self.nodes[(u64::from_be_bytes(prefix) % self.nodes.len() as u64) as usize]
	}

	fn next_opaque(&self) -> u32 {
		self.opaque.fetch_add(1, Ordering::Relaxed)
	}

	async fn call(&self, key: &str, request: Request<'_>) -> Result<Response, CallError> {
		let node = self.node_for(key);
		let frame = request.encode();
		let mut conn = node.pool.get().await?;
		let result = match time::timeout(self.io_timeout, exchange(&mut conn, &frame, request.opaque))
			.await
		{
			Ok(result) => result,
			Err(_) => Err(CallError::Timeout),
		};

		// A failed exchange may leave unread bytes behind; the connection never goes back.
		if result.is_err() {
			drop(Object::take(conn));
		}

		result
	}
}
impl CounterStore for MemcacheStore {
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<u64>> {
		Box::pin(async move {
			let response =
				self.call(key, Request::get(key, self.next_opaque())).await.map_err(StoreError::read)?;

			match response.status {
				Status::NoError => response.decimal().map(Some).map_err(StoreError::read),
				Status::KeyNotFound => Ok(None),
				status => Err(StoreError::read(format!("GET `{key}` answered {status:?}"))),
			}
		})
	}

	fn set<'a>(&'a self, key: &'a str, value: u64, ttl: Option<Duration>) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let request = Request::set(key, value, expiration_secs(ttl), self.next_opaque());
			let response = self.call(key, request).await.map_err(StoreError::write)?;

			match response.status {
				Status::NoError => Ok(()),
				status => Err(StoreError::write(format!("SET `{key}` answered {status:?}"))),
			}
		})
	}

	fn increment<'a>(&'a self, key: &'a str) -> StoreFuture<'a, u64> {
		Box::pin(async move {
			let response = self
				.call(key, Request::increment(key, self.next_opaque()))
				.await
				.map_err(StoreError::write)?;

			match response.status {
				Status::NoError => response.counter().map_err(StoreError::write),
				Status::KeyNotFound => Err(StoreError::KeyExpired { key: key.to_owned() }),
				status => Err(StoreError::write(format!("INCREMENT `{key}` answered {status:?}"))),
			}
		})
	}
}

struct Node {
	addr: String,
	pool: Pool<Connector>,
}
impl Node {
	fn new(addr: String, io_timeout: StdDuration, pool_size: usize) -> Result<Self, ConfigError> {
		let pool = Pool::builder(Connector { addr: addr.clone() })
			.max_size(pool_size)
			.wait_timeout(Some(StdDuration::ZERO))
			.create_timeout(Some(io_timeout))
			.recycle_timeout(Some(io_timeout))
			.runtime(Runtime::Tokio1)
			.build()
			.map_err(|e| ConfigError::PoolBuild { endpoint: addr.clone(), message: e.to_string() })?;

		Ok(Self { addr, pool })
	}
}
impl Debug for Node {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		let status = self.pool.status();

		f.debug_struct("Node")
			.field("addr", &self.addr)
			.field("max_size", &status.max_size)
			.field("size", &status.size)
			.field("available", &status.available)
			.finish()
	}
}

/// Opens and health-checks TCP connections to one endpoint.
#[derive(Debug)]
struct Connector {
	addr: String,
}
impl managed::Manager for Connector {
	type Error = io::Error;
	type Type = TcpStream;

	async fn create(&self) -> Result<TcpStream, io::Error> {
		let stream = TcpStream::connect(&self.addr).await?;

		stream.set_nodelay(true)?;

		Ok(stream)
	}

	async fn recycle(&self, conn: &mut TcpStream, _: &Metrics) -> RecycleResult<io::Error> {
		// An idle connection has nothing to read; EOF or stray bytes mean it is unusable.
		match conn.try_read(&mut [0u8; 1]) {
			Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
			Ok(0) => Err(RecycleError::Backend(io::ErrorKind::UnexpectedEof.into())),
			Ok(_) => Err(RecycleError::Backend(io::Error::new(
				io::ErrorKind::InvalidData,
				"unsolicited bytes on an idle connection",
			))),
			Err(e) => Err(RecycleError::Backend(e)),
		}
	}
}

#[derive(Debug, ThisError)]
enum CallError {
	#[error("I/O failure: {0}")]
	Io(#[from] io::Error),
	#[error("connection pool: {0}")]
	Pool(#[from] PoolError<io::Error>),
	#[error("{0}")]
	Protocol(#[from] ProtocolError),
	#[error("timed out")]
	Timeout,
}

async fn exchange(
	stream: &mut TcpStream,
	frame: &[u8],
	expected: u32,
) -> Result<Response, CallError> {
	stream.write_all(frame).await?;

	let mut raw = [0u8; HEADER_LEN];

	stream.read_exact(&mut raw).await?;

	let header = ResponseHeader::decode(&raw)?;
	let mut body = BytesMut::zeroed(header.body_len as usize);

	stream.read_exact(&mut body).await?;

	if header.opaque != expected {
		return Err(ProtocolError::OpaqueMismatch { expected, got: header.opaque }.into());
	}

	Ok(Response::from_parts(header, body.freeze())?)
}

/// Converts a TTL into the protocol's relative expiration; sub-second TTLs round up.
fn expiration_secs(ttl: Option<Duration>) -> u32 {
	match ttl {
		Some(ttl) if ttl.is_positive() => {
			let secs = ttl.whole_seconds() + i64::from(ttl.subsec_nanoseconds() > 0);

			secs.clamp(1, StatusConfig::MAX_TTL_SECS as i64) as u32
		},
		_ => 0,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn expiration_rounds_up_and_clamps() {
		assert_eq!(expiration_secs(None), 0);
		assert_eq!(expiration_secs(Some(Duration::ZERO)), 0);
		assert_eq!(expiration_secs(Some(Duration::milliseconds(1))), 1);
		assert_eq!(expiration_secs(Some(Duration::seconds(600))), 600);
		assert_eq!(expiration_secs(Some(Duration::days(365))), StatusConfig::MAX_TTL_SECS as u32);
	}

	#[test]
	fn key_placement_is_stable_across_instances() {
		let endpoints = ["10.0.0.1:11211", "10.0.0.2:11211", "10.0.0.3:11211"];
		let a = MemcacheStore::new(endpoints, StdDuration::from_millis(10), 4)
			.expect("Store should accept endpoints.");
		let b = MemcacheStore::new(endpoints, StdDuration::from_millis(10), 4)
			.expect("Store should accept endpoints.");

		for key in ["service:a:on", "service:a:succ", "service:b:fail"] {
			assert_eq!(a.endpoint_for(key), b.endpoint_for(key));
		}
	}

	#[test]
	fn empty_endpoint_list_is_rejected() {
		let err = MemcacheStore::new(Vec::<String>::new(), StdDuration::from_millis(10), 4)
			.expect_err("Empty endpoint list should be rejected.");

		assert!(matches!(err, ConfigError::NoEndpoints));

		let err = MemcacheStore::new(["10.0.0.1:11211"], StdDuration::from_millis(10), 0)
			.expect_err("Zero-sized pools should be rejected.");

		assert!(matches!(err, ConfigError::InvalidPoolSize));
	}

	#[tokio::test]
	async fn unreachable_endpoint_fails_fast() {
		// Reserved TEST-NET-1 address; connect either times out or is refused.
		let store = MemcacheStore::new(["192.0.2.1:11211"], StdDuration::from_millis(50), 4)
			.expect("Store should accept endpoint.");

		assert!(matches!(store.get("k").await, Err(StoreError::Read { .. })));
		assert!(matches!(store.set("k", 1, None).await, Err(StoreError::Write { .. })));
		assert!(matches!(store.increment("k").await, Err(StoreError::Write { .. })));
	}
}
