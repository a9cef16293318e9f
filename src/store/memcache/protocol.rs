//! Framing for the subset of the memcached binary protocol used by the counter store.
//!
//! Every packet starts with a 24-byte big-endian header followed by `extras`, `key`, and
//! `value` sections whose lengths are carried in the header.

// crates.io
use bytes::{Buf, BufMut, Bytes, BytesMut};
// self
use crate::_prelude::*;

/// Fixed header length for requests and responses.
pub const HEADER_LEN: usize = 24;
/// Largest response body accepted: the default 1 MiB item limit plus the key and extras
/// sections.
pub const MAX_BODY_LEN: u32 = 1024 * 1024 + u16::MAX as u32 + u8::MAX as u32;
/// Expiration sentinel that makes INCREMENT fail on a missing key instead of creating it.
pub const NO_AUTO_CREATE: u32 = u32::MAX;

const REQUEST_MAGIC: u8 = 0x80;
const RESPONSE_MAGIC: u8 = 0x81;

/// Commands the store issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Opcode {
	/// Fetch a value.
	Get = 0x00,
	/// Store a value unconditionally.
	Set = 0x01,
	/// Add to a numeric value.
	Increment = 0x05,
}

/// Response status codes the client distinguishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
	/// Command succeeded.
	NoError,
	/// Key does not exist.
	KeyNotFound,
	/// Stored value is not numeric (INCREMENT only).
	NonNumeric,
	/// Any other status, kept for error messages.
	Other(u16),
}
impl From<u16> for Status {
	fn from(code: u16) -> Self {
		match code {
			0x0000 => Status::NoError,
			0x0001 => Status::KeyNotFound,
			0x0006 => Status::NonNumeric,
			other => Status::Other(other),
		}
	}
}

/// Malformed or unexpected packets.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ProtocolError {
	/// The first byte was not the response magic.
	#[error("Unexpected magic byte 0x{0:02x}.")]
	BadMagic(u8),
	/// The response answers a different request.
	#[error("Response opaque {got} does not match request {expected}.")]
	OpaqueMismatch {
		/// Opaque value sent with the request.
		expected: u32,
		/// Opaque value echoed by the server.
		got: u32,
	},
	/// Section lengths exceed the body length.
	#[error("Response sections exceed the declared body length.")]
	Truncated,
	/// The declared body is larger than any item the server can hold.
	#[error("Response body of {0} bytes exceeds the {MAX_BODY_LEN}-byte limit.")]
	Oversized(u32),
	/// A value section could not be interpreted.
	#[error("Response value is malformed: {0}.")]
	BadValue(&'static str),
}

/// Request packet ready to be encoded.
#[derive(Debug)]
pub struct Request<'a> {
	/// Command.
	pub opcode: Opcode,
	/// Extras section (command specific).
	pub extras: Vec<u8>,
	/// Key bytes.
	pub key: &'a [u8],
	/// Value bytes.
	pub value: Vec<u8>,
	/// Correlation token echoed by the server.
	pub opaque: u32,
}
impl<'a> Request<'a> {
	/// `GET key`.
	pub fn get(key: &'a str, opaque: u32) -> Self {
		Self { opcode: Opcode::Get, extras: Vec::new(), key: key.as_bytes(), value: Vec::new(), opaque }
	}

	/// `SET key value` with a relative expiration in seconds (`0` means never).
	///
	/// The value is stored as ASCII decimal so the server can increment it.
	pub fn set(key: &'a str, value: u64, expiration: u32, opaque: u32) -> Self {
		let mut extras = Vec::with_capacity(8);

		extras.put_u32(0);
		extras.put_u32(expiration);

		Self {
			opcode: Opcode::Set,
			extras,
			key: key.as_bytes(),
			value: value.to_string().into_bytes(),
			opaque,
		}
	}

	/// `INCREMENT key by 1` without auto-creating a missing key.
	pub fn increment(key: &'a str, opaque: u32) -> Self {
		let mut extras = Vec::with_capacity(20);

		extras.put_u64(1);
		extras.put_u64(0);
		extras.put_u32(NO_AUTO_CREATE);

		Self { opcode: Opcode::Increment, extras, key: key.as_bytes(), value: Vec::new(), opaque }
	}

	/// Serializes the packet.
	pub fn encode(&self) -> BytesMut {
		let body_len = self.extras.len() + self.key.len() + self.value.len();
		let mut buf = BytesMut::with_capacity(HEADER_LEN + body_len);

		buf.put_u8(REQUEST_MAGIC);
		buf.put_u8(self.opcode as u8);
		buf.put_u16(self.key.len() as u16);
		buf.put_u8(self.extras.len() as u8);
		// data type
		buf.put_u8(0);
		// vbucket
		buf.put_u16(0);
		buf.put_u32(body_len as u32);
		buf.put_u32(self.opaque);
		// cas
		buf.put_u64(0);
		buf.put_slice(&self.extras);
		buf.put_slice(self.key);
		buf.put_slice(&self.value);

		buf
	}
}

/// Decoded response header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResponseHeader {
	/// Key section length.
	pub key_len: u16,
	/// Extras section length.
	pub extras_len: u8,
	/// Response status.
	pub status: Status,
	/// Total body length.
	pub body_len: u32,
	/// Correlation token.
	pub opaque: u32,
}
impl ResponseHeader {
	/// Parses the fixed header.
	pub fn decode(mut raw: &[u8]) -> Result<Self, ProtocolError> {
		if raw.len() < HEADER_LEN {
			return Err(ProtocolError::Truncated);
		}

		let magic = raw.get_u8();

		if magic != RESPONSE_MAGIC {
			return Err(ProtocolError::BadMagic(magic));
		}

		let _opcode = raw.get_u8();
		let key_len = raw.get_u16();
		let extras_len = raw.get_u8();
		let _data_type = raw.get_u8();
		let status = Status::from(raw.get_u16());
		let body_len = raw.get_u32();
		let opaque = raw.get_u32();

		if body_len > MAX_BODY_LEN {
			return Err(ProtocolError::Oversized(body_len));
		}
		if usize::from(key_len) + usize::from(extras_len) > body_len as usize {
			return Err(ProtocolError::Truncated);
		}

		Ok(Self { key_len, extras_len, status, body_len, opaque })
	}
}

/// Decoded response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
	/// Response status.
	pub status: Status,
	/// Value section.
	pub value: Bytes,
}
impl Response {
	/// Splits the body using the header's section lengths.
	pub fn from_parts(header: ResponseHeader, mut body: Bytes) -> Result<Self, ProtocolError> {
		if body.len() != header.body_len as usize {
			return Err(ProtocolError::Truncated);
		}

		body.advance(usize::from(header.extras_len) + usize::from(header.key_len));

		Ok(Self { status: header.status, value: body })
	}

	/// Interprets a GET value as an ASCII decimal counter.
	pub fn decimal(&self) -> Result<u64, ProtocolError> {
		std::str::from_utf8(&self.value)
			.ok()
			.and_then(|text| text.trim().parse().ok())
			.ok_or(ProtocolError::BadValue("not an ASCII decimal"))
	}

	/// Interprets an INCREMENT value as a big-endian `u64`.
	pub fn counter(&self) -> Result<u64, ProtocolError> {
		let mut raw = self.value.clone();

		if raw.len() != 8 {
			return Err(ProtocolError::BadValue("counter is not 8 bytes"));
		}

		Ok(raw.get_u64())
	}
}
