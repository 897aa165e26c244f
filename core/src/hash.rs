// Copyright 2016 The bcsync Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Content hashing for blocks and records.
//!
//! Every construct that must be content-addressable hashes its canonical
//! (protobuf) serialization with Blake2b-256. This is the same hash that is
//! used as the Cache key, so `hash(serialize(x)) == stored-key(x)` is an
//! invariant the whole crate is built to preserve.

use std::fmt;

use blake2_rfc::blake2b::blake2b;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A 32-byte content hash.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

/// The hash of an empty byte string; used as the `previous` field of a
/// genesis block, meaning "no ancestor".
pub const ZERO_HASH: Hash = Hash([0; 32]);

impl Hash {
	/// Builds a `Hash` from a slice, if it is exactly 32 bytes long.
	pub fn from_vec(v: &[u8]) -> Option<Hash> {
		if v.len() != 32 {
			return None;
		}
		let mut a = [0u8; 32];
		a.copy_from_slice(v);
		Some(Hash(a))
	}

	/// Parses a hash field read off the wire or out of storage, rejecting
	/// anything other than exactly 32 bytes as a framing/integrity error.
	/// Every call site that hashes attacker- or peer-supplied bytes must go
	/// through this rather than `from_vec` directly.
	pub fn parse(v: &[u8]) -> Result<Hash, Error> {
		Hash::from_vec(v).ok_or_else(|| Error::BadHashLength(v.len()))
	}

	/// True if `v` encodes the zero-length "no ancestor" marker used on the
	/// wire for a genesis block's previous-hash field.
	pub fn is_empty_ref(v: &[u8]) -> bool {
		v.is_empty()
	}

	pub fn to_vec(&self) -> Vec<u8> {
		self.0.to_vec()
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

impl fmt::Display for Hash {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		for b in self.0.iter() {
			write!(f, "{:02x}", b)?;
		}
		Ok(())
	}
}

impl fmt::Debug for Hash {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "Hash({})", self)
	}
}

/// Types that derive their identity from the hash of their own
/// serialization.
pub trait Hashed {
	fn hash(&self) -> Hash;
}

impl Hashed for [u8] {
	fn hash(&self) -> Hash {
		hash_bytes(self)
	}
}

/// Hashes an arbitrary byte slice with the protocol's content hash
/// (Blake2b, 32-byte digest).
pub fn hash_bytes(data: &[u8]) -> Hash {
	let digest = blake2b(32, &[], data);
	Hash::from_vec(digest.as_bytes()).expect("blake2b(32, ..) always yields a 32-byte digest")
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn same_bytes_same_hash() {
		let a = hash_bytes(b"hello");
		let b = hash_bytes(b"hello");
		assert_eq!(a, b);
	}

	#[test]
	fn different_bytes_different_hash() {
		let a = hash_bytes(b"hello");
		let b = hash_bytes(b"hellp");
		assert_ne!(a, b);
	}

	#[test]
	fn display_is_lowercase_hex() {
		let h = hash_bytes(b"");
		let s = format!("{}", h);
		assert_eq!(s.len(), 64);
		assert!(s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
	}

	#[test]
	fn from_vec_rejects_wrong_length() {
		assert!(Hash::from_vec(&[0u8; 31]).is_none());
		assert!(Hash::from_vec(&[0u8; 33]).is_none());
		assert!(Hash::from_vec(&[]).is_none());
		assert!(Hash::from_vec(&[0u8; 32]).is_some());
	}

	#[test]
	fn parse_reports_the_offending_length() {
		let err = Hash::parse(&[1, 2, 3]).unwrap_err();
		assert!(matches!(err, Error::BadHashLength(3)));
	}
}
