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

//! The Cache collaborator: a content-addressed block store keyed by hash,
//! plus a per-channel head reference. No concurrency contract beyond
//! map-safe operations is required of implementors; the LMDB-backed
//! implementation here is safe for concurrent reads and writes because LMDB
//! itself serializes writers and gives readers a consistent snapshot.

pub mod error;
pub mod lmdb_store;
pub mod mem;

pub use crate::error::Error;

use bcsync_core::{Block, Hash, Reference};

/// Content-addressed block store keyed by hash, plus a per-channel head
/// reference. Implementations must be `Send + Sync`: handlers share one
/// instance across every connection thread.
pub trait Cache: Send + Sync {
	/// Fetches a block previously stored under `hash`.
	fn get_block(&self, hash: &Hash) -> Result<Block, Error>;

	/// Stores `block` under `hash`. Callers are responsible for having
	/// verified `hash == block.hash()` before calling this -- the Cache
	/// itself does not recompute it, to avoid hashing twice on the hot
	/// broadcast path where the caller already has the hash in hand.
	fn put_block(&self, hash: &Hash, block: &Block) -> Result<(), Error>;

	/// True if a block is already stored under `hash`, without paying the
	/// cost of deserializing it.
	fn has_block(&self, hash: &Hash) -> Result<bool, Error>;

	/// Fetches the current head reference for `channel`.
	fn get_head(&self, channel: &str) -> Result<Reference, Error>;

	/// Stores `reference` as the current head for `channel`.
	fn put_head(&self, channel: &str, reference: &Reference) -> Result<(), Error>;

	/// Raw key/value access under a private prefix, reused by collaborators
	/// that need simple persistence (e.g. the network registry's peer
	/// list) without defining their own on-disk format.
	fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error>;

	/// Writes a raw key/value pair. See `get_raw`.
	fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<(), Error>;
}
