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

//! LMDB-backed `Cache`. Blocks are keyed by their 32-byte content hash
//! under the `b:` prefix; channel heads are keyed by channel name under the
//! `h:` prefix; raw entries (e.g. the network registry's peer list) live
//! under whatever prefix the caller supplies to `get_raw`/`put_raw`.

use std::fs;
use std::sync::Arc;

use lmdb_zero as lmdb;
use lmdb_zero::traits::CreateCursor;
use lmdb_zero::LmdbResultExt;
use prost::Message;

use bcsync_core::{Block, Hash, Reference};

use crate::error::{option_to_not_found, Error};
use crate::Cache as CacheTrait;

const BLOCK_PREFIX: u8 = b'b';
const HEAD_PREFIX: u8 = b'h';

fn prefixed(prefix: u8, suffix: &[u8]) -> Vec<u8> {
	let mut k = Vec::with_capacity(suffix.len() + 1);
	k.push(prefix);
	k.extend_from_slice(suffix);
	k
}

/// Opens (creating if necessary) an LMDB environment rooted at `path`.
pub fn new_env(path: &str) -> lmdb::Environment {
	fs::create_dir_all(path).expect("failed to create cache directory");
	unsafe {
		let mut builder = lmdb::EnvBuilder::new().expect("failed to create lmdb env builder");
		builder.set_maxdbs(4).expect("failed to set lmdb maxdbs");
		// 64GB is comfortably more than any single node's block set; mmap
		// pages are allocated lazily so this does not pre-reserve memory.
		builder
			.set_mapsize(64 * 1024 * 1024 * 1024)
			.unwrap_or_else(|e| panic!("unable to size lmdb map: {:?}", e));
		builder
			.open(path, lmdb::open::Flags::empty(), 0o600)
			.expect("failed to open lmdb environment")
	}
}

/// LMDB-backed `Cache`.
pub struct LmdbCache {
	env: Arc<lmdb::Environment>,
	db: Arc<lmdb::Database<'static>>,
}

unsafe impl Send for LmdbCache {}
unsafe impl Sync for LmdbCache {}

impl LmdbCache {
	pub fn open(path: &str) -> Result<LmdbCache, Error> {
		let env = Arc::new(new_env(path));
		let db = Arc::new(lmdb::Database::open(
			env.clone(),
			None,
			&lmdb::DatabaseOptions::new(lmdb::db::CREATE),
		)?);
		Ok(LmdbCache { env, db })
	}

	fn get_raw_inner(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
		let txn = lmdb::ReadTransaction::new(self.env.clone())?;
		let access = txn.access();
		let res: lmdb::error::Result<&[u8]> = access.get(&self.db, key);
		res.map(|v| v.to_vec()).to_opt().map_err(From::from)
	}

	fn put_raw_inner(&self, key: &[u8], value: &[u8]) -> Result<(), Error> {
		let txn = lmdb::WriteTransaction::new(self.env.clone())?;
		{
			let mut access = txn.access();
			access.put(&self.db, key, value, lmdb::put::Flags::empty())?;
		}
		txn.commit()?;
		Ok(())
	}
}

impl CacheTrait for LmdbCache {
	fn get_block(&self, hash: &Hash) -> Result<Block, Error> {
		let key = prefixed(BLOCK_PREFIX, hash.as_bytes());
		let bytes = option_to_not_found(self.get_raw_inner(&key), &format!("block {}", hash))?;
		Block::decode(&bytes[..]).map_err(|e| Error::Decode(hash.to_string(), e.into()))
	}

	fn put_block(&self, hash: &Hash, block: &Block) -> Result<(), Error> {
		let key = prefixed(BLOCK_PREFIX, hash.as_bytes());
		let mut buf = Vec::with_capacity(block.encoded_len());
		block.encode(&mut buf).expect("encoding a Block cannot fail");
		self.put_raw_inner(&key, &buf)
	}

	fn has_block(&self, hash: &Hash) -> Result<bool, Error> {
		let key = prefixed(BLOCK_PREFIX, hash.as_bytes());
		let txn = lmdb::ReadTransaction::new(self.env.clone())?;
		let access = txn.access();
		let res: lmdb::error::Result<&lmdb::Ignore> = access.get(&self.db, &key);
		res.to_opt().map(|o| o.is_some()).map_err(From::from)
	}

	fn get_head(&self, channel: &str) -> Result<Reference, Error> {
		let key = prefixed(HEAD_PREFIX, channel.as_bytes());
		let bytes = option_to_not_found(self.get_raw_inner(&key), &format!("head of channel {}", channel))?;
		Reference::decode(&bytes[..]).map_err(|e| Error::Decode(channel.to_owned(), e.into()))
	}

	fn put_head(&self, channel: &str, reference: &Reference) -> Result<(), Error> {
		let key = prefixed(HEAD_PREFIX, channel.as_bytes());
		let mut buf = Vec::with_capacity(reference.encoded_len());
		reference
			.encode(&mut buf)
			.expect("encoding a Reference cannot fail");
		self.put_raw_inner(&key, &buf)
	}

	fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
		self.get_raw_inner(key)
	}

	fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<(), Error> {
		self.put_raw_inner(key, value)
	}
}

// Referenced so CreateCursor stays linked in for future cursor-based
// iteration (e.g. a future `list_channels` implementation); the trait must
// be in scope wherever `.cursor()` is called on a transaction.
#[allow(dead_code)]
fn _require_create_cursor_in_scope<'e>(txn: &lmdb::ReadTransaction<'e>, db: &lmdb::Database<'e>) {
	let _ = txn.cursor(db);
}

#[cfg(test)]
mod test {
	use super::*;

	fn sample_block(marker: u8) -> Block {
		Block {
			timestamp: 1000,
			channel_name: "news".to_owned(),
			length: 1,
			previous: bcsync_core::ZERO_HASH.to_vec(),
			miner: "alice".to_owned(),
			nonce: marker as u64,
			entry: Vec::new(),
		}
	}

	fn open_tmp() -> (tempfile::TempDir, LmdbCache) {
		let dir = tempfile::tempdir().unwrap();
		let cache = LmdbCache::open(dir.path().to_str().unwrap()).unwrap();
		(dir, cache)
	}

	#[test]
	fn put_then_get_block_round_trips() {
		let (_dir, cache) = open_tmp();
		let block = sample_block(1);
		let hash = block.hash();
		cache.put_block(&hash, &block).unwrap();
		let back = cache.get_block(&hash).unwrap();
		assert_eq!(back, block);
	}

	#[test]
	fn has_block_reflects_presence() {
		let (_dir, cache) = open_tmp();
		let block = sample_block(2);
		let hash = block.hash();
		assert!(!cache.has_block(&hash).unwrap());
		cache.put_block(&hash, &block).unwrap();
		assert!(cache.has_block(&hash).unwrap());
	}

	#[test]
	fn missing_block_is_not_found() {
		let (_dir, cache) = open_tmp();
		let err = cache.get_block(&bcsync_core::ZERO_HASH).unwrap_err();
		assert!(matches!(err, Error::NotFound(_)));
	}

	#[test]
	fn head_round_trips_per_channel() {
		let (_dir, cache) = open_tmp();
		let reference = Reference {
			timestamp: 1000,
			channel_name: "news".to_owned(),
			block_hash: vec![7; 32],
			record_hash: Vec::new(),
		};
		cache.put_head("news", &reference).unwrap();
		let back = cache.get_head("news").unwrap();
		assert_eq!(back, reference);
	}

	#[test]
	fn raw_key_value_round_trips() {
		let (_dir, cache) = open_tmp();
		cache.put_raw(b"peer:127.0.0.1:9000", b"payload").unwrap();
		let back = cache.get_raw(b"peer:127.0.0.1:9000").unwrap();
		assert_eq!(back, Some(b"payload".to_vec()));
		assert_eq!(cache.get_raw(b"peer:absent").unwrap(), None);
	}
}
