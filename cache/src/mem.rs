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

//! An in-memory `Cache`, for unit and integration tests that shouldn't pay
//! for an LMDB environment on disk.

use std::collections::HashMap;
use std::sync::RwLock;

use bcsync_core::{Block, Hash, Reference};

use crate::error::{option_to_not_found, Error};
use crate::Cache as CacheTrait;

#[derive(Default)]
pub struct MemCache {
	blocks: RwLock<HashMap<Hash, Block>>,
	heads: RwLock<HashMap<String, Reference>>,
	raw: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemCache {
	pub fn new() -> MemCache {
		MemCache::default()
	}
}

impl CacheTrait for MemCache {
	fn get_block(&self, hash: &Hash) -> Result<Block, Error> {
		option_to_not_found(
			Ok(self.blocks.read().unwrap().get(hash).cloned()),
			&format!("block {}", hash),
		)
	}

	fn put_block(&self, hash: &Hash, block: &Block) -> Result<(), Error> {
		self.blocks.write().unwrap().insert(hash.clone(), block.clone());
		Ok(())
	}

	fn has_block(&self, hash: &Hash) -> Result<bool, Error> {
		Ok(self.blocks.read().unwrap().contains_key(hash))
	}

	fn get_head(&self, channel: &str) -> Result<Reference, Error> {
		option_to_not_found(
			Ok(self.heads.read().unwrap().get(channel).cloned()),
			&format!("head of channel {}", channel),
		)
	}

	fn put_head(&self, channel: &str, reference: &Reference) -> Result<(), Error> {
		self.heads
			.write()
			.unwrap()
			.insert(channel.to_owned(), reference.clone());
		Ok(())
	}

	fn get_raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
		Ok(self.raw.read().unwrap().get(key).cloned())
	}

	fn put_raw(&self, key: &[u8], value: &[u8]) -> Result<(), Error> {
		self.raw.write().unwrap().insert(key.to_vec(), value.to_vec());
		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn sample_block(nonce: u64) -> Block {
		Block {
			timestamp: 1000,
			channel_name: "news".to_owned(),
			length: 1,
			previous: bcsync_core::ZERO_HASH.to_vec(),
			miner: "alice".to_owned(),
			nonce,
			entry: Vec::new(),
		}
	}

	#[test]
	fn put_then_get_block_round_trips() {
		let cache = MemCache::new();
		let block = sample_block(1);
		let hash = block.hash();
		cache.put_block(&hash, &block).unwrap();
		assert_eq!(cache.get_block(&hash).unwrap(), block);
		assert!(cache.has_block(&hash).unwrap());
	}

	#[test]
	fn missing_block_is_not_found() {
		let cache = MemCache::new();
		assert!(matches!(
			cache.get_block(&bcsync_core::ZERO_HASH).unwrap_err(),
			Error::NotFound(_)
		));
	}

	#[test]
	fn head_and_raw_round_trip_independently_per_key() {
		let cache = MemCache::new();
		let reference = Reference {
			timestamp: 1,
			channel_name: "news".to_owned(),
			block_hash: vec![9; 32],
			record_hash: Vec::new(),
		};
		cache.put_head("news", &reference).unwrap();
		assert_eq!(cache.get_head("news").unwrap(), reference);
		assert!(cache.get_head("other").is_err());

		cache.put_raw(b"k1", b"v1").unwrap();
		assert_eq!(cache.get_raw(b"k1").unwrap(), Some(b"v1".to_vec()));
		assert_eq!(cache.get_raw(b"k2").unwrap(), None);
	}
}
