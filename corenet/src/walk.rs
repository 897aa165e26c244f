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

//! A generalized chain-walk: starting from a block hash, repeatedly fetch
//! the block and hand it to a caller-supplied visitor, following
//! `previous` pointers toward genesis. The visitor controls when the walk
//! stops, and its "found what I was looking for" outcome is distinguished
//! from a real failure rather than smuggled through the error type.

use bcsync_cache::Cache;
use bcsync_core::{Block, Hash};

/// What the visitor wants to happen next.
pub enum Flow<E> {
	/// Keep following `previous` pointers.
	Continue,
	/// Stop walking; this is a successful outcome (e.g. "found the record").
	Stop,
	/// Stop walking; this is a failure the caller should propagate.
	Fail(E),
}

/// Outcome of a completed walk.
pub enum WalkResult<E> {
	/// The visitor raised `Stop`.
	Found,
	/// The walk reached an empty `previous` pointer (genesis) without the
	/// visitor ever raising `Stop`.
	ReachedGenesis,
	/// The visitor raised `Fail`, or a block along the way could not be
	/// read from the cache.
	Failed(E),
}

/// Walks the chain starting at `start`, calling `visit(hash, &block)` for
/// each block in turn. Reads blocks through `cache`, faulting to `fetch` (if
/// supplied) on a cache miss -- a block pulled this way is opportunistically
/// written back to `cache` before the walk continues, so a second walk over
/// the same gap need not hit the network again. With no `fetch` hook, a
/// cache miss fails the walk, same as any other cache-read failure, which is
/// reported through `E` via `from_cache_error`.
pub fn walk<E, F>(
	cache: &dyn Cache,
	start: &Hash,
	mut visit: F,
	from_cache_error: impl Fn(bcsync_cache::Error) -> E,
	fetch: Option<&dyn Fn(&Hash) -> Option<Block>>,
) -> WalkResult<E>
where
	F: FnMut(&Hash, &Block) -> Flow<E>,
{
	let mut current = *start;
	loop {
		let block = match cache.get_block(&current) {
			Ok(b) => b,
			Err(bcsync_cache::Error::NotFound(what)) => match fetch.and_then(|f| f(&current)) {
				Some(b) => {
					let _ = cache.put_block(&current, &b);
					b
				}
				None => return WalkResult::Failed(from_cache_error(bcsync_cache::Error::NotFound(what))),
			},
			Err(e) => return WalkResult::Failed(from_cache_error(e)),
		};
		match visit(&current, &block) {
			Flow::Continue => {}
			Flow::Stop => return WalkResult::Found,
			Flow::Fail(e) => return WalkResult::Failed(e),
		}
		if block.previous.is_empty() {
			return WalkResult::ReachedGenesis;
		}
		current = match Hash::parse(&block.previous) {
			Ok(h) => h,
			Err(e) => {
				return WalkResult::Failed(from_cache_error(bcsync_cache::Error::Decode(current.to_string(), e)))
			}
		};
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use bcsync_cache::mem::MemCache;

	fn chain_of(n: u64) -> (MemCache, Vec<Hash>) {
		let cache = MemCache::new();
		let mut prev: Vec<u8> = Vec::new();
		let mut hashes = Vec::new();
		for i in 1..=n {
			let block = Block {
				timestamp: i,
				channel_name: "news".to_owned(),
				length: i,
				previous: prev.clone(),
				miner: "alice".to_owned(),
				nonce: i,
				entry: Vec::new(),
			};
			let h = block.hash();
			cache.put_block(&h, &block).unwrap();
			hashes.push(h);
			prev = h.to_vec();
		}
		(cache, hashes)
	}

	#[derive(Debug, PartialEq)]
	struct NeverFails;

	#[test]
	fn walk_reaches_genesis_when_visitor_never_stops() {
		let (cache, hashes) = chain_of(3);
		let result: WalkResult<NeverFails> = walk(
			&cache,
			hashes.last().unwrap(),
			|_, _| Flow::Continue,
			|_| NeverFails,
			None,
		);
		assert!(matches!(result, WalkResult::ReachedGenesis));
	}

	#[test]
	fn walk_stops_when_visitor_finds_target() {
		let (cache, hashes) = chain_of(5);
		let target = hashes[1];
		let result: WalkResult<NeverFails> = walk(
			&cache,
			hashes.last().unwrap(),
			|h, _| if *h == target { Flow::Stop } else { Flow::Continue },
			|_| NeverFails,
			None,
		);
		assert!(matches!(result, WalkResult::Found));
	}

	#[test]
	fn walk_fails_on_missing_ancestor() {
		let cache = MemCache::new();
		let missing = bcsync_core::hash::hash_bytes(b"nowhere");
		let result: WalkResult<String> =
			walk(&cache, &missing, |_, _| Flow::Continue, |e| e.to_string(), None);
		assert!(matches!(result, WalkResult::Failed(_)));
	}

	#[test]
	fn walk_faults_a_missing_ancestor_in_from_the_fetch_hook() {
		let (cache, hashes) = chain_of(3);
		let genesis = *hashes.first().unwrap();
		let genesis_block = cache.get_block(&genesis).unwrap();

		// Simulate a cache that has lost its genesis block: a fresh cache
		// with only the tip blocks re-inserted, so the walk must fault the
		// genesis block in from the network to reach it.
		let sparse = MemCache::new();
		for h in &hashes[1..] {
			sparse.put_block(h, &cache.get_block(h).unwrap()).unwrap();
		}

		let fetch = |h: &Hash| {
			if *h == genesis {
				Some(genesis_block.clone())
			} else {
				None
			}
		};
		let result: WalkResult<NeverFails> = walk(
			&sparse,
			hashes.last().unwrap(),
			|_, _| Flow::Continue,
			|_| NeverFails,
			Some(&fetch),
		);
		assert!(matches!(result, WalkResult::ReachedGenesis));
		// The fetched block was written back, so a second walk needs no fetch hook.
		let replay: WalkResult<NeverFails> =
			walk(&sparse, hashes.last().unwrap(), |_, _| Flow::Continue, |_| NeverFails, None);
		assert!(matches!(replay, WalkResult::ReachedGenesis));
	}

	#[test]
	fn walk_fails_when_fetch_hook_also_misses() {
		let cache = MemCache::new();
		let missing = bcsync_core::hash::hash_bytes(b"nowhere");
		let fetch = |_: &Hash| None;
		let result: WalkResult<String> = walk(
			&cache,
			&missing,
			|_, _| Flow::Continue,
			|e| e.to_string(),
			Some(&fetch),
		);
		assert!(matches!(result, WalkResult::Failed(_)));
	}
}
