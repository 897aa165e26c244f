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

//! A Channel is the in-memory view of one chain's current head: its hash,
//! length (chain depth) and timestamp, plus the `update` operation that
//! arbitrates a broadcast candidate under the channel's validation rule.
//!
//! `update` serializes per channel behind an internal mutex -- two
//! concurrent broadcasts for the same channel never interleave head
//! advances -- while channels are otherwise independent of one another, so
//! broadcasts on different channels proceed in parallel.

pub mod error;

pub use crate::error::Error;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, info};

use bcsync_cache::Cache;
use bcsync_core::consensus::{meets_difficulty, Difficulty};
use bcsync_core::{Block, Hash, ZERO_HASH};
use bcsync_net::Registry as NetRegistry;

/// The collaborator contract consumed by the BROADCAST handler: a named
/// chain head with an `update` arbitration rule.
pub trait Channel: Send + Sync {
	fn name(&self) -> &str;

	/// The channel's current head hash. `ZERO_HASH` if the channel has no
	/// blocks yet.
	fn head(&self) -> Hash;

	/// The timestamp of the block currently at `head()`.
	fn timestamp(&self) -> u64;

	/// Arbitrates `candidate` (whose content hash is `hash`) against the
	/// current head under the channel's validation rule. On acceptance the
	/// head advances and the new head reference is persisted to `cache`.
	/// Rejection is reported as an `Err` but is not fatal to the caller: the
	/// BROADCAST handler replies with the current head regardless.
	fn update(
		&self,
		cache: &dyn Cache,
		network: Option<&NetRegistry>,
		hash: &Hash,
		candidate: &Block,
	) -> Result<(), Error>;

	/// Loads the channel's head from `cache` (falling back to the network
	/// collaborator is left to a future outbound-sync path; absent here by
	/// design, see the Non-goals on peer discovery/bootstrap). A channel
	/// with no persisted head is left at its zero-valued default: this is
	/// not an error, it's the "no blocks yet" state.
	fn load_head(&self, cache: &dyn Cache, network: Option<&NetRegistry>) -> Result<(), Error>;
}

struct State {
	head: Hash,
	length: u64,
	timestamp: u64,
}

impl State {
	fn empty() -> State {
		State {
			head: ZERO_HASH,
			length: 0,
			timestamp: 0,
		}
	}
}

/// The canonical proof-of-work validation rule: longer chains win, ties at
/// equal length are broken by earlier timestamp, and the candidate's hash
/// must meet the channel's difficulty threshold.
pub struct PowChannel {
	name: String,
	threshold: Difficulty,
	state: Mutex<State>,
}

impl PowChannel {
	pub fn new(name: String, threshold: Difficulty) -> PowChannel {
		PowChannel {
			name,
			threshold,
			state: Mutex::new(State::empty()),
		}
	}
}

impl Channel for PowChannel {
	fn name(&self) -> &str {
		&self.name
	}

	fn head(&self) -> Hash {
		self.state.lock().unwrap().head
	}

	fn timestamp(&self) -> u64 {
		self.state.lock().unwrap().timestamp
	}

	fn update(
		&self,
		cache: &dyn Cache,
		_network: Option<&NetRegistry>,
		hash: &Hash,
		candidate: &Block,
	) -> Result<(), Error> {
		let mut state = self.state.lock().unwrap();

		if candidate.length < state.length {
			return Err(Error::ShorterThanHead(candidate.length, state.length));
		}
		if candidate.length == state.length && candidate.timestamp >= state.timestamp {
			return Err(Error::TieNotWon(candidate.timestamp, state.timestamp));
		}
		if !meets_difficulty(hash, &self.threshold) {
			return Err(Error::BelowDifficulty);
		}

		cache.put_head(&self.name, &candidate.as_head_reference())?;
		state.head = *hash;
		state.length = candidate.length;
		state.timestamp = candidate.timestamp;
		debug!(
			"channel {}: head advanced to {} at length {}",
			self.name, hash, state.length
		);
		Ok(())
	}

	fn load_head(&self, cache: &dyn Cache, _network: Option<&NetRegistry>) -> Result<(), Error> {
		let reference = match cache.get_head(&self.name) {
			Ok(r) => r,
			Err(bcsync_cache::Error::NotFound(_)) => {
				info!("channel {}: no persisted head, starting empty", self.name);
				return Ok(());
			}
			Err(e) => return Err(e.into()),
		};
		let block_hash = Hash::parse(&reference.block_hash).map_err(|e| Error::Corrupt(e.to_string()))?;
		let block = cache.get_block(&block_hash)?;
		let mut state = self.state.lock().unwrap();
		state.head = block_hash;
		state.length = block.length;
		state.timestamp = block.timestamp;
		Ok(())
	}
}

/// Threshold lookup consulted when a channel is opened for the first time.
/// Channels not named in the map fall back to `Difficulty::one()`, i.e. any
/// non-empty hash is accepted -- appropriate for test/demo channels that
/// don't want real proof-of-work.
pub trait ThresholdPolicy: Send + Sync {
	fn threshold_for(&self, channel_name: &str) -> Difficulty;
}

pub struct FixedThresholds {
	thresholds: HashMap<String, Difficulty>,
	default: Difficulty,
}

impl FixedThresholds {
	pub fn new(thresholds: HashMap<String, Difficulty>, default: Difficulty) -> FixedThresholds {
		FixedThresholds { thresholds, default }
	}
}

impl ThresholdPolicy for FixedThresholds {
	fn threshold_for(&self, channel_name: &str) -> Difficulty {
		self.thresholds
			.get(channel_name)
			.cloned()
			.unwrap_or_else(|| self.default.clone())
	}
}

/// The `open(channel-name) -> Channel` factory the BROADCAST handler calls
/// into. Channels are created lazily on first open and cached for the
/// process lifetime; `load_head` runs exactly once, at creation.
pub struct ChannelRegistry {
	channels: Mutex<HashMap<String, Arc<PowChannel>>>,
	thresholds: Box<dyn ThresholdPolicy>,
}

impl ChannelRegistry {
	pub fn new(thresholds: Box<dyn ThresholdPolicy>) -> ChannelRegistry {
		ChannelRegistry {
			channels: Mutex::new(HashMap::new()),
			thresholds,
		}
	}

	pub fn open(&self, channel_name: &str, cache: &dyn Cache) -> Result<Arc<PowChannel>, Error> {
		let mut channels = self.channels.lock().unwrap();
		if let Some(c) = channels.get(channel_name) {
			return Ok(c.clone());
		}
		let threshold = self.thresholds.threshold_for(channel_name);
		let channel = Arc::new(PowChannel::new(channel_name.to_owned(), threshold));
		channel.load_head(cache, None)?;
		channels.insert(channel_name.to_owned(), channel.clone());
		Ok(channel)
	}

	/// Names of every channel opened so far in this process. Used by the
	/// channel-list inspection endpoint; a channel nobody has broadcast to
	/// or queried yet simply isn't listed.
	pub fn names(&self) -> Vec<String> {
		self.channels.lock().unwrap().keys().cloned().collect()
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use bcsync_cache::mem::MemCache;

	fn sample_block(length: u64, timestamp: u64, previous: Hash, nonce: u64) -> Block {
		Block {
			timestamp,
			channel_name: "news".to_owned(),
			length,
			previous: previous.to_vec(),
			miner: "alice".to_owned(),
			nonce,
			entry: Vec::new(),
		}
	}

	#[test]
	fn genesis_candidate_is_accepted_against_empty_channel() {
		let cache = MemCache::new();
		let channel = PowChannel::new("news".to_owned(), Difficulty::one());
		let block = sample_block(1, 100, ZERO_HASH, 0);
		let hash = block.hash();
		channel.update(&cache, None, &hash, &block).unwrap();
		assert_eq!(channel.head(), hash);
		assert_eq!(channel.timestamp(), 100);
	}

	#[test]
	fn shorter_candidate_is_rejected() {
		let cache = MemCache::new();
		let channel = PowChannel::new("news".to_owned(), Difficulty::one());
		let first = sample_block(2, 100, ZERO_HASH, 0);
		channel.update(&cache, None, &first.hash(), &first).unwrap();

		let shorter = sample_block(1, 200, ZERO_HASH, 1);
		let err = channel
			.update(&cache, None, &shorter.hash(), &shorter)
			.unwrap_err();
		assert!(matches!(err, Error::ShorterThanHead(1, 2)));
	}

	#[test]
	fn equal_length_tie_requires_earlier_timestamp() {
		let cache = MemCache::new();
		let channel = PowChannel::new("news".to_owned(), Difficulty::one());
		let first = sample_block(1, 500, ZERO_HASH, 0);
		channel.update(&cache, None, &first.hash(), &first).unwrap();

		let later_tie = sample_block(1, 600, ZERO_HASH, 1);
		assert!(channel
			.update(&cache, None, &later_tie.hash(), &later_tie)
			.is_err());

		let earlier_tie = sample_block(1, 400, ZERO_HASH, 2);
		channel
			.update(&cache, None, &earlier_tie.hash(), &earlier_tie)
			.unwrap();
		assert_eq!(channel.timestamp(), 400);
	}

	#[test]
	fn below_difficulty_is_rejected() {
		let cache = MemCache::new();
		// MAX_TARGET itself requires any nonzero hash divide cleanly above
		// one, so force a threshold no ordinary hash will clear.
		let impossible = Difficulty::from_num(u64::max_value());
		let channel = PowChannel::new("news".to_owned(), impossible);
		let block = sample_block(1, 100, ZERO_HASH, 0);
		let err = channel.update(&cache, None, &block.hash(), &block).unwrap_err();
		assert!(matches!(err, Error::BelowDifficulty));
	}

	#[test]
	fn registry_opens_each_channel_once_and_loads_persisted_head() {
		let cache = MemCache::new();
		let block = sample_block(1, 100, ZERO_HASH, 0);
		cache.put_block(&block.hash(), &block).unwrap();
		cache.put_head("news", &block.as_head_reference()).unwrap();

		let registry = ChannelRegistry::new(Box::new(FixedThresholds::new(
			HashMap::new(),
			Difficulty::one(),
		)));
		let a = registry.open("news", &cache).unwrap();
		assert_eq!(a.head(), block.hash());

		let b = registry.open("news", &cache).unwrap();
		assert!(Arc::ptr_eq(&a, &b));
	}

	#[test]
	fn opening_a_channel_with_a_malformed_persisted_hash_is_rejected() {
		use bcsync_core::Reference;

		let cache = MemCache::new();
		cache
			.put_head(
				"news",
				&Reference {
					timestamp: 1,
					channel_name: "news".to_owned(),
					block_hash: vec![1, 2, 3],
					record_hash: Vec::new(),
				},
			)
			.unwrap();

		let registry = ChannelRegistry::new(Box::new(FixedThresholds::new(
			HashMap::new(),
			Difficulty::one(),
		)));
		let err = registry.open("news", &cache).unwrap_err();
		assert!(matches!(err, Error::Corrupt(_)));
	}
}
