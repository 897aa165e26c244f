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

//! The network registry: the mutable set of peers the node knows about,
//! admitted through the CONNECT port, consulted by GET\_BLOCK's fallback
//! fetch and by BROADCAST's gap-fill dialogue.
//!
//! Peers are identified by the address string they connected from (or were
//! told about). Each carries an error counter, incremented on a failed
//! outbound dial or fetch and reset on success; nothing currently acts on
//! the counter automatically, it's exposed for an operator or a future
//! banning policy to read.

pub mod error;

pub use crate::error::Error;

use std::collections::HashMap;
use std::net::{SocketAddr, TcpStream};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use bcsync_cache::Cache;
use bcsync_core::framing::{read_framed, write_framed};
use bcsync_core::{Block, Hash, Reference};

const PERSIST_KEY: &[u8] = b"net:peers";

/// A known peer and its bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Peer {
	pub address: String,
	pub error_count: u64,
}

/// The mutable set of known peers, with dial/get timeouts used by the
/// outbound fetch paths.
pub struct Registry {
	cache: Arc<dyn Cache>,
	peers: RwLock<HashMap<String, Peer>>,
	dial_timeout: Duration,
	get_timeout: Duration,
}

impl Registry {
	/// Loads the persisted peer list (if any) from `cache` and builds a
	/// registry with the given outbound timeouts.
	pub fn new(cache: Arc<dyn Cache>, dial_timeout: Duration, get_timeout: Duration) -> Result<Registry, Error> {
		let peers = match cache.get_raw(PERSIST_KEY)? {
			Some(bytes) => {
				let list: Vec<Peer> = serde_json::from_slice(&bytes)
					.map_err(|e| Error::Corrupt(e.to_string()))?;
				list.into_iter().map(|p| (p.address.clone(), p)).collect()
			}
			None => HashMap::new(),
		};
		Ok(Registry {
			cache,
			peers: RwLock::new(peers),
			dial_timeout,
			get_timeout,
		})
	}

	pub fn dial_timeout(&self) -> Duration {
		self.dial_timeout
	}

	pub fn get_timeout(&self) -> Duration {
		self.get_timeout
	}

	/// Admits `address` to the registry, if not already known. A no-op for
	/// an address already present (its error counter is left untouched).
	pub fn add_peer(&self, address: &str) -> Result<(), Error> {
		{
			let peers = self.peers.read().unwrap();
			if peers.contains_key(address) {
				return Ok(());
			}
		}
		let mut peers = self.peers.write().unwrap();
		peers.entry(address.to_owned()).or_insert_with(|| Peer {
			address: address.to_owned(),
			error_count: 0,
		});
		self.persist(&peers)
	}

	/// Looks up a known peer by address, if any.
	pub fn peer_for_address(&self, address: &str) -> Option<Peer> {
		self.peers.read().unwrap().get(address).cloned()
	}

	/// All known peers, in no particular order.
	pub fn peers(&self) -> Vec<Peer> {
		self.peers.read().unwrap().values().cloned().collect()
	}

	/// Increments `address`'s error counter after a failed outbound dial or
	/// fetch. Silently ignored for an address that isn't registered.
	pub fn note_error(&self, address: &str) -> Result<(), Error> {
		let mut peers = self.peers.write().unwrap();
		if let Some(p) = peers.get_mut(address) {
			p.error_count += 1;
		} else {
			return Ok(());
		}
		self.persist(&peers)
	}

	/// Resets `address`'s error counter after a successful outbound
	/// contribution.
	pub fn note_success(&self, address: &str) -> Result<(), Error> {
		let mut peers = self.peers.write().unwrap();
		if let Some(p) = peers.get_mut(address) {
			p.error_count = 0;
		} else {
			return Ok(());
		}
		self.persist(&peers)
	}

	/// Dials every known peer in turn on `get_block_port`, asking for
	/// `hash` on `channel_name`, until one responds with a block that
	/// actually hashes to `hash`. Used by GET\_BLOCK to fault in a block
	/// the local Cache doesn't have. A peer that fails to dial, times out,
	/// or returns the wrong block has its error counter bumped and is
	/// skipped in favor of the next one.
	pub fn fetch_block(&self, get_block_port: u16, channel_name: &str, hash: &Hash) -> Result<Block, Error> {
		for peer in self.peers() {
			match self.try_fetch_block(&peer.address, get_block_port, channel_name, hash) {
				Ok(block) => {
					let _ = self.note_success(&peer.address);
					return Ok(block);
				}
				Err(e) => {
					warn!("net: fetch of {} from {} failed: {}", hash, peer.address, e);
					let _ = self.note_error(&peer.address);
				}
			}
		}
		Err(Error::BlockUnavailable(hash.to_string()))
	}

	fn try_fetch_block(&self, address: &str, port: u16, channel_name: &str, hash: &Hash) -> Result<Block, Error> {
		let raw_addr = format!("{}:{}", address, port);
		let socket_addr: SocketAddr = raw_addr
			.parse()
			.map_err(|e| Error::BadAddress(raw_addr.clone(), e))?;

		let mut stream = TcpStream::connect_timeout(&socket_addr, self.dial_timeout)?;
		stream.set_read_timeout(Some(self.get_timeout))?;
		stream.set_write_timeout(Some(self.get_timeout))?;

		write_framed(
			&mut stream,
			&Reference {
				timestamp: 0,
				channel_name: channel_name.to_owned(),
				block_hash: hash.to_vec(),
				record_hash: Vec::new(),
			},
		)?;

		let block: Block = read_framed(&mut stream)?;
		let block_hash = block.hash();
		if block_hash != *hash {
			return Err(Error::BlockUnavailable(hash.to_string()));
		}
		Ok(block)
	}

	fn persist(&self, peers: &HashMap<String, Peer>) -> Result<(), Error> {
		let list: Vec<&Peer> = peers.values().collect();
		let bytes = serde_json::to_vec(&list).expect("serializing a peer list cannot fail");
		self.cache.put_raw(PERSIST_KEY, &bytes).map_err(|e| {
			warn!("failed to persist peer list: {}", e);
			Error::Cache(e)
		})
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use bcsync_cache::mem::MemCache;

	fn registry() -> Registry {
		Registry::new(Arc::new(MemCache::new()), Duration::from_secs(5), Duration::from_secs(5)).unwrap()
	}

	#[test]
	fn add_peer_then_lookup() {
		let r = registry();
		r.add_peer("10.0.0.1:9000").unwrap();
		let p = r.peer_for_address("10.0.0.1:9000").unwrap();
		assert_eq!(p.error_count, 0);
		assert_eq!(r.peers().len(), 1);
	}

	#[test]
	fn add_peer_is_idempotent_and_keeps_error_count() {
		let r = registry();
		r.add_peer("10.0.0.1:9000").unwrap();
		r.note_error("10.0.0.1:9000").unwrap();
		r.add_peer("10.0.0.1:9000").unwrap();
		assert_eq!(r.peer_for_address("10.0.0.1:9000").unwrap().error_count, 1);
	}

	#[test]
	fn note_error_then_note_success_resets_counter() {
		let r = registry();
		r.add_peer("peer-a").unwrap();
		r.note_error("peer-a").unwrap();
		r.note_error("peer-a").unwrap();
		assert_eq!(r.peer_for_address("peer-a").unwrap().error_count, 2);
		r.note_success("peer-a").unwrap();
		assert_eq!(r.peer_for_address("peer-a").unwrap().error_count, 0);
	}

	#[test]
	fn unknown_peer_lookup_is_none() {
		let r = registry();
		assert!(r.peer_for_address("nope").is_none());
	}

	#[test]
	fn registry_reloads_persisted_peers() {
		let cache = Arc::new(MemCache::new());
		{
			let r = Registry::new(cache.clone(), Duration::from_secs(1), Duration::from_secs(1)).unwrap();
			r.add_peer("peer-a").unwrap();
			r.add_peer("peer-b").unwrap();
		}
		let reloaded = Registry::new(cache, Duration::from_secs(1), Duration::from_secs(1)).unwrap();
		assert_eq!(reloaded.peers().len(), 2);
	}

	fn sample_block() -> Block {
		Block {
			timestamp: 100,
			channel_name: "news".to_owned(),
			length: 1,
			previous: bcsync_core::ZERO_HASH.to_vec(),
			miner: "alice".to_owned(),
			nonce: 0,
			entry: Vec::new(),
		}
	}

	/// Spawns a one-shot GET\_BLOCK-style server on a loopback port: reads a
	/// single framed `Reference`, then writes back `respond_with`.
	fn spawn_one_shot_responder(respond_with: Block) -> std::net::SocketAddr {
		let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
		let addr = listener.local_addr().unwrap();
		std::thread::spawn(move || {
			let (mut stream, _) = listener.accept().unwrap();
			let _req: Reference = read_framed(&mut stream).unwrap();
			write_framed(&mut stream, &respond_with).unwrap();
		});
		addr
	}

	#[test]
	fn fetch_block_succeeds_when_a_peer_has_it() {
		let block = sample_block();
		let hash = block.hash();
		let addr = spawn_one_shot_responder(block.clone());

		let r = registry();
		r.add_peer(&addr.ip().to_string()).unwrap();

		let fetched = r.fetch_block(addr.port(), "news", &hash).unwrap();
		assert_eq!(fetched.hash(), hash);
		assert_eq!(r.peer_for_address(&addr.ip().to_string()).unwrap().error_count, 0);
	}

	#[test]
	fn fetch_block_rejects_a_peer_returning_the_wrong_block() {
		let wanted = sample_block();
		let hash = wanted.hash();
		let mut wrong = sample_block();
		wrong.nonce = 1;
		let addr = spawn_one_shot_responder(wrong);

		let r = registry();
		r.add_peer(&addr.ip().to_string()).unwrap();

		let err = r.fetch_block(addr.port(), "news", &hash).unwrap_err();
		assert!(matches!(err, Error::BlockUnavailable(_)));
		assert_eq!(r.peer_for_address(&addr.ip().to_string()).unwrap().error_count, 1);
	}
}
