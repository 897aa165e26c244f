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

//! BROADCAST: receive a candidate head block, interactively pull whatever
//! ancestors are missing from the cache, arbitrate the candidate through
//! the channel's update rule, and reply with the (possibly unchanged)
//! current head. A `Channel::update` rejection is logged but not fatal to
//! the reply -- the peer must still learn the real head so it converges.

use std::net::TcpStream;
use std::sync::Arc;

use log::{info, warn};

use bcsync_cache::Cache;
use bcsync_channel::ChannelRegistry;
use bcsync_core::framing::{read_framed, write_framed};
use bcsync_core::{Block, Hash, Reference};
use bcsync_net::Registry as NetRegistry;

use crate::dedup::{composite_key, InflightSet};
use crate::error::Error;

pub struct Handler {
	cache: Arc<dyn Cache>,
	channels: Arc<ChannelRegistry>,
	network: Option<Arc<NetRegistry>>,
	inflight: InflightSet,
}

impl Handler {
	pub fn new(
		cache: Arc<dyn Cache>,
		channels: Arc<ChannelRegistry>,
		network: Option<Arc<NetRegistry>>,
	) -> Handler {
		Handler {
			cache,
			channels,
			network,
			inflight: InflightSet::new(),
		}
	}

	pub fn handle(&self, mut stream: TcpStream) -> Result<(), Error> {
		let peer_addr = stream.peer_addr().map(|a| a.ip().to_string()).unwrap_or_default();

		let candidate: Block = read_framed(&mut stream)?;
		let hash = candidate.hash();
		info!(
			"broadcast: {} offers channel {} block {}",
			peer_addr, candidate.channel_name, hash
		);

		let key = composite_key(&candidate.channel_name, &[hash.as_bytes()]);
		let _guard = match self.inflight.claim(key) {
			Some(g) => g,
			None => {
				warn!("broadcast: {} already inflight, dropping", candidate.channel_name);
				return Ok(());
			}
		};

		let channel = self.channels.open(&candidate.channel_name, self.cache.as_ref())?;

		// Ancestor walk: pull whatever the cache doesn't already have,
		// verifying each pulled block's hash before trusting it.
		let mut current = candidate.clone();
		loop {
			if current.previous.is_empty() {
				break;
			}
			let previous_hash = Hash::parse(&current.previous)?;
			if self.cache.has_block(&previous_hash)? {
				break;
			}

			write_framed(
				&mut stream,
				&Reference {
					timestamp: 0,
					channel_name: candidate.channel_name.clone(),
					block_hash: previous_hash.to_vec(),
					record_hash: Vec::new(),
				},
			)?;
			let pulled: Block = read_framed(&mut stream)?;
			let pulled_hash = pulled.hash();
			if pulled_hash != previous_hash {
				warn!(
					"broadcast: {} sent wrong ancestor, wanted {} got {}",
					peer_addr, previous_hash, pulled_hash
				);
				return Err(Error::AncestorHashMismatch(previous_hash.to_string()));
			}
			if !pulled.previous.is_empty() && pulled.previous.len() != 32 {
				warn!(
					"broadcast: {} sent an ancestor with a malformed previous-hash field ({} bytes)",
					peer_addr,
					pulled.previous.len()
				);
				return Err(Error::MalformedPrevious(pulled.previous.len()));
			}
			self.cache.put_block(&previous_hash, &pulled)?;
			current = pulled;
		}

		if let Err(e) = channel.update(self.cache.as_ref(), self.network.as_deref(), &hash, &candidate) {
			warn!("broadcast: channel {} rejected candidate: {}", candidate.channel_name, e);
		} else if let Some(network) = &self.network {
			network.add_peer(&peer_addr)?;
			network.note_success(&peer_addr)?;
		}

		write_framed(
			&mut stream,
			&Reference {
				timestamp: channel.timestamp(),
				channel_name: channel.name().to_owned(),
				block_hash: channel.head().to_vec(),
				record_hash: Vec::new(),
			},
		)?;
		Ok(())
	}
}
