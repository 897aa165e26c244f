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

//! GET\_BLOCK: fetch a block either by its own hash, or by the hash of one
//! of its contained records (in which case the chain is walked from the
//! channel head toward genesis looking for the first block containing a
//! matching entry).

use std::net::TcpStream;
use std::sync::Arc;

use log::{info, warn};

use bcsync_cache::Cache;
use bcsync_core::framing::{read_framed, write_framed};
use bcsync_core::{Block, Hash, Reference};
use bcsync_net::Registry as NetRegistry;

use crate::dedup::{composite_key, InflightSet};
use crate::error::Error;
use crate::walk::{walk, Flow, WalkResult};

pub struct Handler {
	cache: Arc<dyn Cache>,
	network: Option<Arc<NetRegistry>>,
	get_block_port: u16,
	inflight: InflightSet,
}

impl Handler {
	pub fn new(cache: Arc<dyn Cache>, network: Option<Arc<NetRegistry>>, get_block_port: u16) -> Handler {
		Handler {
			cache,
			network,
			get_block_port,
			inflight: InflightSet::new(),
		}
	}

	pub fn handle(&self, mut stream: TcpStream) -> Result<(), Error> {
		let request: Reference = read_framed(&mut stream)?;
		if !request.has_exactly_one_hash_selector() {
			return Err(Error::BadHashSelector);
		}
		info!(
			"get_block: request for channel {} block={} record={}",
			request.channel_name,
			base64::encode_config(&request.block_hash, base64::URL_SAFE_NO_PAD),
			base64::encode_config(&request.record_hash, base64::URL_SAFE_NO_PAD),
		);

		let key = composite_key(&request.channel_name, &[&request.block_hash, &request.record_hash]);
		let _guard = match self.inflight.claim(key) {
			Some(g) => g,
			None => {
				warn!("get_block: {} already inflight, dropping", request.channel_name);
				return Ok(());
			}
		};

		if !request.block_hash.is_empty() {
			// Direct by-hash lookup is cache-only: a miss is logged and the
			// connection closed, with no network fallback (contrast with the
			// by-record-hash walk below, which does fault out to a peer).
			let hash = Hash::parse(&request.block_hash)?;
			let block = self.cache.get_block(&hash)?;
			write_framed(&mut stream, &block)?;
			return Ok(());
		}

		let head = self.cache.get_head(&request.channel_name)?;
		let head_hash = Hash::parse(&head.block_hash)?;
		let target = request.record_hash.clone();

		let channel_name = request.channel_name.clone();
		let network = self.network.clone();
		let get_block_port = self.get_block_port;
		let fetch = move |hash: &Hash| -> Option<Block> {
			network
				.as_ref()
				.and_then(|n| n.fetch_block(get_block_port, &channel_name, hash).ok())
		};

		let mut found = None;
		let result: WalkResult<Error> = walk(
			self.cache.as_ref(),
			&head_hash,
			|_, block| {
				for entry in &block.entry {
					if entry.record_hash == target {
						found = Some(block.clone());
						return Flow::Stop;
					}
				}
				Flow::Continue
			},
			Error::from,
			Some(&fetch),
		);

		match result {
			WalkResult::Found => {
				let block = found.expect("Found implies the visitor recorded a block");
				info!("get_block: found record, writing containing block");
				write_framed(&mut stream, &block)?;
				Ok(())
			}
			WalkResult::ReachedGenesis => {
				info!("get_block: record not found in channel {}", request.channel_name);
				Ok(())
			}
			WalkResult::Failed(e) => Err(e),
		}
	}
}
