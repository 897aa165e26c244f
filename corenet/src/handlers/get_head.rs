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

//! GET\_HEAD: look up the current head reference for a channel. Coalesces
//! concurrent lookups for the same channel behind an inflight set; a
//! coalesced-away request is dropped, not queued, since heads are cheap and
//! frequent to poll.

use std::net::TcpStream;
use std::sync::Arc;

use log::{info, warn};

use bcsync_cache::Cache;
use bcsync_core::framing::{read_framed, write_framed};
use bcsync_core::Reference;

use crate::dedup::InflightSet;
use crate::error::Error;

pub struct Handler {
	cache: Arc<dyn Cache>,
	inflight: InflightSet,
}

impl Handler {
	pub fn new(cache: Arc<dyn Cache>) -> Handler {
		Handler {
			cache,
			inflight: InflightSet::new(),
		}
	}

	pub fn handle(&self, mut stream: TcpStream) -> Result<(), Error> {
		let request: Reference = read_framed(&mut stream)?;
		info!("get_head: request for channel {}", request.channel_name);

		let _guard = match self.inflight.claim(request.channel_name.clone()) {
			Some(g) => g,
			None => {
				warn!("get_head: {} already inflight, dropping", request.channel_name);
				return Ok(());
			}
		};

		let reference = self.cache.get_head(&request.channel_name)?;
		info!(
			"get_head: channel {} head is {}",
			reference.channel_name,
			base64::encode_config(&reference.block_hash, base64::URL_SAFE_NO_PAD)
		);
		write_framed(&mut stream, &reference)?;
		Ok(())
	}
}
