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

//! JSON view models for the inspection endpoints. These mirror the fields
//! the original template-rendered HTML pages exposed, just serialized
//! instead of rendered; binary fields are base64url (no padding), matching
//! the wire encoding operators already use to reference hashes.

use serde::{Deserialize, Serialize};

use bcsync_core::{Block, Reference};

fn b64(bytes: &[u8]) -> String {
	base64::encode_config(bytes, base64::URL_SAFE_NO_PAD)
}

#[derive(Serialize)]
pub struct ReferenceView {
	pub timestamp: u64,
	pub channel: String,
	pub block_hash: String,
	pub record_hash: String,
}

impl From<&Reference> for ReferenceView {
	fn from(r: &Reference) -> ReferenceView {
		ReferenceView {
			timestamp: r.timestamp,
			channel: r.channel_name.clone(),
			block_hash: b64(&r.block_hash),
			record_hash: b64(&r.record_hash),
		}
	}
}

#[derive(Serialize)]
pub struct AccessView {
	pub alias: String,
	pub secret_key: String,
	pub encryption_algorithm: i32,
}

#[derive(Serialize)]
pub struct EntryView {
	pub hash: String,
	pub timestamp: u64,
	pub creator: String,
	pub access: Vec<AccessView>,
	pub payload: String,
	pub compression_algorithm: i32,
	pub encryption_algorithm: i32,
	pub signature: String,
	pub signature_algorithm: i32,
	pub reference: Vec<ReferenceView>,
}

#[derive(Serialize)]
pub struct BlockView {
	pub hash: String,
	pub timestamp: u64,
	pub channel: String,
	pub length: u64,
	pub previous: String,
	pub miner: String,
	pub nonce: u64,
	pub entry: Vec<EntryView>,
}

impl BlockView {
	pub fn new(hash: &str, block: &Block) -> BlockView {
		let entry = block
			.entry
			.iter()
			.filter_map(|e| e.record.as_ref().map(|r| (e, r)))
			.map(|(e, r)| EntryView {
				hash: b64(&e.record_hash),
				timestamp: r.timestamp,
				creator: r.creator.clone(),
				access: r
					.access
					.iter()
					.map(|a| AccessView {
						alias: a.alias.clone(),
						secret_key: b64(&a.secret_key),
						encryption_algorithm: a.encryption_algorithm,
					})
					.collect(),
				payload: b64(&r.payload),
				compression_algorithm: r.compression_algorithm,
				encryption_algorithm: r.encryption_algorithm,
				signature: b64(&r.signature),
				signature_algorithm: r.signature_algorithm,
				reference: r.reference.iter().map(ReferenceView::from).collect(),
			})
			.collect();

		BlockView {
			hash: hash.to_owned(),
			timestamp: block.timestamp,
			channel: block.channel_name.clone(),
			length: block.length,
			previous: b64(&block.previous),
			miner: block.miner.clone(),
			nonce: block.nonce,
			entry,
		}
	}
}

#[derive(Serialize)]
pub struct ChannelView {
	pub channel: String,
	pub timestamp: u64,
	pub hash: String,
}

impl From<&Reference> for ChannelView {
	fn from(r: &Reference) -> ChannelView {
		ChannelView {
			channel: r.channel_name.clone(),
			timestamp: r.timestamp,
			hash: b64(&r.block_hash),
		}
	}
}

#[derive(Serialize)]
pub struct ChannelListView {
	pub channel: Vec<ChannelView>,
}

/// Body of a `POST /registration` request: modeled on the original's
/// alias + stripeEmail form fields, minus anything that names the payment
/// processor directly.
#[derive(Deserialize)]
pub struct RegistrationRequest {
	pub alias: String,
	pub contact: String,
}

/// What actually gets persisted under the registration key prefix. Carries
/// no payment-processor details -- there are none to carry, since none is
/// ever contacted.
#[derive(Serialize, Deserialize)]
pub struct RegistrationRecord {
	pub alias: String,
	pub contact: String,
	pub timestamp: u64,
}

#[derive(Serialize)]
pub struct RegistrationAck {
	pub status: &'static str,
	pub alias: String,
}
