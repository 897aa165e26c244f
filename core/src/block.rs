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

//! Extension methods over the generated protobuf types: content hashing,
//! the genesis/previous convention, and enum-tag validation.

use prost::Message;

use crate::error::Error;
use crate::hash::{hash_bytes, Hash};
use crate::pb::{Block, CompressionAlgorithm, EncryptionAlgorithm, Record, Reference, SignatureAlgorithm};

impl Block {
	/// Computes the block's content hash: the hash of its canonical
	/// (protobuf) serialization. This is the key under which the block is
	/// stored in, and fetched from, the Cache.
	pub fn hash(&self) -> Hash {
		let mut buf = Vec::with_capacity(self.encoded_len());
		// Encoding a well-formed message into a big-enough buffer cannot
		// fail; `Message::encode` only errors on insufficient capacity.
		self.encode(&mut buf).expect("encoding a Block cannot fail");
		hash_bytes(&buf)
	}

	/// True if this block has no ancestor, i.e. it is the first block of
	/// its channel.
	pub fn is_genesis(&self) -> bool {
		self.previous.is_empty()
	}

	/// A `Reference` describing this block as a channel head.
	pub fn as_head_reference(&self) -> Reference {
		Reference {
			timestamp: self.timestamp,
			channel_name: self.channel_name.clone(),
			block_hash: self.hash().to_vec(),
			record_hash: Vec::new(),
		}
	}
}

impl Reference {
	/// A GET_BLOCK request must carry exactly one of block_hash/record_hash.
	pub fn has_exactly_one_hash_selector(&self) -> bool {
		self.block_hash.is_empty() != self.record_hash.is_empty()
	}
}

impl Record {
	pub fn compression_algorithm(&self) -> Result<CompressionAlgorithm, Error> {
		CompressionAlgorithm::from_i32(self.compression_algorithm)
			.ok_or_else(|| Error::UnknownEnumValue(self.compression_algorithm))
	}

	pub fn encryption_algorithm(&self) -> Result<EncryptionAlgorithm, Error> {
		EncryptionAlgorithm::from_i32(self.encryption_algorithm)
			.ok_or_else(|| Error::UnknownEnumValue(self.encryption_algorithm))
	}

	pub fn signature_algorithm(&self) -> Result<SignatureAlgorithm, Error> {
		SignatureAlgorithm::from_i32(self.signature_algorithm)
			.ok_or_else(|| Error::UnknownEnumValue(self.signature_algorithm))
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::pb::BlockEntry;

	fn sample_block() -> Block {
		Block {
			timestamp: 1234,
			channel_name: "Test".to_string(),
			length: 1,
			previous: Vec::new(),
			miner: "miner".to_string(),
			nonce: 7,
			entry: vec![BlockEntry {
				record_hash: vec![1, 2, 3],
				record: Some(Record {
					timestamp: 1234,
					creator: "alice".to_string(),
					access: vec![],
					payload: b"hello".to_vec(),
					compression_algorithm: CompressionAlgorithm::CompressionNone as i32,
					encryption_algorithm: EncryptionAlgorithm::EncryptionNone as i32,
					signature_algorithm: SignatureAlgorithm::SignatureNone as i32,
					signature: vec![],
					reference: vec![],
				}),
			}],
		}
	}

	#[test]
	fn hash_is_deterministic() {
		let b = sample_block();
		assert_eq!(b.hash(), sample_block().hash());
	}

	#[test]
	fn hash_changes_with_content() {
		let a = sample_block();
		let mut b = sample_block();
		b.nonce = 8;
		assert_ne!(a.hash(), b.hash());
	}

	#[test]
	fn genesis_has_empty_previous() {
		let b = sample_block();
		assert!(b.is_genesis());
	}

	#[test]
	fn reference_selector_exclusivity() {
		let mut r = Reference {
			timestamp: 0,
			channel_name: "c".into(),
			block_hash: vec![],
			record_hash: vec![],
		};
		assert!(!r.has_exactly_one_hash_selector());
		r.block_hash = vec![1];
		assert!(r.has_exactly_one_hash_selector());
		r.record_hash = vec![2];
		assert!(!r.has_exactly_one_hash_selector());
	}

	#[test]
	fn unknown_enum_tag_is_rejected() {
		let mut b = sample_block();
		b.entry[0].record.as_mut().unwrap().compression_algorithm = 99;
		let rec = b.entry[0].record.clone().unwrap();
		assert!(rec.compression_algorithm().is_err());
	}
}
