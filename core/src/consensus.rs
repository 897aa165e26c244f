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

//! Consensus-relevant constants and the proof-of-work difficulty check used
//! by the canonical channel validation rule. Kept deliberately small: as
//! long as these stay simple, short functions, consensus-relevant behavior
//! is easy to audit in one place.

use std::fmt;

use num_bigint::BigUint;

use crate::hash::Hash;

/// Maximum size of a CONNECT port identifier, in bytes.
pub const MAX_ALIAS_LENGTH: usize = 256;

/// Sanity bound on a single length-delimited protobuf frame read from a TCP
/// port. Frames larger than this are rejected without being buffered.
pub const MAX_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// The largest possible 32-byte hash value, interpreted as a big-endian
/// integer. A hash's difficulty is `MAX_TARGET / hash`, so lower hash values
/// (more leading zero bytes/bits) mean higher difficulty.
pub const MAX_TARGET: [u8; 32] = [0xff; 32];

/// The difficulty represented by a block hash: `MAX_TARGET` divided by the
/// hash, read as a big-endian integer. Difficulty 1 is the easiest possible
/// (any hash at all clears it); difficulty grows as hashes get smaller.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Difficulty {
	num: BigUint,
}

impl Difficulty {
	/// The minimum difficulty: accepts any hash.
	pub fn one() -> Difficulty {
		Difficulty {
			num: BigUint::from(1u32),
		}
	}

	pub fn from_num(n: u64) -> Difficulty {
		Difficulty {
			num: BigUint::from(n),
		}
	}

	/// Computes the difficulty implied by a hash: higher for smaller hashes.
	pub fn from_hash(h: &Hash) -> Difficulty {
		let max_target = BigUint::from_bytes_be(&MAX_TARGET);
		let h_num = BigUint::from_bytes_be(h.as_bytes());
		if h_num == BigUint::from(0u32) {
			// A hash of exactly zero would divide by zero; treat it as
			// infinitely difficult rather than panicking.
			return Difficulty {
				num: max_target,
			};
		}
		Difficulty {
			num: max_target / h_num,
		}
	}
}

impl fmt::Display for Difficulty {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.num)
	}
}

/// The canonical proof-of-work rule: a candidate block's hash must imply a
/// difficulty at least equal to the channel's configured threshold.
pub fn meets_difficulty(hash: &Hash, threshold: &Difficulty) -> bool {
	&Difficulty::from_hash(hash) >= threshold
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn easiest_difficulty_accepts_any_hash() {
		let h = Hash([0xff; 32]);
		assert!(meets_difficulty(&h, &Difficulty::one()));
	}

	#[test]
	fn smaller_hash_is_more_difficult() {
		let easy = Hash([0xff; 32]);
		let mut hard_bytes = [0u8; 32];
		hard_bytes[0] = 0x00;
		hard_bytes[1] = 0x01;
		let hard = Hash(hard_bytes);
		assert!(Difficulty::from_hash(&hard) > Difficulty::from_hash(&easy));
	}

	#[test]
	fn high_threshold_rejects_easy_hash() {
		let h = Hash([0xff; 32]);
		let threshold = Difficulty::from_num(1_000_000);
		assert!(!meets_difficulty(&h, &threshold));
	}
}
