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

//! Per-handler inflight request deduplication. Each of the three keyed
//! handlers (GET\_HEAD, GET\_BLOCK, BROADCAST) owns one `InflightSet`,
//! keyed on a composite string built from the request. A key present in the
//! set means an identical request is already being served; the second
//! caller is expected to log and drop rather than wait, since responses are
//! deterministic and therefore not worth queuing behind.

use std::collections::HashSet;
use std::sync::Mutex;

/// A set of in-progress request keys, safe for concurrent insertion/removal.
/// Memory footprint tracks inflight cardinality, not history: a key is
/// always removed when its guard drops, including on panic unwind.
pub struct InflightSet {
	keys: Mutex<HashSet<String>>,
}

impl InflightSet {
	pub fn new() -> InflightSet {
		InflightSet {
			keys: Mutex::new(HashSet::new()),
		}
	}

	/// Attempts to claim `key`. Returns `None` if `key` is already inflight
	/// (caller should log and drop the request); otherwise returns a guard
	/// that releases the key when dropped.
	pub fn claim(&self, key: String) -> Option<InflightGuard<'_>> {
		let mut keys = self.keys.lock().unwrap();
		if keys.contains(&key) {
			return None;
		}
		keys.insert(key.clone());
		Some(InflightGuard { set: self, key })
	}
}

impl Default for InflightSet {
	fn default() -> InflightSet {
		InflightSet::new()
	}
}

/// Releases its key from the owning `InflightSet` on drop, including during
/// an unwinding panic, so a handler that panics mid-request never leaves a
/// stuck dedup entry behind.
pub struct InflightGuard<'a> {
	set: &'a InflightSet,
	key: String,
}

impl<'a> Drop for InflightGuard<'a> {
	fn drop(&mut self) {
		self.set.keys.lock().unwrap().remove(&self.key);
	}
}

/// Builds the composite key for the GET\_BLOCK and BROADCAST handlers:
/// channel name, then base64url (no padding) of each hash component in
/// turn, `∥`-joined by nothing (concatenation is unambiguous because base64
/// never decodes across a hash boundary by coincidence of length).
pub fn composite_key(channel: &str, parts: &[&[u8]]) -> String {
	let mut key = String::from(channel);
	for part in parts {
		key.push_str(&base64::encode_config(part, base64::URL_SAFE_NO_PAD));
	}
	key
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn second_claim_of_same_key_is_rejected() {
		let set = InflightSet::new();
		let _guard = set.claim("a".to_owned()).unwrap();
		assert!(set.claim("a".to_owned()).is_none());
	}

	#[test]
	fn key_is_released_when_guard_drops() {
		let set = InflightSet::new();
		{
			let _guard = set.claim("a".to_owned()).unwrap();
		}
		assert!(set.claim("a".to_owned()).is_some());
	}

	#[test]
	fn distinct_keys_do_not_interfere() {
		let set = InflightSet::new();
		let _a = set.claim("a".to_owned()).unwrap();
		let _b = set.claim("b".to_owned()).unwrap();
	}

	#[test]
	fn composite_key_is_stable_for_same_inputs() {
		let a = composite_key("news", &[&[1, 2, 3], &[]]);
		let b = composite_key("news", &[&[1, 2, 3], &[]]);
		assert_eq!(a, b);
	}

	#[test]
	fn composite_key_differs_across_channels() {
		let a = composite_key("news", &[&[1, 2, 3]]);
		let b = composite_key("weather", &[&[1, 2, 3]]);
		assert_ne!(a, b);
	}
}
