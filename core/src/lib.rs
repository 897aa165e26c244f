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

//! Data model, content-addressing and proof-of-work primitives shared by
//! every other bcsync crate: the wire types (`Reference`, `Block`,
//! `BlockEntry`, `Record`, `KeyShare`), their canonical hashing, and the
//! consensus constants the channel validation rule builds on.

#![deny(unused_mut)]

pub mod block;
pub mod consensus;
pub mod error;
pub mod framing;
pub mod hash;

pub use crate::error::Error;
pub use crate::hash::{Hash, Hashed, ZERO_HASH};

/// Generated protobuf message types: `Reference`, `Block`, `BlockEntry`,
/// `Record`, `KeyShare`, and the algorithm enums.
pub mod pb {
	include!(concat!(env!("OUT_DIR"), "/bcsync.rs"));
}

pub use crate::pb::{
	Block, BlockEntry, CompressionAlgorithm, EncryptionAlgorithm, KeyShare, Record, Reference,
	SignatureAlgorithm,
};
