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

//! CONNECT: a raw (unframed) peer identifier, admitted to the network
//! registry if the admission policy allows it. No response is ever written.

use std::io::Read;
use std::net::TcpStream;
use std::sync::Arc;

use log::{info, warn};

use bcsync_core::consensus::MAX_ALIAS_LENGTH;
use bcsync_net::Registry;

use crate::error::Error;

/// `allowed(address, peer) -> bool`: the admission policy consulted before
/// adding a connecting peer to the network registry.
pub trait AllowPolicy: Send + Sync {
	fn allowed(&self, address: &str, peer: &str) -> bool;
}

/// Admits every peer unconditionally; the default when no finer-grained
/// policy is configured.
pub struct AllowAll;

impl AllowPolicy for AllowAll {
	fn allowed(&self, _address: &str, _peer: &str) -> bool {
		true
	}
}

pub fn handle(
	mut stream: TcpStream,
	network: Arc<Registry>,
	policy: Arc<dyn AllowPolicy>,
) -> Result<(), Error> {
	let peer_addr = stream.peer_addr().map(|a| a.ip().to_string()).unwrap_or_default();

	let mut buf = vec![0u8; MAX_ALIAS_LENGTH];
	let n = stream.read(&mut buf)?;
	if n == 0 {
		return Err(Error::EmptyAlias);
	}
	buf.truncate(n);
	let alias = String::from_utf8_lossy(&buf).into_owned();

	info!("connect: {} identifies as {}", peer_addr, alias);

	if !policy.allowed(&peer_addr, &alias) {
		warn!("connect: {} ({}) denied by policy", peer_addr, alias);
		return Err(Error::NotAllowed);
	}

	network.add_peer(&peer_addr)?;
	Ok(())
}
