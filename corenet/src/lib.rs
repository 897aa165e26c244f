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

//! The four-port TCP protocol core. `Server` owns one `Handler` per port
//! role and runs their accept loops, each on its own thread, each spawning
//! one further thread per accepted connection (see `listener::listen`).

pub mod dedup;
pub mod error;
pub mod handlers;
pub mod listener;
pub mod walk;

pub use crate::error::Error;

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::warn;

use bcsync_cache::Cache;
use bcsync_channel::ChannelRegistry;
use bcsync_net::Registry as NetRegistry;

use crate::handlers::connect::AllowPolicy;

/// The four port numbers the core listens on. Exact values are an operator
/// choice (see the config crate's defaults); this struct just carries
/// whatever they resolved to.
#[derive(Debug, Clone, Copy)]
pub struct Ports {
	pub connect: u16,
	pub get_head: u16,
	pub get_block: u16,
	pub broadcast: u16,
}

/// Wires the Cache, Channel registry and (optional) network registry into
/// the four port handlers and runs their listener loops.
pub struct Server {
	ports: Ports,
	cache: Arc<dyn Cache>,
	channels: Arc<ChannelRegistry>,
	network: Option<Arc<NetRegistry>>,
	allow_policy: Arc<dyn AllowPolicy>,
}

impl Server {
	pub fn new(
		ports: Ports,
		cache: Arc<dyn Cache>,
		channels: Arc<ChannelRegistry>,
		network: Option<Arc<NetRegistry>>,
		allow_policy: Arc<dyn AllowPolicy>,
	) -> Server {
		Server {
			ports,
			cache,
			channels,
			network,
			allow_policy,
		}
	}

	/// Spawns one thread per port role, each running that port's accept
	/// loop for the life of the process. Returns immediately; join the
	/// returned handles to block until all four loops exit (which normally
	/// only happens if every one of them failed to bind).
	pub fn run(&self) -> Vec<JoinHandle<()>> {
		let mut handles = Vec::with_capacity(4);

		{
			let network = self.network.clone();
			let policy = self.allow_policy.clone();
			let port = self.ports.connect;
			handles.push(
				thread::Builder::new()
					.name("connect-listener".to_owned())
					.spawn(move || {
						let network = match network {
							Some(n) => n,
							None => {
								warn!("connect: no network registry configured, port disabled");
								return;
							}
						};
						listener::listen("connect", port, move |stream| {
							if let Err(e) = handlers::connect::handle(stream, network.clone(), policy.clone()) {
								warn!("connect: {}", e);
							}
						});
					})
					.expect("failed to spawn connect listener thread"),
			);
		}

		{
			let cache = self.cache.clone();
			let port = self.ports.get_head;
			handles.push(
				thread::Builder::new()
					.name("get-head-listener".to_owned())
					.spawn(move || {
						let handler = handlers::get_head::Handler::new(cache);
						listener::listen("get_head", port, move |stream| {
							if let Err(e) = handler.handle(stream) {
								warn!("get_head: {}", e);
							}
						});
					})
					.expect("failed to spawn get_head listener thread"),
			);
		}

		{
			let cache = self.cache.clone();
			let network = self.network.clone();
			let port = self.ports.get_block;
			handles.push(
				thread::Builder::new()
					.name("get-block-listener".to_owned())
					.spawn(move || {
						let handler = handlers::get_block::Handler::new(cache, network, port);
						listener::listen("get_block", port, move |stream| {
							if let Err(e) = handler.handle(stream) {
								warn!("get_block: {}", e);
							}
						});
					})
					.expect("failed to spawn get_block listener thread"),
			);
		}

		{
			let cache = self.cache.clone();
			let channels = self.channels.clone();
			let network = self.network.clone();
			let port = self.ports.broadcast;
			handles.push(
				thread::Builder::new()
					.name("broadcast-listener".to_owned())
					.spawn(move || {
						let handler = handlers::broadcast::Handler::new(cache, channels, network);
						listener::listen("broadcast", port, move |stream| {
							if let Err(e) = handler.handle(stream) {
								warn!("broadcast: {}", e);
							}
						});
					})
					.expect("failed to spawn broadcast listener thread"),
			);
		}

		handles
	}
}
