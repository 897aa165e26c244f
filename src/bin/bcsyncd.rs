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

//! Entry point for the `bcsyncd` node: wires configuration, logging, the
//! LMDB cache, the network and channel registries and the four TCP port
//! listeners, then serves the HTTP inspection API on the main thread until
//! interrupted.

use std::path::PathBuf;
use std::process::exit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{App, Arg};
use log::{info, warn};

use bcsync_api::Api;
use bcsync_cache::lmdb_store::LmdbCache;
use bcsync_cache::Cache;
use bcsync_channel::{ChannelRegistry, FixedThresholds};
use bcsync_config::Config;
use bcsync_core::consensus::Difficulty;
use bcsync_corenet::handlers::connect::AllowAll;
use bcsync_corenet::{Ports, Server};
use bcsync_net::Registry as NetRegistry;
use bcsync_util::{LogLevel, LoggingConfig};

fn main() {
	let matches = App::new("bcsyncd")
		.about("Peer-to-peer synchronization core for a content-addressed block chain network")
		.arg(
			Arg::with_name("config")
				.short("c")
				.long("config")
				.value_name("FILE")
				.help("Path to a TOML configuration file")
				.takes_value(true),
		)
		.get_matches();

	let config_path = matches.value_of("config").map(PathBuf::from);
	let config = Config::load(config_path.as_deref()).unwrap_or_else(|e| {
		eprintln!("failed to load configuration: {}", e);
		exit(1);
	});

	init_logging(&config);
	info!("starting bcsyncd");

	let store_path = config.store_path.join("chain");
	let cache: Arc<dyn Cache> = Arc::new(LmdbCache::open(&store_path.to_string_lossy()).unwrap_or_else(|e| {
		eprintln!("failed to open block store at {}: {}", store_path.display(), e);
		exit(1);
	}));

	let network = Arc::new(
		NetRegistry::new(
			cache.clone(),
			Duration::from_secs(config.network.dial_timeout_secs),
			Duration::from_secs(config.network.get_timeout_secs),
		)
		.unwrap_or_else(|e| {
			eprintln!("failed to load peer registry: {}", e);
			exit(1);
		}),
	);

	let thresholds = config
		.channel_difficulty
		.iter()
		.map(|(name, bits)| (name.clone(), Difficulty::from_num(*bits)))
		.collect();
	let channels = Arc::new(ChannelRegistry::new(Box::new(FixedThresholds::new(
		thresholds,
		Difficulty::from_num(config.default_difficulty),
	))));

	let ports = Ports {
		connect: config.ports.connect,
		get_head: config.ports.get_head,
		get_block: config.ports.get_block,
		broadcast: config.ports.broadcast,
	};
	let server = Server::new(
		ports,
		cache.clone(),
		channels.clone(),
		Some(network.clone()),
		Arc::new(AllowAll),
	);
	let _listener_handles = server.run();

	let running = Arc::new(AtomicBool::new(true));
	let running_handler = running.clone();
	ctrlc::set_handler(move || {
		running_handler.store(false, Ordering::SeqCst);
	})
	.expect("failed to install SIGINT/SIGTERM handler");

	let http_addr = format!("0.0.0.0:{}", config.ports.http).parse().unwrap_or_else(|e| {
		eprintln!("invalid http bind address: {}", e);
		exit(1);
	});

	let api = Api::new(cache, channels);
	let rt = tokio::runtime::Runtime::new().expect("failed to start tokio runtime for the api server");
	let api_handle = rt.spawn(async move {
		if let Err(e) = api.serve(http_addr).await {
			warn!("api server exited: {}", e);
		}
	});

	while running.load(Ordering::SeqCst) {
		thread::sleep(Duration::from_millis(250));
	}
	warn!("received shutdown signal, exiting");
	rt.block_on(async {
		api_handle.abort();
	});
}

fn init_logging(config: &Config) {
	let mut logging = LoggingConfig::default();
	logging.log_to_file = true;
	logging.log_file_path = config
		.log_path
		.join("bcsyncd.log")
		.to_string_lossy()
		.into_owned();
	logging.stdout_log_level = LogLevel::Info;
	if let Some(parent) = config.log_path.to_str() {
		let _ = std::fs::create_dir_all(parent);
	}
	bcsync_util::init_logger(&logging);
}
