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

//! Layered configuration: compiled-in defaults, overridden by an optional
//! TOML file, overridden in turn by environment variables. Keeping the
//! three layers flattened onto one struct (rather than nested per-section
//! like an older configuration era might) keeps the override precedence
//! easy to reason about: each layer only ever replaces whole fields.

pub mod error;

pub use crate::error::Error;

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default port numbers. Stable across releases; an operator who changes
/// them must change them on every node they expect to interoperate with.
pub const DEFAULT_PORT_CONNECT: u16 = 8001;
pub const DEFAULT_PORT_GET_HEAD: u16 = 8002;
pub const DEFAULT_PORT_GET_BLOCK: u16 = 8003;
pub const DEFAULT_PORT_BROADCAST: u16 = 8004;
pub const DEFAULT_HTTP_PORT: u16 = 8080;

const ENV_SECURITYSTORE: &str = "SECURITYSTORE";
const ENV_LOGSTORE: &str = "LOGSTORE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortsConfig {
	pub connect: u16,
	pub get_head: u16,
	pub get_block: u16,
	pub broadcast: u16,
	pub http: u16,
}

impl Default for PortsConfig {
	fn default() -> PortsConfig {
		PortsConfig {
			connect: DEFAULT_PORT_CONNECT,
			get_head: DEFAULT_PORT_GET_HEAD,
			get_block: DEFAULT_PORT_GET_BLOCK,
			broadcast: DEFAULT_PORT_BROADCAST,
			http: DEFAULT_HTTP_PORT,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
	pub dial_timeout_secs: u64,
	pub get_timeout_secs: u64,
}

impl Default for NetworkConfig {
	fn default() -> NetworkConfig {
		NetworkConfig {
			dial_timeout_secs: 10,
			get_timeout_secs: 10,
		}
	}
}

/// Top-level configuration for the `bcsyncd` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	pub ports: PortsConfig,
	pub network: NetworkConfig,

	/// Root of the on-disk key/block store. Defaults to `$SECURITYSTORE`,
	/// falling back to `$HOME/bc`.
	pub store_path: PathBuf,

	/// Root of the log output directory. Defaults to `$LOGSTORE`, falling
	/// back to `$HOME/bc/logs`.
	pub log_path: PathBuf,

	/// Per-channel difficulty thresholds, keyed by channel name. A channel
	/// not present here uses `default_difficulty`.
	#[serde(default)]
	pub channel_difficulty: HashMap<String, u64>,

	/// Difficulty threshold applied to channels absent from
	/// `channel_difficulty`.
	pub default_difficulty: u64,
}

impl Default for Config {
	fn default() -> Config {
		Config {
			ports: PortsConfig::default(),
			network: NetworkConfig::default(),
			store_path: default_store_path(),
			log_path: default_log_path(),
			channel_difficulty: HashMap::new(),
			default_difficulty: 1,
		}
	}
}

fn home_dir() -> PathBuf {
	dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_store_path() -> PathBuf {
	home_dir().join("bc")
}

fn default_log_path() -> PathBuf {
	home_dir().join("bc").join("logs")
}

impl Config {
	/// Builds a `Config` from compiled defaults, overlaid with `path` (if
	/// given and present on disk), overlaid with recognized environment
	/// variables.
	pub fn load(path: Option<&Path>) -> Result<Config, Error> {
		let mut config = Config::default();

		if let Some(path) = path {
			if path.exists() {
				config = Config::merge_file(config, path)?;
			}
		}

		config.apply_env()?;
		Ok(config)
	}

	fn merge_file(base: Config, path: &Path) -> Result<Config, Error> {
		let path_str = path.display().to_string();
		let contents = fs::read_to_string(path).map_err(|e| Error::FileIo(path_str.clone(), e))?;
		let file_config: FileConfig =
			toml::from_str(&contents).map_err(|e| Error::Parse(path_str, e))?;
		Ok(file_config.apply_onto(base))
	}

	fn apply_env(&mut self) -> Result<(), Error> {
		if let Ok(v) = env::var(ENV_SECURITYSTORE) {
			self.store_path = PathBuf::from(v);
		}
		if let Ok(v) = env::var(ENV_LOGSTORE) {
			self.log_path = PathBuf::from(v);
		}
		Ok(())
	}
}

/// The shape of an on-disk config file: every field optional, so a file can
/// override just the fields it cares about and leave the rest at their
/// compiled default.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
	ports: Option<PortsConfig>,
	network: Option<NetworkConfig>,
	store_path: Option<PathBuf>,
	log_path: Option<PathBuf>,
	#[serde(default)]
	channel_difficulty: HashMap<String, u64>,
	default_difficulty: Option<u64>,
}

impl FileConfig {
	fn apply_onto(self, mut base: Config) -> Config {
		if let Some(ports) = self.ports {
			base.ports = ports;
		}
		if let Some(network) = self.network {
			base.network = network;
		}
		if let Some(store_path) = self.store_path {
			base.store_path = store_path;
		}
		if let Some(log_path) = self.log_path {
			base.log_path = log_path;
		}
		if !self.channel_difficulty.is_empty() {
			base.channel_difficulty = self.channel_difficulty;
		}
		if let Some(d) = self.default_difficulty {
			base.default_difficulty = d;
		}
		base
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use std::io::Write;

	#[test]
	fn defaults_when_no_file_given() {
		let config = Config::load(None).unwrap();
		assert_eq!(config.ports.connect, DEFAULT_PORT_CONNECT);
		assert_eq!(config.default_difficulty, 1);
	}

	#[test]
	fn file_overrides_selected_fields_only() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("bcsync.toml");
		let mut f = fs::File::create(&path).unwrap();
		write!(
			f,
			r#"
			default_difficulty = 42

			[ports]
			connect = 9001
			get_head = 9002
			get_block = 9003
			broadcast = 9004
			http = 9090
			"#
		)
		.unwrap();

		let config = Config::load(Some(&path)).unwrap();
		assert_eq!(config.default_difficulty, 42);
		assert_eq!(config.ports.connect, 9001);
		// network config wasn't in the file, so it keeps its default.
		assert_eq!(config.network.dial_timeout_secs, 10);
	}

	#[test]
	fn missing_file_path_falls_back_to_defaults() {
		let config = Config::load(Some(Path::new("/nonexistent/bcsync.toml"))).unwrap();
		assert_eq!(config.ports.connect, DEFAULT_PORT_CONNECT);
	}

	#[test]
	fn env_vars_override_store_paths() {
		env::set_var(ENV_SECURITYSTORE, "/tmp/bcsync-test-store");
		env::set_var(ENV_LOGSTORE, "/tmp/bcsync-test-logs");
		let config = Config::load(None).unwrap();
		assert_eq!(config.store_path, PathBuf::from("/tmp/bcsync-test-store"));
		assert_eq!(config.log_path, PathBuf::from("/tmp/bcsync-test-logs"));
		env::remove_var(ENV_SECURITYSTORE);
		env::remove_var(ENV_LOGSTORE);
	}
}
