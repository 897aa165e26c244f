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

//! Logging wrapper shared by every crate in the workspace and by the
//! `bcsyncd` binary. Initializes a log4rs root logger from a
//! `LoggingConfig`, optionally with a size-triggered, gzip-rolled file
//! appender, and installs a panic hook that routes panic messages through
//! the same logger rather than letting them vanish on an unattended node.

use std::panic;
use std::thread;

use backtrace::Backtrace;
use log::{error, info, LevelFilter, Record};
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::Append;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::filter::{threshold::ThresholdFilter, Filter, Response};
use parking_lot::Mutex;

use crate::types::{LogLevel, LoggingConfig};

lazy_static::lazy_static! {
	static ref WAS_INIT: Mutex<bool> = Mutex::new(false);
}

const LOGGING_PATTERN: &str = "{d(%Y%m%d %H:%M:%S%.3f)} {h({l})} {M} - {m}{n}";

fn convert_log_level(level: &LogLevel) -> LevelFilter {
	match *level {
		LogLevel::Error => LevelFilter::Error,
		LogLevel::Warning => LevelFilter::Warn,
		LogLevel::Info => LevelFilter::Info,
		LogLevel::Debug => LevelFilter::Debug,
		LogLevel::Trace => LevelFilter::Trace,
	}
}

/// Rejects records outside the workspace's own crates, keeping dependency
/// chatter (hyper, lmdb-zero and friends all log through the same `log`
/// facade) out of the configured appenders.
#[derive(Debug)]
struct BcsyncFilter;

impl Filter for BcsyncFilter {
	fn filter(&self, record: &Record<'_>) -> Response {
		match record.module_path() {
			Some(path) if path.starts_with("bcsync") => Response::Neutral,
			_ => Response::Reject,
		}
	}
}

/// Initializes the process-wide logger from `config`. Safe to call more
/// than once; only the first call takes effect.
pub fn init_logger(config: &LoggingConfig) {
	let mut was_init = WAS_INIT.lock();
	if *was_init {
		return;
	}

	let level_stdout = convert_log_level(&config.stdout_log_level);
	let level_file = convert_log_level(&config.file_log_level);
	let level_minimum = level_stdout.max(level_file);

	let mut root = Root::builder();
	let mut appenders = Vec::new();

	if config.log_to_stdout {
		let stdout = ConsoleAppender::builder()
			.encoder(Box::new(PatternEncoder::new(LOGGING_PATTERN)))
			.build();
		appenders.push(
			Appender::builder()
				.filter(Box::new(ThresholdFilter::new(level_stdout)))
				.filter(Box::new(BcsyncFilter))
				.build("stdout", Box::new(stdout)),
		);
		root = root.appender("stdout");
	}

	if config.log_to_file {
		let file: Box<dyn Append> = match config.log_max_size {
			Some(size) => {
				let roller = FixedWindowRoller::builder()
					.build(&format!("{}.{{}}.gz", config.log_file_path), 32)
					.expect("log roller pattern is a compile-time constant");
				let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(size)), Box::new(roller));
				Box::new(
					RollingFileAppender::builder()
						.append(config.log_file_append)
						.encoder(Box::new(PatternEncoder::new(LOGGING_PATTERN)))
						.build(&config.log_file_path, Box::new(policy))
						.expect("log file path must be creatable"),
				)
			}
			None => Box::new(
				FileAppender::builder()
					.append(config.log_file_append)
					.encoder(Box::new(PatternEncoder::new(LOGGING_PATTERN)))
					.build(&config.log_file_path)
					.expect("log file path must be creatable"),
			),
		};
		appenders.push(
			Appender::builder()
				.filter(Box::new(ThresholdFilter::new(level_file)))
				.filter(Box::new(BcsyncFilter))
				.build("file", file),
		);
		root = root.appender("file");
	}

	let log_config = Config::builder()
		.appenders(appenders)
		.build(root.build(level_minimum))
		.expect("appender set built above is always valid");
	log4rs::init_config(log_config).expect("logger is only ever initialized once");

	install_panic_hook();
	*was_init = true;
	info!(
		"log4rs initialized: file level {:?}, stdout level {:?}",
		level_file, level_stdout
	);
}

/// Initializes a minimal stdout-only logger for test binaries. Idempotent
/// for the same reason `init_logger` is.
pub fn init_test_logger() {
	let mut config = LoggingConfig::default();
	config.log_to_file = false;
	config.stdout_log_level = LogLevel::Debug;
	init_logger(&config);
}

fn install_panic_hook() {
	panic::set_hook(Box::new(|info| {
		let backtrace = Backtrace::new();
		let thread = thread::current();
		let thread_name = thread.name().unwrap_or("unnamed");
		let msg = match info.payload().downcast_ref::<&'static str>() {
			Some(s) => (*s).to_owned(),
			None => match info.payload().downcast_ref::<String>() {
				Some(s) => s.clone(),
				None => "Box<Any>".to_owned(),
			},
		};
		match info.location() {
			Some(loc) => error!(
				"thread '{}' panicked at '{}': {}:{}\n{:?}",
				thread_name,
				msg,
				loc.file(),
				loc.line(),
				backtrace
			),
			None => error!("thread '{}' panicked at '{}'\n{:?}", thread_name, msg, backtrace),
		}
	}));
}
