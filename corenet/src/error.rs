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

use std::io;

use failure_derive::Fail;

/// Failures a handler logs and closes the connection over. None of these
/// ever reach the peer as a response; they only drive what gets written to
/// the log and whether the connection is dropped silently or with a reply.
#[derive(Debug, Fail)]
pub enum Error {
	#[fail(display = "io error: {}", _0)]
	Io(io::Error),
	#[fail(display = "cache error: {}", _0)]
	Cache(bcsync_cache::Error),
	#[fail(display = "channel error: {}", _0)]
	Channel(bcsync_channel::Error),
	#[fail(display = "network registry error: {}", _0)]
	Network(bcsync_net::Error),
	#[fail(display = "peer sent an empty identifier")]
	EmptyAlias,
	#[fail(display = "peer was not admitted by the connect policy")]
	NotAllowed,
	#[fail(display = "request carries zero or both of block-hash/record-hash")]
	BadHashSelector,
	#[fail(display = "pulled ancestor {} does not hash to the requested value", _0)]
	AncestorHashMismatch(String),
	#[fail(display = "data model error: {}", _0)]
	Core(bcsync_core::Error),
	#[fail(display = "block has a previous-hash field of {} bytes, expected 0 or 32", _0)]
	MalformedPrevious(usize),
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Error {
		Error::Io(e)
	}
}

impl From<bcsync_cache::Error> for Error {
	fn from(e: bcsync_cache::Error) -> Error {
		Error::Cache(e)
	}
}

impl From<bcsync_channel::Error> for Error {
	fn from(e: bcsync_channel::Error) -> Error {
		Error::Channel(e)
	}
}

impl From<bcsync_net::Error> for Error {
	fn from(e: bcsync_net::Error) -> Error {
		Error::Network(e)
	}
}

impl From<bcsync_core::Error> for Error {
	fn from(e: bcsync_core::Error) -> Error {
		Error::Core(e)
	}
}
