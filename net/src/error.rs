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
use std::net::AddrParseError;

use failure_derive::Fail;

#[derive(Debug, Fail)]
pub enum Error {
	#[fail(display = "peer store error: {}", _0)]
	Cache(bcsync_cache::Error),
	#[fail(display = "malformed persisted peer list: {}", _0)]
	Corrupt(String),
	#[fail(display = "io error contacting peer: {}", _0)]
	Io(io::Error),
	#[fail(display = "invalid peer address {}: {}", _0, _1)]
	BadAddress(String, AddrParseError),
	#[fail(display = "block {} not available from any known peer", _0)]
	BlockUnavailable(String),
}

impl From<bcsync_cache::Error> for Error {
	fn from(e: bcsync_cache::Error) -> Error {
		Error::Cache(e)
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Error {
		Error::Io(e)
	}
}
