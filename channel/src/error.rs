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

use failure_derive::Fail;

#[derive(Debug, Fail)]
pub enum Error {
	#[fail(display = "cache error: {}", _0)]
	Cache(bcsync_cache::Error),
	#[fail(display = "candidate rejected: shorter than current head (candidate {}, current {})", _0, _1)]
	ShorterThanHead(u64, u64),
	#[fail(
		display = "candidate rejected: equal length tie not won (candidate timestamp {}, current timestamp {})",
		_0, _1
	)]
	TieNotWon(u64, u64),
	#[fail(display = "candidate rejected: does not meet difficulty threshold")]
	BelowDifficulty,
	#[fail(display = "corrupt persisted head reference: {}", _0)]
	Corrupt(String),
}

impl From<bcsync_cache::Error> for Error {
	fn from(e: bcsync_cache::Error) -> Error {
		Error::Cache(e)
	}
}
