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
	#[fail(display = "not found: {}", _0)]
	NotFound(String),
	#[fail(display = "lmdb error: {}", _0)]
	Lmdb(lmdb_zero::error::Error),
	#[fail(display = "corrupt stored value for {}: {}", _0, _1)]
	Decode(String, bcsync_core::Error),
}

impl From<lmdb_zero::error::Error> for Error {
	fn from(e: lmdb_zero::error::Error) -> Error {
		Error::Lmdb(e)
	}
}

/// Turns a `Result<Option<T>, Error>` into `Result<T, Error>`, mapping a
/// missing value to `Error::NotFound`.
pub fn option_to_not_found<T>(res: Result<Option<T>, Error>, what: &str) -> Result<T, Error> {
	match res {
		Ok(Some(v)) => Ok(v),
		Ok(None) => Err(Error::NotFound(what.to_owned())),
		Err(e) => Err(e),
	}
}
