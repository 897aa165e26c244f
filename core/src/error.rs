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

/// Errors raised while decoding or validating the wire data model.
#[derive(Debug, Fail)]
pub enum Error {
	#[fail(display = "malformed protobuf: {}", _0)]
	Decode(prost::DecodeError),
	#[fail(display = "malformed protobuf: {}", _0)]
	Encode(prost::EncodeError),
	#[fail(display = "frame of {} bytes exceeds the {} byte sanity bound", _0, _1)]
	FrameTooLarge(usize, usize),
	#[fail(display = "reference must carry a block hash or a record hash")]
	MissingHashSelector,
	#[fail(display = "unrecognized enum value {}", _0)]
	UnknownEnumValue(i32),
	#[fail(display = "hash field has {} bytes, expected 32", _0)]
	BadHashLength(usize),
}

impl From<prost::DecodeError> for Error {
	fn from(e: prost::DecodeError) -> Error {
		Error::Decode(e)
	}
}

impl From<prost::EncodeError> for Error {
	fn from(e: prost::EncodeError) -> Error {
		Error::Encode(e)
	}
}
