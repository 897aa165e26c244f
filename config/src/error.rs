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

#[derive(Debug, Fail)]
pub enum Error {
	#[fail(display = "error reading config file {}: {}", _0, _1)]
	FileIo(String, io::Error),
	#[fail(display = "error parsing config file {}: {}", _0, _1)]
	Parse(String, toml::de::Error),
	#[fail(display = "invalid value for environment variable {}: {}", _0, _1)]
	BadEnvVar(&'static str, String),
}
