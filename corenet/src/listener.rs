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

//! One accept loop per port role. Each accepted connection is handed to a
//! fresh thread running the port's handler closure; accept failures are
//! logged and retried, a failure to bind at all is fatal to that port's
//! loop only.

use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use log::{error, info, warn};

/// Binds `port` on all interfaces and runs the accept loop until the
/// process exits. `handle` is invoked on its own thread per connection; it
/// owns closing the connection on every exit path.
pub fn listen<H>(name: &'static str, port: u16, handle: H)
where
	H: Fn(TcpStream) + Send + Sync + 'static,
{
	let listener = match TcpListener::bind(("0.0.0.0", port)) {
		Ok(l) => l,
		Err(e) => {
			error!("{}: failed to bind port {}: {}", name, port, e);
			return;
		}
	};
	info!("{}: listening on port {}", name, port);

	let handle = Arc::new(handle);
	for conn in listener.incoming() {
		match conn {
			Ok(stream) => {
				let handle = handle.clone();
				let builder = thread::Builder::new().name(format!("{}-conn", name));
				if let Err(e) = builder.spawn(move || handle(stream)) {
					warn!("{}: failed to spawn connection thread: {}", name, e);
				}
			}
			Err(e) => {
				warn!("{}: accept error: {}", name, e);
			}
		}
	}
}
