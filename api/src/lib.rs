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

//! A thin HTTP surface over the same Cache and Network registry the TCP
//! core uses: block, channel and channel-list inspection for operators,
//! plus a merchant-registration endpoint that validates and persists
//! requests without ever contacting a payment processor. None of this
//! contributes invariants to the core; it's JSON glue over the core's read
//! paths.

pub mod error;
pub mod views;

pub use crate::error::Error;

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use log::{error, info, warn};
use serde::Serialize;

use bcsync_cache::Cache;
use bcsync_channel::ChannelRegistry;
use bcsync_core::Hash;

use crate::views::{
	BlockView, ChannelListView, ChannelView, RegistrationAck, RegistrationRecord, RegistrationRequest,
};

pub struct Api {
	cache: Arc<dyn Cache>,
	channels: Arc<ChannelRegistry>,
}

impl Api {
	pub fn new(cache: Arc<dyn Cache>, channels: Arc<ChannelRegistry>) -> Api {
		Api { cache, channels }
	}

	/// Runs the HTTP server until the process exits. Must be called from
	/// within a tokio runtime.
	pub async fn serve(self, addr: SocketAddr) -> Result<(), Error> {
		let api = Arc::new(self);
		let make_svc = make_service_fn(move |_conn| {
			let api = api.clone();
			async move { Ok::<_, Infallible>(service_fn(move |req| dispatch(api.clone(), req))) }
		});

		info!("api: listening on {}", addr);
		Server::bind(&addr).serve(make_svc).await?;
		Ok(())
	}
}

async fn dispatch(api: Arc<Api>, req: Request<Body>) -> Result<Response<Body>, Infallible> {
	let method = req.method().clone();
	let path = req.uri().path().to_owned();
	let query = parse_query(req.uri().query().unwrap_or(""));
	info!("api: {} {}", method, path);

	let response = match (&method, path.as_str()) {
		(&Method::GET, "/block") => handle_block(&api, &query),
		(&Method::GET, "/channel") => handle_channel(&api, &query),
		(&Method::GET, "/channels") => handle_channel_list(&api),
		(&Method::POST, "/registration") => handle_registration(&api, req).await,
		_ => not_found(),
	};
	Ok(response)
}

fn parse_query(raw: &str) -> HashMap<String, String> {
	raw.split('&')
		.filter(|kv| !kv.is_empty())
		.filter_map(|kv| {
			let mut parts = kv.splitn(2, '=');
			let key = parts.next()?;
			let value = parts.next().unwrap_or("");
			Some((key.to_owned(), value.to_owned()))
		})
		.collect()
}

fn handle_block(api: &Api, query: &HashMap<String, String>) -> Response<Body> {
	let channel = match query.get("channel") {
		Some(c) => c,
		None => return not_found(),
	};
	let hash_param = match query.get("hash") {
		Some(h) => h,
		None => return not_found(),
	};
	let hash_bytes = match base64::decode_config(hash_param, base64::URL_SAFE_NO_PAD) {
		Ok(b) if b.len() == 32 => b,
		_ => return bad_request("hash must be a 32-byte base64url value"),
	};
	let hash = Hash::from_vec(&hash_bytes).expect("length checked above");
	match api.cache.get_block(&hash) {
		Ok(block) => {
			// The channel query parameter is kept for parity with the
			// original lookup signature; the block itself is content
			// addressed and doesn't need it to be fetched.
			let _ = channel;
			json(&BlockView::new(hash_param, &block))
		}
		Err(e) => {
			error!("api: block lookup failed: {}", e);
			not_found()
		}
	}
}

fn handle_channel(api: &Api, query: &HashMap<String, String>) -> Response<Body> {
	let channel = match query.get("channel") {
		Some(c) => c,
		None => return not_found(),
	};
	match api.cache.get_head(channel) {
		Ok(reference) => json(&ChannelView::from(&reference)),
		Err(e) => {
			error!("api: channel lookup failed: {}", e);
			not_found()
		}
	}
}

fn handle_channel_list(api: &Api) -> Response<Body> {
	let mut channel = Vec::new();
	for name in api.channels.names() {
		if let Ok(reference) = api.cache.get_head(&name) {
			channel.push(ChannelView::from(&reference));
		}
	}
	json(&ChannelListView { channel })
}

const REGISTRATION_KEY_PREFIX: &[u8] = b"registration:";

/// True if `alias` is a well-formed handle: non-empty, no longer than 64
/// bytes, and limited to ASCII letters, digits, `-` and `_` so it's safe to
/// embed directly in the raw cache key.
fn is_well_formed_alias(alias: &str) -> bool {
	!alias.is_empty()
		&& alias.len() <= 64
		&& alias.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Accepts a merchant-registration request (alias + contact info) and
/// records it in the Cache under a private key prefix. No payment
/// processor is ever contacted -- that integration is out of scope here --
/// but the request is validated and persisted exactly as a real front door
/// to one would need to.
async fn handle_registration(api: &Api, req: Request<Body>) -> Response<Body> {
	let body = match hyper::body::to_bytes(req.into_body()).await {
		Ok(b) => b,
		Err(e) => {
			warn!("api: failed to read registration body: {}", e);
			return bad_request("could not read request body");
		}
	};
	let request: RegistrationRequest = match serde_json::from_slice(&body) {
		Ok(r) => r,
		Err(e) => {
			warn!("api: malformed registration body: {}", e);
			return bad_request("body must be a JSON object with \"alias\" and \"contact\" fields");
		}
	};
	if !is_well_formed_alias(&request.alias) {
		return bad_request("alias must be 1-64 characters of letters, digits, '-' or '_'");
	}
	if request.contact.is_empty() {
		return bad_request("contact must not be empty");
	}

	let timestamp = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0);
	let record = RegistrationRecord {
		alias: request.alias.clone(),
		contact: request.contact,
		timestamp,
	};
	let value = match serde_json::to_vec(&record) {
		Ok(v) => v,
		Err(e) => {
			error!("api: failed to serialize registration record: {}", e);
			return Response::builder()
				.status(StatusCode::INTERNAL_SERVER_ERROR)
				.body(Body::empty())
				.expect("building an empty response cannot fail");
		}
	};
	let key = [REGISTRATION_KEY_PREFIX, request.alias.as_bytes()].concat();
	if let Err(e) = api.cache.put_raw(&key, &value) {
		error!("api: failed to persist registration for {}: {}", request.alias, e);
		return Response::builder()
			.status(StatusCode::INTERNAL_SERVER_ERROR)
			.body(Body::empty())
			.expect("building an empty response cannot fail");
	}

	info!("api: registered alias {}", request.alias);
	json(&RegistrationAck {
		status: "recorded",
		alias: record.alias,
	})
}

fn json<T: Serialize>(value: &T) -> Response<Body> {
	match serde_json::to_vec(value) {
		Ok(body) => Response::builder()
			.status(StatusCode::OK)
			.header("content-type", "application/json")
			.body(Body::from(body))
			.expect("building a response from a serialized body cannot fail"),
		Err(e) => {
			error!("api: failed to serialize response: {}", e);
			Response::builder()
				.status(StatusCode::INTERNAL_SERVER_ERROR)
				.body(Body::empty())
				.expect("building an empty response cannot fail")
		}
	}
}

fn not_found() -> Response<Body> {
	Response::builder()
		.status(StatusCode::NOT_FOUND)
		.body(Body::empty())
		.expect("building an empty response cannot fail")
}

fn bad_request(message: &str) -> Response<Body> {
	Response::builder()
		.status(StatusCode::BAD_REQUEST)
		.body(Body::from(message.to_owned()))
		.expect("building a response from a fixed body cannot fail")
}

#[cfg(test)]
mod test {
	use super::*;
	use bcsync_cache::mem::MemCache;
	use bcsync_channel::FixedThresholds;
	use bcsync_core::consensus::Difficulty;
	use std::collections::HashMap as Map;

	fn api() -> Api {
		Api::new(
			Arc::new(MemCache::new()),
			Arc::new(ChannelRegistry::new(Box::new(FixedThresholds::new(Map::new(), Difficulty::one())))),
		)
	}

	fn request(body: &str) -> Request<Body> {
		Request::builder()
			.method(Method::POST)
			.uri("/registration")
			.body(Body::from(body.to_owned()))
			.unwrap()
	}

	#[test]
	fn alias_validation_rejects_empty_and_unusual_characters() {
		assert!(!is_well_formed_alias(""));
		assert!(!is_well_formed_alias("has a space"));
		assert!(!is_well_formed_alias("has/slash"));
		assert!(is_well_formed_alias("alice-bob_42"));
		assert!(!is_well_formed_alias(&"a".repeat(65)));
	}

	#[tokio::test]
	async fn registration_persists_a_well_formed_request() {
		let api = api();
		let resp = handle_registration(&api, request(r#"{"alias":"alice","contact":"alice@example.org"}"#)).await;
		assert_eq!(resp.status(), StatusCode::OK);

		let stored = api.cache.get_raw(b"registration:alice").unwrap().unwrap();
		let record: RegistrationRecord = serde_json::from_slice(&stored).unwrap();
		assert_eq!(record.alias, "alice");
		assert_eq!(record.contact, "alice@example.org");
	}

	#[tokio::test]
	async fn registration_rejects_a_malformed_alias() {
		let api = api();
		let resp = handle_registration(&api, request(r#"{"alias":"has space","contact":"a@b.com"}"#)).await;
		assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
		assert!(api.cache.get_raw(b"registration:has space").unwrap().is_none());
	}

	#[tokio::test]
	async fn registration_rejects_a_non_json_body() {
		let api = api();
		let resp = handle_registration(&api, request("not json")).await;
		assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
	}
}
