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

//! Length-delimited protobuf framing: a varint byte count followed by the
//! serialized payload. Every TCP port except CONNECT speaks this framing.

use std::io::{self, Read, Write};

use prost::Message;

use crate::consensus::MAX_FRAME_SIZE;

/// Writes `msg` to `writer` as a varint length prefix followed by its
/// protobuf encoding.
pub fn write_framed<W: Write, M: Message>(writer: &mut W, msg: &M) -> io::Result<()> {
	let mut buf = Vec::with_capacity(msg.encoded_len());
	msg.encode(&mut buf)
		.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
	write_varint(writer, buf.len() as u64)?;
	writer.write_all(&buf)
}

/// Reads one length-delimited protobuf message from `reader`. Rejects
/// frames whose declared length exceeds `MAX_FRAME_SIZE`, without reading
/// the oversized payload off the wire.
pub fn read_framed<R: Read, M: Message + Default>(reader: &mut R) -> io::Result<M> {
	let len = read_varint(reader)? as usize;
	if len > MAX_FRAME_SIZE {
		return Err(io::Error::new(
			io::ErrorKind::InvalidData,
			format!("frame of {} bytes exceeds the {} byte sanity bound", len, MAX_FRAME_SIZE),
		));
	}
	let mut buf = vec![0u8; len];
	reader.read_exact(&mut buf)?;
	M::decode(&buf[..]).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn write_varint<W: Write>(writer: &mut W, mut value: u64) -> io::Result<()> {
	loop {
		let mut byte = (value & 0x7f) as u8;
		value >>= 7;
		if value != 0 {
			byte |= 0x80;
		}
		writer.write_all(&[byte])?;
		if value == 0 {
			return Ok(());
		}
	}
}

fn read_varint<R: Read>(reader: &mut R) -> io::Result<u64> {
	let mut result: u64 = 0;
	let mut shift = 0u32;
	loop {
		if shift >= 64 {
			return Err(io::Error::new(io::ErrorKind::InvalidData, "varint too long"));
		}
		let mut byte = [0u8; 1];
		reader.read_exact(&mut byte)?;
		result |= u64::from(byte[0] & 0x7f) << shift;
		if byte[0] & 0x80 == 0 {
			return Ok(result);
		}
		shift += 7;
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::pb::Reference;
	use std::io::Cursor;

	#[test]
	fn round_trips_a_message() {
		let r = Reference {
			timestamp: 42,
			channel_name: "Test".into(),
			block_hash: vec![1, 2, 3],
			record_hash: vec![],
		};
		let mut buf = Vec::new();
		write_framed(&mut buf, &r).unwrap();

		let mut cur = Cursor::new(buf);
		let decoded: Reference = read_framed(&mut cur).unwrap();
		assert_eq!(decoded, r);
	}

	#[test]
	fn rejects_oversized_frame_without_reading_payload() {
		let mut buf = Vec::new();
		write_varint(&mut buf, (MAX_FRAME_SIZE + 1) as u64).unwrap();
		// Deliberately do not append a payload: the reader must bail out
		// from the length prefix alone.
		let mut cur = Cursor::new(buf);
		let res: io::Result<Reference> = read_framed(&mut cur);
		assert!(res.is_err());
	}

	#[test]
	fn truncated_frame_is_an_io_error() {
		let r = Reference {
			timestamp: 1,
			channel_name: "c".into(),
			block_hash: vec![9; 32],
			record_hash: vec![],
		};
		let mut buf = Vec::new();
		write_framed(&mut buf, &r).unwrap();
		buf.truncate(buf.len() - 1);
		let mut cur = Cursor::new(buf);
		let res: io::Result<Reference> = read_framed(&mut cur);
		assert!(res.is_err());
	}
}
