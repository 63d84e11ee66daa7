// Copyright 2024, The Android Open Source Project
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

//! Record framing: each record is preceded by its length, as a big-endian
//! `u32`.

use bytes::{Buf, Bytes, BytesMut};
use std::io::{self, Read};

/// Default maximum size of a record
pub const MAX_COMMAND_BYTES: usize = 8 * 1024;

const HEADER_LEN: usize = 4;
const READ_CHUNK: usize = 1024;

/// Prefix `body` with its length
pub fn frame(body: &[u8]) -> Vec<u8> {
    let mut vec = Vec::with_capacity(HEADER_LEN + body.len());
    vec.extend_from_slice(&(body.len() as u32).to_be_bytes());
    vec.extend_from_slice(body);
    vec
}

/// Buffers the bytes read from a non-blocking stream, and yields complete
/// records only.
pub struct RecordStream<R> {
    inner: R,
    buf: BytesMut,
    max_record_len: usize,
}

impl<R: Read> RecordStream<R> {
    /// Wrap `inner`, rejecting records larger than `max_record_len`
    pub fn new(inner: R, max_record_len: usize) -> Self {
        Self { inner, buf: BytesMut::with_capacity(HEADER_LEN + max_record_len), max_record_len }
    }

    /// Next complete record.
    ///
    /// Returns `Ok(None)` when no complete record is buffered and the stream
    /// would block. The end of stream is reported as an `UnexpectedEof` error,
    /// an oversized record as `InvalidData`; both are fatal for the stream.
    pub fn next_record(&mut self) -> io::Result<Option<Bytes>> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(record) = self.take_record()? {
                return Ok(Some(record));
            }
            match self.inner.read(&mut chunk) {
                Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(None),
                Err(e) => return Err(e),
            }
        }
    }

    /// The wrapped stream
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    fn take_record(&mut self) -> io::Result<Option<Bytes>> {
        let Some(header) = self.buf.get(..HEADER_LEN) else {
            return Ok(None);
        };
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        if len > self.max_record_len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("record of {} bytes exceeds {} bytes", len, self.max_record_len),
            ));
        }
        if self.buf.len() < HEADER_LEN + len {
            return Ok(None);
        }
        self.buf.advance(HEADER_LEN);
        Ok(Some(self.buf.split_to(len).freeze()))
    }
}
