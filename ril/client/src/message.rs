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

//! Records exchanged with the daemon, without their length prefix.

use crate::parcel::{Reader, Writer};

/// Response type of a reply correlated to a request by its token
pub const RESPONSE_SOLICITED: i32 = 0;
/// Response type of an event
pub const RESPONSE_UNSOLICITED: i32 = 1;

/// Request sent to the daemon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request<'a> {
    /// Command identifier
    pub kind: u32,
    /// Token, echoed back in the reply
    pub token: u32,
    /// Opaque payload
    pub payload: &'a [u8],
}

impl<'a> Request<'a> {
    /// Read a request record
    pub fn from_bytes(data: &'a [u8]) -> Option<Self> {
        let mut r = Reader::new(data);
        let kind = r.read_u32()?;
        let token = r.read_u32()?;
        let len = usize::try_from(r.read_i32()?).ok()?;
        Some(Self { kind, token, payload: r.read_inplace(len)? })
    }

    /// Output the request record
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new(Vec::with_capacity(12 + self.payload.len() + 3));
        w.write_u32(self.kind);
        w.write_u32(self.token);
        w.write_i32(self.payload.len() as i32);
        w.write_blob(self.payload);
        w.into_vec()
    }
}

/// Reply sent by the daemon.
/// A `None` payload omits the length field, which readers take as empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response<'a> {
    /// Reply to the request sent with `token`
    Solicited {
        /// Token of the request
        token: u32,
        /// Zero on success
        error: i32,
        /// Response data
        payload: Option<&'a [u8]>,
    },
    /// Event of kind `kind`
    Unsolicited {
        /// Event identifier
        kind: u32,
        /// Event data
        payload: Option<&'a [u8]>,
    },
}

impl Response<'_> {
    /// Output the reply record
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new(Vec::new());
        let payload = match *self {
            Response::Solicited { token, error, payload } => {
                w.write_i32(RESPONSE_SOLICITED);
                w.write_u32(token);
                w.write_i32(error);
                payload
            }
            Response::Unsolicited { kind, payload } => {
                w.write_i32(RESPONSE_UNSOLICITED);
                w.write_u32(kind);
                payload
            }
        };
        if let Some(payload) = payload {
            w.write_i32(payload.len() as i32);
            w.write_blob(payload);
        }
        w.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(data: &[u8]) -> Vec<i32> {
        data.chunks(4).map(|c| i32::from_ne_bytes(c.try_into().unwrap())).collect()
    }

    #[test]
    fn request() {
        let request = Request { kind: 59, token: 0x8000_0000, payload: b"abcde" };
        let data = request.to_bytes();
        assert_eq!(data.len(), 20);
        assert_eq!(&ints(&data)[..3], &[59, i32::MIN, 5]);
        let decoded = Request::from_bytes(&data).unwrap();
        assert_eq!(decoded, request);
        assert_eq!(decoded.to_bytes(), data);
        assert_eq!(Request::from_bytes(&data[..14]), None);
    }

    #[test]
    fn responses() {
        let data = Response::Solicited { token: 4, error: 0, payload: Some(b"ok") }.to_bytes();
        assert_eq!(data.len(), 20);
        assert_eq!(&ints(&data)[..4], &[RESPONSE_SOLICITED, 4, 0, 2]);

        let data = Response::Solicited { token: 4, error: 2, payload: None }.to_bytes();
        assert_eq!(ints(&data), [RESPONSE_SOLICITED, 4, 2]);

        let data = Response::Unsolicited { kind: 1028, payload: Some(&[]) }.to_bytes();
        assert_eq!(ints(&data), [RESPONSE_UNSOLICITED, 1028, 0]);
    }
}
