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

//! Parcel encoding shared with the RIL daemon: `int32` fields in host byte
//! order, byte blobs zero-padded to a 4 bytes boundary.

const ALIGN: usize = 4;

fn padded(len: usize) -> usize {
    (len + ALIGN - 1) & !(ALIGN - 1)
}

pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn get(&mut self, n: usize) -> Option<&'a [u8]> {
        if n > self.data.len() - self.pos {
            return None;
        }
        let old_pos = self.pos;
        self.pos += n;
        Some(&self.data[old_pos..self.pos])
    }

    pub(crate) fn read_i32(&mut self) -> Option<i32> {
        Some(i32::from_ne_bytes(self.get(4)?.try_into().ok()?))
    }

    pub(crate) fn read_u32(&mut self) -> Option<u32> {
        Some(self.read_i32()? as u32)
    }

    /// Blob of `len` bytes. Trailing padding is consumed when present, a
    /// peer that does not pad its last blob is still accepted.
    pub(crate) fn read_inplace(&mut self, len: usize) -> Option<&'a [u8]> {
        let blob = self.get(len)?;
        let pad = (padded(len) - len).min(self.remaining());
        self.pos += pad;
        Some(blob)
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

pub(crate) struct Writer {
    vec: Vec<u8>,
}

impl Writer {
    pub(crate) fn new(vec: Vec<u8>) -> Self {
        Self { vec }
    }

    pub(crate) fn into_vec(self) -> Vec<u8> {
        self.vec
    }

    pub(crate) fn write_i32(&mut self, v: i32) {
        self.vec.extend_from_slice(&v.to_ne_bytes());
    }

    pub(crate) fn write_u32(&mut self, v: u32) {
        self.write_i32(v as i32);
    }

    pub(crate) fn write_blob(&mut self, data: &[u8]) {
        self.vec.extend_from_slice(data);
        self.vec.resize(self.vec.len() + padded(data.len()) - data.len(), 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_is_padded() {
        let mut w = Writer::new(Vec::new());
        w.write_i32(3);
        w.write_blob(b"abc");
        w.write_i32(-1);
        let data = w.into_vec();
        assert_eq!(data.len(), 12);
        assert_eq!(&data[4..8], b"abc\0");

        let mut r = Reader::new(&data);
        let len = r.read_i32().unwrap() as usize;
        assert_eq!(r.read_inplace(len), Some(&b"abc"[..]));
        assert_eq!(r.read_i32(), Some(-1));
        assert_eq!(r.remaining(), 0);
        assert_eq!(r.read_i32(), None);
    }

    #[test]
    fn unpadded_tail() {
        let mut data = 2i32.to_ne_bytes().to_vec();
        data.extend_from_slice(b"ok");

        let mut r = Reader::new(&data);
        assert_eq!(r.read_i32(), Some(2));
        assert_eq!(r.read_inplace(2), Some(&b"ok"[..]));
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn truncated_blob() {
        let data = [1u8, 2, 3];
        let mut r = Reader::new(&data);
        assert_eq!(r.read_inplace(4), None);
        assert_eq!(r.read_i32(), None);
        assert_eq!(r.read_inplace(3), Some(&data[..]));
    }
}
