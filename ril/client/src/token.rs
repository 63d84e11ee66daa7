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

use std::fmt;
use std::num::NonZeroU32;

/// Maximum count of requests in flight
pub const TOKEN_POOL_SIZE: usize = u32::BITS as usize;

/// Identifier of a request in flight, a value with exactly one bit set
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(NonZeroU32);

impl Token {
    /// Token from its wire value, `None` unless exactly one bit is set
    pub fn from_raw(value: u32) -> Option<Self> {
        NonZeroU32::new(value).filter(|v| v.is_power_of_two()).map(Self)
    }

    /// Wire value
    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Index of the bit in the pool
    pub(crate) fn slot(self) -> usize {
        self.0.trailing_zeros() as usize
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:#010x})", self.get())
    }
}

/// Bitmap allocator of tokens
#[derive(Debug, Default)]
pub struct TokenPool {
    bits: u32,
}

impl TokenPool {
    /// Empty pool
    pub fn new() -> Self {
        Default::default()
    }

    /// Take the lowest free token, `None` when all are in flight
    pub fn allocate(&mut self) -> Option<Token> {
        if self.bits == u32::MAX {
            return None;
        }
        let token = Token::from_raw(1 << self.bits.trailing_ones())?;
        self.bits |= token.get();
        Some(token)
    }

    /// Release `token`; releasing a free token does nothing
    pub fn free(&mut self, token: Token) {
        self.bits &= !token.get();
    }

    /// Whether `value` is a token currently in flight
    pub fn is_valid(&self, value: u32) -> bool {
        self.validate(value).is_some()
    }

    /// Token of wire value `value`, when in flight
    pub fn validate(&self, value: u32) -> Option<Token> {
        Token::from_raw(value).filter(|token| self.bits & token.get() != 0)
    }

    /// Count of tokens in flight
    pub fn in_use(&self) -> usize {
        self.bits.count_ones() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn exhaustion() {
        let mut pool = TokenPool::new();
        let tokens: HashSet<_> = (0..TOKEN_POOL_SIZE).map(|_| pool.allocate().unwrap()).collect();
        assert_eq!(tokens.len(), TOKEN_POOL_SIZE);
        assert!(tokens.iter().all(|t| pool.is_valid(t.get())));
        assert_eq!(pool.allocate(), None);
        assert_eq!(pool.in_use(), 32);
    }

    #[test]
    fn reuse() {
        let mut pool = TokenPool::new();
        let t0 = pool.allocate().unwrap();
        let t1 = pool.allocate().unwrap();
        assert_eq!(t0.get(), 0x1);
        assert_eq!(t1.get(), 0x2);

        pool.free(t0);
        assert!(!pool.is_valid(t0.get()));
        assert!(pool.is_valid(t1.get()));
        pool.free(t0);
        assert_eq!(pool.in_use(), 1);

        assert_eq!(pool.allocate(), Some(t0));
        assert!(pool.is_valid(t0.get()));
    }

    #[test]
    fn validity() {
        let mut pool = TokenPool::new();
        let t = pool.allocate().unwrap();
        let _ = pool.allocate().unwrap();

        assert!(!pool.is_valid(0));
        assert!(!pool.is_valid(0x3));
        assert!(!pool.is_valid(0x8000_0000));
        assert_eq!(pool.validate(t.get()), Some(t));
        assert_eq!(Token::from_raw(0x8000_0000).map(Token::slot), Some(31));
    }
}
