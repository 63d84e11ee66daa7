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

use crate::error::{Error, Result};
use crate::token::{Token, TokenPool, TOKEN_POOL_SIZE};

/// Capacity of the request history
pub const HISTORY_CAPACITY: usize = 32;

// A successful token allocation must always find a free history slot.
const _: () = assert!(HISTORY_CAPACITY == TOKEN_POOL_SIZE);

/// Request kind sent with a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Token of the request
    pub token: Token,
    /// Logical kind of the request, selecting its completion handler
    pub kind: u32,
    /// Unregister the completion handler once it has been called
    pub one_shot: bool,
}

/// Fixed-size table of the requests sent and not yet answered
#[derive(Debug)]
pub struct RequestHistory {
    slots: [Option<HistoryEntry>; HISTORY_CAPACITY],
}

impl Default for RequestHistory {
    fn default() -> Self {
        Self { slots: [None; HISTORY_CAPACITY] }
    }
}

impl RequestHistory {
    /// Empty history
    pub fn new() -> Self {
        Default::default()
    }

    /// Record that `token` was sent for a request of `kind`
    pub fn record(&mut self, token: Token, kind: u32, one_shot: bool) -> Result<()> {
        let slot = self.slots.iter_mut().find(|s| s.is_none()).ok_or(Error::Resource)?;
        *slot = Some(HistoryEntry { token, kind, one_shot });
        log::debug!("history: token {:?} for request {}", token, kind);
        Ok(())
    }

    /// Forget `token`, returning its entry
    pub fn clear(&mut self, token: Token) -> Option<HistoryEntry> {
        let slot = self.slots.iter_mut().find(|s| matches!(s, Some(e) if e.token == token))?;
        slot.take()
    }

    /// Request kind sent with `token`
    pub fn find_kind(&self, token: Token) -> Option<u32> {
        self.find(token).map(|e| e.kind)
    }

    /// Entry recorded for `token`
    pub fn find(&self, token: Token) -> Option<&HistoryEntry> {
        self.slots.iter().flatten().find(|e| e.token == token)
    }

    /// Count of recorded entries
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Whether no request is recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take_all(&mut self) -> impl Iterator<Item = HistoryEntry> + '_ {
        self.slots.iter_mut().filter_map(Option::take)
    }
}

/// Token pool and request history, kept in lockstep
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    tokens: TokenPool,
    history: RequestHistory,
}

impl InFlight {
    /// Allocate a token for a request of `kind`, and record it
    pub(crate) fn begin(&mut self, kind: u32, one_shot: bool) -> Result<Token> {
        let token = self.tokens.allocate().ok_or(Error::Again)?;
        if let Err(e) = self.history.record(token, kind, one_shot) {
            self.tokens.free(token);
            return Err(e);
        }
        Ok(token)
    }

    /// Token of wire value `value`, when in flight
    pub(crate) fn lookup(&self, value: u32) -> Option<Token> {
        self.tokens.validate(value)
    }

    pub(crate) fn entry(&self, token: Token) -> Option<&HistoryEntry> {
        self.history.find(token)
    }

    /// Release `token` and its history entry
    pub(crate) fn complete(&mut self, token: Token) -> Option<HistoryEntry> {
        self.tokens.free(token);
        self.history.clear(token)
    }

    /// Release every request in flight, returning how many there were
    pub(crate) fn abandon_all(&mut self) -> usize {
        let entries: Vec<_> = self.history.take_all().collect();
        for entry in &entries {
            log::warn!("Abandoning request {} with token {:?}", entry.kind, entry.token);
            self.tokens.free(entry.token);
        }
        debug_assert_eq!(self.tokens.in_use(), 0);
        entries.len()
    }

    pub(crate) fn is_valid(&self, token: Token) -> bool {
        self.tokens.is_valid(token.get())
    }

    pub(crate) fn len(&self) -> usize {
        self.tokens.in_use()
    }
}
