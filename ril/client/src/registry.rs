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

/// Count of kinds a handler table can hold
pub const HANDLER_TABLE_SIZE: usize = 32;

/// Kind-keyed table, holding at most one handler by kind
#[derive(Debug)]
pub struct HandlerTable<H> {
    entries: Vec<(u32, H)>,
}

impl<H> Default for HandlerTable<H> {
    fn default() -> Self {
        Self { entries: Vec::with_capacity(HANDLER_TABLE_SIZE) }
    }
}

impl<H: Clone> HandlerTable<H> {
    /// Empty table
    pub fn new() -> Self {
        Default::default()
    }

    /// Register `handler` for `kind`, replacing any previous one.
    /// A `None` handler removes the entry of `kind`.
    pub fn register(&mut self, kind: u32, handler: Option<H>) -> Result<()> {
        let index = self.entries.iter().position(|(k, _)| *k == kind);
        match (index, handler) {
            (Some(index), None) => {
                self.entries.remove(index);
            }
            (None, None) => (),
            (Some(index), Some(handler)) => self.entries[index].1 = handler,
            (None, Some(_)) if self.entries.len() == HANDLER_TABLE_SIZE => {
                return Err(Error::Resource)
            }
            (None, Some(handler)) => self.entries.push((kind, handler)),
        }
        Ok(())
    }

    /// Handler registered for `kind`
    pub fn find(&self, kind: u32) -> Option<H> {
        self.entries.iter().find(|(k, _)| *k == kind).map(|(_, h)| h.clone())
    }

    /// Count of registered kinds
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no handler is registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_and_remove() {
        let mut table = HandlerTable::new();
        table.register(7, Some("first")).unwrap();
        table.register(7, Some("second")).unwrap();
        assert_eq!(table.find(7), Some("second"));
        assert_eq!(table.len(), 1);

        table.register(7, None).unwrap();
        assert_eq!(table.find(7), None);
        table.register(7, None).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn capacity() {
        let mut table = HandlerTable::new();
        for kind in 0..HANDLER_TABLE_SIZE as u32 {
            table.register(kind, Some(kind)).unwrap();
        }
        assert_eq!(table.register(100, Some(100)), Err(Error::Resource));
        assert_eq!(table.register(3, Some(33)), Ok(()));
        assert_eq!(table.register(100, None), Ok(()));

        table.register(0, None).unwrap();
        assert_eq!(table.register(100, Some(100)), Ok(()));
        assert_eq!(table.find(100), Some(100));
        assert_eq!(table.find(3), Some(33));
    }
}
