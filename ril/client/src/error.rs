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

use num_derive::{FromPrimitive, ToPrimitive};
use std::fmt;

/// Status codes of the multi-client library.
///
/// Discriminants are the values exchanged with C callers and passed to
/// error callbacks; success (`0`) is represented by `Ok(_)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
#[repr(i32)]
pub enum Error {
    /// All request tokens are in flight; the send may be retried later
    Again = 1,
    /// The client handle has not been opened
    NotInitialized = 2,
    /// Bad parameter, unknown response type or invalid token
    InvalidArgument = 3,
    /// Socket connect, write, or end-of-stream failure
    Connection = 4,
    /// Malformed record or read failure
    Io = 5,
    /// A fixed-size table is full
    Resource = 6,
    /// Anything else
    Unknown = 7,
}

/// Result type of the multi-client library
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Integer code, as returned by the C entry points
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::Again => "request tokens exhausted, try again",
            Error::NotInitialized => "client is not initialized",
            Error::InvalidArgument => "invalid argument",
            Error::Connection => "connection error",
            Error::Io => "I/O error",
            Error::Resource => "resource not available",
            Error::Unknown => "unknown error",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(_: std::io::Error) -> Self {
        Error::Io
    }
}

impl From<nix::errno::Errno> for Error {
    fn from(_: nix::errno::Errno) -> Self {
        Error::Io
    }
}

/// Failure delivered asynchronously to the registered error callback.
///
/// A client that never registers an error callback has no way to learn that a
/// request failed: its completion handler simply never runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorEvent {
    /// Fault detected locally by the reader thread
    Local(Error),
    /// Non-success code carried by a solicited reply of the daemon
    Remote(i32),
}

impl ErrorEvent {
    /// Raw code, as passed to C error callbacks
    pub fn code(&self) -> i32 {
        match *self {
            ErrorEvent::Local(e) => e.code(),
            ErrorEvent::Remote(code) => code,
        }
    }
}
