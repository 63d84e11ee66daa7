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

//! RIL multi-client
//!
//! A client session sends requests to a RIL daemon over a Unix-domain socket,
//! and receives the replies and events on a reader thread:
//!
//! ```text
//!         caller                      reader thread
//!            |                              ^
//!            | send_raw_request()           | handler(payload)
//!        ____v______________________________|____
//!       |  tokens   | history |    handlers      |
//!       |___________|_________|__________________|
//!            |                              ^
//!            | [len][kind][token][payload]  | [len][type][token|kind]...
//!            v                              |
//!                         @Multiclient
//! ```
//!
//! Each request in flight holds one of 32 single-bit tokens, echoed back by
//! the daemon in the reply. The reply is dispatched to the handler registered
//! for the kind of the request.

mod client;
mod config;
mod dispatch;
mod error;
mod history;
mod message;
mod parcel;
mod reader;
mod record;
mod registry;
mod token;
mod transport;

pub mod oem;
pub mod sap;


pub use client::{ErrorCallback, Handler, RilClient};
pub use config::{ClientConfig, Endpoint};
pub use error::{Error, ErrorEvent, Result};
pub use history::{HistoryEntry, RequestHistory, HISTORY_CAPACITY};
pub use message::{Request, Response, RESPONSE_SOLICITED, RESPONSE_UNSOLICITED};
pub use record::{frame, RecordStream, MAX_COMMAND_BYTES};
pub use registry::{HandlerTable, HANDLER_TABLE_SIZE};
pub use token::{Token, TokenPool, TOKEN_POOL_SIZE};

/// Inits logging for Android
#[cfg(target_os = "android")]
pub fn init_logging() {
    android_logger::init_once(android_logger::Config::default().with_tag("RILClient"));
}

/// Inits logging for host
#[cfg(not(target_os = "android"))]
pub fn init_logging() {
    env_logger::Builder::new().parse_default_env().try_init().ok();
}
