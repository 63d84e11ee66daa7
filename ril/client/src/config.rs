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

use crate::record::MAX_COMMAND_BYTES;
use std::fmt;

/// Well-known abstract socket names of the daemons accepting multi-clients
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Endpoint {
    /// RIL daemon
    #[default]
    Multiclient,
    /// Qualcomm RIL daemon
    QMulticlient,
    /// Second RIL daemon, on dual-mode CDMA / GSM devices
    Second,
    /// Any other abstract name
    Custom(String),
}

impl Endpoint {
    /// Name in the abstract socket namespace
    pub fn name(&self) -> &str {
        match self {
            Endpoint::Multiclient => "Multiclient",
            Endpoint::QMulticlient => "QMulticlient",
            Endpoint::Second => "Multiclient2",
            Endpoint::Custom(name) => name,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name())
    }
}

/// Client session configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Endpoint used by `RilClient::connect()`
    pub endpoint: Endpoint,
    /// Records larger than this break the connection
    pub max_record_len: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { endpoint: Endpoint::default(), max_record_len: MAX_COMMAND_BYTES }
    }
}

impl ClientConfig {
    /// Select the daemon endpoint
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Select the maximum size of incoming records
    pub fn with_max_record_len(mut self, max_record_len: usize) -> Self {
        self.max_record_len = max_record_len;
        self
    }
}
