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

use crate::config::Endpoint;
use crate::error::{Error, Result};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags};
use nix::sys::socket::{send, MsgFlags};
use std::net::Shutdown;
use std::os::fd::AsRawFd;
use std::os::unix::net::{SocketAddr, UnixStream};
use std::sync::{Mutex, PoisonError};

#[cfg(target_os = "android")]
use std::os::android::net::SocketAddrExt;
#[cfg(target_os = "linux")]
use std::os::linux::net::SocketAddrExt;

/// Connect a stream socket to `endpoint`, in the abstract namespace
pub(crate) fn connect(endpoint: &Endpoint) -> Result<UnixStream> {
    let addr = SocketAddr::from_abstract_name(endpoint.name()).map_err(|e| {
        log::error!("Invalid endpoint {}: {}", endpoint, e);
        Error::InvalidArgument
    })?;
    UnixStream::connect_addr(&addr).map_err(|e| {
        log::error!("Connecting to {} failed: {}", endpoint, e);
        Error::Connection
    })
}

/// Connected socket, written by the senders of a session
pub(crate) struct Link {
    stream: UnixStream,
    send_lock: Mutex<()>,
}

impl Link {
    pub(crate) fn new(stream: UnixStream) -> Self {
        Self { stream, send_lock: Mutex::new(()) }
    }

    /// Write a whole frame. Frames of concurrent senders never interleave.
    pub(crate) fn send(&self, frame: &[u8]) -> Result<()> {
        let _guard = self.send_lock.lock().unwrap_or_else(PoisonError::into_inner);
        blocking_write(&self.stream, frame)
    }

    /// Shut the socket down. A send waiting for room in the socket buffer
    /// fails, and so do the later ones.
    pub(crate) fn close(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// Write the whole of `buf`, waiting for room in the socket buffer.
/// On failure the socket is shut down, and no further write can succeed.
fn blocking_write(stream: &UnixStream, buf: &[u8]) -> Result<()> {
    let mut offset = 0;
    while offset < buf.len() {
        match send(stream.as_raw_fd(), &buf[offset..], MsgFlags::MSG_NOSIGNAL) {
            Ok(n) => offset += n,
            Err(Errno::EINTR) => continue,
            Err(Errno::EAGAIN) => wait_writable(stream)?,
            Err(e) => return Err(broken(stream, e)),
        }
    }
    Ok(())
}

/// Write a wake-up message, without blocking
pub(crate) fn wake(stream: &UnixStream) -> Result<()> {
    loop {
        match send(stream.as_raw_fd(), b"close", MsgFlags::MSG_NOSIGNAL | MsgFlags::MSG_DONTWAIT) {
            Err(Errno::EINTR) => continue,
            Ok(_) => return Ok(()),
            Err(e) => return Err(e.into()),
        }
    }
}

fn wait_writable(stream: &UnixStream) -> Result<()> {
    loop {
        let mut fds = [PollFd::new(stream, PollFlags::POLLOUT)];
        match poll(&mut fds, -1) {
            Err(Errno::EINTR) => continue,
            Ok(_) => return Ok(()),
            Err(e) => return Err(broken(stream, e)),
        }
    }
}

fn broken(stream: &UnixStream, e: Errno) -> Error {
    log::error!("Unexpected error on write: {}", e);
    let _ = stream.shutdown(Shutdown::Both);
    Error::Connection
}
