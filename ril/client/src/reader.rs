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

use crate::client::Shared;
use crate::dispatch::process_record;
use crate::error::{Error, ErrorEvent, Result};
use crate::record::RecordStream;
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags};
use std::io::{self, Read};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Background thread of a connected session, decoding and dispatching every
/// record received. It runs until the end of the stream, a fatal read
/// error, or a wake-up message from `disconnect()`.
pub(crate) struct ReaderTask {
    shared: Arc<Shared>,
    generation: u64,
    records: RecordStream<UnixStream>,
    wake: UnixStream,
}

impl ReaderTask {
    pub(crate) fn new(
        shared: Arc<Shared>,
        generation: u64,
        stream: UnixStream,
        wake: UnixStream,
        max_record_len: usize,
    ) -> Self {
        Self { shared, generation, records: RecordStream::new(stream, max_record_len), wake }
    }

    pub(crate) fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new().name("ril-client-rx".into()).spawn(move || self.run())
    }

    fn run(mut self) {
        loop {
            let (socket_ready, wake_ready) = match self.wait() {
                Ok(ready) => ready,
                Err(e) => {
                    log::error!("Poll failed: {}", e);
                    return self.stop(Some(Error::Connection));
                }
            };
            if socket_ready {
                if let Err(e) = self.drain() {
                    return self.stop(Some(e));
                }
            }
            if wake_ready || !self.shared.is_current(self.generation) {
                self.drain_wake();
                return self.stop(None);
            }
        }
    }

    /// Block until the socket or the wake-up stream is ready
    fn wait(&self) -> nix::Result<(bool, bool)> {
        let ready =
            PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR | PollFlags::POLLNVAL;
        loop {
            let mut fds = [
                PollFd::new(self.records.get_ref(), PollFlags::POLLIN),
                PollFd::new(&self.wake, PollFlags::POLLIN),
            ];
            match poll(&mut fds, -1) {
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(e),
                Ok(_) => (),
            }
            let is_ready = |fd: &PollFd| fd.revents().is_some_and(|r| r.intersects(ready));
            return Ok((is_ready(&fds[0]), is_ready(&fds[1])));
        }
    }

    /// Process the complete records available, until the socket would block.
    /// An error returned is fatal for the connection.
    fn drain(&mut self) -> Result<()> {
        loop {
            match self.records.next_record() {
                Ok(Some(record)) => {
                    if let Err(e) = process_record(&self.shared, self.generation, &record) {
                        log::warn!("Dropped record: {}", e);
                        self.shared.report(ErrorEvent::Local(e));
                    }
                }
                Ok(None) => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    log::warn!("Connection closed by the daemon");
                    return Err(Error::Connection);
                }
                Err(e) => {
                    log::error!("Read failed: {}", e);
                    return Err(Error::Connection);
                }
            }
        }
    }

    fn drain_wake(&mut self) {
        let mut buf = [0u8; 16];
        loop {
            match self.wake.read(&mut buf) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    }

    /// Shut the socket down, and end the session unless it has already been
    /// ended by `disconnect()` or a new connection.
    fn stop(self, error: Option<Error>) {
        let _ = self.records.get_ref().shutdown(Shutdown::Both);
        let ended = self.shared.end_session(self.generation);
        if let Some(error) = error.filter(|_| ended) {
            self.shared.report(ErrorEvent::Local(error));
        }
        log::info!("Reader stopped");
    }
}
