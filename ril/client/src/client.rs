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

use crate::config::{ClientConfig, Endpoint};
use crate::error::{Error, ErrorEvent, Result};
use crate::history::InFlight;
use crate::message::Request;
use crate::reader::ReaderTask;
use crate::record::frame;
use crate::registry::HandlerTable;
use crate::token::Token;
use crate::transport::{self, Link};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};

/// Completion or event handler, called from the reader thread with the
/// payload of the reply
pub type Handler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Receives the failures detected asynchronously
pub type ErrorCallback = Arc<dyn Fn(ErrorEvent) + Send + Sync>;

/// Tables shared by the senders and the reader thread
pub(crate) struct Tables {
    pub(crate) in_flight: InFlight,
    pub(crate) requests: HandlerTable<Handler>,
    pub(crate) unsolicited: HandlerTable<Handler>,
    /// Unregister the completion handler of the next request once called
    pub(crate) delete_after_dispatch: bool,
    /// Session owning the tokens in flight. Records read by the reader of
    /// an older session are dropped.
    pub(crate) generation: u64,
}

pub(crate) struct Shared {
    tables: Mutex<Tables>,
    on_error: RwLock<Option<ErrorCallback>>,
    connected: AtomicBool,
}

impl Shared {
    pub(crate) fn new() -> Self {
        Self {
            tables: Mutex::new(Tables {
                in_flight: Default::default(),
                requests: HandlerTable::new(),
                unsolicited: HandlerTable::new(),
                delete_after_dispatch: false,
                generation: 0,
            }),
            on_error: RwLock::new(None),
            connected: AtomicBool::new(false),
        }
    }

    /// Lock the tables. The lock must never be held while calling out.
    pub(crate) fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_error_callback(&self, callback: Option<ErrorCallback>) {
        *self.on_error.write().unwrap_or_else(PoisonError::into_inner) = callback;
    }

    /// Deliver `event` to the error callback, if any
    pub(crate) fn report(&self, event: ErrorEvent) {
        let callback = self.on_error.read().unwrap_or_else(PoisonError::into_inner).clone();
        match callback {
            Some(callback) => callback(event),
            None => log::debug!("No error callback for {:?}", event),
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Start a session, returning its generation
    pub(crate) fn begin_session(&self) -> u64 {
        let mut tables = self.tables();
        tables.generation += 1;
        self.connected.store(true, Ordering::SeqCst);
        tables.generation
    }

    /// End session `generation`, abandoning its requests in flight.
    /// Returns false when the session had already ended.
    pub(crate) fn end_session(&self, generation: u64) -> bool {
        let mut tables = self.tables();
        if tables.generation != generation {
            return false;
        }
        tables.generation += 1;
        self.connected.store(false, Ordering::SeqCst);
        let abandoned = tables.in_flight.abandon_all();
        if abandoned > 0 {
            log::warn!("{} requests abandoned without reply", abandoned);
        }
        true
    }

    /// Whether session `generation` is still running
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.tables().generation == generation
    }
}

struct Connection {
    link: Arc<Link>,
    wake: UnixStream,
    reader: Option<JoinHandle<()>>,
    generation: u64,
}

impl Connection {
    /// Close the socket, stop the reader thread, and wait for it, unless
    /// called from it
    fn shutdown(mut self) {
        self.link.close();
        if let Err(e) = transport::wake(&self.wake) {
            log::debug!("Reader not woken: {}", e);
        }
        let Some(reader) = self.reader.take() else {
            return;
        };
        if reader.thread().id() == thread::current().id() {
            log::debug!("Disconnecting from the reader thread");
        } else if reader.join().is_err() {
            log::error!("Reader thread panicked");
        }
    }
}

/// Client session with a RIL daemon.
///
/// Requests are fire-and-forget: replies and events are delivered to the
/// registered handlers, on the reader thread of the session. A failed
/// request only shows through the error callback.
pub struct RilClient {
    config: ClientConfig,
    shared: Arc<Shared>,
    connection: Mutex<Option<Connection>>,
}

impl RilClient {
    /// Create a client using the default configuration
    pub fn open() -> Self {
        Self::open_with(Default::default())
    }

    /// Create a client; no connection is made until `connect()`
    pub fn open_with(config: ClientConfig) -> Self {
        Self { config, shared: Arc::new(Shared::new()), connection: Mutex::new(None) }
    }

    /// The configuration given at creation
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connect to the configured endpoint
    pub fn connect(&self) -> Result<()> {
        self.connect_to(&self.config.endpoint)
    }

    /// Connect to `endpoint`, and start the reader thread.
    /// Succeeds without effect when already connected.
    pub fn connect_to(&self, endpoint: &Endpoint) -> Result<()> {
        // A stale reader may still be running the error callback, which can
        // call back into the client: it is joined without holding the lock.
        let mut connection = loop {
            let mut connection = self.connection();
            if connection.is_some() && self.shared.is_connected() {
                return Ok(());
            }
            let Some(stale) = connection.take() else {
                break connection;
            };
            drop(connection);
            self.shared.end_session(stale.generation);
            stale.shutdown();
        };

        let stream = transport::connect(endpoint)?;
        stream.set_nonblocking(true).map_err(|e| {
            log::error!("Cannot set socket non-blocking: {}", e);
            Error::Connection
        })?;
        let (wake, wake_rx) = UnixStream::pair()?;
        wake_rx.set_nonblocking(true)?;
        let reader_stream = stream.try_clone()?;

        let generation = self.shared.begin_session();
        let task = ReaderTask::new(
            self.shared.clone(),
            generation,
            reader_stream,
            wake_rx,
            self.config.max_record_len,
        );
        let reader = task.spawn().map_err(|e| {
            log::error!("Cannot start reader thread: {}", e);
            self.shared.end_session(generation);
            Error::Io
        })?;
        *connection = Some(Connection {
            link: Arc::new(Link::new(stream)),
            wake,
            reader: Some(reader),
            generation,
        });
        log::info!("Connected to {}", endpoint);
        Ok(())
    }

    /// Stop the reader thread and close the socket. Requests still in flight
    /// are abandoned.
    pub fn disconnect(&self) -> Result<()> {
        let Some(connection) = self.connection().take() else {
            return Ok(());
        };
        self.shared.end_session(connection.generation);
        connection.shutdown();
        log::info!("Disconnected");
        Ok(())
    }

    /// Disconnect, and release the client
    pub fn close(self) -> Result<()> {
        self.disconnect()
    }

    /// Whether the session is connected, and its reader running
    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    /// Register the handler of events of `kind`; `None` unregisters it
    pub fn register_unsolicited_handler(&self, kind: u32, handler: Option<Handler>) -> Result<()> {
        self.shared.tables().unsolicited.register(kind, handler)
    }

    /// Register the completion handler of requests of `kind`; `None`
    /// unregisters it
    pub fn register_request_handler(&self, kind: u32, handler: Option<Handler>) -> Result<()> {
        self.shared.tables().requests.register(kind, handler)
    }

    /// Register the error callback; `None` unregisters it
    pub fn register_error_callback(&self, callback: Option<ErrorCallback>) {
        self.shared.set_error_callback(callback)
    }

    /// Unregister the completion handler of the next request sent, once it
    /// has been called
    pub fn mark_delete_after_dispatch(&self) {
        self.shared.tables().delete_after_dispatch = true;
    }

    /// Send a request of `kind`.
    ///
    /// Returns the token of the request, or `Again` when every token is in
    /// flight.
    pub fn send_raw_request(&self, kind: u32, payload: &[u8]) -> Result<Token> {
        self.send(kind, kind, payload, false)
    }

    /// Register `handler` for `kind`, send a request of `kind`, and
    /// unregister `handler` once it has been called.
    pub fn send_oneshot_request(
        &self,
        kind: u32,
        payload: &[u8],
        handler: Handler,
    ) -> Result<Token> {
        self.register_request_handler(kind, Some(handler.clone()))?;
        self.send(kind, kind, payload, true).map_err(|e| {
            self.unregister_if(kind, &handler);
            e
        })
    }

    /// Completion handler registered for `kind`
    pub fn request_handler(&self, kind: u32) -> Option<Handler> {
        self.shared.tables().requests.find(kind)
    }

    /// Event handler registered for `kind`
    pub fn unsolicited_handler(&self, kind: u32) -> Option<Handler> {
        self.shared.tables().unsolicited.find(kind)
    }

    /// Whether the request sent with `token` is waiting for its reply
    pub fn is_pending(&self, token: Token) -> bool {
        self.shared.tables().in_flight.is_valid(token)
    }

    /// Count of requests waiting for their reply
    pub fn in_flight(&self) -> usize {
        self.shared.tables().in_flight.len()
    }

    /// Send a request with command `wire_kind`, completed by the handler of
    /// `kind`
    pub(crate) fn send(
        &self,
        wire_kind: u32,
        kind: u32,
        payload: &[u8],
        one_shot: bool,
    ) -> Result<Token> {
        if i32::try_from(payload.len()).is_err() {
            return Err(Error::InvalidArgument);
        }
        // The send lock of the link is taken without holding `connection`,
        // so that a disconnect can interrupt a send waiting for room.
        let link = self
            .connection()
            .as_ref()
            .filter(|_| self.shared.is_connected())
            .map(|c| (c.link.clone(), c.generation));
        let Some((link, generation)) = link else {
            log::warn!("Request {} while not connected", kind);
            return Err(Error::Connection);
        };

        let token = {
            let mut tables = self.shared.tables();
            if tables.generation != generation {
                return Err(Error::Connection);
            }
            let one_shot = one_shot || tables.delete_after_dispatch;
            let token = tables.in_flight.begin(kind, one_shot)?;
            tables.delete_after_dispatch = false;
            token
        };

        let record = frame(&Request { kind: wire_kind, token: token.get(), payload }.to_bytes());
        if let Err(e) = link.send(&record) {
            let mut tables = self.shared.tables();
            if tables.generation == generation {
                tables.in_flight.complete(token);
            }
            return Err(e);
        }
        log::debug!("Sent request {} ({}) with token {:?}", kind, wire_kind, token);
        Ok(token)
    }

    /// Unregister the handler of `kind`, when it is still `handler`
    pub(crate) fn unregister_if(&self, kind: u32, handler: &Handler) {
        let mut tables = self.shared.tables();
        if tables.requests.find(kind).is_some_and(|h| Arc::ptr_eq(&h, handler)) {
            let _ = tables.requests.register(kind, None);
        }
    }

    fn connection(&self) -> MutexGuard<'_, Option<Connection>> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RilClient {
    fn drop(&mut self) {
        let _ = self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_connected() {
        let client = RilClient::open();
        assert!(!client.is_connected());
        assert_eq!(client.send_raw_request(1, b"abc"), Err(Error::Connection));
        assert_eq!(client.in_flight(), 0);

        assert_eq!(client.disconnect(), Ok(()));
        assert_eq!(client.disconnect(), Ok(()));
        assert_eq!(client.close(), Ok(()));
    }

    #[test]
    fn oneshot_not_connected() {
        let client = RilClient::open();
        let handler: Handler = Arc::new(|_: &[u8]| ());
        assert_eq!(client.send_oneshot_request(7, &[], handler), Err(Error::Connection));
        assert!(client.request_handler(7).is_none());
    }

    #[test]
    fn handlers() {
        let client = RilClient::open();
        let handler: Handler = Arc::new(|_: &[u8]| ());
        client.register_request_handler(3, Some(handler.clone())).unwrap();
        client.register_unsolicited_handler(1009, Some(handler.clone())).unwrap();
        assert!(client.request_handler(3).is_some_and(|h| Arc::ptr_eq(&h, &handler)));
        assert!(client.unsolicited_handler(3).is_none());

        client.register_request_handler(3, None).unwrap();
        assert!(client.request_handler(3).is_none());
        assert!(client.unsolicited_handler(1009).is_some());
    }

    #[test]
    fn delete_after_dispatch_survives_failed_send() {
        let client = RilClient::open();
        client.mark_delete_after_dispatch();
        assert_eq!(client.send_raw_request(1, &[]), Err(Error::Connection));
        assert!(client.shared.tables().delete_after_dispatch);
    }
}
