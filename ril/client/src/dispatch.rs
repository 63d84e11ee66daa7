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

//! Decoding of the records received from the daemon, and dispatch to the
//! registered handlers. Handlers are called without any lock held.

use crate::client::{Handler, Shared};
use crate::error::{Error, ErrorEvent, Result};
use crate::message::{RESPONSE_SOLICITED, RESPONSE_UNSOLICITED};
use crate::parcel::Reader;
use std::sync::Arc;

/// Process a record read by the reader of session `generation`. An error
/// concerns this record only. Records of an ended session are dropped.
pub(crate) fn process_record(shared: &Shared, generation: u64, record: &[u8]) -> Result<()> {
    let mut r = Reader::new(record);
    match r.read_i32().ok_or(Error::Io)? {
        RESPONSE_UNSOLICITED => process_unsolicited(shared, generation, &mut r),
        RESPONSE_SOLICITED => process_solicited(shared, generation, &mut r),
        response_type => {
            log::warn!("Dropping record of unknown response type {}", response_type);
            Err(Error::InvalidArgument)
        }
    }
}

/// Optional length-prefixed payload; an absent length means no payload
fn read_payload<'a>(r: &mut Reader<'a>) -> Result<&'a [u8]> {
    let Some(len) = r.read_i32() else {
        return Ok(&[]);
    };
    let len = usize::try_from(len).map_err(|_| Error::Io)?;
    r.read_inplace(len).ok_or(Error::Io)
}

fn process_unsolicited(shared: &Shared, generation: u64, r: &mut Reader) -> Result<()> {
    let kind = r.read_u32().ok_or(Error::Io)?;
    let payload = read_payload(r)?;
    log::debug!("Unsolicited {}, {} bytes", kind, payload.len());

    let handler = {
        let tables = shared.tables();
        if tables.generation != generation {
            log::debug!("Dropping unsolicited {} of an ended session", kind);
            return Ok(());
        }
        tables.unsolicited.find(kind)
    };
    match handler {
        Some(handler) => handler(payload),
        None => log::debug!("No handler for unsolicited {}", kind),
    }
    Ok(())
}

fn process_solicited(shared: &Shared, generation: u64, r: &mut Reader) -> Result<()> {
    let value = r.read_u32().ok_or(Error::Io)?;
    let token = {
        let tables = shared.tables();
        if tables.generation != generation {
            log::debug!("Dropping reply {:#x} of an ended session", value);
            return Ok(());
        }
        tables.in_flight.lookup(value)
    };
    let Some(token) = token else {
        log::warn!("Dropping reply with invalid token {:#x}", value);
        return Err(Error::InvalidArgument);
    };

    let reply = r.read_i32().ok_or(Error::Io).and_then(|error| match error {
        0 => read_payload(r).map(Ok),
        error => Ok(Err(error)),
    });

    let (entry, handler) = {
        let mut tables = shared.tables();
        if tables.generation != generation {
            return Ok(());
        }
        let entry = tables.in_flight.complete(token);
        let handler = match (&reply, entry) {
            (Ok(Ok(_)), Some(entry)) => tables.requests.find(entry.kind),
            _ => None,
        };
        (entry, handler)
    };

    let payload = match reply? {
        Ok(payload) => payload,
        Err(error) => {
            log::warn!("Request {:?} failed with error {}", entry.map(|e| e.kind), error);
            shared.report(ErrorEvent::Remote(error));
            return Ok(());
        }
    };
    let (Some(entry), Some(handler)) = (entry, handler) else {
        log::debug!("No handler for token {:?}", token);
        return Ok(());
    };

    handler(payload);

    if entry.one_shot {
        let mut tables = shared.tables();
        if tables.requests.find(entry.kind).is_some_and(|h| Arc::ptr_eq(&h, &handler)) {
            let _ = tables.requests.register(entry.kind, None::<Handler>);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Response;
    use std::sync::Mutex;

    struct Recorder {
        calls: Mutex<Vec<(&'static str, Vec<u8>)>>,
        errors: Mutex<Vec<ErrorEvent>>,
    }

    impl Recorder {
        fn new(shared: &Shared) -> Arc<Self> {
            let recorder =
                Arc::new(Self { calls: Mutex::new(vec![]), errors: Mutex::new(vec![]) });
            let r = recorder.clone();
            shared.set_error_callback(Some(Arc::new(move |e: ErrorEvent| {
                r.errors.lock().unwrap().push(e)
            })));
            recorder
        }

        fn handler(self: &Arc<Self>, name: &'static str) -> Handler {
            let r = self.clone();
            Arc::new(move |data: &[u8]| r.calls.lock().unwrap().push((name, data.to_vec())))
        }

        fn calls(&self) -> Vec<(&'static str, Vec<u8>)> {
            self.calls.lock().unwrap().clone()
        }

        fn errors(&self) -> Vec<ErrorEvent> {
            self.errors.lock().unwrap().clone()
        }
    }

    fn solicited(token: u32, error: i32, payload: Option<&[u8]>) -> Vec<u8> {
        Response::Solicited { token, error, payload }.to_bytes()
    }

    fn event(kind: u32, payload: Option<&[u8]>) -> Vec<u8> {
        Response::Unsolicited { kind, payload }.to_bytes()
    }

    #[test]
    fn solicited_success() {
        let shared = Shared::new();
        let rec = Recorder::new(&shared);
        {
            let mut tables = shared.tables();
            tables.requests.register(42, Some(rec.handler("42"))).unwrap();
            tables.requests.register(43, Some(rec.handler("43"))).unwrap();
        }
        let token = shared.tables().in_flight.begin(42, false).unwrap();

        process_record(&shared, 0, &solicited(token.get(), 0, Some(b"ok"))).unwrap();
        assert_eq!(rec.calls(), [("42", b"ok".to_vec())]);
        assert!(!shared.tables().in_flight.is_valid(token));
        assert!(shared.tables().requests.find(42).is_some());
        assert!(rec.errors().is_empty());
    }

    #[test]
    fn solicited_without_payload() {
        let shared = Shared::new();
        let rec = Recorder::new(&shared);
        shared.tables().requests.register(1, Some(rec.handler("1"))).unwrap();
        let token = shared.tables().in_flight.begin(1, false).unwrap();

        process_record(&shared, 0, &solicited(token.get(), 0, None)).unwrap();
        assert_eq!(rec.calls(), [("1", vec![])]);
    }

    #[test]
    fn solicited_error() {
        let shared = Shared::new();
        let rec = Recorder::new(&shared);
        shared.tables().requests.register(42, Some(rec.handler("42"))).unwrap();
        let token = shared.tables().in_flight.begin(42, false).unwrap();

        process_record(&shared, 0, &solicited(token.get(), 2, Some(b"ignored"))).unwrap();
        assert!(rec.calls().is_empty());
        assert_eq!(rec.errors(), [ErrorEvent::Remote(2)]);
        assert!(!shared.tables().in_flight.is_valid(token));
    }

    #[test]
    fn invalid_token() {
        let shared = Shared::new();
        let rec = Recorder::new(&shared);
        shared.tables().requests.register(42, Some(rec.handler("42"))).unwrap();
        let token = shared.tables().in_flight.begin(42, false).unwrap();

        for value in [0, 0x2, 0x3, 0x8000_0000] {
            let result = process_record(&shared, 0, &solicited(value, 0, Some(b"ok")));
            assert_eq!(result, Err(Error::InvalidArgument));
        }
        assert!(rec.calls().is_empty());
        let tables = shared.tables();
        assert_eq!(tables.in_flight.len(), 1);
        assert_eq!(tables.in_flight.entry(token).map(|e| e.kind), Some(42));
    }

    #[test]
    fn malformed_solicited() {
        let shared = Shared::new();
        let rec = Recorder::new(&shared);
        shared.tables().requests.register(42, Some(rec.handler("42"))).unwrap();

        let token = shared.tables().in_flight.begin(42, false).unwrap();
        let record = solicited(token.get(), 0, None);
        assert_eq!(process_record(&shared, 0, &record[..8]), Err(Error::Io));
        assert!(!shared.tables().in_flight.is_valid(token));

        let token = shared.tables().in_flight.begin(42, false).unwrap();
        let mut record = solicited(token.get(), 0, None);
        record.extend_from_slice(&16i32.to_ne_bytes());
        record.extend_from_slice(b"short");
        assert_eq!(process_record(&shared, 0, &record), Err(Error::Io));
        assert!(!shared.tables().in_flight.is_valid(token));

        assert_eq!(process_record(&shared, 0, &record[..2]), Err(Error::Io));
        assert!(rec.calls().is_empty());
    }

    #[test]
    fn unsolicited() {
        let shared = Shared::new();
        let rec = Recorder::new(&shared);
        shared.tables().unsolicited.register(1000, Some(rec.handler("1000"))).unwrap();
        shared.tables().unsolicited.register(1001, Some(rec.handler("1001"))).unwrap();

        process_record(&shared, 0, &event(1000, Some(b"abc"))).unwrap();
        process_record(&shared, 0, &event(1002, Some(b"xyz"))).unwrap();
        process_record(&shared, 0, &event(1001, None)).unwrap();

        assert_eq!(rec.calls(), [("1000", b"abc".to_vec()), ("1001", vec![])]);
        assert!(rec.errors().is_empty());
    }

    #[test]
    fn unknown_response_type() {
        let shared = Shared::new();
        assert_eq!(process_record(&shared, 0, &7i32.to_ne_bytes()), Err(Error::InvalidArgument));
    }

    #[test]
    fn ended_session() {
        let shared = Shared::new();
        let rec = Recorder::new(&shared);
        shared.tables().requests.register(42, Some(rec.handler("42"))).unwrap();
        shared.tables().unsolicited.register(1000, Some(rec.handler("1000"))).unwrap();
        let generation = shared.begin_session();
        let token = shared.tables().in_flight.begin(42, false).unwrap();

        let stale = generation - 1;
        process_record(&shared, stale, &solicited(token.get(), 0, Some(b"ok"))).unwrap();
        process_record(&shared, stale, &event(1000, None)).unwrap();
        assert!(rec.calls().is_empty());
        assert!(shared.tables().in_flight.is_valid(token));

        assert!(shared.end_session(generation));
        assert!(!shared.end_session(generation));
        assert!(!shared.is_connected());
        assert!(!shared.tables().in_flight.is_valid(token));
        process_record(&shared, generation, &solicited(token.get(), 0, Some(b"ok"))).unwrap();
        assert!(rec.calls().is_empty());
        assert!(rec.errors().is_empty());
    }

    #[test]
    fn one_shot_handler() {
        let shared = Shared::new();
        let rec = Recorder::new(&shared);
        shared.tables().requests.register(106, Some(rec.handler("106"))).unwrap();
        let token = shared.tables().in_flight.begin(106, true).unwrap();

        process_record(&shared, 0, &solicited(token.get(), 0, Some(&[1]))).unwrap();
        assert_eq!(rec.calls(), [("106", vec![1])]);
        assert!(shared.tables().requests.find(106).is_none());
    }
}
