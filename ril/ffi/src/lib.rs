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

//! C entry points of the RIL multi-client library.
//!
//! Every function returns `0` on success or an error code of
//! `secril_client::Error`. A null client handle yields `NotInitialized`.
//!
//! # Safety
//!
//! A handle must come from `OpenClient_RILD()`, and must not be used after
//! `CloseClient_RILD()`. Buffers must be valid for the length given.
//! Callbacks are called from the reader thread of the client, and must be
//! safe to call from any thread.

#![allow(non_snake_case)]

use core::ffi::{c_char, c_int, c_void};
use core::{ptr, slice};
use num_traits::FromPrimitive;
use secril_client::oem::{
    AudioPath, CallRecCondition, DhaSolMode, DhaSolSelect, ExtraVolume, LoopbackMode,
    MuteCondition, SoundClockCondition, SoundType, TwoMicSolDevice, TwoMicSolReport,
    DHA_PARAM_LEN,
};
use secril_client::{Endpoint, Error, ErrorCallback, ErrorEvent, Handler, Result, RilClient};
use std::sync::Arc;

/// Opaque client handle, `HRilClient` on the C side
pub struct CRilClient {
    client: RilClient,
}

/// Completion handler of a request
pub type RilOnComplete =
    unsafe extern "C" fn(handle: *mut CRilClient, data: *const c_void, len: usize) -> c_int;

/// Handler of an event
pub type RilOnUnsolicited =
    unsafe extern "C" fn(handle: *mut CRilClient, data: *const c_void, len: usize) -> c_int;

/// Error callback, receiving the user data given at registration
pub type RilOnError = unsafe extern "C" fn(data: *mut c_void, error: c_int) -> c_int;

#[derive(Clone, Copy)]
struct HandlePtr(*mut CRilClient);

impl HandlePtr {
    fn get(self) -> *mut CRilClient {
        self.0
    }
}

//SAFETY: The handle is only dereferenced by the C callbacks, which are
//        required to be safe to call from any thread.
unsafe impl Send for HandlePtr {}
unsafe impl Sync for HandlePtr {}

#[derive(Clone, Copy)]
struct UserData(*mut c_void);

impl UserData {
    fn get(self) -> *mut c_void {
        self.0
    }
}

//SAFETY: The user data is opaque to Rust, and only given back to the C
//        error callback.
unsafe impl Send for UserData {}
unsafe impl Sync for UserData {}

fn status<T>(result: Result<T>) -> c_int {
    match result {
        Ok(_) => 0,
        Err(e) => e.code(),
    }
}

fn arg<T: FromPrimitive>(value: c_int) -> Result<T> {
    T::from_i32(value).ok_or(Error::InvalidArgument)
}

/// Run `f` on the client of `handle`
///
/// # Safety
///
/// `handle` is null, or a live handle returned by `OpenClient_RILD()`.
unsafe fn with_client<T>(
    handle: *mut CRilClient,
    f: impl FnOnce(&RilClient) -> Result<T>,
) -> c_int {
    // SAFETY: Guaranteed by the caller.
    match unsafe { handle.as_ref() } {
        Some(handle) => status(f(&handle.client)),
        None => {
            log::warn!("Null client handle");
            Error::NotInitialized.code()
        }
    }
}

/// Wrap a C handler; an empty payload is given as a null pointer
fn c_handler(handle: *mut CRilClient, callback: RilOnComplete) -> Handler {
    let handle = HandlePtr(handle);
    Arc::new(move |data: &[u8]| {
        let ptr = if data.is_empty() { ptr::null() } else { data.as_ptr().cast::<c_void>() };

        // SAFETY: The C code has registered a valid function pointer, and
        //         `ptr` is valid for `data.len()` bytes during the call.
        unsafe {
            callback(handle.get(), ptr, data.len());
        }
    })
}

/// Open a client, not yet connected
#[no_mangle]
pub extern "C" fn OpenClient_RILD() -> *mut CRilClient {
    secril_client::init_logging();
    Box::into_raw(Box::new(CRilClient { client: RilClient::open() }))
}

/// Disconnect and release the client
///
/// # Safety
///
/// See the crate documentation; `handle` is invalid after the call.
#[no_mangle]
pub unsafe extern "C" fn CloseClient_RILD(handle: *mut CRilClient) -> c_int {
    if handle.is_null() {
        return Error::NotInitialized.code();
    }
    // SAFETY: The handle was allocated by `OpenClient_RILD()`, and is no
    //         longer used by the caller.
    let handle = unsafe { Box::from_raw(handle) };
    status(handle.client.close())
}

/// Connect to the RIL daemon
///
/// # Safety
///
/// See the crate documentation.
#[no_mangle]
pub unsafe extern "C" fn Connect_RILD(handle: *mut CRilClient) -> c_int {
    unsafe { with_client(handle, |c| c.connect_to(&Endpoint::Multiclient)) }
}

/// Connect to the Qualcomm RIL daemon
///
/// # Safety
///
/// See the crate documentation.
#[no_mangle]
pub unsafe extern "C" fn Connect_QRILD(handle: *mut CRilClient) -> c_int {
    unsafe { with_client(handle, |c| c.connect_to(&Endpoint::QMulticlient)) }
}

/// Connect to the second RIL daemon of dual-mode devices
///
/// # Safety
///
/// See the crate documentation.
#[no_mangle]
pub unsafe extern "C" fn Connect_RILD_Second(handle: *mut CRilClient) -> c_int {
    unsafe { with_client(handle, |c| c.connect_to(&Endpoint::Second)) }
}

/// `1` when connected, `0` otherwise, or for a null handle
///
/// # Safety
///
/// See the crate documentation.
#[no_mangle]
pub unsafe extern "C" fn isConnected_RILD(handle: *mut CRilClient) -> c_int {
    // SAFETY: Guaranteed by the caller.
    match unsafe { handle.as_ref() } {
        Some(handle) => handle.client.is_connected().into(),
        None => 0,
    }
}

/// # Safety
///
/// See the crate documentation.
#[no_mangle]
pub unsafe extern "C" fn Disconnect_RILD(handle: *mut CRilClient) -> c_int {
    unsafe { with_client(handle, |c| c.disconnect()) }
}

/// Register the handler of events `id`; a null handler unregisters it
///
/// # Safety
///
/// See the crate documentation.
#[no_mangle]
pub unsafe extern "C" fn RegisterUnsolicitedHandler(
    handle: *mut CRilClient,
    id: u32,
    handler: Option<RilOnUnsolicited>,
) -> c_int {
    let handler = handler.map(|h| c_handler(handle, h));
    unsafe { with_client(handle, |c| c.register_unsolicited_handler(id, handler)) }
}

/// Register the completion handler of requests `id`; a null handler
/// unregisters it
///
/// # Safety
///
/// See the crate documentation.
#[no_mangle]
pub unsafe extern "C" fn RegisterRequestCompleteHandler(
    handle: *mut CRilClient,
    id: u32,
    handler: Option<RilOnComplete>,
) -> c_int {
    let handler = handler.map(|h| c_handler(handle, h));
    unsafe { with_client(handle, |c| c.register_request_handler(id, handler)) }
}

/// Register the error callback, called with `data`; a null callback
/// unregisters it
///
/// # Safety
///
/// See the crate documentation.
#[no_mangle]
pub unsafe extern "C" fn RegisterErrorCallback(
    handle: *mut CRilClient,
    callback: Option<RilOnError>,
    data: *mut c_void,
) -> c_int {
    let data = UserData(data);
    let callback = callback.map(|callback| {
        Arc::new(move |event: ErrorEvent| {
            // SAFETY: The C code has registered a valid function pointer.
            unsafe {
                callback(data.get(), event.code());
            }
        }) as ErrorCallback
    });
    unsafe {
        with_client(handle, |c| {
            c.register_error_callback(callback);
            Ok(())
        })
    }
}

/// Send `len` bytes of `data` with the raw OEM hook command
///
/// # Safety
///
/// See the crate documentation.
#[no_mangle]
pub unsafe extern "C" fn InvokeOemRequestHookRaw(
    handle: *mut CRilClient,
    data: *const c_char,
    len: usize,
) -> c_int {
    let data = match (data.is_null(), len) {
        (_, 0) => &[][..],
        (true, _) => return Error::InvalidArgument.code(),
        // SAFETY: The C code gives a buffer valid for `len` bytes.
        (false, len) => unsafe { slice::from_raw_parts(data.cast::<u8>(), len) },
    };
    unsafe { with_client(handle, |c| c.invoke_oem_request_hook_raw(data)) }
}

/// # Safety
///
/// See the crate documentation.
#[no_mangle]
pub unsafe extern "C" fn SetCallVolume(
    handle: *mut CRilClient,
    sound_type: c_int,
    level: c_int,
) -> c_int {
    unsafe {
        with_client(handle, |c| {
            let level = u8::try_from(level).map_err(|_| Error::InvalidArgument)?;
            c.set_call_volume(arg::<SoundType>(sound_type)?, level)
        })
    }
}

/// # Safety
///
/// See the crate documentation.
#[no_mangle]
pub unsafe extern "C" fn SetCallAudioPath(
    handle: *mut CRilClient,
    path: c_int,
    extra: c_int,
) -> c_int {
    unsafe {
        with_client(handle, |c| {
            c.set_call_audio_path(arg::<AudioPath>(path)?, arg::<ExtraVolume>(extra)?)
        })
    }
}

/// # Safety
///
/// See the crate documentation.
#[no_mangle]
pub unsafe extern "C" fn SetCallClockSync(handle: *mut CRilClient, condition: c_int) -> c_int {
    unsafe {
        with_client(handle, |c| c.set_call_clock_sync(arg::<SoundClockCondition>(condition)?))
    }
}

/// # Safety
///
/// See the crate documentation.
#[no_mangle]
pub unsafe extern "C" fn SetVideoCallClockSync(handle: *mut CRilClient, condition: c_int) -> c_int {
    unsafe {
        with_client(handle, |c| {
            c.set_video_call_clock_sync(arg::<SoundClockCondition>(condition)?)
        })
    }
}

/// # Safety
///
/// See the crate documentation.
#[no_mangle]
pub unsafe extern "C" fn SetCallRecord(handle: *mut CRilClient, condition: c_int) -> c_int {
    unsafe { with_client(handle, |c| c.set_call_record(arg::<CallRecCondition>(condition)?)) }
}

/// # Safety
///
/// See the crate documentation.
#[no_mangle]
pub unsafe extern "C" fn SetMute(handle: *mut CRilClient, condition: c_int) -> c_int {
    unsafe { with_client(handle, |c| c.set_mute(arg::<MuteCondition>(condition)?)) }
}

/// Query the mute state; `handler` receives the reply once
///
/// # Safety
///
/// See the crate documentation.
#[no_mangle]
pub unsafe extern "C" fn GetMute(handle: *mut CRilClient, handler: Option<RilOnComplete>) -> c_int {
    let Some(handler) = handler else {
        return Error::InvalidArgument.code();
    };
    let handler = c_handler(handle, handler);
    unsafe { with_client(handle, |c| c.get_mute(handler)) }
}

/// # Safety
///
/// See the crate documentation.
#[no_mangle]
pub unsafe extern "C" fn SetTwoMicControl(
    handle: *mut CRilClient,
    device: c_int,
    report: c_int,
) -> c_int {
    unsafe {
        with_client(handle, |c| {
            c.set_two_mic_control(arg::<TwoMicSolDevice>(device)?, arg::<TwoMicSolReport>(report)?)
        })
    }
}

/// Hearing aid solution; `param` points to 24 bytes of tuning parameter
///
/// # Safety
///
/// See the crate documentation.
#[no_mangle]
pub unsafe extern "C" fn SetDhaSolution(
    handle: *mut CRilClient,
    mode: c_int,
    select: c_int,
    param: *const c_char,
) -> c_int {
    if param.is_null() {
        return Error::InvalidArgument.code();
    }
    // SAFETY: The C code gives a parameter of `DHA_PARAM_LEN` bytes.
    let param = unsafe { &*param.cast::<[u8; DHA_PARAM_LEN]>() };
    unsafe {
        with_client(handle, |c| {
            c.set_dha_solution(arg::<DhaSolMode>(mode)?, arg::<DhaSolSelect>(select)?, param)
        })
    }
}

/// # Safety
///
/// See the crate documentation.
#[no_mangle]
pub unsafe extern "C" fn SetLoopbackTest(
    handle: *mut CRilClient,
    mode: c_int,
    path: c_int,
) -> c_int {
    unsafe {
        with_client(handle, |c| {
            c.set_loopback_test(arg::<LoopbackMode>(mode)?, arg::<AudioPath>(path)?)
        })
    }
}
