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

//! OEM sound requests, carried by the raw OEM hook command.
//!
//! The payload of an OEM request starts with a 4-byte header: function id,
//! sub-function id, and the total length of the payload as a big-endian
//! `u16`.

use crate::client::{Handler, RilClient};
use crate::error::{Error, Result};
use crate::token::Token;
use num_derive::{FromPrimitive, ToPrimitive};

/// Command of the raw OEM hook request
pub const RIL_REQUEST_OEM_HOOK_RAW: u32 = 59;

/// Length of the OEM header
pub const OEM_HEADER_LEN: usize = 4;

/// OEM function of sound requests
pub const OEM_FUNC_SOUND: u8 = 0x08;

const OEM_SND_SET_VOLUME_CTRL: u8 = 0x03;
const OEM_SND_SET_AUDIO_PATH: u8 = 0x05;
const OEM_SND_SET_VIDEO_CALL_CTRL: u8 = 0x07;
const OEM_SND_SET_LOOPBACK_CTRL: u8 = 0x08;
const OEM_SND_SET_VOICE_RECORDING_CTRL: u8 = 0x09;
const OEM_SND_SET_CLOCK_CTRL: u8 = 0x0A;
const OEM_SND_SET_MUTE: u8 = 0x0B;
const OEM_SND_GET_MUTE: u8 = 0x0C;
const OEM_SND_SET_TWO_MIC_CTL: u8 = 0x0D;
const OEM_SND_SET_DHA_CTL: u8 = 0x0E;

/// Logical kinds of the OEM sound requests, selecting their completion
/// handler
#[allow(missing_docs)]
pub mod kind {
    pub const SET_CALL_VOLUME: u32 = 101;
    pub const SET_AUDIO_PATH: u32 = 102;
    pub const SET_CALL_CLOCK_SYNC: u32 = 103;
    pub const SET_CALL_RECORDING: u32 = 104;
    pub const SET_CALL_MUTE: u32 = 105;
    pub const GET_CALL_MUTE: u32 = 106;
    pub const SET_CALL_VT_CTRL: u32 = 107;
    pub const SET_TWO_MIC_CTRL: u32 = 108;
    pub const SET_DHA_CTRL: u32 = 109;
    pub const SET_LOOPBACK: u32 = 110;
}

/// Length of the DHA parameter
pub const DHA_PARAM_LEN: usize = 24;

/// Build an OEM request payload of function `func`
pub fn oem_request(func: u8, sub: u8, body: &[u8]) -> Result<Vec<u8>> {
    let len = u16::try_from(OEM_HEADER_LEN + body.len()).map_err(|_| Error::InvalidArgument)?;
    let mut payload = Vec::with_capacity(len.into());
    payload.extend_from_slice(&[func, sub]);
    payload.extend_from_slice(&len.to_be_bytes());
    payload.extend_from_slice(body);
    Ok(payload)
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum SoundType {
    Voice = 0,
    Speaker = 1,
    Headset = 2,
    BtVoice = 3,
}

impl SoundType {
    /// Modem code
    pub fn code(self) -> u8 {
        match self {
            SoundType::Voice => 0x01,
            SoundType::Speaker => 0x11,
            SoundType::Headset => 0x31,
            SoundType::BtVoice => 0x41,
        }
    }
}

/// External sound device path
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum AudioPath {
    Handset = 0,
    Headset = 1,
    Speaker = 2,
    Bluetooth = 3,
    StereoBt = 4,
    Headphone = 5,
    BluetoothNoNr = 6,
    Mic1 = 7,
    Mic2 = 8,
    BluetoothWb = 9,
    BluetoothWbNoNr = 10,
}

impl AudioPath {
    /// Modem code
    pub fn code(self) -> u8 {
        match self {
            AudioPath::Handset => 0x01,
            AudioPath::Headset => 0x02,
            AudioPath::Speaker => 0x06,
            AudioPath::Bluetooth => 0x04,
            AudioPath::StereoBt => 0x05,
            AudioPath::Headphone => 0x07,
            AudioPath::BluetoothNoNr => 0x08,
            AudioPath::Mic1 => 0x09,
            AudioPath::Mic2 => 0x0A,
            AudioPath::BluetoothWb => 0x0B,
            AudioPath::BluetoothWbNoNr => 0x0C,
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum ExtraVolume {
    OriginalPath = 0,
    ExtraVolumePath = 1,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum SoundClockCondition {
    Stop = 0,
    Start = 1,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum CallRecCondition {
    Stop = 0,
    Start = 1,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum MuteCondition {
    TxUnmute = 0,
    TxMute = 1,
    RxUnmute = 2,
    RxMute = 3,
    RxTxUnmute = 4,
    RxTxMute = 5,
}

/// Two microphone solution device
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum TwoMicSolDevice {
    Audience = 0,
    Fortemedia = 1,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum TwoMicSolReport {
    Off = 0,
    On = 1,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum DhaSolMode {
    Off = 0,
    On = 1,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum DhaSolSelect {
    Left = 0,
    Right = 1,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum LoopbackMode {
    End = 0,
    OnPcm = 1,
    OnPacket = 2,
}

impl RilClient {
    /// Send `data` verbatim with the raw OEM hook command
    pub fn invoke_oem_request_hook_raw(&self, data: &[u8]) -> Result<Token> {
        self.send(RIL_REQUEST_OEM_HOOK_RAW, RIL_REQUEST_OEM_HOOK_RAW, data, false)
    }

    /// Set the in-call volume of `sound_type` to `level`
    pub fn set_call_volume(&self, sound_type: SoundType, level: u8) -> Result<Token> {
        self.send_sound(kind::SET_CALL_VOLUME, OEM_SND_SET_VOLUME_CTRL, &[sound_type.code(), level])
    }

    /// Route the call audio to `path`
    pub fn set_call_audio_path(&self, path: AudioPath, extra: ExtraVolume) -> Result<Token> {
        self.send_sound(kind::SET_AUDIO_PATH, OEM_SND_SET_AUDIO_PATH, &[path.code(), extra as u8])
    }

    /// Start or stop the sound clock of a voice call
    pub fn set_call_clock_sync(&self, condition: SoundClockCondition) -> Result<Token> {
        self.send_sound(kind::SET_CALL_CLOCK_SYNC, OEM_SND_SET_CLOCK_CTRL, &[condition as u8])
    }

    /// Start or stop the sound clock of a video call
    pub fn set_video_call_clock_sync(&self, condition: SoundClockCondition) -> Result<Token> {
        self.send_sound(kind::SET_CALL_VT_CTRL, OEM_SND_SET_VIDEO_CALL_CTRL, &[condition as u8])
    }

    /// Start or stop the call recording
    pub fn set_call_record(&self, condition: CallRecCondition) -> Result<Token> {
        self.send_sound(
            kind::SET_CALL_RECORDING,
            OEM_SND_SET_VOICE_RECORDING_CTRL,
            &[condition as u8],
        )
    }

    /// Mute or unmute the call audio
    pub fn set_mute(&self, condition: MuteCondition) -> Result<Token> {
        self.send_sound(kind::SET_CALL_MUTE, OEM_SND_SET_MUTE, &[condition as u8])
    }

    /// Query the mute state; `handler` receives the reply, once
    pub fn get_mute(&self, handler: Handler) -> Result<Token> {
        if !self.is_connected() {
            return Err(Error::Connection);
        }
        let payload = oem_request(OEM_FUNC_SOUND, OEM_SND_GET_MUTE, &[])?;
        self.register_request_handler(kind::GET_CALL_MUTE, Some(handler.clone()))?;
        self.send(RIL_REQUEST_OEM_HOOK_RAW, kind::GET_CALL_MUTE, &payload, true).map_err(|e| {
            self.unregister_if(kind::GET_CALL_MUTE, &handler);
            e
        })
    }

    /// Select the two microphone noise suppression device, and its report
    pub fn set_two_mic_control(
        &self,
        device: TwoMicSolDevice,
        report: TwoMicSolReport,
    ) -> Result<Token> {
        let body = [device as u8, report as u8];
        self.send_sound(kind::SET_TWO_MIC_CTRL, OEM_SND_SET_TWO_MIC_CTL, &body)
    }

    /// Hearing aid solution, with its tuning parameter
    pub fn set_dha_solution(
        &self,
        mode: DhaSolMode,
        select: DhaSolSelect,
        param: &[u8; DHA_PARAM_LEN],
    ) -> Result<Token> {
        let mut body = [0u8; 2 + DHA_PARAM_LEN];
        body[0] = mode as u8;
        body[1] = select as u8;
        body[2..].copy_from_slice(param);
        self.send_sound(kind::SET_DHA_CTRL, OEM_SND_SET_DHA_CTL, &body)
    }

    /// Start or end a modem audio loopback on `path`
    pub fn set_loopback_test(&self, mode: LoopbackMode, path: AudioPath) -> Result<Token> {
        self.send_sound(kind::SET_LOOPBACK, OEM_SND_SET_LOOPBACK_CTRL, &[mode as u8, path.code()])
    }

    /// Send a sound request of logical `kind`. Its completion handler, if
    /// any, is unregistered first.
    fn send_sound(&self, kind: u32, sub: u8, body: &[u8]) -> Result<Token> {
        if !self.is_connected() {
            return Err(Error::Connection);
        }
        let payload = oem_request(OEM_FUNC_SOUND, sub, body)?;
        self.register_request_handler(kind, None)?;
        self.send(RIL_REQUEST_OEM_HOOK_RAW, kind, &payload, false).map_err(|e| {
            let _ = self.register_request_handler(kind, None);
            e
        })
    }
}
