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

//! SIM Access Profile requests, carried by the raw OEM hook command.
//!
//! Replies complete the handler registered for `RIL_REQUEST_OEM_HOOK_RAW`,
//! and notifications are events of kind `RIL_UNSOL_OEM_HOOK_RAW`.

use crate::client::RilClient;
use crate::error::{Error, Result};
use crate::oem::{oem_request, RIL_REQUEST_OEM_HOOK_RAW};
use crate::token::Token;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;

/// Event kind of the OEM notifications
pub const RIL_UNSOL_OEM_HOOK_RAW: u32 = 1028;

/// OEM function of SAP requests
pub const OEM_FUNC_SAP: u8 = 0x14;

/// Maximum size of an APDU
pub const SAP_MAX_MSG_SIZE: usize = 512;

const OEM_SAP_CONNECT: u8 = 0x01;
const OEM_SAP_STATUS: u8 = 0x02;
const OEM_SAP_READER_STATUS: u8 = 0x03;
const OEM_SAP_SIM_POWER: u8 = 0x04;
const OEM_SAP_TRANSFER_ATR: u8 = 0x05;
const OEM_SAP_TRANSFER_APDU: u8 = 0x06;
const OEM_SAP_SET_PROTOCOL: u8 = 0x07;

const SAP_NOTI_DISCONNECT: u8 = 0x01;
const SAP_NOTI_CARD_STATUS: u8 = 0x02;

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum SapMsgId {
    ConnectReq = 0x00,
    ConnectResp = 0x01,
    DisconnectReq = 0x02,
    DisconnectResp = 0x03,
    DisconnectInd = 0x04,
    TransferApduReq = 0x05,
    TransferApduResp = 0x06,
    TransferAtrReq = 0x07,
    TransferAtrResp = 0x08,
    PowerSimOffReq = 0x09,
    PowerSimOffResp = 0x0A,
    PowerSimOnReq = 0x0B,
    PowerSimOnResp = 0x0C,
    ResetSimReq = 0x0D,
    ResetSimResp = 0x0E,
    TransferCardReaderStatusReq = 0x0F,
    TransferCardReaderStatusResp = 0x10,
    StatusInd = 0x11,
    ErrorResp = 0x12,
    SetTransportProtocolReq = 0x13,
    SetTransportProtocolResp = 0x14,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum ConnectionStatus {
    Ok = 0x00,
    UnableToEstablish = 0x01,
    NotSupportMaxSize = 0x02,
    MsgSizeTooSmall = 0x03,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum DisconnectType {
    Graceful = 0x00,
    Immediate = 0x01,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum SapStatus {
    Unknown = 0x00,
    NoSim = 0x01,
    NotReady = 0x02,
    Ready = 0x03,
    Connected = 0x04,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum CardStatus {
    UnknownError = 0x00,
    Reset = 0x01,
    NotAccessible = 0x02,
    Removed = 0x03,
    Inserted = 0x04,
    Recovered = 0x05,
}

/// Result code of a SAP operation
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum ResultCode {
    Ok = 0x00,
    NoReason = 0x01,
    CardNotAccessible = 0x02,
    CardAlreadyPowerOff = 0x03,
    CardRemoved = 0x04,
    CardAlreadyPowerOn = 0x05,
    DataNotAvailable = 0x06,
    NotSupport = 0x07,
}

#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum TransportProtocol {
    T0 = 0x00,
    T1 = 0x01,
}

/// SAP request
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SapRequest<'a> {
    /// Connect or disconnect, selected by the message id
    Connect(SapMsgId),
    Status,
    ReaderStatus,
    /// Power the SIM off or on, or reset it, selected by the message id
    SimPower(SapMsgId),
    TransferAtr,
    TransferApdu(&'a [u8]),
    SetProtocol(TransportProtocol),
}

impl SapRequest<'_> {
    /// OEM payload of the request
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let (sub, body) = match self {
            SapRequest::Connect(msg_id) => (OEM_SAP_CONNECT, vec![*msg_id as u8]),
            SapRequest::Status => (OEM_SAP_STATUS, vec![]),
            SapRequest::ReaderStatus => (OEM_SAP_READER_STATUS, vec![]),
            SapRequest::SimPower(msg_id) => (OEM_SAP_SIM_POWER, vec![*msg_id as u8]),
            SapRequest::TransferAtr => (OEM_SAP_TRANSFER_ATR, vec![]),
            SapRequest::TransferApdu(data) => {
                if data.len() > SAP_MAX_MSG_SIZE {
                    return Err(Error::InvalidArgument);
                }
                let mut body = (data.len() as u16).to_be_bytes().to_vec();
                body.extend_from_slice(data);
                (OEM_SAP_TRANSFER_APDU, body)
            }
            SapRequest::SetProtocol(protocol) => (OEM_SAP_SET_PROTOCOL, vec![*protocol as u8]),
        };
        oem_request(OEM_FUNC_SAP, sub, &body)
    }
}

/// Reply to `SapRequest::Connect`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectResponse {
    pub msg_id: SapMsgId,
    pub status: ConnectionStatus,
    pub max_msg_size: u16,
}

impl ConnectResponse {
    /// Parse the reply payload, `None` when malformed
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let [msg_id, status, hi, lo, ..] = *data else {
            return None;
        };
        Some(Self {
            msg_id: SapMsgId::from_u8(msg_id)?,
            status: ConnectionStatus::from_u8(status)?,
            max_msg_size: u16::from_be_bytes([hi, lo]),
        })
    }
}

/// Reply to `SapRequest::Status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: SapStatus,
}

impl StatusResponse {
    /// Parse the reply payload, `None` when malformed
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        Some(Self { status: SapStatus::from_u8(*data.first()?)? })
    }
}

/// Reply to `SapRequest::ReaderStatus`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderStatusResponse {
    pub result: ResultCode,
    /// Card reader status bits
    pub status: u8,
}

impl ReaderStatusResponse {
    /// Parse the reply payload, `None` when malformed
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let [result, status, ..] = *data else {
            return None;
        };
        Some(Self { result: ResultCode::from_u8(result)?, status })
    }
}

/// Reply to `SapRequest::SimPower`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimPowerResponse {
    pub msg_id: SapMsgId,
    pub result: ResultCode,
}

impl SimPowerResponse {
    /// Parse the reply payload, `None` when malformed
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let [msg_id, result, ..] = *data else {
            return None;
        };
        Some(Self { msg_id: SapMsgId::from_u8(msg_id)?, result: ResultCode::from_u8(result)? })
    }
}

/// Reply to `SapRequest::TransferAtr` and `SapRequest::TransferApdu`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResponse {
    pub result: ResultCode,
    pub data: Vec<u8>,
}

impl TransferResponse {
    /// Parse the reply payload, `None` when malformed
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        let [result, hi, lo, ref tail @ ..] = *data else {
            return None;
        };
        let len = u16::from_be_bytes([hi, lo]) as usize;
        Some(Self { result: ResultCode::from_u8(result)?, data: tail.get(..len)?.to_vec() })
    }
}

/// Reply to `SapRequest::SetProtocol`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetProtocolResponse {
    pub result: ResultCode,
}

impl SetProtocolResponse {
    /// Parse the reply payload, `None` when malformed
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        Some(Self { result: ResultCode::from_u8(*data.first()?)? })
    }
}

/// Payload of a `RIL_UNSOL_OEM_HOOK_RAW` event of the SAP function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SapNotification {
    Disconnect(DisconnectType),
    CardStatus(CardStatus),
}

impl SapNotification {
    /// Parse the event payload, `None` when malformed or not a SAP notification
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        match *data {
            [SAP_NOTI_DISCONNECT, param, ..] => {
                Some(Self::Disconnect(DisconnectType::from_u8(param)?))
            }
            [SAP_NOTI_CARD_STATUS, param, ..] => {
                Some(Self::CardStatus(CardStatus::from_u8(param)?))
            }
            _ => None,
        }
    }
}

impl RilClient {
    /// Send a SAP request with the raw OEM hook command
    pub fn send_sap_request(&self, request: &SapRequest) -> Result<Token> {
        let payload = request.to_bytes()?;
        log::debug!("SAP request {:?}", request);
        self.send(RIL_REQUEST_OEM_HOOK_RAW, RIL_REQUEST_OEM_HOOK_RAW, &payload, false)
    }
}
