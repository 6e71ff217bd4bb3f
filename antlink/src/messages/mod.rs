// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::messages::config::{
    AssignChannel, ChannelId, ChannelPeriod, ChannelRfFrequency, EnableExtRxMessages, LibConfig,
    LowPrioritySearchTimeout, SearchTimeout, SetNetworkKey, UnAssignChannel,
};
use channel::{ChannelEvent, ChannelResponse};
use const_utils::{max, min};
use control::{
    CloseChannel, OpenChannel, OpenRxScanMode, RequestMessage, ResetSystem, SleepMessage,
};
use core::fmt;
use data::{AcknowledgedData, AdvancedBurstData, BroadcastData, BurstTransferData};
use konst::{option::unwrap_or, primitive::parse_usize, unwrap_ctx};
use notifications::{SerialErrorMessage, StartUpMessage};
use packed_struct::prelude::*;
use requested_response::{AntVersion, Capabilities, ChannelStatus, SerialNumber};
use thiserror::Error;

pub mod channel;
pub mod config;
pub mod control;
pub mod data;
pub mod notifications;
pub mod requested_response;

/// Largest content length accepted from the radio.
///
/// Set with the `ANT_MAX_CONTENT_SIZE` environment variable at build time, clamped to `[24, 255]`.
pub const ANT_MAX_CONTENT_SIZE: usize = min(
    max(
        unwrap_ctx!(parse_usize(unwrap_or!(
            option_env!("ANT_MAX_CONTENT_SIZE"),
            "64"
        ))),
        24,
    ),
    255,
);

/// Sync, length and id
pub const HEADER_SIZE: usize = 3;
pub const CHECKSUM_SIZE: usize = 1;
/// Largest complete frame, header and checksum included
pub const MAX_FRAME_SIZE: usize = ANT_MAX_CONTENT_SIZE + HEADER_SIZE + CHECKSUM_SIZE;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum CodecError {
    #[error("Invalid byte pattern: {0:?}")]
    Packing(PackingError),
    #[error("Message id {0:#04x} is not supported")]
    UnsupportedMessage(u8),
    #[error("Unknown message id {0:#04x}")]
    UnknownMessageId(u8),
    #[error("Expected sync byte, got {0:#04x}")]
    BadSync(u8),
    #[error("Header declares {0} bytes but got {1}")]
    BadLength(usize, usize),
    #[error("Messsage is of size {0}, allocated buffer is {1}")]
    BufferTooSmall(usize, usize),
}

impl From<PackingError> for CodecError {
    fn from(err: PackingError) -> Self {
        CodecError::Packing(err)
    }
}

/// All supported RX messages
#[derive(Clone, PartialEq, Debug)]
pub enum RxMessage {
    // Notification Messages
    StartUpMessage(StartUpMessage),
    SerialErrorMessage(SerialErrorMessage),
    // Data Messages
    BroadcastData(BroadcastData),
    AcknowledgedData(AcknowledgedData),
    // Channel Messages
    ChannelEvent(ChannelEvent),
    ChannelResponse(ChannelResponse),
    // Requested Response Messages
    ChannelStatus(ChannelStatus),
    ChannelId(ChannelId),
    AntVersion(AntVersion),
    Capabilities(Capabilities),
    SerialNumber(SerialNumber),
}

impl RxMessage {
    /// Channel the message is scoped to, if any
    pub fn channel_number(&self) -> Option<u8> {
        match self {
            RxMessage::BroadcastData(bd) => Some(bd.payload.channel_number),
            RxMessage::AcknowledgedData(ad) => Some(ad.payload.channel_number),
            RxMessage::ChannelEvent(ce) => Some(ce.payload.channel_number),
            RxMessage::ChannelResponse(cr) => Some(cr.channel_number),
            RxMessage::ChannelStatus(cs) => Some(cs.channel_number),
            RxMessage::ChannelId(id) => Some(id.channel_number),
            RxMessage::StartUpMessage(_)
            | RxMessage::SerialErrorMessage(_)
            | RxMessage::AntVersion(_)
            | RxMessage::Capabilities(_)
            | RxMessage::SerialNumber(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TxMessage {
    UnAssignChannel(UnAssignChannel),
    AssignChannel(AssignChannel),
    ChannelId(ChannelId),
    ChannelPeriod(ChannelPeriod),
    SearchTimeout(SearchTimeout),
    ChannelRfFrequency(ChannelRfFrequency),
    SetNetworkKey(SetNetworkKey),
    LowPrioritySearchTimeout(LowPrioritySearchTimeout),
    EnableExtRxMessages(EnableExtRxMessages),
    LibConfig(LibConfig),
    ResetSystem(ResetSystem),
    OpenChannel(OpenChannel),
    CloseChannel(CloseChannel),
    RequestMessage(RequestMessage),
    OpenRxScanMode(OpenRxScanMode),
    SleepMessage(SleepMessage),
    BroadcastData(BroadcastData),
    AcknowledgedData(AcknowledgedData),
    BurstTransferData(BurstTransferData),
    AdvancedBurstData(AdvancedBurstData),
}

impl TxMessage {
    fn as_transmitable(&self) -> &dyn TransmitableMessage {
        match self {
            TxMessage::UnAssignChannel(uc) => uc,
            TxMessage::AssignChannel(ac) => ac,
            TxMessage::ChannelId(id) => id,
            TxMessage::ChannelPeriod(cp) => cp,
            TxMessage::SearchTimeout(st) => st,
            TxMessage::ChannelRfFrequency(cr) => cr,
            TxMessage::SetNetworkKey(nk) => nk,
            TxMessage::LowPrioritySearchTimeout(lp) => lp,
            TxMessage::EnableExtRxMessages(ee) => ee,
            TxMessage::LibConfig(lc) => lc,
            TxMessage::ResetSystem(rs) => rs,
            TxMessage::OpenChannel(oc) => oc,
            TxMessage::CloseChannel(cc) => cc,
            TxMessage::RequestMessage(rm) => rm,
            TxMessage::OpenRxScanMode(or) => or,
            TxMessage::SleepMessage(sm) => sm,
            TxMessage::BroadcastData(bd) => bd,
            TxMessage::AcknowledgedData(ad) => ad,
            TxMessage::BurstTransferData(bt) => bt,
            TxMessage::AdvancedBurstData(ab) => ab,
        }
    }

    /// Channel the message is scoped to
    ///
    /// Network keys, extended message switches, lib config, reset and sleep are device wide and
    /// return `None`. Their responses come back on channel 0 regardless of who sent them.
    pub fn channel_number(&self) -> Option<u8> {
        match self {
            TxMessage::UnAssignChannel(uc) => Some(uc.channel_number),
            TxMessage::AssignChannel(ac) => Some(ac.data.channel_number),
            TxMessage::ChannelId(id) => Some(id.channel_number),
            TxMessage::ChannelPeriod(cp) => Some(cp.channel_number),
            TxMessage::SearchTimeout(st) => Some(st.channel_number),
            TxMessage::ChannelRfFrequency(cr) => Some(cr.channel_number),
            TxMessage::LowPrioritySearchTimeout(lp) => Some(lp.channel_number),
            TxMessage::OpenChannel(oc) => Some(oc.channel_number),
            TxMessage::CloseChannel(cc) => Some(cc.channel_number),
            TxMessage::RequestMessage(rm) => match rm.target() {
                control::RequestTarget::Channel(c) => Some(c),
                control::RequestTarget::SubMessage(_) => None,
            },
            TxMessage::BroadcastData(bd) => Some(bd.payload.channel_number),
            TxMessage::AcknowledgedData(ad) => Some(ad.payload.channel_number),
            TxMessage::BurstTransferData(bt) => Some(*bt.channel_sequence.channel_number),
            TxMessage::AdvancedBurstData(ab) => Some(*ab.channel_sequence.channel_number),
            TxMessage::SetNetworkKey(_)
            | TxMessage::EnableExtRxMessages(_)
            | TxMessage::LibConfig(_)
            | TxMessage::ResetSystem(_)
            | TxMessage::OpenRxScanMode(_)
            | TxMessage::SleepMessage(_) => None,
        }
    }
}

impl TransmitableMessage for TxMessage {
    fn serialize_message(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        self.as_transmitable().serialize_message(buf)
    }

    fn get_tx_msg_id(&self) -> TxMessageId {
        self.as_transmitable().get_tx_msg_id()
    }
}

#[derive(Clone, Debug, PartialEq)]
/// Represents a generic ANT radio message
pub struct AntMessage {
    pub header: RxMessageHeader,
    pub message: RxMessage,
    /// XOR of all prior bytes should match this
    pub checksum: u8,
    /// Whether `checksum` matched the received bytes
    pub valid: bool,
}

/// Trait for any TX message type
pub trait TransmitableMessage {
    /// Write the message content (no header, no checksum) into `buf`, returning its length
    fn serialize_message(&self, buf: &mut [u8]) -> Result<usize, CodecError>;
    fn get_tx_msg_id(&self) -> TxMessageId;
}

macro_rules! AntAutoPackWithExtention {
    ($msg_type:ident, $id:expr, $main_field:ident, $ext_field:ident) => {
        impl TransmitableMessage for $msg_type {
            fn serialize_message(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
                let data_len = PackedStructSlice::packed_bytes_size(Some(&self.$main_field))?;
                let ext_len = match &self.$ext_field {
                    Some(ext) => PackedStructSlice::packed_bytes_size(Some(ext))?,
                    None => 0,
                };
                let total = data_len + ext_len;
                if buf.len() < total {
                    return Err(CodecError::BufferTooSmall(total, buf.len()));
                }
                self.$main_field.pack_to_slice(&mut buf[..data_len])?;
                if let Some(ext) = &self.$ext_field {
                    ext.pack_to_slice(&mut buf[data_len..total])?;
                }
                Ok(total)
            }
            fn get_tx_msg_id(&self) -> TxMessageId {
                $id
            }
        }
        impl From<$msg_type> for TxMessage {
            fn from(msg: $msg_type) -> TxMessage {
                TxMessage::$msg_type(msg)
            }
        }
    };
}

pub(crate) use AntAutoPackWithExtention;

#[derive(PrimitiveEnum_u8, Clone, Copy, PartialEq, Debug)]
pub enum SyncByte {
    Value = 0xA4,
}

#[derive(PackedStruct, Debug, PartialEq, Clone, Copy)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "3")]
pub struct RxMessageHeader {
    #[packed_field(bytes = "0", ty = "enum")]
    pub sync: SyncByte,
    #[packed_field(bytes = "1")]
    pub msg_length: u8,
    #[packed_field(bytes = "2", ty = "enum")]
    pub msg_id: RxMessageId,
}

#[derive(PackedStruct, Debug, PartialEq, Clone, Copy)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "3")]
pub struct TxMessageHeader {
    #[packed_field(bytes = "0", ty = "enum")]
    pub sync: SyncByte,
    #[packed_field(bytes = "1")]
    pub msg_length: u8,
    #[packed_field(bytes = "2", ty = "enum")]
    pub msg_id: TxMessageId,
}

#[derive(PrimitiveEnum_u8, Clone, Copy, Debug, PartialEq)]
pub enum RxMessageId {
    // Notification Messages
    StartUpMessage = 0x6F,
    SerialErrorMessage = 0xAE,
    // Data Messages
    BroadcastData = 0x4E,
    AcknowledgedData = 0x4F,
    BurstTransferData = 0x50,
    AdvancedBurstData = 0x72,
    // Channel Messages, responses share the id
    ChannelEvent = 0x40,
    // Requested Response Messages
    ChannelStatus = 0x52,
    ChannelId = 0x51,
    AntVersion = 0x3E,
    Capabilities = 0x54,
    SerialNumber = 0x61,
}

impl fmt::Display for RxMessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RxMessageId::StartUpMessage => "Start-up Message",
            RxMessageId::SerialErrorMessage => "Serial Error Message",
            RxMessageId::BroadcastData => "Broadcast Data",
            RxMessageId::AcknowledgedData => "Acknowledged Data",
            RxMessageId::BurstTransferData => "Burst Transfer Data",
            RxMessageId::AdvancedBurstData => "Advanced Burst Data",
            RxMessageId::ChannelEvent => "Channel Response / Event",
            RxMessageId::ChannelStatus => "Channel Status",
            RxMessageId::ChannelId => "Channel ID",
            RxMessageId::AntVersion => "ANT Version",
            RxMessageId::Capabilities => "Capabilities",
            RxMessageId::SerialNumber => "Serial Number",
        };
        f.write_str(name)
    }
}

#[derive(PrimitiveEnum_u8, Clone, Copy, PartialEq, Debug)]
pub enum TxMessageId {
    // Config Messages
    UnAssignChannel = 0x41,
    AssignChannel = 0x42,
    ChannelId = 0x51,
    ChannelPeriod = 0x43,
    SearchTimeout = 0x44,
    ChannelRfFrequency = 0x45,
    SetNetworkKey = 0x46,
    LowPrioritySearchTimeout = 0x63,
    EnableExtRxMessages = 0x66,
    LibConfig = 0x6E,
    // Control Messages
    ResetSystem = 0x4A,
    OpenChannel = 0x4B,
    CloseChannel = 0x4C,
    RequestMessage = 0x4D,
    OpenRxScanMode = 0x5B,
    SleepMessage = 0xC5,
    // Data Messages
    BroadcastData = 0x4E,
    AcknowledgedData = 0x4F,
    BurstTransferData = 0x50,
    AdvancedBurstData = 0x72,
}

impl fmt::Display for TxMessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxMessageId::UnAssignChannel => "Unassign Channel",
            TxMessageId::AssignChannel => "Assign Channel",
            TxMessageId::ChannelId => "Channel ID",
            TxMessageId::ChannelPeriod => "Channel Period",
            TxMessageId::SearchTimeout => "Search Timeout",
            TxMessageId::ChannelRfFrequency => "Channel RF Frequency",
            TxMessageId::SetNetworkKey => "Set Network Key",
            TxMessageId::LowPrioritySearchTimeout => "Low Priority Search Timeout",
            TxMessageId::EnableExtRxMessages => "Enable Extended Rx Messages",
            TxMessageId::LibConfig => "Lib Config",
            TxMessageId::ResetSystem => "Reset System",
            TxMessageId::OpenChannel => "Open Channel",
            TxMessageId::CloseChannel => "Close Channel",
            TxMessageId::RequestMessage => "Request Message",
            TxMessageId::OpenRxScanMode => "Open Rx Scan Mode",
            TxMessageId::SleepMessage => "Sleep Message",
            TxMessageId::BroadcastData => "Broadcast Data",
            TxMessageId::AcknowledgedData => "Acknowledged Data",
            TxMessageId::BurstTransferData => "Burst Transfer Data",
            TxMessageId::AdvancedBurstData => "Advanced Burst Data",
        };
        f.write_str(name)
    }
}
