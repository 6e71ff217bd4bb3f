// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::messages::CodecError;
use core::fmt;
use packed_struct::prelude::*;

pub use crate::messages::TxMessageId;

#[derive(PrimitiveEnum_u8, Clone, Copy, Debug, PartialEq)]
pub enum MessageCode {
    ResponseNoError = 0x00,
    EventRxSearchTimeout = 0x01,
    EventRxFail = 0x02,
    EventTx = 0x03,
    EventTransferRxFailed = 0x04,
    EventTransferTxCompleted = 0x05,
    EventTransferTxFailed = 0x06,
    EventChannelClosed = 0x07,
    EventRxFailGoToSearch = 0x08,
    EventChannelCollision = 0x09,
    EventTransferTxStart = 0x0A,
    EventTransferNextDataBlock = 0x11,
    ChannelInWrongState = 0x15,
    ChannelNotOpened = 0x16,
    ChannelIdNotSet = 0x18,
    CloseAllChannels = 0x19,
    TransferInProgress = 0x1F,
    TransferSequenceNumberError = 0x20,
    TransferInError = 0x21,
    MessageSizeExceedsLimit = 0x27,
    InvalidMessage = 0x28,
    InvalidNetworkNumber = 0x29,
    InvalidListId = 0x30,
    InvalidScanTxChannel = 0x31,
    InvalidParameterProvided = 0x32,
    EventSerialQueOverflow = 0x34,
    EventQueOverflow = 0x35,
    EncryptNegotiationSuccess = 0x38,
    EncryptNegotiationFail = 0x39,
    NvmFullError = 0x40,
    NvmWriteError = 0x41,
    UsbStringWriteFail = 0x70,
    MesgSerialErrorId = 0xAE,
}

impl fmt::Display for MessageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageCode::ResponseNoError => "response no error",
            MessageCode::EventRxSearchTimeout => "event rx search timeout",
            MessageCode::EventRxFail => "event rx fail",
            MessageCode::EventTx => "event tx",
            MessageCode::EventTransferRxFailed => "event transfer rx failed",
            MessageCode::EventTransferTxCompleted => "event transfer tx completed",
            MessageCode::EventTransferTxFailed => "event transfer tx failed",
            MessageCode::EventChannelClosed => "event channel closed",
            MessageCode::EventRxFailGoToSearch => "event rx fail go to search",
            MessageCode::EventChannelCollision => "event channel collision",
            MessageCode::EventTransferTxStart => "event transfer tx start",
            MessageCode::EventTransferNextDataBlock => "event transfer next data block",
            MessageCode::ChannelInWrongState => "channel in wrong state",
            MessageCode::ChannelNotOpened => "channel not opened",
            MessageCode::ChannelIdNotSet => "channel id not set",
            MessageCode::CloseAllChannels => "close all channels",
            MessageCode::TransferInProgress => "transfer in progress",
            MessageCode::TransferSequenceNumberError => "transfer sequence number error",
            MessageCode::TransferInError => "transfer in error",
            MessageCode::MessageSizeExceedsLimit => "message size exceeds limit",
            MessageCode::InvalidMessage => "invalid message",
            MessageCode::InvalidNetworkNumber => "invalid network number",
            MessageCode::InvalidListId => "invalid list id",
            MessageCode::InvalidScanTxChannel => "invalid scan tx channel",
            MessageCode::InvalidParameterProvided => "invalid parameter provided",
            MessageCode::EventSerialQueOverflow => "event serial queue overflow",
            MessageCode::EventQueOverflow => "event queue overflow",
            MessageCode::EncryptNegotiationSuccess => "encrypt negotiation success",
            MessageCode::EncryptNegotiationFail => "encrypt negotiation fail",
            MessageCode::NvmFullError => "nvm full error",
            MessageCode::NvmWriteError => "nvm write error",
            MessageCode::UsbStringWriteFail => "usb string write fail",
            MessageCode::MesgSerialErrorId => "serial error",
        };
        f.write_str(name)
    }
}

#[derive(PackedStruct, Copy, Clone, Debug, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "3")]
pub struct ChannelEventPayload {
    #[packed_field(bytes = "0")]
    pub channel_number: u8,
    #[packed_field(bits = "8:14")]
    _reserved0: ReservedZeroes<packed_bits::Bits<7>>,
    #[packed_field(bits = "15")]
    _reserved1: ReservedOnes<packed_bits::Bits<1>>,
    #[packed_field(bytes = "2", ty = "enum")]
    pub message_code: MessageCode,
}

/// Channel event (0x40 with byte 1 set to 1), unsolicited notification from the radio
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ChannelEvent {
    pub payload: ChannelEventPayload,
}

impl ChannelEvent {
    pub(crate) const MSG_ID: u8 = 1;
    pub(crate) const MSG_ID_INDEX: usize = 1;

    pub fn new(channel_number: u8, message_code: MessageCode) -> Self {
        Self {
            payload: ChannelEventPayload {
                channel_number,
                _reserved0: Default::default(),
                _reserved1: Default::default(),
                message_code,
            },
        }
    }

    /// Whether a 0x40 message body is an event rather than a response
    pub(crate) fn is_event(data: &[u8]) -> bool {
        data.get(Self::MSG_ID_INDEX) == Some(&Self::MSG_ID)
    }

    pub(crate) fn unpack_from_slice(data: &[u8]) -> Result<Self, CodecError> {
        // Some events carry trailing data, only the first 3 bytes are interpreted
        let payload = data.get(..3).ok_or(CodecError::BufferTooSmall(3, data.len()))?;
        Ok(ChannelEvent {
            payload: ChannelEventPayload::unpack_from_slice(payload)?,
        })
    }
}

/// Channel response (0x40), the radio's answer to a configuration or control message
#[derive(PackedStruct, Debug, Clone, Copy, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "3")]
pub struct ChannelResponse {
    #[packed_field(bytes = "0")]
    pub channel_number: u8,
    #[packed_field(bytes = "1", ty = "enum")]
    pub message_id: TxMessageId,
    #[packed_field(bytes = "2", ty = "enum")]
    pub message_code: MessageCode,
}

impl ChannelResponse {
    pub fn new(channel_number: u8, message_id: TxMessageId, message_code: MessageCode) -> Self {
        Self {
            channel_number,
            message_id,
            message_code,
        }
    }
}
