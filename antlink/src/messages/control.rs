// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::messages::{
    AntAutoPackWithExtention, CodecError, TransmitableMessage, TxMessage, TxMessageId,
};
use antlink_derive::AntTx;
use packed_struct::prelude::*;

#[derive(PackedStruct, AntTx, Clone, Copy, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "1")]
pub struct ResetSystem {
    #[packed_field(bytes = "0")]
    filler: ReservedZeroes<packed_bits::Bits::<8>>,
}

impl ResetSystem {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(PackedStruct, AntTx, Clone, Copy, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "1")]
pub struct OpenChannel {
    #[packed_field(bytes = "0")]
    pub channel_number: u8,
}

impl OpenChannel {
    pub fn new(channel_number: u8) -> Self {
        Self { channel_number }
    }
}

#[derive(PackedStruct, AntTx, Clone, Copy, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "1")]
pub struct CloseChannel {
    #[packed_field(bytes = "0")]
    pub channel_number: u8,
}

impl CloseChannel {
    pub fn new(channel_number: u8) -> Self {
        Self { channel_number }
    }
}

#[derive(PrimitiveEnum_u8, Clone, Copy, Debug, PartialEq, Default)]
pub enum RequestableMessageId {
    #[default]
    ChannelStatus = 0x52,
    ChannelId = 0x51,
    AntVersion = 0x3E,
    Capabilities = 0x54,
    SerialNumber = 0x61,
}

impl RequestableMessageId {
    /// Whether the reply describes a single channel rather than the whole radio
    pub fn is_channel_scoped(&self) -> bool {
        matches!(
            self,
            RequestableMessageId::ChannelStatus | RequestableMessageId::ChannelId
        )
    }
}

/// How byte 0 of a [RequestMessage] is interpreted
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RequestTarget {
    Channel(u8),
    SubMessage(u8),
}

#[derive(PackedStruct, Clone, Copy, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "2")]
pub struct RequestMessageData {
    /// Channel number or sub-message id, see [RequestMessage::target]
    #[packed_field(bytes = "0")]
    pub channel: u8,
    #[packed_field(bytes = "1", ty = "enum")]
    pub message_id: RequestableMessageId,
}

#[derive(PackedStruct, Clone, Copy, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "3")]
pub struct NvmRequest {
    #[packed_field(bytes = "0:1")]
    pub addr: u16,
    #[packed_field(bytes = "2")]
    pub size: u8,
}

impl NvmRequest {
    pub fn new(addr: u16, size: u8) -> Self {
        Self { addr, size }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RequestMessage {
    pub data: RequestMessageData,
    pub nvm_region: Option<NvmRequest>,
}
AntAutoPackWithExtention!(
    RequestMessage,
    TxMessageId::RequestMessage,
    data,
    nvm_region
);

impl RequestMessage {
    pub fn new(
        channel: u8,
        message_id: RequestableMessageId,
        nvm_region: Option<NvmRequest>,
    ) -> Self {
        Self {
            data: RequestMessageData {
                channel,
                message_id,
            },
            nvm_region,
        }
    }

    /// Request addressed by sub-message id instead of channel number
    pub fn new_sub_message(sub_message_id: u8, message_id: RequestableMessageId) -> Self {
        Self::new(sub_message_id, message_id, None)
    }

    /// Interpretation of byte 0
    ///
    /// Byte 0 carries a channel number when the requested reply is channel scoped (status,
    /// channel id) and a sub-message id for radio wide replies (capabilities, version, serial
    /// number).
    pub fn target(&self) -> RequestTarget {
        if self.data.message_id.is_channel_scoped() {
            RequestTarget::Channel(self.data.channel)
        } else {
            RequestTarget::SubMessage(self.data.channel)
        }
    }

    pub(crate) fn unpack_from_slice(data: &[u8]) -> Result<Self, CodecError> {
        let (main, ext) = match data.len() {
            2 => (data, None),
            5 => (&data[..2], Some(NvmRequest::unpack_from_slice(&data[2..])?)),
            len => return Err(CodecError::BadLength(2, len)),
        };
        Ok(Self {
            data: RequestMessageData::unpack_from_slice(main)?,
            nvm_region: ext,
        })
    }
}

#[derive(PackedStruct, Clone, Copy, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "1")]
pub struct OpenRxScanModeData {
    #[packed_field(bytes = "0")]
    filler: ReservedZeroes<packed_bits::Bits::<8>>,
}

#[derive(PackedStruct, Clone, Copy, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "1")]
pub struct SynchronousChannelPacketsOnly {
    #[packed_field(bits = "0:6")]
    _reserved: ReservedZeroes<packed_bits::Bits::<7>>,
    #[packed_field(bits = "7")]
    pub enable: bool,
}

/// Represents an Open Rx Scan Mode message (0x5B)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OpenRxScanMode {
    pub data: OpenRxScanModeData,
    pub synchronous_channel_packets_only: Option<SynchronousChannelPacketsOnly>,
}
AntAutoPackWithExtention!(
    OpenRxScanMode,
    TxMessageId::OpenRxScanMode,
    data,
    synchronous_channel_packets_only
);

impl OpenRxScanMode {
    pub fn new(synchronous_channel_packets_only: Option<bool>) -> Self {
        Self {
            data: OpenRxScanModeData::default(),
            synchronous_channel_packets_only: synchronous_channel_packets_only.map(|enable| {
                SynchronousChannelPacketsOnly {
                    enable,
                    ..SynchronousChannelPacketsOnly::default()
                }
            }),
        }
    }

    pub(crate) fn unpack_from_slice(data: &[u8]) -> Result<Self, CodecError> {
        let ext = match data.len() {
            1 => None,
            2 => Some(SynchronousChannelPacketsOnly::unpack_from_slice(&data[1..])?),
            len => return Err(CodecError::BadLength(1, len)),
        };
        Ok(Self {
            data: OpenRxScanModeData::unpack_from_slice(&data[..1])?,
            synchronous_channel_packets_only: ext,
        })
    }
}

#[derive(PackedStruct, AntTx, Clone, Copy, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "1")]
pub struct SleepMessage {
    #[packed_field(bytes = "0")]
    filler: ReservedZeroes<packed_bits::Bits::<8>>,
}

impl SleepMessage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_system() {
        let packed = ResetSystem::new();
        assert_eq!(packed.pack().unwrap(), [0]);
    }

    #[test]
    fn open_channel() {
        assert_eq!(OpenChannel::new(0).pack().unwrap(), [0]);
        assert_eq!(OpenChannel::new(1).pack().unwrap(), [1]);
    }

    #[test]
    fn close_channel() {
        let packed = CloseChannel::new(0);
        assert_eq!(packed.pack().unwrap(), [0]);
    }

    #[test]
    fn sleep_message() {
        let packed = SleepMessage::new();
        assert_eq!(packed.pack().unwrap(), [0]);
    }

    #[test]
    fn request_message() {
        let mut buf = [0; 5];
        let packed = RequestMessage::new(1, RequestableMessageId::ChannelStatus, None);
        assert_eq!(packed.serialize_message(&mut buf).unwrap(), 2);
        assert_eq!(buf[..2], [1, 0x52]);
        assert_eq!(packed.target(), RequestTarget::Channel(1));

        let packed = RequestMessage::new(
            0,
            RequestableMessageId::ChannelId,
            Some(NvmRequest::new(0x1234, 8)),
        );
        assert_eq!(packed.serialize_message(&mut buf).unwrap(), 5);
        assert_eq!(buf, [0, 0x51, 0x34, 0x12, 8]);
        assert_eq!(RequestMessage::unpack_from_slice(&buf).unwrap(), packed);
    }

    #[test]
    fn request_sub_message() {
        let packed = RequestMessage::new_sub_message(0, RequestableMessageId::Capabilities);
        assert_eq!(packed.target(), RequestTarget::SubMessage(0));
        assert_eq!(packed.data.pack().unwrap(), [0, 0x54]);
    }

    #[test]
    fn open_rx_scan_mode() {
        let mut buf = [0; 2];
        assert_eq!(OpenRxScanMode::new(None).serialize_message(&mut buf).unwrap(), 1);
        assert_eq!(buf, [0, 0]);
        let packed = OpenRxScanMode::new(Some(true));
        assert_eq!(packed.serialize_message(&mut buf).unwrap(), 2);
        assert_eq!(buf, [0, 1]);
        assert_eq!(OpenRxScanMode::unpack_from_slice(&buf).unwrap(), packed);
    }
}
