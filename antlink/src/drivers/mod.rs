// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Byte level plumbing: message encode/decode, stream framing and the transport seam.

mod framer;
mod serial;

pub use framer::*;
pub use serial::*;

use crate::bits::calculate_checksum;
use crate::messages::channel::{ChannelEvent, ChannelResponse};
use crate::messages::config::{
    AssignChannel, ChannelId, ChannelPeriod, ChannelRfFrequency, EnableExtRxMessages, LibConfig,
    LowPrioritySearchTimeout, SearchTimeout, SetNetworkKey, UnAssignChannel,
};
use crate::messages::control::{
    CloseChannel, OpenChannel, OpenRxScanMode, RequestMessage, ResetSystem, SleepMessage,
};
use crate::messages::data::{AcknowledgedData, BroadcastData};
use crate::messages::notifications::{SerialErrorMessage, StartUpMessage};
use crate::messages::requested_response::{AntVersion, Capabilities, ChannelStatus, SerialNumber};
use crate::messages::{
    AntMessage, CodecError, RxMessage, RxMessageHeader, RxMessageId, SyncByte,
    TransmitableMessage, TxMessage, TxMessageHeader, TxMessageId, CHECKSUM_SIZE, HEADER_SIZE,
    MAX_FRAME_SIZE,
};

use arrayvec::ArrayVec;
use core::fmt::Debug;
use packed_struct::prelude::{PackedStruct, PackedStructSlice, PrimitiveEnum};
use thiserror::Error;

/// One complete frame, sync byte to checksum
pub type Buffer = ArrayVec<u8, MAX_FRAME_SIZE>;

#[derive(Error, Debug, PartialEq)]
pub enum DriverError<E: Debug> {
    #[error("Codec error: {0}")]
    Codec(CodecError),
    #[error("Transport error: {0:?}")]
    Transport(E),
}

impl<E: Debug> From<CodecError> for DriverError<E> {
    fn from(err: CodecError) -> Self {
        DriverError::Codec(err)
    }
}

/// Byte sink the channel pool writes encoded messages through
pub trait Transport {
    type Error: Debug;

    fn open(&mut self) -> Result<(), Self::Error>;
    /// Write one complete encoded message
    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
    fn close(&mut self) -> Result<(), Self::Error>;
}

fn create_packed_message<'a>(
    buf: &'a mut [u8],
    msg: &dyn TransmitableMessage,
) -> Result<&'a [u8], CodecError> {
    if buf.len() < HEADER_SIZE + CHECKSUM_SIZE {
        return Err(CodecError::BufferTooSmall(
            HEADER_SIZE + CHECKSUM_SIZE,
            buf.len(),
        ));
    }
    let content_end = buf.len() - CHECKSUM_SIZE;
    let msg_len = msg.serialize_message(&mut buf[HEADER_SIZE..content_end])?;
    let header = TxMessageHeader {
        sync: SyncByte::Value,
        msg_length: msg_len as u8,
        msg_id: msg.get_tx_msg_id(),
    };

    let padded_len = msg_len + HEADER_SIZE;
    header.pack_to_slice(&mut buf[..HEADER_SIZE])?;
    buf[padded_len] = calculate_checksum(&buf[..padded_len]);

    Ok(&buf[..padded_len + CHECKSUM_SIZE])
}

/// Encode a message into a complete frame: sync, length, id, content and checksum.
///
/// The length byte always reflects the content actually written, so optional trailers (extended
/// assignment, extended data) grow it.
pub fn encode_message(msg: &dyn TransmitableMessage) -> Result<Buffer, CodecError> {
    let mut buf = [0; MAX_FRAME_SIZE];
    let frame = create_packed_message(&mut buf, msg)?;
    let mut out = Buffer::new();
    out.try_extend_from_slice(frame)
        .map_err(|_| CodecError::BufferTooSmall(frame.len(), MAX_FRAME_SIZE))?;
    Ok(out)
}

/// Splits a frame into header bytes, content and checksum after validating the framing.
fn split_frame(buf: &[u8]) -> Result<(u8, &[u8], u8, bool), CodecError> {
    if buf.len() < HEADER_SIZE + CHECKSUM_SIZE {
        return Err(CodecError::BufferTooSmall(
            HEADER_SIZE + CHECKSUM_SIZE,
            buf.len(),
        ));
    }
    if buf[0] != SyncByte::Value.to_primitive() {
        return Err(CodecError::BadSync(buf[0]));
    }
    let msg_length = buf[1] as usize;
    let msg_size = msg_length + HEADER_SIZE + CHECKSUM_SIZE;
    if buf.len() != msg_size {
        return Err(CodecError::BadLength(msg_size, buf.len()));
    }
    let content_end = HEADER_SIZE + msg_length;
    let checksum = buf[content_end];
    let valid = calculate_checksum(&buf[..content_end]) == checksum;
    Ok((buf[2], &buf[HEADER_SIZE..content_end], checksum, valid))
}

/// Decode a frame sent by the radio.
///
/// A checksum mismatch is reported through [AntMessage::valid], anything that can't be parsed is
/// an error.
pub fn decode_message(buf: &[u8]) -> Result<AntMessage, CodecError> {
    let (id, msg_slice, checksum, valid) = split_frame(buf)?;
    let msg_id = RxMessageId::from_primitive(id).ok_or(CodecError::UnknownMessageId(id))?;

    let body = match msg_id {
        RxMessageId::StartUpMessage => {
            RxMessage::StartUpMessage(StartUpMessage::unpack_from_slice(msg_slice)?)
        }
        RxMessageId::SerialErrorMessage => {
            RxMessage::SerialErrorMessage(SerialErrorMessage::unpack_with_echo(msg_slice)?)
        }
        RxMessageId::BroadcastData => {
            RxMessage::BroadcastData(BroadcastData::unpack_from_slice(msg_slice)?)
        }
        RxMessageId::AcknowledgedData => {
            RxMessage::AcknowledgedData(AcknowledgedData::unpack_from_slice(msg_slice)?)
        }
        RxMessageId::BurstTransferData | RxMessageId::AdvancedBurstData => {
            return Err(CodecError::UnsupportedMessage(id))
        }
        RxMessageId::ChannelEvent => {
            if ChannelEvent::is_event(msg_slice) {
                RxMessage::ChannelEvent(ChannelEvent::unpack_from_slice(msg_slice)?)
            } else {
                RxMessage::ChannelResponse(ChannelResponse::unpack_from_slice(msg_slice)?)
            }
        }
        RxMessageId::ChannelStatus => {
            RxMessage::ChannelStatus(ChannelStatus::unpack_from_slice(msg_slice)?)
        }
        RxMessageId::ChannelId => RxMessage::ChannelId(ChannelId::unpack_from_slice(msg_slice)?),
        RxMessageId::AntVersion => RxMessage::AntVersion(AntVersion::unpack_from_slice(msg_slice)?),
        RxMessageId::Capabilities => {
            RxMessage::Capabilities(Capabilities::unpack_from_slice(msg_slice)?)
        }
        RxMessageId::SerialNumber => {
            RxMessage::SerialNumber(SerialNumber::unpack_from_slice(msg_slice)?)
        }
    };

    Ok(AntMessage {
        header: RxMessageHeader {
            sync: SyncByte::Value,
            msg_length: msg_slice.len() as u8,
            msg_id,
        },
        message: body,
        checksum,
        valid,
    })
}

/// A decoded host to radio frame
#[derive(Clone, Debug, PartialEq)]
pub struct TxFrame {
    pub header: TxMessageHeader,
    pub message: TxMessage,
    pub checksum: u8,
    pub valid: bool,
}

/// Decode a frame written by the host, used to inspect or log outbound traffic.
pub fn decode_tx_message(buf: &[u8]) -> Result<TxFrame, CodecError> {
    let (id, msg_slice, checksum, valid) = split_frame(buf)?;
    let msg_id = TxMessageId::from_primitive(id).ok_or(CodecError::UnknownMessageId(id))?;

    let message = match msg_id {
        TxMessageId::UnAssignChannel => UnAssignChannel::unpack_from_slice(msg_slice)?.into(),
        TxMessageId::AssignChannel => AssignChannel::unpack_from_slice(msg_slice)?.into(),
        TxMessageId::ChannelId => ChannelId::unpack_from_slice(msg_slice)?.into(),
        TxMessageId::ChannelPeriod => ChannelPeriod::unpack_from_slice(msg_slice)?.into(),
        TxMessageId::SearchTimeout => SearchTimeout::unpack_from_slice(msg_slice)?.into(),
        TxMessageId::ChannelRfFrequency => {
            ChannelRfFrequency::unpack_from_slice(msg_slice)?.into()
        }
        TxMessageId::SetNetworkKey => SetNetworkKey::unpack_from_slice(msg_slice)?.into(),
        TxMessageId::LowPrioritySearchTimeout => {
            LowPrioritySearchTimeout::unpack_from_slice(msg_slice)?.into()
        }
        TxMessageId::EnableExtRxMessages => {
            EnableExtRxMessages::unpack_from_slice(msg_slice)?.into()
        }
        TxMessageId::LibConfig => LibConfig::unpack_from_slice(msg_slice)?.into(),
        TxMessageId::ResetSystem => ResetSystem::unpack_from_slice(msg_slice)?.into(),
        TxMessageId::OpenChannel => OpenChannel::unpack_from_slice(msg_slice)?.into(),
        TxMessageId::CloseChannel => CloseChannel::unpack_from_slice(msg_slice)?.into(),
        TxMessageId::RequestMessage => RequestMessage::unpack_from_slice(msg_slice)?.into(),
        TxMessageId::OpenRxScanMode => OpenRxScanMode::unpack_from_slice(msg_slice)?.into(),
        TxMessageId::SleepMessage => SleepMessage::unpack_from_slice(msg_slice)?.into(),
        TxMessageId::BroadcastData => BroadcastData::unpack_from_slice(msg_slice)?.into(),
        TxMessageId::AcknowledgedData => AcknowledgedData::unpack_from_slice(msg_slice)?.into(),
        TxMessageId::BurstTransferData | TxMessageId::AdvancedBurstData => {
            return Err(CodecError::UnsupportedMessage(id))
        }
    };

    Ok(TxFrame {
        header: TxMessageHeader {
            sync: SyncByte::Value,
            msg_length: msg_slice.len() as u8,
            msg_id,
        },
        message,
        checksum,
        valid,
    })
}
