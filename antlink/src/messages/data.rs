// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::messages::{CodecError, TransmitableMessage, TxMessage, TxMessageId};
use derive_new::new;
use packed_struct::prelude::*;

pub use crate::messages::config::{
    DeviceType, TransmissionChannelType, TransmissionGlobalDataPages, TransmissionType,
};

/// Channel id appended to data messages when extended messages are enabled
#[derive(PackedStruct, new, Clone, Copy, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "4")]
pub struct ChannelIdOutput {
    #[packed_field(bytes = "0:1")]
    pub device_number: u16,
    #[packed_field(bytes = "2")]
    pub device_type: DeviceType,
    #[packed_field(bytes = "3")]
    pub transmission_type: TransmissionType,
}

impl ChannelIdOutput {
    const PACKING_SIZE: usize = 4;
}

#[derive(PrimitiveEnum_u8, Clone, Copy, PartialEq, Debug)]
pub enum RssiMeasurementType {
    Agc = 0x10,
    Dbm = 0x20,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RssiOutput {
    pub measurement_type: RssiMeasurementType,
    pub measurement_value: RssiMeasurementValue,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RssiMeasurementValue {
    Dbm(MeasurementValueDbm),
    Agc(MeasurementValueAgc),
}

#[derive(PackedStruct, Clone, Copy, Debug, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "2")]
pub struct MeasurementValueDbm {
    #[packed_field(bytes = "0")]
    pub rssi_value: i8,
    #[packed_field(bytes = "1")]
    pub threshold_configuration_value: i8,
}

impl MeasurementValueDbm {
    // +1 for type byte
    const PACKING_SIZE: usize = 3;
}

// https://www.thisisant.com/forum/viewthread/4280/
#[derive(PackedStruct, Clone, Copy, Debug, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "3")]
pub struct MeasurementValueAgc {
    #[packed_field(bytes = "0")]
    pub threshold_offset: i8,
    #[packed_field(bytes = "1:2")]
    pub register: u16,
}

impl MeasurementValueAgc {
    // +1 for type byte
    const PACKING_SIZE: usize = 4;
}

impl RssiOutput {
    fn packing_size(&self) -> usize {
        match self.measurement_value {
            RssiMeasurementValue::Dbm(_) => MeasurementValueDbm::PACKING_SIZE,
            RssiMeasurementValue::Agc(_) => MeasurementValueAgc::PACKING_SIZE,
        }
    }

    pub(crate) fn unpack_from_slice(data: &[u8]) -> Result<RssiOutput, CodecError> {
        let (type_byte, value) = data
            .split_first()
            .ok_or(CodecError::BufferTooSmall(1, 0))?;
        let measurement_type =
            RssiMeasurementType::from_primitive(*type_byte).ok_or(PackingError::InvalidValue)?;
        let measurement_value = match measurement_type {
            RssiMeasurementType::Agc => {
                RssiMeasurementValue::Agc(MeasurementValueAgc::unpack_from_slice(value)?)
            }
            RssiMeasurementType::Dbm => {
                RssiMeasurementValue::Dbm(MeasurementValueDbm::unpack_from_slice(value)?)
            }
        };
        Ok(RssiOutput {
            measurement_type,
            measurement_value,
        })
    }

    pub(crate) fn pack_to_slice(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        let len = self.packing_size();
        let available = buf.len();
        let dst = buf
            .get_mut(..len)
            .ok_or(CodecError::BufferTooSmall(len, available))?;
        dst[0] = self.measurement_type.to_primitive();
        match &self.measurement_value {
            RssiMeasurementValue::Dbm(v) => v.pack_to_slice(&mut dst[1..])?,
            RssiMeasurementValue::Agc(v) => v.pack_to_slice(&mut dst[1..])?,
        }
        Ok(len)
    }
}

#[derive(PackedStruct, new, Clone, Copy, Debug, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "2")]
pub struct TimestampOutput {
    /// 1/32768 s ticks
    #[packed_field(bytes = "0:1")]
    pub rx_timestamp: u16,
}

impl TimestampOutput {
    const PACKING_SIZE: usize = 2;
}

#[derive(PackedStruct, new, Clone, Copy, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "lsb0", size_bytes = "1")]
pub struct FlagByte {
    #[packed_field(bits = "7")]
    pub channel_id_output: bool,
    #[packed_field(bits = "6")]
    pub rssi_output: bool,
    #[packed_field(bits = "5")]
    pub timestamp_output: bool,
    #[new(default)]
    #[packed_field(bits = "0:4")]
    _reserved: ReservedZeroes<packed_bits::Bits<5>>,
}

impl FlagByte {
    const PACKING_SIZE: usize = 1;
}

/// Optional trailer of a data message, present when extended messages or lib config are enabled
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtendedInfo {
    pub flag_byte: FlagByte,
    pub channel_id_output: Option<ChannelIdOutput>,
    pub rssi_output: Option<RssiOutput>,
    pub timestamp_output: Option<TimestampOutput>,
}

fn take(data: &[u8], len: usize) -> Result<(&[u8], &[u8]), CodecError> {
    if data.len() < len {
        return Err(CodecError::BufferTooSmall(len, data.len()));
    }
    Ok(data.split_at(len))
}

impl ExtendedInfo {
    /// Build a trailer, the flag byte follows from the fields present
    pub fn new(
        channel_id_output: Option<ChannelIdOutput>,
        rssi_output: Option<RssiOutput>,
        timestamp_output: Option<TimestampOutput>,
    ) -> Self {
        Self {
            flag_byte: FlagByte::new(
                channel_id_output.is_some(),
                rssi_output.is_some(),
                timestamp_output.is_some(),
            ),
            channel_id_output,
            rssi_output,
            timestamp_output,
        }
    }

    pub fn packing_size(&self) -> usize {
        FlagByte::PACKING_SIZE
            + self
                .channel_id_output
                .map_or(0, |_| ChannelIdOutput::PACKING_SIZE)
            + self.rssi_output.map_or(0, |r| r.packing_size())
            + self
                .timestamp_output
                .map_or(0, |_| TimestampOutput::PACKING_SIZE)
    }

    pub(crate) fn unpack_from_slice(data: &[u8]) -> Result<Option<ExtendedInfo>, CodecError> {
        if data.is_empty() {
            return Ok(None);
        }

        let (flag_buf, data) = take(data, FlagByte::PACKING_SIZE)?;
        let flag_byte = FlagByte::unpack_from_slice(flag_buf)?;

        let mut extended_info = ExtendedInfo {
            flag_byte,
            channel_id_output: None,
            rssi_output: None,
            timestamp_output: None,
        };

        let data = if flag_byte.channel_id_output {
            let (msg_data, data) = take(data, ChannelIdOutput::PACKING_SIZE)?;
            extended_info.channel_id_output = Some(ChannelIdOutput::unpack_from_slice(msg_data)?);
            data
        } else {
            data
        };

        let data = if flag_byte.rssi_output {
            // Hack to handle https://www.thisisant.com/forum/viewthread/4280/
            let format = RssiMeasurementType::from_primitive(
                *data.first().ok_or(CodecError::BufferTooSmall(1, 0))?,
            )
            .ok_or(PackingError::InvalidValue)?;
            let slice_size = match format {
                RssiMeasurementType::Agc => MeasurementValueAgc::PACKING_SIZE,
                RssiMeasurementType::Dbm => MeasurementValueDbm::PACKING_SIZE,
            };
            let (msg_data, data) = take(data, slice_size)?;
            extended_info.rssi_output = Some(RssiOutput::unpack_from_slice(msg_data)?);
            data
        } else {
            data
        };

        let data = if flag_byte.timestamp_output {
            let (msg_data, data) = take(data, TimestampOutput::PACKING_SIZE)?;
            extended_info.timestamp_output = Some(TimestampOutput::unpack_from_slice(msg_data)?);
            data
        } else {
            data
        };

        if !data.is_empty() {
            let expected = extended_info.packing_size();
            return Err(CodecError::BadLength(expected, expected + data.len()));
        }

        Ok(Some(extended_info))
    }

    pub(crate) fn pack_to_slice(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        let len = self.packing_size();
        if buf.len() < len {
            return Err(CodecError::BufferTooSmall(len, buf.len()));
        }
        let flag_byte = FlagByte::new(
            self.channel_id_output.is_some(),
            self.rssi_output.is_some(),
            self.timestamp_output.is_some(),
        );
        flag_byte.pack_to_slice(&mut buf[..FlagByte::PACKING_SIZE])?;
        let mut offset = FlagByte::PACKING_SIZE;
        if let Some(id) = &self.channel_id_output {
            id.pack_to_slice(&mut buf[offset..offset + ChannelIdOutput::PACKING_SIZE])?;
            offset += ChannelIdOutput::PACKING_SIZE;
        }
        if let Some(rssi) = &self.rssi_output {
            offset += rssi.pack_to_slice(&mut buf[offset..])?;
        }
        if let Some(ts) = &self.timestamp_output {
            ts.pack_to_slice(&mut buf[offset..offset + TimestampOutput::PACKING_SIZE])?;
            offset += TimestampOutput::PACKING_SIZE;
        }
        Ok(offset)
    }
}

#[derive(PackedStruct, Copy, Clone, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "9")]
pub struct BroadcastDataPayload {
    #[packed_field(bytes = "0")]
    pub channel_number: u8,
    #[packed_field(bytes = "1:8")]
    pub data: [u8; 8],
}

impl BroadcastDataPayload {
    const PACKING_SIZE: usize = 9;

    fn serialize_with(
        &self,
        extended_info: &Option<ExtendedInfo>,
        buf: &mut [u8],
    ) -> Result<usize, CodecError> {
        let ext_len = extended_info.as_ref().map_or(0, |e| e.packing_size());
        let total = Self::PACKING_SIZE + ext_len;
        if buf.len() < total {
            return Err(CodecError::BufferTooSmall(total, buf.len()));
        }
        self.pack_to_slice(&mut buf[..Self::PACKING_SIZE])?;
        if let Some(ext) = extended_info {
            ext.pack_to_slice(&mut buf[Self::PACKING_SIZE..total])?;
        }
        Ok(total)
    }

    fn unpack_with_extension(
        data: &[u8],
    ) -> Result<(BroadcastDataPayload, Option<ExtendedInfo>), CodecError> {
        let (payload, extended) = take(data, Self::PACKING_SIZE)?;
        Ok((
            BroadcastDataPayload::unpack_from_slice(payload)?,
            ExtendedInfo::unpack_from_slice(extended)?,
        ))
    }
}

/// Represents a Broadcast Data message (0x4E)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BroadcastData {
    pub payload: BroadcastDataPayload,
    pub extended_info: Option<ExtendedInfo>,
}

impl TransmitableMessage for BroadcastData {
    fn serialize_message(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        self.payload.serialize_with(&self.extended_info, buf)
    }

    fn get_tx_msg_id(&self) -> TxMessageId {
        TxMessageId::BroadcastData
    }
}

impl From<BroadcastData> for TxMessage {
    fn from(msg: BroadcastData) -> TxMessage {
        TxMessage::BroadcastData(msg)
    }
}

impl BroadcastData {
    /// Constructs a new `BroadcastData`.
    pub fn new(channel_number: u8, data: [u8; 8]) -> Self {
        Self {
            payload: BroadcastDataPayload {
                channel_number,
                data,
            },
            extended_info: None,
        }
    }

    pub(crate) fn unpack_from_slice(data: &[u8]) -> Result<BroadcastData, CodecError> {
        let (payload, extended_info) = BroadcastDataPayload::unpack_with_extension(data)?;
        Ok(BroadcastData {
            payload,
            extended_info,
        })
    }
}

// Same byte payload, just different name
pub type AcknowledgedDataPayload = BroadcastDataPayload;

/// Represents an Acknowledged Data message (0x4F)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AcknowledgedData {
    pub payload: AcknowledgedDataPayload,
    pub extended_info: Option<ExtendedInfo>,
}

impl TransmitableMessage for AcknowledgedData {
    fn serialize_message(&self, buf: &mut [u8]) -> Result<usize, CodecError> {
        self.payload.serialize_with(&self.extended_info, buf)
    }

    fn get_tx_msg_id(&self) -> TxMessageId {
        TxMessageId::AcknowledgedData
    }
}

impl From<AcknowledgedData> for TxMessage {
    fn from(msg: AcknowledgedData) -> TxMessage {
        TxMessage::AcknowledgedData(msg)
    }
}

impl AcknowledgedData {
    /// Constructs a new `AcknowledgedData`.
    pub fn new(channel_number: u8, data: [u8; 8]) -> Self {
        Self {
            payload: AcknowledgedDataPayload {
                channel_number,
                data,
            },
            extended_info: None,
        }
    }

    pub fn with_extended_info(mut self, extended_info: ExtendedInfo) -> Self {
        self.extended_info = Some(extended_info);
        self
    }

    pub(crate) fn unpack_from_slice(data: &[u8]) -> Result<AcknowledgedData, CodecError> {
        let (payload, extended_info) = AcknowledgedDataPayload::unpack_with_extension(data)?;
        Ok(AcknowledgedData {
            payload,
            extended_info,
        })
    }
}

#[derive(PackedStruct, new, Clone, Copy, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "lsb0", size_bytes = "1")]
pub struct ChannelSequence {
    #[packed_field(bits = "7:5")]
    pub sequence_number: Integer<u8, packed_bits::Bits<3>>,
    #[packed_field(bits = "4:0")]
    pub channel_number: Integer<u8, packed_bits::Bits<5>>,
}

/// Burst transfer (0x50), recognised but not supported
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BurstTransferData {
    pub channel_sequence: ChannelSequence,
    pub data: [u8; 8],
}

impl TransmitableMessage for BurstTransferData {
    fn serialize_message(&self, _buf: &mut [u8]) -> Result<usize, CodecError> {
        Err(CodecError::UnsupportedMessage(
            TxMessageId::BurstTransferData.to_primitive(),
        ))
    }

    fn get_tx_msg_id(&self) -> TxMessageId {
        TxMessageId::BurstTransferData
    }
}

impl From<BurstTransferData> for TxMessage {
    fn from(msg: BurstTransferData) -> TxMessage {
        TxMessage::BurstTransferData(msg)
    }
}

/// Advanced burst transfer (0x72), recognised but not supported
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AdvancedBurstData {
    pub channel_sequence: ChannelSequence,
}

impl TransmitableMessage for AdvancedBurstData {
    fn serialize_message(&self, _buf: &mut [u8]) -> Result<usize, CodecError> {
        Err(CodecError::UnsupportedMessage(
            TxMessageId::AdvancedBurstData.to_primitive(),
        ))
    }

    fn get_tx_msg_id(&self) -> TxMessageId {
        TxMessageId::AdvancedBurstData
    }
}

impl From<AdvancedBurstData> for TxMessage {
    fn from(msg: AdvancedBurstData) -> TxMessage {
        TxMessage::AdvancedBurstData(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_byte() {
        let unpacked = FlagByte::unpack(&[0x20]).unwrap();
        assert_eq!(unpacked.channel_id_output, false);
        assert_eq!(unpacked.rssi_output, false);
        assert_eq!(unpacked.timestamp_output, true);
        assert_eq!(FlagByte::new(true, false, false).pack().unwrap(), [0x80]);
    }

    #[test]
    fn channel_id_output() {
        let unpacked = ChannelIdOutput::unpack(&[0xAA, 0xBB, 0xCC, 0xDD]).unwrap();
        assert_eq!(unpacked.device_number, 0xBBAA);
        assert_eq!(unpacked.device_type.pairing_request, true);
        assert_eq!(unpacked.device_type.id(), 0x4C);
        assert_eq!(
            unpacked.transmission_type.transmission_channel_type,
            TransmissionChannelType::IndependentChannel
        );
        assert_eq!(
            unpacked.transmission_type.global_datapages_used,
            TransmissionGlobalDataPages::GlobalDataPagesUsed
        );
        assert_eq!(*unpacked.transmission_type.device_number_extension, 0xD);
    }

    #[test]
    fn rssi_output() {
        let unpacked = RssiOutput::unpack_from_slice(&[0x20, 0b10110000, 0b10111010]).unwrap();
        assert_eq!(unpacked.measurement_type, RssiMeasurementType::Dbm);
        let value = match unpacked.measurement_value {
            RssiMeasurementValue::Dbm(e) => e,
            RssiMeasurementValue::Agc(_) => panic!("Incorrect enum"),
        };
        assert_eq!(value.rssi_value, -80);
        assert_eq!(value.threshold_configuration_value, -70);

        let mut buf = [0; 3];
        assert_eq!(unpacked.pack_to_slice(&mut buf).unwrap(), 3);
        assert_eq!(buf, [0x20, 0b10110000, 0b10111010]);
    }

    #[test]
    fn rssi_output_buffer_too_small() {
        let unpacked = RssiOutput::unpack_from_slice(&[0x20, 0b10110000, 0b10111010]).unwrap();
        let mut buf = [0; 2];
        assert_eq!(
            unpacked.pack_to_slice(&mut buf),
            Err(CodecError::BufferTooSmall(3, 2))
        );
    }

    #[test]
    fn timestamp_output() {
        let unpacked = TimestampOutput::unpack(&[0xAA, 0xBB]).unwrap();
        assert_eq!(unpacked.rx_timestamp, 0xBBAA);
    }

    #[test]
    fn extended_info() {
        let unpacked = ExtendedInfo::unpack_from_slice(&[]).unwrap();
        assert_eq!(unpacked, None);

        let unpacked = ExtendedInfo::unpack_from_slice(&[0x40, 0x20, 0xCE, 0x80])
            .unwrap()
            .unwrap();
        assert_eq!(unpacked.flag_byte.rssi_output, true);
        assert_eq!(unpacked.channel_id_output.is_none(), true);
        assert_eq!(unpacked.timestamp_output.is_none(), true);
        let rssi = match unpacked.rssi_output.unwrap().measurement_value {
            RssiMeasurementValue::Dbm(e) => e,
            RssiMeasurementValue::Agc(_) => panic!("Incorrect enum"),
        };
        assert_eq!(rssi.rssi_value, -50);
        assert_eq!(rssi.threshold_configuration_value, -128);

        let unpacked = ExtendedInfo::unpack_from_slice(&[0x60, 0x10, 0xCE, 0x80, 0x60, 0xAA, 0xBB])
            .unwrap()
            .unwrap();
        let rssi = match unpacked.rssi_output.unwrap().measurement_value {
            RssiMeasurementValue::Dbm(_) => panic!("Incorrect enum"),
            RssiMeasurementValue::Agc(e) => e,
        };
        assert_eq!(rssi.threshold_offset, -50);
        assert_eq!(rssi.register, 0x6080);
        assert_eq!(unpacked.timestamp_output.unwrap().rx_timestamp, 0xBBAA);
    }

    #[test]
    fn extended_info_truncated() {
        assert_eq!(
            ExtendedInfo::unpack_from_slice(&[0x80, 1, 2]),
            Err(CodecError::BufferTooSmall(4, 2))
        );
        assert_eq!(
            ExtendedInfo::unpack_from_slice(&[0x20, 1, 2, 3]),
            Err(CodecError::BadLength(3, 4))
        );
    }

    #[test]
    fn extended_info_pack() {
        let info = ExtendedInfo::new(
            Some(ChannelIdOutput::new(0x1234, 120.into(), 1.into())),
            None,
            Some(TimestampOutput::new(0xAABB)),
        );
        let mut buf = [0; 7];
        assert_eq!(info.pack_to_slice(&mut buf).unwrap(), 7);
        assert_eq!(buf, [0xA0, 0x34, 0x12, 120, 1, 0xBB, 0xAA]);
        assert_eq!(ExtendedInfo::unpack_from_slice(&buf).unwrap(), Some(info));
    }

    #[test]
    fn broadcast_data() {
        let unpacked = BroadcastData::unpack_from_slice(&[0, 1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(unpacked.payload.channel_number, 0);
        assert_eq!(unpacked.payload.data, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(unpacked.extended_info, None);
        let unpacked =
            BroadcastData::unpack_from_slice(&[0, 1, 2, 3, 4, 5, 6, 7, 8, 0x20, 0xBB, 0xAA])
                .unwrap();
        let ext_info = unpacked.extended_info.unwrap();
        assert_eq!(ext_info.flag_byte.timestamp_output, true);
        assert_eq!(ext_info.timestamp_output.unwrap().rx_timestamp, 0xAABB);

        let mut buf: [u8; 12] = [0; 12];
        let size = BroadcastData::new(5, [5, 6, 7, 8, 9, 0, 1, 2])
            .serialize_message(&mut buf)
            .unwrap();
        assert_eq!(buf, [5, 5, 6, 7, 8, 9, 0, 1, 2, 0, 0, 0]);
        assert_eq!(size, 9);
    }

    #[test]
    fn broadcast_data_short() {
        assert_eq!(
            BroadcastData::unpack_from_slice(&[0, 1, 2]),
            Err(CodecError::BufferTooSmall(9, 3))
        );
    }

    #[test]
    fn acknowledged_data() {
        let mut buf: [u8; 16] = [0; 16];
        let size = AcknowledgedData::new(1, [49, 255, 255, 255, 255, 255, 75, 0])
            .with_extended_info(ExtendedInfo::new(
                Some(ChannelIdOutput::new(1, 17.into(), 5.into())),
                None,
                None,
            ))
            .serialize_message(&mut buf)
            .unwrap();
        assert_eq!(size, 14);
        assert_eq!(
            buf[..14],
            [1, 49, 255, 255, 255, 255, 255, 75, 0, 0x80, 1, 0, 17, 5]
        );
    }

    #[test]
    fn burst_unsupported() {
        let mut buf = [0; 16];
        assert_eq!(
            BurstTransferData::default().serialize_message(&mut buf),
            Err(CodecError::UnsupportedMessage(0x50))
        );
        assert_eq!(
            AdvancedBurstData::default().serialize_message(&mut buf),
            Err(CodecError::UnsupportedMessage(0x72))
        );
    }

    #[test]
    fn channel_sequence() {
        let unpacked = ChannelSequence::unpack(&[0x3F]).unwrap();
        assert_eq!(*unpacked.sequence_number, 0x1);
        assert_eq!(*unpacked.channel_number, 0x1F);
    }
}
