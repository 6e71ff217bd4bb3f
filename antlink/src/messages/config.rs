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
use crate::plus::PUBLIC_NETWORK_KEY;
use antlink_derive::AntTx;
use derive_new::new;
use packed_struct::prelude::*;

/// Represents a UnAssign Channel Message (0x41)
#[derive(PackedStruct, AntTx, new, Clone, Copy, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "1")]
pub struct UnAssignChannel {
    /// Channel to be unassigned
    #[packed_field(bytes = "0")]
    pub channel_number: u8,
}

// Note, this is bit shifted 4 bits relative to the offical doc because the field would overlap in
// the channel status message. The result is the same just a minor mismatch compared to official
// docs
#[derive(PrimitiveEnum_u8, Clone, Copy, Debug, PartialEq, Default)]
pub enum ChannelType {
    #[default]
    BidirectionalSlave = 0,
    BidirectionalMaster = 1,
    SharedBidirectionalSlave = 2,
    SharedBidirectionalMaster = 3,
    SharedReceiveOnly = 4,
    MasterTransmitOnly = 5,
}

/// Mandatory fields for [AssignChannel] messages
#[derive(PackedStruct, Clone, Copy, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "3")]
pub struct AssignChannelData {
    /// Channel to be initialized
    #[packed_field(bytes = "0")]
    pub channel_number: u8,
    #[packed_field(bits = "12:15")]
    _reserved: ReservedZeroes<packed_bits::Bits::<4>>,
    /// Channel type to be configured
    #[packed_field(bits = "8:11", ty = "enum")]
    pub channel_type: ChannelType,
    /// Which network key to use, set keys via [SetNetworkKey]
    #[packed_field(bytes = "2")]
    pub network_number: u8,
}

#[derive(PackedStruct, Clone, Copy, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "lsb0", size_bytes = "1")]
pub struct ExtendedAssignment {
    /// Background scanning, the channel keeps searching while others are open
    #[packed_field(bits = "0")]
    pub always_search: bool,
    #[packed_field(bits = "1")]
    pub ignore_transmission_type: bool,
    #[packed_field(bits = "2")]
    pub frequency_agility: bool,
    #[packed_field(bits = "3")]
    pub auto_shared_slave: bool,
    #[packed_field(bits = "4")]
    pub fast_initiation_mode: bool,
    #[packed_field(bits = "5")]
    pub async_tx_mode: bool,
    #[packed_field(bits = "6:7")]
    _reserved: ReservedZeroes<packed_bits::Bits::<2>>,
}

impl ExtendedAssignment {
    /// Extended assignment used by searching channels (0x01)
    pub fn background_scanning() -> Self {
        Self {
            always_search: true,
            ..Self::default()
        }
    }
}

/// Represents a Assign Channel message (0x42)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AssignChannel {
    /// Mandatory fields
    pub data: AssignChannelData,
    /// Optional fields
    pub extended_assignment: Option<ExtendedAssignment>,
}
AntAutoPackWithExtention!(
    AssignChannel,
    TxMessageId::AssignChannel,
    data,
    extended_assignment
);

impl AssignChannel {
    /// Constructs a new `AssignChannel`.
    pub fn new(
        channel_number: u8,
        channel_type: ChannelType,
        network_number: u8,
        extended_assignment: Option<ExtendedAssignment>,
    ) -> Self {
        Self {
            data: AssignChannelData {
                channel_number,
                channel_type,
                network_number,
                ..AssignChannelData::default()
            },
            extended_assignment,
        }
    }

    pub(crate) fn unpack_from_slice(data: &[u8]) -> Result<Self, CodecError> {
        let (main, ext) = match data.len() {
            3 => (data, None),
            4 => (&data[..3], Some(ExtendedAssignment::unpack_from_slice(&data[3..])?)),
            len => return Err(CodecError::BadLength(3, len)),
        };
        Ok(Self {
            data: AssignChannelData::unpack_from_slice(main)?,
            extended_assignment: ext,
        })
    }
}

#[derive(PrimitiveEnum_u8, PartialEq, Copy, Clone, Debug, Default)]
pub enum TransmissionChannelType {
    #[default]
    Reserved = 0b00,
    IndependentChannel = 0b01,
    SharedChannel1ByteAddress = 0b10,
    SharedChannel2ByteAddress = 0b11,
}

#[derive(PrimitiveEnum_u8, Clone, Copy, PartialEq, Debug, Default)]
pub enum TransmissionGlobalDataPages {
    #[default]
    GlobalDataPagesNotUsed = 0,
    GlobalDataPagesUsed = 1,
}

/// Transmission type byte, all zeroes is the wildcard
#[derive(PackedStruct, new, Copy, Clone, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "lsb0", size_bytes = "1")]
pub struct TransmissionType {
    #[packed_field(bits = "0:1", ty = "enum")]
    pub transmission_channel_type: TransmissionChannelType,
    #[packed_field(bits = "2", ty = "enum")]
    pub global_datapages_used: TransmissionGlobalDataPages,
    #[new(default)]
    #[packed_field(bits = "3")]
    _reserved: ReservedZeroes<packed_bits::Bits::<1>>,
    #[packed_field(bits = "4:7")]
    pub device_number_extension: Integer<u8, packed_bits::Bits::<4>>,
}

impl TransmissionType {
    /// Constructs a new `TransmissionType` with wildcarded values.
    pub fn new_wildcard() -> Self {
        Self::default()
    }

    pub fn is_wildcard(&self) -> bool {
        u8::from(*self) == 0
    }
}

impl From<u8> for TransmissionType {
    fn from(raw: u8) -> Self {
        let global_datapages_used = if raw & 0b100 != 0 {
            TransmissionGlobalDataPages::GlobalDataPagesUsed
        } else {
            TransmissionGlobalDataPages::GlobalDataPagesNotUsed
        };
        Self {
            transmission_channel_type: TransmissionChannelType::from_primitive(raw & 0b11)
                .unwrap_or_default(),
            global_datapages_used,
            device_number_extension: (raw >> 4).into(),
            ..Self::default()
        }
    }
}

impl From<TransmissionType> for u8 {
    fn from(tt: TransmissionType) -> u8 {
        tt.transmission_channel_type.to_primitive()
            | (tt.global_datapages_used.to_primitive() << 2)
            | (*tt.device_number_extension << 4)
    }
}

#[derive(PackedStruct, new, Copy, Clone, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "lsb0", size_bytes = "1")]
pub struct DeviceType {
    #[packed_field(bits = "0:6")]
    pub device_type_id: Integer<u8, packed_bits::Bits::<7>>,
    #[packed_field(bits = "7")]
    pub pairing_request: bool,
}

impl DeviceType {
    /// Constructs a new `DeviceType` with wildcarded values.
    pub fn new_wildcard() -> Self {
        Self::default()
    }

    pub fn id(&self) -> u8 {
        *self.device_type_id
    }
}

impl From<u8> for DeviceType {
    fn from(raw: u8) -> Self {
        Self {
            device_type_id: (raw & 0x7F).into(),
            pairing_request: raw & 0x80 != 0,
        }
    }
}

impl From<DeviceType> for u8 {
    fn from(dt: DeviceType) -> u8 {
        *dt.device_type_id | if dt.pairing_request { 0x80 } else { 0 }
    }
}

/// Represents a Channel Id message (0x51)
///
/// This message is both RX and TX capable
#[derive(PackedStruct, AntTx, new, Clone, Copy, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "5")]
pub struct ChannelId {
    /// Channel number to configure or from request
    #[packed_field(bytes = "0")]
    pub channel_number: u8,
    /// Device ID of channel
    ///
    /// if this is a slave channel and was wildcarded initially this will contain the master's
    /// ID once a connection is formed
    #[packed_field(bytes = "1:2")]
    pub device_number: u16,
    #[packed_field(bytes = "3")]
    pub device_type: DeviceType,
    #[packed_field(bytes = "4")]
    pub transmission_type: TransmissionType,
}

impl ChannelId {
    /// Constructs a new `ChannelId` with wildcarded values.
    pub fn new_wildcard(channel: u8) -> Self {
        Self {
            channel_number: channel,
            device_number: 0,
            device_type: DeviceType::new_wildcard(),
            transmission_type: TransmissionType::new_wildcard(),
        }
    }
}

/// Represents a Channel Period message (0x43)
#[derive(PackedStruct, AntTx, new, Clone, Copy, Debug, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "3")]
pub struct ChannelPeriod {
    /// Channel to be configured
    #[packed_field(bytes = "0")]
    pub channel_number: u8,
    /// Period to be used
    ///
    /// 32768 / message frequency = period
    #[packed_field(bytes = "1:2")]
    pub channel_period: u16,
}

impl ChannelPeriod {
    /// 4Hz
    pub const DEFAULT_PERIOD: u16 = 8192;
}

impl Default for ChannelPeriod {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_PERIOD)
    }
}

/// Represents a Search Timeout message (0x44)
#[derive(PackedStruct, AntTx, new, Clone, Copy, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "2")]
pub struct SearchTimeout {
    /// Channel to configured
    #[packed_field(bytes = "0")]
    pub channel_number: u8,
    /// Search timeout to be set
    ///
    /// 2.5s * search_timeout = time searching
    /// 0 - no high priority search
    /// 255 - infinite search
    #[packed_field(bytes = "1")]
    pub search_timeout: u8,
}

/// Represents a Channel RF Frequency (0x45)
#[derive(PackedStruct, AntTx, new, Clone, Copy, Debug, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "2")]
pub struct ChannelRfFrequency {
    /// Channel to be configured
    #[packed_field(bytes = "0")]
    pub channel_number: u8,
    /// Frequency for channel to operate at
    ///
    /// 2400 MHz + rf_frequency = operating frequency
    #[packed_field(bytes = "1")]
    pub rf_frequency: u8,
}

impl ChannelRfFrequency {
    pub const DEFAULT_FREQUENCY: u8 = 66;
}

impl Default for ChannelRfFrequency {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_FREQUENCY)
    }
}

/// Represents a Set Network Key message (0x46)
///
/// Defaults to the public key on network 0
#[derive(PackedStruct, AntTx, new, Clone, Copy, Debug, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "9")]
pub struct SetNetworkKey {
    /// Network number to be used
    ///
    /// Max value is device dependent
    #[packed_field(bytes = "0")]
    pub network_number: u8,
    /// Key to be installed
    #[packed_field(bytes = "1:8")]
    pub network_key: [u8; 8],
}

impl SetNetworkKey {
    /// Size of a default network key
    pub const NETWORK_KEY_SIZE: usize = 8;
}

impl Default for SetNetworkKey {
    fn default() -> Self {
        Self::new(0, PUBLIC_NETWORK_KEY)
    }
}

/// Represents a Low Priority Search Timeout message (0x63)
#[derive(PackedStruct, AntTx, new, Clone, Copy, Debug, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "2")]
pub struct LowPrioritySearchTimeout {
    /// Channel to be configured
    #[packed_field(bytes = "0")]
    pub channel_number: u8,
    /// Search timeout in counts of 2.5s, 255 never times out
    #[packed_field(bytes = "1")]
    pub search_timeout: u8,
}

impl LowPrioritySearchTimeout {
    /// Five seconds of low priority search
    pub const DEFAULT_SEARCH_TIMEOUT: u8 = 2;
}

impl Default for LowPrioritySearchTimeout {
    fn default() -> Self {
        Self::new(0, Self::DEFAULT_SEARCH_TIMEOUT)
    }
}

/// Represents a Enable Ext Rx Messages message (0x66)
#[derive(PackedStruct, AntTx, new, Clone, Copy, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "2")]
pub struct EnableExtRxMessages {
    #[new(default)]
    #[packed_field(bits = "0:14")]
    _reserved: ReservedZeroes<packed_bits::Bits::<15>>,
    /// enable extended messages
    #[packed_field(bits = "15")]
    pub enable: bool,
}

/// Represents a Lib Config message (0x6E)
#[derive(PackedStruct, AntTx, new, Clone, Copy, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "2")]
pub struct LibConfig {
    #[new(default)]
    #[packed_field(bytes = "0")]
    _reserved0: ReservedZeroes<packed_bits::Bits::<8>>,
    #[packed_field(bits = "8")]
    pub enable_channel_id_output: bool,
    #[packed_field(bits = "9")]
    pub enable_rssi_output: bool,
    #[packed_field(bits = "10")]
    pub enable_rx_timestamp_output: bool,
    #[new(default)]
    #[packed_field(bits = "11:15")]
    _reserved1: ReservedZeroes<packed_bits::Bits::<5>>,
}
