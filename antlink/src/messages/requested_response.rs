// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::messages::{CodecError, ANT_MAX_CONTENT_SIZE};
use arrayvec::ArrayVec;
use packed_struct::prelude::*;

// Rexport reused types so they exist in all expected namespaces based on the datasheet
pub use crate::messages::config::{ChannelId, ChannelType, DeviceType, TransmissionType};

#[derive(PrimitiveEnum_u8, Clone, Copy, Debug, PartialEq, Default)]
pub enum ChannelState {
    #[default]
    UnAssigned = 0,
    Assigned = 1,
    Searching = 2,
    Tracking = 3,
}

/// Channel status (0x52), reply to a status request
#[derive(PackedStruct, Debug, Clone, Copy, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "2")]
pub struct ChannelStatus {
    #[packed_field(bytes = "0")]
    pub channel_number: u8,
    #[packed_field(bits = "8:11", ty = "enum")]
    pub channel_type: ChannelType,
    #[packed_field(bits = "12:13")]
    pub network_number: u8,
    #[packed_field(bits = "14:15", ty = "enum")]
    pub channel_state: ChannelState,
}

/// ANT version (0x3E), a null terminated ascii string
#[derive(Clone, Debug, PartialEq)]
pub struct AntVersion {
    pub version: ArrayVec<u8, ANT_MAX_CONTENT_SIZE>,
}

impl AntVersion {
    pub(crate) fn unpack_from_slice(data: &[u8]) -> Result<Self, CodecError> {
        let mut version = ArrayVec::new();
        version
            .try_extend_from_slice(data)
            .map_err(|_| CodecError::BufferTooSmall(data.len(), ANT_MAX_CONTENT_SIZE))?;
        Ok(Self { version })
    }

    /// Version text up to the first null byte
    pub fn as_str(&self) -> Option<&str> {
        let end = self
            .version
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.version.len());
        core::str::from_utf8(&self.version[..end]).ok()
    }
}

#[derive(PackedStruct, Copy, Clone, Debug, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "4")]
pub struct BaseCapabilities {
    #[packed_field(bytes = "0")]
    pub max_ant_channels: u8,
    #[packed_field(bytes = "1")]
    pub max_networks: u8,
    #[packed_field(bytes = "2")]
    pub standard_options: StandardOptions,
    #[packed_field(bytes = "3")]
    pub advanced_options: AdvancedOptions,
}

impl BaseCapabilities {
    const PACKING_SIZE: usize = 4;
}

#[derive(PackedStruct, Copy, Clone, Debug, PartialEq)]
#[packed_struct(bit_numbering = "lsb0", size_bytes = "1")]
pub struct StandardOptions {
    #[packed_field(bits = "0")]
    pub no_receive_channels: bool,
    #[packed_field(bits = "1")]
    pub no_transmit_channels: bool,
    #[packed_field(bits = "2")]
    pub no_receive_messages: bool,
    #[packed_field(bits = "3")]
    pub no_transmit_messages: bool,
    #[packed_field(bits = "4")]
    pub no_acked_messages: bool,
    #[packed_field(bits = "5")]
    pub no_burst_messages: bool,
    #[packed_field(bits = "6:7")]
    _reserved: ReservedZeroes<packed_bits::Bits<2>>,
}

#[derive(PackedStruct, Copy, Clone, Debug, PartialEq)]
#[packed_struct(bit_numbering = "lsb0", size_bytes = "1")]
pub struct AdvancedOptions {
    #[packed_field(bits = "0")]
    _reserved: ReservedZeroes<packed_bits::Bits<1>>,
    #[packed_field(bits = "1")]
    pub network_enabled: bool,
    #[packed_field(bits = "2")]
    _reserved1: ReservedZeroes<packed_bits::Bits<1>>,
    #[packed_field(bits = "3")]
    pub serial_number_enabled: bool,
    #[packed_field(bits = "4")]
    pub per_channel_tx_power_enabled: bool,
    #[packed_field(bits = "5")]
    pub low_priority_search_enabled: bool,
    #[packed_field(bits = "6")]
    pub script_enabled: bool,
    #[packed_field(bits = "7")]
    pub search_list_enabled: bool,
}

#[derive(PackedStruct, Copy, Clone, Debug, PartialEq)]
#[packed_struct(bit_numbering = "lsb0", size_bytes = "1")]
pub struct AdvancedOptions2 {
    #[packed_field(bits = "0")]
    pub led_enabled: bool,
    #[packed_field(bits = "1")]
    pub ext_message_enabled: bool,
    #[packed_field(bits = "2")]
    pub scan_mode_enabled: bool,
    #[packed_field(bits = "3")]
    _reserved: ReservedZeroes<packed_bits::Bits<1>>,
    #[packed_field(bits = "4")]
    pub prox_search_enabled: bool,
    #[packed_field(bits = "5")]
    pub ext_assign_enabled: bool,
    #[packed_field(bits = "6")]
    pub fs_antfs_enabled: bool,
    #[packed_field(bits = "7")]
    pub fit1_enabled: bool,
}

#[derive(PackedStruct, Copy, Clone, Debug, PartialEq)]
#[packed_struct(bit_numbering = "lsb0", size_bytes = "1")]
pub struct AdvancedOptions3 {
    #[packed_field(bits = "0")]
    pub advanced_burst_enabled: bool,
    #[packed_field(bits = "1")]
    pub event_buffering_enabled: bool,
    #[packed_field(bits = "2")]
    pub event_filtering_enabled: bool,
    #[packed_field(bits = "3")]
    pub high_duty_search_enabled: bool,
    #[packed_field(bits = "4")]
    pub search_sharing_enabled: bool,
    #[packed_field(bits = "5")]
    _reserved: ReservedZeroes<packed_bits::Bits<1>>,
    #[packed_field(bits = "6")]
    pub selective_data_updates_enabled: bool,
    #[packed_field(bits = "7")]
    pub encrypted_channel_enabled: bool,
}

#[derive(PackedStruct, Copy, Clone, Debug, PartialEq)]
#[packed_struct(bit_numbering = "lsb0", size_bytes = "1")]
pub struct AdvancedOptions4 {
    #[packed_field(bits = "0")]
    pub rfactive_notification_enabled: bool,
    #[packed_field(bits = "1:7")]
    _reserved: ReservedZeroes<packed_bits::Bits<7>>,
}

/// Capabilities (0x54)
///
/// Older radios stop after the base capabilities, every trailing byte is optional.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Capabilities {
    pub base_capabilities: BaseCapabilities,
    pub advanced_options2: Option<AdvancedOptions2>,
    pub max_sensrcore_channels: Option<u8>,
    pub advanced_options3: Option<AdvancedOptions3>,
    pub advanced_options4: Option<AdvancedOptions4>,
}

impl Capabilities {
    const MAX_SIZE: usize = BaseCapabilities::PACKING_SIZE + 4;

    pub(crate) fn unpack_from_slice(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() < BaseCapabilities::PACKING_SIZE {
            return Err(CodecError::BufferTooSmall(
                BaseCapabilities::PACKING_SIZE,
                data.len(),
            ));
        }
        if data.len() > Self::MAX_SIZE {
            return Err(CodecError::BadLength(Self::MAX_SIZE, data.len()));
        }
        let (base, options) = data.split_at(BaseCapabilities::PACKING_SIZE);
        let byte = |i: usize| options.get(i..i + 1);

        Ok(Capabilities {
            base_capabilities: BaseCapabilities::unpack_from_slice(base)?,
            advanced_options2: byte(0)
                .map(AdvancedOptions2::unpack_from_slice)
                .transpose()?,
            max_sensrcore_channels: options.get(1).copied(),
            advanced_options3: byte(2)
                .map(AdvancedOptions3::unpack_from_slice)
                .transpose()?,
            advanced_options4: byte(3)
                .map(AdvancedOptions4::unpack_from_slice)
                .transpose()?,
        })
    }
}

/// Serial number (0x61), 4 bytes little endian
#[derive(PackedStruct, Debug, Clone, Copy, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "4")]
pub struct SerialNumber {
    #[packed_field(bytes = "0:3")]
    pub serial_number: u32,
}
