// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::plus::common::datapages::DataPage;
use antlink_derive::DataPage;
use derive_new::new;
use packed_struct::prelude::*;

#[derive(PrimitiveEnum_u8, PartialEq, Copy, Clone, Debug)]
pub enum DataPageNumbers {
    DefaultDataPage = 0,
    CumulativeOperatingTime = 1,
    ManufacturerInformation = 2,
    ProductInformation = 3,
    PreviousHeartBeat = 4,
    SwimIntervalSummary = 5,
    Capabilities = 6,
    BatteryStatus = 7,
    DeviceInformation = 9,
}

impl From<DataPageNumbers> for Integer<u8, packed_bits::Bits::<7>> {
    fn from(dp: DataPageNumbers) -> Self {
        dp.to_primitive().into()
    }
}

/// The last 4 bytes in every message in the heart rate profile are the same, this maps out those
/// fields
#[derive(PackedStruct, new, PartialEq, Copy, Clone, Debug)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "4")]
pub struct CommonData {
    /// 1/1024 s
    #[packed_field(bytes = "0:1")]
    pub heart_beat_event_time: u16,
    #[packed_field(bytes = "2")]
    pub heart_beat_count: u8,
    #[packed_field(bytes = "3")]
    pub computed_heart_rate: u8,
}

/// Any heart rate page
///
/// Byte 0 holds the page number in bits 0-6 and the page change toggle in bit 7. Bytes 1-3 depend on
/// the page and are kept as is.
#[derive(PackedStruct, DataPage, new, PartialEq, Copy, Clone, Debug)]
#[packed_struct(bit_numbering = "msb0", size_bytes = "8")]
pub struct HeartRatePage {
    #[packed_field(bits = "1:7")]
    data_page_number: Integer<u8, packed_bits::Bits::<7>>,
    #[packed_field(bits = "0")]
    pub page_change_toggle: bool,
    #[packed_field(bytes = "1:3")]
    pub page_specific: [u8; 3],
    #[packed_field(bytes = "4:7")]
    pub common: CommonData,
}

impl HeartRatePage {
    pub fn page(&self) -> Option<DataPageNumbers> {
        DataPageNumbers::from_primitive(self.data_page_number())
    }

    /// Heart rate in bpm, 0 means the monitor has no reading
    pub fn heart_rate(&self) -> Option<u8> {
        match self.common.computed_heart_rate {
            0 => None,
            bpm => Some(bpm),
        }
    }

    /// Event time of the beat before the current one, only carried by page 4
    pub fn previous_heart_beat_event_time(&self) -> Option<u16> {
        match self.page() {
            Some(DataPageNumbers::PreviousHeartBeat) => Some(u16::from_le_bytes([
                self.page_specific[1],
                self.page_specific[2],
            ])),
            _ => None,
        }
    }
}
