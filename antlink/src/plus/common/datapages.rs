// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Pages shared by every ANT+ profile.

use antlink_derive::DataPage;
use derive_new::new;
use packed_struct::prelude::*;

/// Byte 0 of a page, masking off the toggle bit some profiles carry in bit 7
pub const DATA_PAGE_NUMBER_MASK: u8 = 0x7F;

/// Every data page is 8 bytes
pub const DATA_PAGE_SIZE: usize = 8;

/// An 8 byte ANT+ payload identified by its page number
pub trait DataPage {
    fn data_page_number(&self) -> u8;
}

/// Page number of a raw payload
pub fn page_number(data: &[u8; DATA_PAGE_SIZE]) -> u8 {
    data[0] & DATA_PAGE_NUMBER_MASK
}

#[derive(PrimitiveEnum_u8, PartialEq, Copy, Clone, Debug)]
pub enum DataPageNumbers {
    RequestDataPage = 70,
}

#[derive(PackedStruct, Copy, Clone, Debug, Default, PartialEq)]
#[packed_struct(bit_numbering = "lsb0", size_bytes = "1")]
pub struct RequestedTransmissionResponse {
    #[packed_field(bits = "0:6")]
    pub number_of_transmissions: Integer<u8, packed_bits::Bits::<7>>,
    #[packed_field(bits = "7")]
    pub use_acknowleged_messages: bool,
}

impl RequestedTransmissionResponse {
    pub fn new(number_of_transmissions: u8, use_acknowleged_messages: bool) -> Self {
        Self {
            number_of_transmissions: (number_of_transmissions & DATA_PAGE_NUMBER_MASK).into(),
            use_acknowleged_messages,
        }
    }
}

#[derive(PrimitiveEnum_u8, Clone, Copy, PartialEq, Debug)]
pub enum CommandType {
    RequestDataPage = 1,
    RequestAntFsSession = 2,
    RequestDataPageFromSlave = 3,
    RequestDataPageSet = 4,
}

/// Common page 70, asks the device to broadcast `requested_page_number`
#[derive(PackedStruct, DataPage, new, Copy, Clone, Debug, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "8")]
pub struct RequestDataPage {
    #[new(value = "DataPageNumbers::RequestDataPage.to_primitive()")]
    #[packed_field(bytes = "0")]
    data_page_number: u8,
    #[packed_field(bytes = "1:2")]
    pub slave_serial_number: u16,
    #[packed_field(bytes = "3")]
    pub descriptor_byte_1: u8,
    #[packed_field(bytes = "4")]
    pub descriptor_byte_2: u8,
    #[packed_field(bytes = "5")]
    pub requested_transmission_response: RequestedTransmissionResponse,
    #[packed_field(bytes = "6")]
    pub requested_page_number: u8,
    #[packed_field(bytes = "7", ty = "enum")]
    pub command_type: CommandType,
}

impl RequestDataPage {
    /// Request `page` twice over broadcast, no serial number or descriptors
    pub fn for_page(page: u8) -> Self {
        Self::new(
            0xFFFF,
            0xFF,
            0xFF,
            RequestedTransmissionResponse::new(2, false),
            page,
            CommandType::RequestDataPage,
        )
    }
}
