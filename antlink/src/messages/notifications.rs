// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::messages::CodecError;
use packed_struct::prelude::*;

#[derive(PrimitiveEnum_u8, Clone, Copy, Debug, PartialEq)]
pub enum SerialErrorType {
    IncorrectSyncByte = 0x00,
    IncorrectChecksumByte = 0x02,
    IncorrectMessageLength = 0x03,
}

/// Start-up message (0x6F), sent by the radio after any reset
#[derive(PackedStruct, Debug, Clone, Copy, PartialEq)]
#[packed_struct(bit_numbering = "lsb0", endian = "lsb", size_bytes = "1")]
pub struct StartUpMessage {
    #[packed_field(bits = "0")]
    pub hardware_reset_line: bool,
    #[packed_field(bits = "1")]
    pub watch_dog_reset: bool,
    #[packed_field(bits = "5")]
    pub command_reset: bool,
    #[packed_field(bits = "6")]
    pub synchronous_reset: bool,
    #[packed_field(bits = "7")]
    pub suspend_reset: bool,
}

impl StartUpMessage {
    /// Power on reset is reported as no reset cause bit set
    pub fn is_power_on_reset(&self) -> bool {
        !(self.hardware_reset_line
            || self.watch_dog_reset
            || self.command_reset
            || self.synchronous_reset
            || self.suspend_reset)
    }
}

/// Serial error message (0xAE)
///
/// The radio echoes the offending message after the error number, only the error number is kept.
#[derive(PackedStruct, Debug, Clone, Copy, PartialEq)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "1")]
pub struct SerialErrorMessage {
    #[packed_field(bytes = "0", ty = "enum")]
    pub error_number: SerialErrorType,
}

impl SerialErrorMessage {
    pub(crate) fn unpack_with_echo(data: &[u8]) -> Result<Self, CodecError> {
        let error = data.get(..1).ok_or(CodecError::BufferTooSmall(1, 0))?;
        Ok(SerialErrorMessage::unpack_from_slice(error)?)
    }
}
