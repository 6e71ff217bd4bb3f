// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Checksum and bit packing helpers shared by the message and data page codecs.

/// XOR of every byte in `buf`.
///
/// Used both to author the trailing checksum of a message and to validate a received one.
pub fn calculate_checksum(buf: &[u8]) -> u8 {
    buf.iter().fold(0, |acc, x| acc ^ x)
}

/// Combine two nibbles into a byte, `low` in bits 0-3 and `high` in bits 4-7.
pub const fn pack_nibbles(low: u8, high: u8) -> u8 {
    (low & 0x0F) | ((high & 0x0F) << 4)
}

pub const fn low_nibble(byte: u8) -> u8 {
    byte & 0x0F
}

pub const fn high_nibble(byte: u8) -> u8 {
    byte >> 4
}

/// Read bit `n` (lsb0) of `byte`.
pub const fn bit(byte: u8, n: u8) -> bool {
    (byte >> n) & 1 == 1
}

/// Returns `byte` with bit `n` (lsb0) set to `value`.
pub const fn with_bit(byte: u8, n: u8, value: bool) -> u8 {
    if value {
        byte | (1 << n)
    } else {
        byte & !(1 << n)
    }
}
