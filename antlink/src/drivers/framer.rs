// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::drivers::Buffer;
use crate::messages::{SyncByte, ANT_MAX_CONTENT_SIZE, CHECKSUM_SIZE, HEADER_SIZE};
use log::{debug, warn};
use packed_struct::prelude::PrimitiveEnum;

/// Splits an arbitrarily chunked byte stream into complete frames.
///
/// Bytes ahead of a sync byte are discarded, a partial frame is carried over to the next push.
/// Checksums are not inspected here, that is left to [crate::drivers::decode_message].
#[derive(Default, Debug)]
pub struct Framer {
    partial: Buffer,
}

impl Framer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes of an incomplete frame waiting for more input
    pub fn leftover(&self) -> &[u8] {
        &self.partial
    }

    pub fn reset(&mut self) {
        self.partial.clear();
    }

    /// Feed a chunk of received bytes, yields every frame completed by it in stream order.
    ///
    /// Input the iterator is not driven over is dropped.
    pub fn push<'a>(&'a mut self, chunk: &'a [u8]) -> Frames<'a> {
        Frames {
            framer: self,
            input: chunk,
        }
    }

    /// Consume bytes from the front of `input` until a frame completes or `input` runs out.
    pub fn next_frame(&mut self, input: &mut &[u8]) -> Option<Buffer> {
        let sync = SyncByte::Value.to_primitive();
        let mut skipped = 0;
        let mut frame = None;

        while let Some((&byte, rest)) = input.split_first() {
            *input = rest;
            if self.partial.is_empty() {
                if byte == sync {
                    self.partial.push(byte);
                } else {
                    skipped += 1;
                }
                continue;
            }

            // Bounded by the length check below
            self.partial.push(byte);
            let declared = self.partial[1] as usize;
            if self.partial.len() == 2 && declared > ANT_MAX_CONTENT_SIZE {
                warn!(
                    "Frame length {} exceeds max content size {}, resyncing",
                    declared, ANT_MAX_CONTENT_SIZE
                );
                self.partial.clear();
                if byte == sync {
                    self.partial.push(byte);
                } else {
                    skipped += 1;
                }
                continue;
            }
            if self.partial.len() == declared + HEADER_SIZE + CHECKSUM_SIZE {
                frame = Some(core::mem::take(&mut self.partial));
                break;
            }
        }

        if skipped > 0 {
            debug!("Discarding {} bytes ahead of sync", skipped);
        }
        frame
    }
}

/// Frames completed by one [Framer::push]
pub struct Frames<'a> {
    framer: &'a mut Framer,
    input: &'a [u8],
}

impl Iterator for Frames<'_> {
    type Item = Buffer;

    fn next(&mut self) -> Option<Buffer> {
        self.framer.next_frame(&mut self.input)
    }
}
