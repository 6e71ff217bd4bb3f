// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::events::{AntEvent, EventSink};
use crate::plus::common::datapages::DATA_PAGE_SIZE;
use crate::plus::profiles::heart_rate::HeartRatePage;
use log::warn;
use packed_struct::PackedStruct;

/// Interprets pages broadcast by a heart rate monitor
#[derive(Debug, Default)]
pub struct Display {
    last_heart_rate: Option<u8>,
    last_beat_count: Option<u8>,
}

impl Display {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset_state(&mut self) {
        *self = Self::default();
    }

    pub fn handle_dp(
        &mut self,
        channel: u8,
        data: &[u8; DATA_PAGE_SIZE],
        events: &mut dyn EventSink,
    ) {
        let page = match HeartRatePage::unpack(data) {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to parse heart rate page {:02X?}: {:?}", data, e);
                return;
            }
        };
        self.last_beat_count = Some(page.common.heart_beat_count);
        self.last_heart_rate = page.heart_rate();
        if let Some(bpm) = self.last_heart_rate {
            events.publish(AntEvent::HeartRateSample { channel, bpm });
        }
    }

    pub fn heart_rate(&self) -> Option<u8> {
        self.last_heart_rate
    }

    pub fn beat_count(&self) -> Option<u8> {
        self.last_beat_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publishes_heart_rate() {
        let mut display = Display::new();
        let mut events: Vec<AntEvent> = Vec::new();
        display.handle_dp(2, &[0x84, 0xFF, 0x00, 0x10, 0x00, 0x14, 9, 72], &mut events);
        assert_eq!(events, [AntEvent::HeartRateSample { channel: 2, bpm: 72 }]);
        assert_eq!(display.heart_rate(), Some(72));
        assert_eq!(display.beat_count(), Some(9));
    }

    #[test]
    fn zero_heart_rate_is_not_published() {
        let mut display = Display::new();
        let mut events: Vec<AntEvent> = Vec::new();
        display.handle_dp(2, &[0x00, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0], &mut events);
        assert!(events.is_empty());
        assert_eq!(display.heart_rate(), None);
        display.reset_state();
        assert_eq!(display.beat_count(), None);
    }
}
