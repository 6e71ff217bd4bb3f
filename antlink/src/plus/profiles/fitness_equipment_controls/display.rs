// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::events::{AntEvent, EventSink};
use crate::plus::common::datapages::{page_number, DATA_PAGE_SIZE};
use crate::plus::profiles::fitness_equipment_controls::{
    DataPageNumbers, EquipmentType, GeneralFeData, SpecificTrainerData,
};
use core::time::Duration;
use log::{debug, warn};
use packed_struct::PrimitiveEnum;

/// Interprets pages broadcast by fitness equipment and turns them into samples
#[derive(Debug, Default)]
pub struct Display {
    equipment_type: Option<EquipmentType>,
    last_elapsed_time: Option<u8>,
    elapsed_quarter_seconds: u64,
    speed: Option<f64>,
    virtual_speed: bool,
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
        let dp_num = page_number(data);
        match DataPageNumbers::from_primitive(dp_num) {
            Some(DataPageNumbers::GeneralFeData) => {
                let page = GeneralFeData::decode(data);
                if !page.is_valid() {
                    warn!("Dropping general FE data with bad checksum {:02X?}", data);
                    return;
                }
                self.handle_general_data(channel, &page, events);
            }
            Some(DataPageNumbers::SpecificTrainerData) => {
                let page = SpecificTrainerData::decode(data);
                if !page.is_valid() {
                    warn!("Dropping trainer data with bad checksum {:02X?}", data);
                    return;
                }
                if let Some(watts) = page.power_watts() {
                    events.publish(AntEvent::PowerSample { channel, watts });
                }
                if let Some(rpm) = page.cadence_rpm() {
                    events.publish(AntEvent::CadenceSample { channel, rpm });
                }
            }
            _ => debug!("Ignoring FE data page {} on channel {}", dp_num, channel),
        }
    }

    fn handle_general_data(
        &mut self,
        channel: u8,
        page: &GeneralFeData,
        events: &mut dyn EventSink,
    ) {
        let equipment = page.equipment();
        if self.equipment_type != Some(equipment) {
            debug!("Channel {} equipment is {}", channel, equipment);
            self.equipment_type = Some(equipment);
            events.publish(AntEvent::EquipmentIdentified { channel, equipment });
        }

        // Elapsed time rolls over every 64s
        if let Some(last) = self.last_elapsed_time {
            self.elapsed_quarter_seconds += page.elapsed_time.wrapping_sub(last) as u64;
        } else {
            self.elapsed_quarter_seconds = page.elapsed_time as u64;
        }
        self.last_elapsed_time = Some(page.elapsed_time);

        self.virtual_speed = page.virtual_speed();
        self.speed = page.speed_mps();
        if let Some(speed) = self.speed {
            events.publish(AntEvent::SpeedSample { channel, speed });
        }

        if let Some(bpm) = page.heart_rate_bpm().filter(|bpm| *bpm != 0) {
            events.publish(AntEvent::HeartRateSample { channel, bpm });
        }
    }

    pub fn equipment_type(&self) -> Option<EquipmentType> {
        self.equipment_type
    }

    /// Time since the session started, accumulated across rollovers
    pub fn elapsed_time(&self) -> Duration {
        Duration::from_millis(self.elapsed_quarter_seconds * 250)
    }

    /// Last reported speed in m/s
    pub fn speed(&self) -> Option<f64> {
        self.speed
    }

    /// Whether the last speed was computed by the trainer rather than measured
    pub fn is_virtual_speed(&self) -> bool {
        self.virtual_speed
    }
}
