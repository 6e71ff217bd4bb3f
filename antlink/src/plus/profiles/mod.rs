// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

pub mod fitness_equipment_controls;
pub mod heart_rate;

use crate::events::{AntEvent, EventSink};
use crate::plus::common::datapages::DATA_PAGE_SIZE;
use crate::plus::Profile;

/// Turns data pages received by a tracking channel into events, per profile
#[derive(Debug)]
pub enum Interpreter {
    HeartRate(heart_rate::Display),
    FitnessEquipment(fitness_equipment_controls::Display),
    /// Hands the payload over untouched
    Generic,
}

impl Interpreter {
    pub fn new(profile: Profile) -> Self {
        match profile {
            Profile::HeartRate => Interpreter::HeartRate(heart_rate::Display::new()),
            Profile::FitnessEquipment => {
                Interpreter::FitnessEquipment(fitness_equipment_controls::Display::new())
            }
            Profile::Generic => Interpreter::Generic,
        }
    }

    pub fn handle_dp(
        &mut self,
        channel: u8,
        data: &[u8; DATA_PAGE_SIZE],
        events: &mut dyn EventSink,
    ) {
        match self {
            Interpreter::HeartRate(display) => display.handle_dp(channel, data, events),
            Interpreter::FitnessEquipment(display) => display.handle_dp(channel, data, events),
            Interpreter::Generic => events.publish(AntEvent::Payload {
                channel,
                data: *data,
            }),
        }
    }

    pub fn reset_state(&mut self) {
        match self {
            Interpreter::HeartRate(display) => display.reset_state(),
            Interpreter::FitnessEquipment(display) => display.reset_state(),
            Interpreter::Generic => (),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_forwards_payload() {
        let mut interpreter = Interpreter::new(Profile::Generic);
        let mut events: Vec<AntEvent> = Vec::new();
        interpreter.handle_dp(4, &[1, 2, 3, 4, 5, 6, 7, 8], &mut events);
        assert_eq!(
            events,
            [AntEvent::Payload {
                channel: 4,
                data: [1, 2, 3, 4, 5, 6, 7, 8]
            }]
        );
    }

    #[test]
    fn heart_rate_dispatch() {
        let mut interpreter = Interpreter::new(Profile::HeartRate);
        let mut events: Vec<AntEvent> = Vec::new();
        interpreter.handle_dp(2, &[0, 0xFF, 0xFF, 0xFF, 0, 0, 1, 90], &mut events);
        assert_eq!(events, [AntEvent::HeartRateSample { channel: 2, bpm: 90 }]);
    }
}
