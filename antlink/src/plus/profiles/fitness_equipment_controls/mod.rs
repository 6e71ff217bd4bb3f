// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Based off V5 of the Fitness Equipment specification

mod datapages;
mod display;

pub use datapages::*;
pub use display::*;

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipmentType {
    Treadmill,
    Elliptical,
    Reserved,
    Rower,
    Climber,
    NordicSkier,
    StationaryBike,
    General,
}

impl From<u8> for EquipmentType {
    fn from(p: u8) -> EquipmentType {
        match p {
            19 => EquipmentType::Treadmill,
            20 => EquipmentType::Elliptical,
            21 => EquipmentType::Reserved,
            22 => EquipmentType::Rower,
            23 => EquipmentType::Climber,
            24 => EquipmentType::NordicSkier,
            25 => EquipmentType::StationaryBike,
            _ => EquipmentType::General,
        }
    }
}

impl From<EquipmentType> for u8 {
    fn from(e: EquipmentType) -> u8 {
        match e {
            EquipmentType::General => 16,
            EquipmentType::Treadmill => 19,
            EquipmentType::Elliptical => 20,
            EquipmentType::Reserved => 21,
            EquipmentType::Rower => 22,
            EquipmentType::Climber => 23,
            EquipmentType::NordicSkier => 24,
            EquipmentType::StationaryBike => 25,
        }
    }
}

impl fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EquipmentType::Treadmill => "Treadmill",
            EquipmentType::Elliptical => "Elliptical",
            EquipmentType::Reserved => "Reserved",
            EquipmentType::Rower => "Rower",
            EquipmentType::Climber => "Climber",
            EquipmentType::NordicSkier => "Nordic Skier",
            EquipmentType::StationaryBike => "Trainer/Stationary Bike",
            EquipmentType::General => "General",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equipment_types() {
        assert_eq!(EquipmentType::from(19), EquipmentType::Treadmill);
        assert_eq!(EquipmentType::from(21), EquipmentType::Reserved);
        assert_eq!(EquipmentType::from(25), EquipmentType::StationaryBike);
        assert_eq!(EquipmentType::from(16), EquipmentType::General);
        assert_eq!(EquipmentType::from(99), EquipmentType::General);
        assert_eq!(u8::from(EquipmentType::Rower), 22);
        assert_eq!(
            EquipmentType::StationaryBike.to_string(),
            "Trainer/Stationary Bike"
        );
    }
}
