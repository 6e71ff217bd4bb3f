// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::bits::{bit, calculate_checksum, high_nibble, low_nibble, pack_nibbles, with_bit};
use crate::fields::FieldDefinition;
use crate::plus::common::datapages::{DataPage, DATA_PAGE_SIZE};
use crate::plus::profiles::fitness_equipment_controls::EquipmentType;
use antlink_derive::DataPage;
use core::time::Duration;
use derive_new::new;
use packed_struct::prelude::*;

#[derive(PrimitiveEnum_u8, PartialEq, Copy, Clone, Debug)]
pub enum DataPageNumbers {
    GeneralFeData = 16,
    SpecificTrainerData = 25,
    BasicResistance = 48,
    TargetPower = 49,
    WindResistance = 50,
    TrackResistance = 51,
    UserConfiguration = 55,
}

pub const RESISTANCE: FieldDefinition = FieldDefinition::new(0.5, 0.0, 100.0, 0);
pub const TARGET_POWER: FieldDefinition = FieldDefinition::new(0.25, 0.0, 4000.0, 0);
pub const WIND_RESISTANCE_COEFFICIENT: FieldDefinition =
    FieldDefinition::new(0.01, 0.0, 1.86, 0xFF).with_default(0.51);
pub const WIND_SPEED: FieldDefinition =
    FieldDefinition::new(1.0, -127.0, 127.0, 0xFF).with_offset(127.0);
pub const DRAFTING_FACTOR: FieldDefinition =
    FieldDefinition::new(0.01, 0.0, 1.0, 0xFF).with_default(1.0);
pub const GRADE: FieldDefinition =
    FieldDefinition::new(0.01, -200.0, 200.0, 0xFFFF).with_offset(200.0);
pub const ROLLING_RESISTANCE: FieldDefinition =
    FieldDefinition::new(0.00005, 0.0, 0.0127, 0xFF).with_default(0.004);
pub const USER_WEIGHT: FieldDefinition =
    FieldDefinition::new(0.01, 0.0, 655.34, 0xFFFF).with_default(75.0);
pub const WHEEL_DIAMETER_OFFSET: FieldDefinition =
    FieldDefinition::new(1.0, 1.0, 10.0, 0xF).with_default(15.0);
pub const BIKE_WEIGHT: FieldDefinition =
    FieldDefinition::new(0.05, 0.0, 50.0, 0xFFF).with_default(10.0);
pub const WHEEL_DIAMETER: FieldDefinition =
    FieldDefinition::new(0.01, 0.0, 2.54, 0xFF).with_default(0.7);
pub const GEAR_RATIO: FieldDefinition = FieldDefinition::new(0.03, 3.0, 7.65, 0);
pub const SPEED: FieldDefinition = FieldDefinition::new(0.001, 0.0, 65.534, 0xFFFF);
pub const HEART_RATE: FieldDefinition = FieldDefinition::new(1.0, 0.0, 254.0, 0xFF);

pub const INSTANTANEOUS_POWER_INVALID: u16 = 0xFFF;
pub const CADENCE_INVALID: u8 = 0xFF;

/// Data page 48, resistance as a percentage of the trainer's maximum
#[derive(PackedStruct, DataPage, new, PartialEq, Copy, Clone, Debug)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "8")]
pub struct BasicResistance {
    #[new(value = "DataPageNumbers::BasicResistance.to_primitive()")]
    #[packed_field(bytes = "0")]
    data_page_number: u8,
    #[new(default)]
    #[packed_field(bytes = "1:6")]
    _reserved: [u8; 6],
    #[packed_field(bytes = "7")]
    pub total_resistance: u8,
}

impl BasicResistance {
    pub fn from_percent(percent: Option<f64>) -> Self {
        Self::new(RESISTANCE.encode(percent) as u8)
    }

    pub fn percent(&self) -> Option<f64> {
        RESISTANCE.decode(self.total_resistance.into())
    }
}

/// Data page 49, target power for ERG mode
#[derive(PackedStruct, DataPage, new, PartialEq, Copy, Clone, Debug)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "8")]
pub struct TargetPower {
    #[new(value = "DataPageNumbers::TargetPower.to_primitive()")]
    #[packed_field(bytes = "0")]
    data_page_number: u8,
    #[new(default)]
    #[packed_field(bytes = "1:5")]
    _reserved: [u8; 5],
    #[packed_field(bytes = "6:7")]
    pub target_power: u16,
}

impl TargetPower {
    pub fn from_watts(watts: Option<f64>) -> Self {
        Self::new(TARGET_POWER.encode(watts) as u16)
    }

    pub fn watts(&self) -> Option<f64> {
        TARGET_POWER.decode(self.target_power.into())
    }
}

/// Air density at sea level and 15°C, kg/m³
pub const AIR_DENSITY_SEA_LEVEL: f64 = 1.275;

/// Riding position used to estimate a wind resistance coefficient
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BikeType {
    Mtb,
    Commuter,
    #[default]
    RoadTouring,
    RoadRacing,
}

impl BikeType {
    /// Frontal surface area in m²
    pub const fn frontal_area(self) -> f64 {
        match self {
            BikeType::Mtb => 0.57,
            BikeType::Commuter => 0.55,
            BikeType::RoadTouring => 0.40,
            BikeType::RoadRacing => 0.36,
        }
    }

    pub const fn drag_coefficient(self) -> f64 {
        match self {
            BikeType::Mtb => 1.20,
            BikeType::Commuter => 1.15,
            BikeType::RoadTouring => 1.0,
            BikeType::RoadRacing => 0.88,
        }
    }

    /// Wind resistance coefficient in kg/m at sea level
    pub fn wind_resistance_coefficient(self) -> f64 {
        wind_resistance_coefficient(
            self.frontal_area(),
            self.drag_coefficient(),
            AIR_DENSITY_SEA_LEVEL,
        )
    }
}

/// Frontal area × drag coefficient × air density
pub fn wind_resistance_coefficient(frontal_area: f64, drag: f64, air_density: f64) -> f64 {
    frontal_area * drag * air_density
}

/// Data page 50, simulation wind parameters
#[derive(PackedStruct, DataPage, new, PartialEq, Copy, Clone, Debug)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "8")]
pub struct WindResistance {
    #[new(value = "DataPageNumbers::WindResistance.to_primitive()")]
    #[packed_field(bytes = "0")]
    data_page_number: u8,
    #[new(default)]
    #[packed_field(bytes = "1:4")]
    _reserved: [u8; 4],
    #[packed_field(bytes = "5")]
    pub wind_resistance_coefficient: u8,
    #[packed_field(bytes = "6")]
    pub wind_speed: u8,
    #[packed_field(bytes = "7")]
    pub drafting_factor: u8,
}

impl WindResistance {
    /// Coefficient in kg/m, wind speed in km/h (negative is a tail wind), drafting factor 0..1
    pub fn from_values(
        coefficient: Option<f64>,
        wind_speed: Option<f64>,
        drafting_factor: Option<f64>,
    ) -> Self {
        Self::new(
            WIND_RESISTANCE_COEFFICIENT.encode(coefficient) as u8,
            WIND_SPEED.encode(wind_speed) as u8,
            DRAFTING_FACTOR.encode(drafting_factor) as u8,
        )
    }

    pub fn coefficient(&self) -> Option<f64> {
        WIND_RESISTANCE_COEFFICIENT.decode(self.wind_resistance_coefficient.into())
    }

    pub fn wind_speed_kmh(&self) -> Option<f64> {
        WIND_SPEED.decode(self.wind_speed.into())
    }

    pub fn drafting(&self) -> Option<f64> {
        DRAFTING_FACTOR.decode(self.drafting_factor.into())
    }
}

/// Data page 51, simulated grade and rolling resistance
#[derive(PackedStruct, DataPage, new, PartialEq, Copy, Clone, Debug)]
#[packed_struct(bit_numbering = "msb0", endian = "lsb", size_bytes = "8")]
pub struct TrackResistance {
    #[new(value = "DataPageNumbers::TrackResistance.to_primitive()")]
    #[packed_field(bytes = "0")]
    data_page_number: u8,
    #[new(default)]
    #[packed_field(bytes = "1:4")]
    _reserved: [u8; 4],
    #[packed_field(bytes = "5:6")]
    pub grade: u16,
    #[packed_field(bytes = "7")]
    pub rolling_resistance: u8,
}

impl TrackResistance {
    /// Grade in percent, rolling resistance as a unitless coefficient
    pub fn from_grade(grade: Option<f64>, rolling_resistance: Option<f64>) -> Self {
        Self::new(
            GRADE.encode(grade) as u16,
            ROLLING_RESISTANCE.encode(rolling_resistance) as u8,
        )
    }

    pub fn grade_percent(&self) -> Option<f64> {
        GRADE.decode(self.grade.into())
    }

    pub fn rolling_resistance_coefficient(&self) -> Option<f64> {
        ROLLING_RESISTANCE.decode(self.rolling_resistance.into())
    }
}

/// Physical values of a user configuration, `None` falls back to the field default
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UserSettings {
    /// kg
    pub user_weight: Option<f64>,
    /// kg
    pub bike_weight: Option<f64>,
    /// m
    pub wheel_diameter: Option<f64>,
    /// mm
    pub wheel_diameter_offset: Option<f64>,
    pub gear_ratio: Option<f64>,
}

/// Data page 55, raw field values
///
/// Bike weight is 12 bits wide and shares byte 4 with the wheel diameter offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UserConfiguration {
    pub user_weight: u16,
    pub wheel_diameter_offset: u8,
    pub bike_weight: u16,
    pub wheel_diameter: u8,
    pub gear_ratio: u8,
}

impl DataPage for UserConfiguration {
    fn data_page_number(&self) -> u8 {
        DataPageNumbers::UserConfiguration.to_primitive()
    }
}

impl UserConfiguration {
    pub fn from_settings(settings: &UserSettings) -> Self {
        Self {
            user_weight: USER_WEIGHT.encode(settings.user_weight) as u16,
            wheel_diameter_offset: WHEEL_DIAMETER_OFFSET.encode(settings.wheel_diameter_offset)
                as u8,
            bike_weight: BIKE_WEIGHT.encode(settings.bike_weight) as u16,
            wheel_diameter: WHEEL_DIAMETER.encode(settings.wheel_diameter) as u8,
            gear_ratio: GEAR_RATIO.encode(settings.gear_ratio) as u8,
        }
    }

    pub fn encode(&self) -> [u8; DATA_PAGE_SIZE] {
        let weight = self.user_weight.to_le_bytes();
        [
            self.data_page_number(),
            weight[0],
            weight[1],
            0,
            pack_nibbles(self.wheel_diameter_offset, (self.bike_weight & 0xF) as u8),
            (self.bike_weight >> 4) as u8,
            self.wheel_diameter,
            self.gear_ratio,
        ]
    }

    pub fn decode(data: &[u8; DATA_PAGE_SIZE]) -> Self {
        Self {
            user_weight: u16::from_le_bytes([data[1], data[2]]),
            wheel_diameter_offset: low_nibble(data[4]),
            bike_weight: ((data[5] as u16) << 4) | high_nibble(data[4]) as u16,
            wheel_diameter: data[6],
            gear_ratio: data[7],
        }
    }

    pub fn settings(&self) -> UserSettings {
        UserSettings {
            user_weight: USER_WEIGHT.decode(self.user_weight.into()),
            bike_weight: BIKE_WEIGHT.decode(self.bike_weight.into()),
            wheel_diameter: WHEEL_DIAMETER.decode(self.wheel_diameter.into()),
            wheel_diameter_offset: WHEEL_DIAMETER_OFFSET.decode(self.wheel_diameter_offset.into()),
            gear_ratio: GEAR_RATIO.decode(self.gear_ratio.into()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeartRateSource {
    Invalid,
    AntPlus,
    EmFiveKhz,
    HandContact,
}

#[derive(PrimitiveEnum_u8, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeState {
    Reserved = 0,
    AsleepOff = 1,
    Ready = 2,
    InUse = 3,
    Finished = 4,
}

impl HeartRateSource {
    fn bits(self) -> u8 {
        match self {
            HeartRateSource::Invalid => 0,
            HeartRateSource::AntPlus => 1,
            HeartRateSource::EmFiveKhz => 2,
            HeartRateSource::HandContact => 3,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            1 => HeartRateSource::AntPlus,
            2 => HeartRateSource::EmFiveKhz,
            3 => HeartRateSource::HandContact,
            _ => HeartRateSource::Invalid,
        }
    }
}

/// Low nibble of page 16 byte 6
#[derive(new, Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeCapabilities {
    pub heart_rate_source: HeartRateSource,
    pub distance_enabled: bool,
    pub virtual_speed: bool,
}

impl FeCapabilities {
    pub fn to_nibble(self) -> u8 {
        let nibble = with_bit(self.heart_rate_source.bits(), 2, self.distance_enabled);
        with_bit(nibble, 3, self.virtual_speed)
    }

    pub fn from_nibble(nibble: u8) -> Self {
        Self {
            heart_rate_source: HeartRateSource::from_bits(nibble),
            distance_enabled: bit(nibble, 2),
            virtual_speed: bit(nibble, 3),
        }
    }
}

/// High nibble of page 16 byte 6
#[derive(new, Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeStatus {
    pub state: FeState,
    pub lap_toggle: bool,
}

impl FeStatus {
    pub fn to_nibble(self) -> u8 {
        with_bit(self.state.to_primitive(), 3, self.lap_toggle)
    }

    /// `None` when the state bits hold an undefined value
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        FeState::from_primitive(nibble & 0b111).map(|state| Self {
            state,
            lap_toggle: bit(nibble, 3),
        })
    }
}

/// Data page 16, general fitness equipment data
///
/// Byte 6 packs the capabilities in the low nibble and the FE state in the high one, byte 7 is an
/// XOR of the first seven bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GeneralFeData {
    pub equipment_type: u8,
    /// 0.25 s, rolls over every 64 s
    pub elapsed_time: u8,
    /// 0.001 m/s
    pub speed: u16,
    pub heart_rate: u8,
    pub capabilities: u8,
    pub fe_state: u8,
    /// Trailer as received, recomputed on encode
    pub checksum: u8,
}

impl DataPage for GeneralFeData {
    fn data_page_number(&self) -> u8 {
        DataPageNumbers::GeneralFeData.to_primitive()
    }
}

impl GeneralFeData {
    /// Build a page from physical readings, a missing speed or heart rate is sent as invalid
    pub fn from_readings(
        equipment: EquipmentType,
        elapsed: Duration,
        speed_mps: Option<f64>,
        heart_rate_bpm: Option<u8>,
        capabilities: FeCapabilities,
        status: FeStatus,
    ) -> Self {
        Self {
            equipment_type: equipment.into(),
            elapsed_time: ((elapsed.as_millis() / 250) % 256) as u8,
            speed: SPEED.encode(speed_mps) as u16,
            heart_rate: HEART_RATE.encode(heart_rate_bpm.map(f64::from)) as u8,
            capabilities: capabilities.to_nibble(),
            fe_state: status.to_nibble(),
            checksum: 0,
        }
    }

    pub fn encode(&self) -> [u8; DATA_PAGE_SIZE] {
        let speed = self.speed.to_le_bytes();
        let mut data = [
            self.data_page_number(),
            self.equipment_type,
            self.elapsed_time,
            speed[0],
            speed[1],
            self.heart_rate,
            pack_nibbles(self.capabilities, self.fe_state),
            0,
        ];
        data[7] = calculate_checksum(&data[..7]);
        data
    }

    pub fn decode(data: &[u8; DATA_PAGE_SIZE]) -> Self {
        Self {
            equipment_type: data[1],
            elapsed_time: data[2],
            speed: u16::from_le_bytes([data[3], data[4]]),
            heart_rate: data[5],
            capabilities: low_nibble(data[6]),
            fe_state: high_nibble(data[6]),
            checksum: data[7],
        }
    }

    /// Whether the trailer matches the rest of the page
    pub fn is_valid(&self) -> bool {
        self.encode()[7] == self.checksum
    }

    pub fn equipment(&self) -> EquipmentType {
        (self.equipment_type & 0x1F).into()
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_time as u64 * 250)
    }

    /// m/s
    pub fn speed_mps(&self) -> Option<f64> {
        SPEED.decode(self.speed.into())
    }

    pub fn heart_rate_bpm(&self) -> Option<u8> {
        HEART_RATE
            .decode(self.heart_rate.into())
            .map(|_| self.heart_rate)
    }

    pub fn capabilities(&self) -> FeCapabilities {
        FeCapabilities::from_nibble(self.capabilities)
    }

    pub fn status(&self) -> Option<FeStatus> {
        FeStatus::from_nibble(self.fe_state)
    }

    pub fn heart_rate_source(&self) -> HeartRateSource {
        self.capabilities().heart_rate_source
    }

    pub fn distance_enabled(&self) -> bool {
        self.capabilities().distance_enabled
    }

    pub fn virtual_speed(&self) -> bool {
        self.capabilities().virtual_speed
    }

    pub fn state(&self) -> Option<FeState> {
        self.status().map(|s| s.state)
    }

    pub fn lap_toggle(&self) -> bool {
        bit(self.fe_state, 3)
    }
}

/// Data page 25, trainer power and cadence
///
/// Bytes 5-6 hold the 12 bit instantaneous power with the trainer status in the top nibble, byte 7
/// is an XOR of the first seven bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpecificTrainerData {
    pub event_count: u8,
    pub cadence: u8,
    pub accumulated_power: u16,
    pub instantaneous_power: u16,
    pub trainer_status: u8,
    /// Trailer as received, recomputed on encode
    pub checksum: u8,
}

impl DataPage for SpecificTrainerData {
    fn data_page_number(&self) -> u8 {
        DataPageNumbers::SpecificTrainerData.to_primitive()
    }
}

impl SpecificTrainerData {
    pub fn encode(&self) -> [u8; DATA_PAGE_SIZE] {
        let accumulated = self.accumulated_power.to_le_bytes();
        let power = ((self.instantaneous_power & 0x0FFF)
            | ((low_nibble(self.trainer_status) as u16) << 12))
            .to_le_bytes();
        let mut data = [
            self.data_page_number(),
            self.event_count,
            self.cadence,
            accumulated[0],
            accumulated[1],
            power[0],
            power[1],
            0,
        ];
        data[7] = calculate_checksum(&data[..7]);
        data
    }

    pub fn decode(data: &[u8; DATA_PAGE_SIZE]) -> Self {
        let power = u16::from_le_bytes([data[5], data[6]]);
        Self {
            event_count: data[1],
            cadence: data[2],
            accumulated_power: u16::from_le_bytes([data[3], data[4]]),
            instantaneous_power: power & 0x0FFF,
            trainer_status: (power >> 12) as u8,
            checksum: data[7],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.encode()[7] == self.checksum
    }

    pub fn power_watts(&self) -> Option<u16> {
        (self.instantaneous_power != INSTANTANEOUS_POWER_INVALID).then_some(self.instantaneous_power)
    }

    pub fn cadence_rpm(&self) -> Option<u8> {
        (self.cadence != CADENCE_INVALID).then_some(self.cadence)
    }

    pub fn power_calibration_required(&self) -> bool {
        bit(self.trainer_status, 0)
    }

    pub fn resistance_calibration_required(&self) -> bool {
        bit(self.trainer_status, 1)
    }

    pub fn user_configuration_required(&self) -> bool {
        bit(self.trainer_status, 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_resistance() {
        let page = BasicResistance::from_percent(Some(110.0));
        assert_eq!(page.data_page_number(), 48);
        assert_eq!(page.pack().unwrap(), [48, 0, 0, 0, 0, 0, 0, 200]);

        let page = BasicResistance::from_percent(Some(25.0));
        assert_eq!(page.pack().unwrap(), [48, 0, 0, 0, 0, 0, 0, 50]);
        assert_eq!(page.percent(), Some(25.0));

        let unpacked = BasicResistance::unpack(&[48, 0, 0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(unpacked.percent(), None);
    }

    #[test]
    fn target_power() {
        let page = TargetPower::from_watts(Some(250.0));
        assert_eq!(page.pack().unwrap(), [49, 0, 0, 0, 0, 0, 0xE8, 0x03]);
        assert_eq!(page.watts(), Some(250.0));

        let page = TargetPower::from_watts(Some(5000.0));
        assert_eq!(page.target_power, 16000);
        assert_eq!(TargetPower::from_watts(None).target_power, 0);
    }

    #[test]
    fn wind_resistance() {
        let page = WindResistance::from_values(None, Some(0.0), None);
        assert_eq!(page.pack().unwrap(), [50, 0, 0, 0, 0, 51, 127, 100]);

        let page = WindResistance::from_values(
            Some(BikeType::RoadRacing.wind_resistance_coefficient()),
            Some(-13.0),
            Some(0.5),
        );
        assert_eq!(page.pack().unwrap(), [50, 0, 0, 0, 0, 40, 114, 50]);
        assert_eq!(page.wind_speed_kmh(), Some(-13.0));
        assert_eq!(page.drafting(), Some(0.5));

        let page = WindResistance::from_values(Some(3.0), Some(200.0), Some(255.0));
        assert_eq!(page.wind_resistance_coefficient, 186);
        assert_eq!(page.wind_speed, 254);
        assert_eq!(page.drafting_factor, 0xFF);
        assert_eq!(page.drafting(), None);
    }

    #[test]
    fn wind_resistance_coefficients() {
        assert!((BikeType::RoadTouring.wind_resistance_coefficient() - 0.51).abs() < 1e-9);
        assert!((BikeType::Mtb.wind_resistance_coefficient() - 0.8721).abs() < 1e-9);
        assert!((wind_resistance_coefficient(0.5, 1.0, 1.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn track_resistance() {
        let page = TrackResistance::from_grade(Some(4.8), None);
        assert_eq!(page.grade, 20480);
        assert_eq!(page.pack().unwrap(), [51, 0, 0, 0, 0, 0x00, 0x50, 80]);

        let page = TrackResistance::from_grade(Some(0.0), Some(0.005));
        assert_eq!(page.pack().unwrap(), [51, 0, 0, 0, 0, 0x20, 0x4E, 100]);

        assert_eq!(TrackResistance::from_grade(Some(-250.0), None).grade, 0);
        assert_eq!(TrackResistance::from_grade(Some(250.0), None).grade, 40000);
        assert_eq!(TrackResistance::from_grade(None, None).grade, 0xFFFF);
        assert_eq!(TrackResistance::from_grade(None, None).grade_percent(), None);
    }

    #[test]
    fn user_configuration_defaults() {
        let page = UserConfiguration::from_settings(&UserSettings::default());
        assert_eq!(page.user_weight, 7500);
        assert_eq!(page.bike_weight, 200);
        assert_eq!(page.wheel_diameter_offset, 0xF);
        assert_eq!(page.encode(), [55, 0x4C, 0x1D, 0, 0x8F, 0x0C, 70, 0]);
    }

    #[test]
    fn user_configuration_round_trip() {
        let settings = UserSettings {
            user_weight: Some(80.0),
            bike_weight: Some(8.5),
            wheel_diameter: Some(0.68),
            wheel_diameter_offset: Some(3.0),
            gear_ratio: Some(3.0),
        };
        let page = UserConfiguration::from_settings(&settings);
        let decoded = UserConfiguration::decode(&page.encode());
        assert_eq!(decoded, page);
        assert_eq!(decoded.bike_weight, 170);
        assert_eq!(decoded.gear_ratio, 100);
        assert_eq!(decoded.settings().wheel_diameter_offset, Some(3.0));
    }

    #[test]
    fn general_fe_data() {
        let page = GeneralFeData {
            equipment_type: 25,
            elapsed_time: 40,
            speed: 8333,
            heart_rate: 0xFF,
            capabilities: 0b0100,
            fe_state: 3,
            checksum: 0,
        };
        let data = page.encode();
        assert_eq!(data, [16, 25, 40, 0x8D, 0x20, 0xFF, 0x34, 0x47]);

        let decoded = GeneralFeData::decode(&data);
        assert!(decoded.is_valid());
        assert_eq!(decoded.equipment(), EquipmentType::StationaryBike);
        assert_eq!(decoded.elapsed(), Duration::from_secs(10));
        assert_eq!(decoded.speed_mps(), Some(8.333));
        assert_eq!(decoded.heart_rate_bpm(), None);
        assert_eq!(decoded.heart_rate_source(), HeartRateSource::Invalid);
        assert!(decoded.distance_enabled());
        assert!(!decoded.virtual_speed());
        assert_eq!(decoded.state(), Some(FeState::InUse));
        assert!(!decoded.lap_toggle());
    }

    #[test]
    fn general_fe_data_from_readings() {
        let capabilities = FeCapabilities::new(HeartRateSource::HandContact, true, true);
        let status = FeStatus::new(FeState::Ready, true);
        let page = GeneralFeData::from_readings(
            EquipmentType::StationaryBike,
            Duration::from_millis(64_500),
            Some(8.333),
            Some(142),
            capabilities,
            status,
        );
        let data = page.encode();
        assert_eq!(data[..7], [16, 25, 2, 0x8D, 0x20, 142, 0xAF]);
        assert_eq!(data[7], calculate_checksum(&data[..7]));

        let decoded = GeneralFeData::decode(&data);
        assert!(decoded.is_valid());
        assert_eq!(decoded.capabilities(), capabilities);
        assert_eq!(decoded.status(), Some(status));
        assert_eq!(decoded.speed_mps(), Some(8.333));
        assert_eq!(decoded.heart_rate_bpm(), Some(142));
        assert_eq!(decoded.elapsed(), Duration::from_millis(500));
    }

    #[test]
    fn general_fe_data_missing_readings() {
        let page = GeneralFeData::from_readings(
            EquipmentType::Treadmill,
            Duration::ZERO,
            None,
            None,
            FeCapabilities::new(HeartRateSource::Invalid, false, false),
            FeStatus::new(FeState::AsleepOff, false),
        );
        let data = page.encode();
        assert_eq!(data[..7], [16, 19, 0, 0xFF, 0xFF, 0xFF, 0x10]);
        let decoded = GeneralFeData::decode(&data);
        assert_eq!(decoded.speed_mps(), None);
        assert_eq!(decoded.heart_rate_bpm(), None);
        assert_eq!(decoded.state(), Some(FeState::AsleepOff));
    }

    #[test]
    fn general_fe_data_bad_checksum() {
        let decoded = GeneralFeData::decode(&[16, 25, 40, 0x8D, 0x20, 0xFF, 0x34, 0x00]);
        assert!(!decoded.is_valid());
    }

    #[test]
    fn specific_trainer_data() {
        let page = SpecificTrainerData {
            event_count: 7,
            cadence: 90,
            accumulated_power: 1000,
            instantaneous_power: 250,
            trainer_status: 0b0100,
            checksum: 0,
        };
        let data = page.encode();
        assert_eq!(data, [25, 7, 90, 0xE8, 0x03, 0xFA, 0x40, 0x15]);

        let decoded = SpecificTrainerData::decode(&data);
        assert!(decoded.is_valid());
        assert_eq!(decoded.power_watts(), Some(250));
        assert_eq!(decoded.cadence_rpm(), Some(90));
        assert!(decoded.user_configuration_required());
        assert!(!decoded.power_calibration_required());
        assert_eq!(decoded.accumulated_power, 1000);
    }

    #[test]
    fn specific_trainer_data_invalid_fields() {
        let page = SpecificTrainerData {
            cadence: 0xFF,
            instantaneous_power: 0xFFF,
            ..SpecificTrainerData::default()
        };
        let decoded = SpecificTrainerData::decode(&page.encode());
        assert_eq!(decoded.power_watts(), None);
        assert_eq!(decoded.cadence_rpm(), None);
    }
}
