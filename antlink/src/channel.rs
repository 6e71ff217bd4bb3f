// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::messages::config::{ChannelId, DeviceType, TransmissionType};
use crate::messages::data::ChannelIdOutput;
use const_utils::u64::min;
use core::fmt;
use core::time::Duration;

pub use crate::messages::requested_response::ChannelState;

/// Helper to convert durations to search timeouts.
/// Anything greater than or equal to 637.5s will default to inifinite timeout per ANT spec.
pub const fn duration_to_search_timeout(t: Duration) -> u8 {
    // Scale up by 10 to avoid floating point math as ratio is 2.5s to 1 count
    min((t.as_secs() * 10) / (25), 255) as u8
}

/// Human readable name of an ANT+ device type
pub fn device_type_name(device_type: u8) -> &'static str {
    match device_type {
        120 => "Heart Rate",
        17 => "Trainer",
        11 => "Power Meter",
        121 => "Speed and Cadence",
        _ => "unsupported",
    }
}

/// Identity of a remote device, as carried by channel id messages and extended data
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DeviceId {
    pub device_number: u16,
    pub device_type: u8,
    pub transmission_type: u8,
}

impl DeviceId {
    pub const fn new(device_number: u16, device_type: u8, transmission_type: u8) -> Self {
        Self {
            device_number,
            device_type,
            transmission_type,
        }
    }

    /// Channel id message binding `channel` to this device
    pub fn to_channel_id(&self, channel: u8) -> ChannelId {
        ChannelId::new(
            channel,
            self.device_number,
            DeviceType::from(self.device_type),
            TransmissionType::from(self.transmission_type),
        )
    }

    pub fn device_type_name(&self) -> &'static str {
        device_type_name(self.device_type)
    }
}

impl From<ChannelIdOutput> for DeviceId {
    fn from(id: ChannelIdOutput) -> Self {
        Self::new(
            id.device_number,
            id.device_type.into(),
            id.transmission_type.into(),
        )
    }
}

impl From<ChannelId> for DeviceId {
    fn from(id: ChannelId) -> Self {
        Self::new(
            id.device_number,
            id.device_type.into(),
            id.transmission_type.into(),
        )
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} #{} (type {}, transmission 0x{:02X})",
            self.device_type_name(),
            self.device_number,
            self.device_type,
            self.transmission_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_timeout_conversion() {
        assert_eq!(duration_to_search_timeout(Duration::from_secs(0)), 0);
        assert_eq!(duration_to_search_timeout(Duration::from_secs(75)), 30);
        assert_eq!(duration_to_search_timeout(Duration::from_secs(1000)), 255);
    }

    #[test]
    fn device_names() {
        assert_eq!(device_type_name(120), "Heart Rate");
        assert_eq!(device_type_name(17), "Trainer");
        assert_eq!(device_type_name(11), "Power Meter");
        assert_eq!(device_type_name(121), "Speed and Cadence");
        assert_eq!(device_type_name(0), "unsupported");
    }

    #[test]
    fn channel_id_conversion() {
        let device = DeviceId::new(49647, 120, 161);
        let msg = device.to_channel_id(2);
        assert_eq!(msg.channel_number, 2);
        assert_eq!(msg.device_number, 49647);
        assert_eq!(msg.device_type.id(), 120);
        assert_eq!(u8::from(msg.transmission_type), 161);
        assert_eq!(DeviceId::from(msg), device);
    }

    #[test]
    fn display() {
        assert_eq!(
            DeviceId::new(12345, 17, 5).to_string(),
            "Trainer #12345 (type 17, transmission 0x05)"
        );
    }
}
