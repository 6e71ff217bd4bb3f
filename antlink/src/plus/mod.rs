// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! ANT+ profiles, channel configuration tables and the per channel state machine.

use crate::channel::duration_to_search_timeout;
use crate::messages::config::{ChannelType, ExtendedAssignment};
use core::time::Duration;

pub mod common;
pub mod profiles;

pub const PUBLIC_NETWORK_KEY: [u8; 8] = [232, 228, 33, 59, 85, 122, 103, 193];
pub const ANT_PLUS_NETWORK_KEY: [u8; 8] = [185, 165, 33, 251, 189, 114, 195, 69];

pub const NETWORK_RF_FREQUENCY: u8 = 57;

/// Device profile a channel is configured for
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Profile {
    HeartRate,
    FitnessEquipment,
    #[default]
    Generic,
}

/// Radio parameters a profile dictates
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProfileDefaults {
    /// 0 is the wildcard, matching any device type
    pub device_type: u8,
    pub channel_period: u16,
    pub rf_frequency: u8,
    pub network_key: [u8; 8],
}

const HEART_RATE_DEFAULTS: ProfileDefaults = ProfileDefaults {
    device_type: 120,
    channel_period: 8070,
    rf_frequency: NETWORK_RF_FREQUENCY,
    network_key: ANT_PLUS_NETWORK_KEY,
};

const FITNESS_EQUIPMENT_DEFAULTS: ProfileDefaults = ProfileDefaults {
    device_type: 17,
    channel_period: 8192,
    rf_frequency: NETWORK_RF_FREQUENCY,
    network_key: ANT_PLUS_NETWORK_KEY,
};

const GENERIC_DEFAULTS: ProfileDefaults = ProfileDefaults {
    device_type: 0,
    channel_period: 8192,
    rf_frequency: 66,
    network_key: PUBLIC_NETWORK_KEY,
};

impl Profile {
    pub const fn defaults(self) -> ProfileDefaults {
        match self {
            Profile::HeartRate => HEART_RATE_DEFAULTS,
            Profile::FitnessEquipment => FITNESS_EQUIPMENT_DEFAULTS,
            Profile::Generic => GENERIC_DEFAULTS,
        }
    }

    pub const fn device_type(self) -> u8 {
        self.defaults().device_type
    }

    /// Whether a device of `device_type` can be paired to a channel of this profile
    pub const fn accepts(self, device_type: u8) -> bool {
        let wanted = self.device_type();
        wanted == 0 || wanted == device_type
    }
}

/// What the channel is configured to do
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelMode {
    /// Background scan for any device of the profile's type
    Searching,
    /// Locked to a single known device
    Tracking,
}

/// Full channel configuration, always computed from `(profile, mode)` and never stored
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelConfig {
    pub channel_type: ChannelType,
    pub network_number: u8,
    pub network_key: [u8; 8],
    pub device_type: u8,
    pub channel_period: u16,
    pub rf_frequency: u8,
    pub enable_ext_rx: bool,
    pub extended_assignment: Option<ExtendedAssignment>,
    pub search_timeout: u8,
    pub low_priority_search_timeout: u8,
}

impl ChannelConfig {
    pub fn new(profile: Profile, mode: ChannelMode) -> Self {
        let defaults = profile.defaults();
        let (enable_ext_rx, extended_assignment, search_timeout, low_priority_search_timeout) =
            match mode {
                ChannelMode::Searching => (
                    true,
                    Some(ExtendedAssignment::background_scanning()),
                    0,
                    255,
                ),
                ChannelMode::Tracking => (
                    false,
                    None,
                    duration_to_search_timeout(Duration::from_secs(75)),
                    duration_to_search_timeout(Duration::from_secs(5)),
                ),
            };
        Self {
            channel_type: ChannelType::BidirectionalSlave,
            network_number: 0,
            network_key: defaults.network_key,
            device_type: defaults.device_type,
            channel_period: defaults.channel_period,
            rf_frequency: defaults.rf_frequency,
            enable_ext_rx,
            extended_assignment,
            search_timeout,
            low_priority_search_timeout,
        }
    }
}

/// Deadlines and retry limits of the channel state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    /// How long to wait for a channel response or event before re-issuing a write
    pub response_timeout: Duration,
    /// Re-issues of a configuration step before giving up
    pub max_retries: u8,
    /// First delay before re-sending a failed acknowledged transfer, doubled on every attempt
    pub transfer_backoff: Duration,
    /// Re-sends of an acknowledged transfer before giving up
    pub transfer_max_retries: u8,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_millis(500),
            max_retries: 3,
            transfer_backoff: Duration::from_millis(250),
            transfer_max_retries: 5,
        }
    }
}

impl Timing {
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_transfer_backoff(mut self, backoff: Duration) -> Self {
        self.transfer_backoff = backoff;
        self
    }

    pub fn with_transfer_max_retries(mut self, retries: u8) -> Self {
        self.transfer_max_retries = retries;
        self
    }

    /// Delay before re-sending a transfer that already failed `attempt` times
    pub fn transfer_delay(&self, attempt: u8) -> Duration {
        self.transfer_backoff * (1u32 << attempt.saturating_sub(1).min(16))
    }
}
