// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Typed events published by channels and the channel pool.

use crate::channel::DeviceId;
use crate::messages::channel::MessageCode;
use crate::messages::notifications::SerialErrorType;
use crate::messages::TxMessageId;
use crate::plus::profiles::fitness_equipment_controls::EquipmentType;
use log::warn;
use thingbuf::mpsc::errors::TrySendError;

#[derive(Clone, Debug, PartialEq)]
pub enum AntEvent {
    /// A searching channel saw a broadcast carrying this device id
    DeviceFound { channel: u8, device: DeviceId },
    DeviceConnected { channel: u8, device: DeviceId },
    DeviceDisconnected { channel: u8 },
    PowerSample { channel: u8, watts: u16 },
    CadenceSample { channel: u8, rpm: u8 },
    /// Speed in m/s
    SpeedSample { channel: u8, speed: f64 },
    HeartRateSample { channel: u8, bpm: u8 },
    /// Equipment type reported by a fitness equipment general data page
    EquipmentIdentified { channel: u8, equipment: EquipmentType },
    /// Data from a generic channel, handed over untouched
    Payload { channel: u8, data: [u8; 8] },
    /// The device acknowledged a control page
    ControlAccepted { channel: u8, page: u8 },
    /// A control page could not be delivered after all retries
    ControlFailed { channel: u8, page: u8 },
    /// A configuration step was rejected or never answered, the channel is unassigned
    ConfigurationFailed {
        channel: u8,
        step: TxMessageId,
        code: Option<MessageCode>,
    },
    SerialError(SerialErrorType),
}

// Hack to allow channels to recycle memory, not for actual use
impl Default for AntEvent {
    fn default() -> AntEvent {
        AntEvent::DeviceDisconnected { channel: 0 }
    }
}

impl AntEvent {
    /// Channel the event relates to, `None` for radio wide events
    pub fn channel(&self) -> Option<u8> {
        match self {
            AntEvent::DeviceFound { channel, .. }
            | AntEvent::DeviceConnected { channel, .. }
            | AntEvent::DeviceDisconnected { channel }
            | AntEvent::PowerSample { channel, .. }
            | AntEvent::CadenceSample { channel, .. }
            | AntEvent::SpeedSample { channel, .. }
            | AntEvent::HeartRateSample { channel, .. }
            | AntEvent::EquipmentIdentified { channel, .. }
            | AntEvent::Payload { channel, .. }
            | AntEvent::ControlAccepted { channel, .. }
            | AntEvent::ControlFailed { channel, .. }
            | AntEvent::ConfigurationFailed { channel, .. } => Some(*channel),
            AntEvent::SerialError(_) => None,
        }
    }
}

/// Destination for [AntEvent]s, passed explicitly to whatever publishes them
pub trait EventSink {
    fn publish(&mut self, event: AntEvent);
}

impl EventSink for Vec<AntEvent> {
    fn publish(&mut self, event: AntEvent) {
        self.push(event);
    }
}

impl<F: FnMut(AntEvent)> EventSink for F {
    fn publish(&mut self, event: AntEvent) {
        self(event)
    }
}

fn log_send_error(err: TrySendError<AntEvent>) {
    match err {
        TrySendError::Full(event) => warn!("Event queue full, dropping {:?}", event),
        TrySendError::Closed(event) => warn!("Event queue closed, dropping {:?}", event),
        _ => warn!("Failed to publish event"),
    }
}

impl EventSink for thingbuf::mpsc::Sender<AntEvent> {
    fn publish(&mut self, event: AntEvent) {
        if let Err(e) = self.try_send(event) {
            log_send_error(e);
        }
    }
}

impl EventSink for thingbuf::mpsc::blocking::Sender<AntEvent> {
    fn publish(&mut self, event: AntEvent) {
        if let Err(e) = self.try_send(event) {
            log_send_error(e);
        }
    }
}
