// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::channel::{ChannelState, DeviceId};
use crate::drivers::{decode_message, encode_message, DriverError, Framer, Transport};
use crate::events::{AntEvent, EventSink};
use crate::messages::config::UnAssignChannel;
use crate::messages::control::{CloseChannel, RequestMessage, RequestableMessageId, ResetSystem};
use crate::messages::requested_response::Capabilities;
use crate::messages::{AntMessage, RxMessage, TransmitableMessage, TxMessage, TxMessageId};
use crate::plus::common::msg_handler::{Channel, ChannelError};
use crate::plus::{ChannelMode, Profile, Timing};
use core::fmt::Debug;
use core::time::Duration;
use log::{debug, trace, warn};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RouterError<E: Debug> {
    #[error("no free channel slot")]
    OutOfChannels,
    #[error("channel slot already in use")]
    ChannelAlreadyAssigned,
    #[error("channel out of bounds")]
    ChannelOutOfBounds,
    #[error("channel 0 is reserved")]
    ReservedSlot,
    #[error("no channel at this slot")]
    ChannelNotAssociated,
    #[error("no searching channel accepts this device")]
    NoSearchingChannel,
    #[error("Channel error: {0}")]
    Channel(ChannelError),
    #[error("Driver error: {0}")]
    Driver(DriverError<E>),
}

impl<E: Debug> From<DriverError<E>> for RouterError<E> {
    fn from(err: DriverError<E>) -> Self {
        RouterError::Driver(err)
    }
}

impl<E: Debug> From<ChannelError> for RouterError<E> {
    fn from(err: ChannelError) -> Self {
        RouterError::Channel(err)
    }
}

/// Channel slots handed out by the pool, slot 0 included
pub const MAX_CHANNELS: usize = 8;

/// Slot kept back for background scanning, never given to a device
pub const RESERVED_CHANNEL: u8 = 0;

/// Owns the radio channels and everything between them and the transport
///
/// Inbound bytes are pushed through [ChannelPool::on_raw_bytes], outbound messages leave on
/// [ChannelPool::process]. Neither blocks, the caller decides how often to run them.
pub struct ChannelPool<T: Transport, S: EventSink> {
    transport: T,
    events: S,
    framer: Framer,
    channels: [Option<Channel>; MAX_CHANNELS],
    // what the hardware reports as some have less than max
    max_channels: usize,
    outbound: VecDeque<TxMessage>,
    // channels waiting on a response to a radio wide message, oldest first
    waiters: VecDeque<(TxMessageId, u8)>,
    timing: Timing,
}

impl<T: Transport, S: EventSink> ChannelPool<T, S> {
    pub fn new(mut transport: T, events: S) -> Result<Self, RouterError<T::Error>> {
        transport.open().map_err(DriverError::Transport)?;
        Ok(Self {
            transport,
            events,
            framer: Framer::new(),
            channels: Default::default(),
            max_channels: MAX_CHANNELS,
            outbound: VecDeque::new(),
            waiters: VecDeque::new(),
            timing: Timing::default(),
        })
    }

    /// Timing used by channels added after this call
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn max_channels(&self) -> usize {
        self.max_channels
    }

    /// `preferred` if it is free and usable, otherwise the lowest free slot
    pub fn find_available(&self, preferred: Option<u8>) -> Option<u8> {
        let free = |n: usize| n != RESERVED_CHANNEL as usize && self.channels[n].is_none();
        if let Some(n) = preferred.map(usize::from) {
            if n < self.max_channels && free(n) {
                return Some(n as u8);
            }
        }
        (0..self.max_channels).find(|&n| free(n)).map(|n| n as u8)
    }

    /// Add a channel at next available index
    pub fn add_channel(&mut self, profile: Profile) -> Result<u8, RouterError<T::Error>> {
        let index = self
            .find_available(None)
            .ok_or(RouterError::OutOfChannels)?;
        self.channels[index as usize] = Some(Channel::with_timing(index, profile, self.timing));
        debug!("Added {:?} channel {}", profile, index);
        Ok(index)
    }

    /// Add channel at a specific index
    pub fn add_channel_at_index(
        &mut self,
        profile: Profile,
        index: u8,
    ) -> Result<(), RouterError<T::Error>> {
        if index == RESERVED_CHANNEL {
            return Err(RouterError::ReservedSlot);
        }
        if index as usize >= self.max_channels {
            return Err(RouterError::ChannelOutOfBounds);
        }
        if self.channels[index as usize].is_some() {
            return Err(RouterError::ChannelAlreadyAssigned);
        }
        self.channels[index as usize] = Some(Channel::with_timing(index, profile, self.timing));
        debug!("Added {:?} channel {}", profile, index);
        Ok(())
    }

    /// Drop a channel, anything it still had queued is discarded and the radio side is closed
    pub fn remove_channel(&mut self, index: u8) -> Result<(), RouterError<T::Error>> {
        let slot = self
            .channels
            .get_mut(index as usize)
            .ok_or(RouterError::ChannelOutOfBounds)?;
        if slot.take().is_none() {
            return Err(RouterError::ChannelNotAssociated);
        }
        self.outbound
            .retain(|msg| msg.channel_number() != Some(index));
        self.waiters.retain(|(_, n)| *n != index);
        debug!("Removed channel {}", index);
        self.write(&CloseChannel::new(index).into())?;
        self.write(&UnAssignChannel::new(index).into())?;
        Ok(())
    }

    pub fn channel(&self, index: u8) -> Option<&Channel> {
        self.channels.get(index as usize)?.as_ref()
    }

    pub fn channel_mut(&mut self, index: u8) -> Option<&mut Channel> {
        self.channels.get_mut(index as usize)?.as_mut()
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter().flatten()
    }

    /// Pair `device` on the first searching channel whose profile accepts it
    pub fn pair(&mut self, device: DeviceId) -> Result<u8, RouterError<T::Error>> {
        let channel = self
            .channels
            .iter_mut()
            .flatten()
            .find(|c| {
                c.state() == ChannelState::Searching
                    && c.mode() == Some(ChannelMode::Searching)
                    && c.profile().accepts(device.device_type)
            })
            .ok_or(RouterError::NoSearchingChannel)?;
        channel.pair(device)?;
        Ok(channel.number())
    }

    /// Reboot radio via reset message
    ///
    /// Channels stay registered but lose their state, they need a new search or track.
    pub fn reset(&mut self) -> Result<(), RouterError<T::Error>> {
        self.framer.reset();
        self.outbound.clear();
        self.waiters.clear();
        self.reset_channels();
        self.write(&ResetSystem::new().into())
    }

    /// Ask the radio how many channels it has, the reply caps the usable slots
    pub fn request_capabilities(&mut self) {
        self.outbound.push_back(
            RequestMessage::new_sub_message(0, RequestableMessageId::Capabilities).into(),
        );
    }

    /// Feed bytes read from the transport, partial frames are kept for the next call
    pub fn on_raw_bytes(&mut self, chunk: &[u8], now: Duration) {
        let mut input = chunk;
        while let Some(frame) = self.framer.next_frame(&mut input) {
            trace!("RX {:02X?}", frame.as_slice());
            match decode_message(&frame) {
                Ok(msg) if !msg.valid => {
                    warn!("Dropping message with bad checksum {:02X?}", frame.as_slice())
                }
                Ok(msg) => self.handle_message(&msg, now),
                Err(e) => warn!("Dropping undecodable frame {:02X?}: {}", frame.as_slice(), e),
            }
        }
    }

    /// Collect the next write of every channel and push all queued messages to the transport
    pub fn process(&mut self, now: Duration) -> Result<(), RouterError<T::Error>> {
        for channel in self.channels.iter_mut().flatten() {
            if let Some(msg) = channel.send_message(now, &mut self.events) {
                if msg.channel_number().is_none() {
                    self.waiters
                        .push_back((msg.get_tx_msg_id(), channel.number()));
                }
                self.outbound.push_back(msg);
            }
        }
        while let Some(msg) = self.outbound.pop_front() {
            self.write(&msg)?;
        }
        Ok(())
    }

    pub fn events(&self) -> &S {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut S {
        &mut self.events
    }

    /// Teardown pool and return transport and sink
    pub fn release(mut self) -> (T, S) {
        if let Err(e) = self.transport.close() {
            warn!("Failed to close transport: {:?}", e);
        }
        (self.transport, self.events)
    }

    fn write(&mut self, msg: &TxMessage) -> Result<(), RouterError<T::Error>> {
        let frame = encode_message(msg).map_err(DriverError::from)?;
        trace!("TX {:02X?}", frame.as_slice());
        self.transport
            .write(&frame)
            .map_err(DriverError::Transport)?;
        Ok(())
    }

    fn reset_channels(&mut self) {
        self.channels
            .iter_mut()
            .flatten()
            .for_each(|c| c.reset_state());
    }

    fn parse_capabilities(&mut self, msg: &Capabilities) {
        let reported = msg.base_capabilities.max_ant_channels as usize;
        self.max_channels = reported.min(MAX_CHANNELS);
        debug!("Radio reports {} channels", reported);
        for (n, slot) in self.channels.iter_mut().enumerate().skip(self.max_channels) {
            if slot.take().is_some() {
                warn!("Dropping channel {}, radio only has {}", n, reported);
            }
        }
    }

    fn handle_message(&mut self, msg: &AntMessage, now: Duration) {
        match &msg.message {
            RxMessage::ChannelResponse(response) => {
                // Radio wide messages are answered on channel 0, hand it to whoever asked
                let waiter = self
                    .waiters
                    .iter()
                    .position(|(id, _)| *id == response.message_id)
                    .and_then(|i| self.waiters.remove(i));
                let channel = match waiter {
                    Some((_, n)) => n,
                    None => response.channel_number,
                };
                self.route_message(channel, msg, now);
            }
            RxMessage::Capabilities(data) => self.parse_capabilities(data),
            RxMessage::StartUpMessage(data) => {
                debug!("Radio started {:?}", data);
                self.waiters.clear();
                self.reset_channels();
            }
            RxMessage::SerialErrorMessage(data) => {
                warn!("Radio reported serial error {:?}", data.error_number);
                self.events.publish(AntEvent::SerialError(data.error_number));
            }
            other => match other.channel_number() {
                Some(n) => self.route_message(n, msg, now),
                None => debug!("Unhandled message {:?}", other),
            },
        }
    }

    fn route_message(&mut self, channel: u8, msg: &AntMessage, now: Duration) {
        match self
            .channels
            .get_mut(channel as usize)
            .and_then(Option::as_mut)
        {
            Some(handler) => handler.receive_message(msg, now, &mut self.events),
            None => debug!("No channel {} for {:?}", channel, msg.message),
        }
    }
}
