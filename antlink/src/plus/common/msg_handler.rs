// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::channel::{ChannelState, DeviceId};
use crate::events::{AntEvent, EventSink};
use crate::messages::channel::{ChannelEvent, ChannelResponse, MessageCode};
use crate::messages::config::{
    AssignChannel, ChannelId, ChannelPeriod, ChannelRfFrequency, EnableExtRxMessages,
    LowPrioritySearchTimeout, SearchTimeout, SetNetworkKey, UnAssignChannel,
};
use crate::messages::control::{CloseChannel, OpenChannel, RequestMessage, RequestableMessageId};
use crate::messages::data::{AcknowledgedData, ExtendedInfo};
use crate::messages::requested_response::ChannelStatus;
use crate::messages::{AntMessage, CodecError, RxMessage, TransmitableMessage, TxMessage, TxMessageId};
use crate::plus::common::datapages::{DataPage, RequestDataPage, DATA_PAGE_SIZE};
use crate::plus::profiles::fitness_equipment_controls::{
    BasicResistance, TargetPower, TrackResistance, UserConfiguration, UserSettings,
    WindResistance,
};
use crate::plus::profiles::Interpreter;
use crate::plus::{ChannelConfig, ChannelMode, Profile, Timing};
use core::time::Duration;
use log::{debug, error, trace, warn};
use packed_struct::PackedStruct;
use std::collections::VecDeque;
use thiserror::Error;

/// Control pages a channel holds before refusing more
pub const MAX_QUEUED_CONTROLS: usize = 8;

#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum ChannelError {
    #[error("channel is {current:?}, operation needs {expected:?}")]
    WrongState {
        current: ChannelState,
        expected: ChannelState,
    },
    #[error("control queue full")]
    ControlQueueFull,
    #[error("failed to encode page: {0:?}")]
    Codec(CodecError),
}

impl From<CodecError> for ChannelError {
    fn from(err: CodecError) -> Self {
        ChannelError::Codec(err)
    }
}

/// What the channel is working towards
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Goal {
    Search,
    Track,
    Close,
}

/// Reply that finishes a step
#[derive(Clone, Copy, Debug, PartialEq)]
enum Awaiting {
    Response(TxMessageId),
    Event(MessageCode),
    Reply(RequestableMessageId),
}

#[derive(Clone, Debug, PartialEq)]
struct Step {
    message: TxMessage,
    awaiting: Awaiting,
    completes_goal: bool,
}

impl Step {
    fn response(message: TxMessage) -> Self {
        let id = message.get_tx_msg_id();
        Self {
            message,
            awaiting: Awaiting::Response(id),
            completes_goal: false,
        }
    }

    fn reply(message: TxMessage, id: RequestableMessageId) -> Self {
        Self {
            message,
            awaiting: Awaiting::Reply(id),
            completes_goal: false,
        }
    }
}

/// A step that went out and has not been answered yet
#[derive(Clone, Debug)]
struct PendingExchange {
    step: Step,
    awaiting: Awaiting,
    deadline: Duration,
    attempts: u8,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum TransferState {
    InFlight { deadline: Duration },
    Backoff { retry_at: Duration },
}

/// Acknowledged control page on its way to the device
#[derive(Clone, Copy, Debug)]
struct Transfer {
    page: u8,
    data: [u8; DATA_PAGE_SIZE],
    attempts: u8,
    state: TransferState,
}

/// State machine driving a single radio channel
///
/// The channel never touches the transport. [Channel::send_message] hands out at most one message
/// per call and [Channel::receive_message] consumes whatever the radio sent back for this channel.
/// Both take the current monotonic time so deadlines can be evaluated without a clock.
#[derive(Debug)]
pub struct Channel {
    number: u8,
    profile: Profile,
    timing: Timing,
    state: ChannelState,
    mode: Option<ChannelMode>,
    device: Option<DeviceId>,
    goal: Option<Goal>,
    steps: VecDeque<Step>,
    pending: Option<PendingExchange>,
    controls: VecDeque<(u8, [u8; DATA_PAGE_SIZE])>,
    transfer: Option<Transfer>,
    found: Vec<DeviceId>,
    interpreter: Interpreter,
}

impl Channel {
    pub fn new(number: u8, profile: Profile) -> Self {
        Self::with_timing(number, profile, Timing::default())
    }

    pub fn with_timing(number: u8, profile: Profile, timing: Timing) -> Self {
        Self {
            number,
            profile,
            timing,
            state: ChannelState::UnAssigned,
            mode: None,
            device: None,
            goal: None,
            steps: VecDeque::new(),
            pending: None,
            controls: VecDeque::new(),
            transfer: None,
            found: Vec::new(),
            interpreter: Interpreter::new(profile),
        }
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Configuration the channel last completed
    pub fn mode(&self) -> Option<ChannelMode> {
        self.mode
    }

    /// Device the channel is bound to
    pub fn device(&self) -> Option<DeviceId> {
        self.device
    }

    /// Devices seen since the last search started
    pub fn found_devices(&self) -> &[DeviceId] {
        &self.found
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Whether the channel has any outstanding work
    pub fn is_busy(&self) -> bool {
        self.goal.is_some()
            || self.pending.is_some()
            || !self.steps.is_empty()
            || !self.controls.is_empty()
            || self.transfer.is_some()
    }

    /// Configure the channel as a background scanner for the profile's device type
    pub fn search(&mut self) {
        let n = self.number;
        let config = ChannelConfig::new(self.profile, ChannelMode::Searching);
        let wildcard = DeviceId::new(0, config.device_type, 0);
        self.found.clear();
        self.start(
            Goal::Search,
            [
                Step::response(UnAssignChannel::new(n).into()),
                Step::response(SetNetworkKey::new(config.network_number, config.network_key).into()),
                Step::response(
                    AssignChannel::new(
                        n,
                        config.channel_type,
                        config.network_number,
                        config.extended_assignment,
                    )
                    .into(),
                ),
                Step::response(wildcard.to_channel_id(n).into()),
                Step::response(EnableExtRxMessages::new(config.enable_ext_rx).into()),
                Step::response(
                    LowPrioritySearchTimeout::new(n, config.low_priority_search_timeout).into(),
                ),
                Step::response(SearchTimeout::new(n, config.search_timeout).into()),
                Step::response(ChannelRfFrequency::new(n, config.rf_frequency).into()),
                Step::response(ChannelPeriod::new(n, config.channel_period).into()),
                Step::response(OpenChannel::new(n).into()),
            ],
        );
    }

    /// Reconfigure the channel to follow a single device
    pub fn track(&mut self, device: DeviceId) {
        let n = self.number;
        let config = ChannelConfig::new(self.profile, ChannelMode::Tracking);
        self.device = Some(device);
        self.start(
            Goal::Track,
            [
                Step::response(EnableExtRxMessages::new(config.enable_ext_rx).into()),
                Step::response(CloseChannel::new(n).into()),
                Step::response(UnAssignChannel::new(n).into()),
                Step::response(SetNetworkKey::new(config.network_number, config.network_key).into()),
                Step::response(
                    AssignChannel::new(
                        n,
                        config.channel_type,
                        config.network_number,
                        config.extended_assignment,
                    )
                    .into(),
                ),
                Step::response(device.to_channel_id(n).into()),
                Step::response(
                    LowPrioritySearchTimeout::new(n, config.low_priority_search_timeout).into(),
                ),
                Step::response(SearchTimeout::new(n, config.search_timeout).into()),
                Step::response(ChannelRfFrequency::new(n, config.rf_frequency).into()),
                Step::response(ChannelPeriod::new(n, config.channel_period).into()),
                Step::response(OpenChannel::new(n).into()),
            ],
        );
    }

    /// Switch a searching channel over to one of the devices it found
    pub fn pair(&mut self, device: DeviceId) -> Result<(), ChannelError> {
        if self.state != ChannelState::Searching || self.mode != Some(ChannelMode::Searching) {
            return Err(ChannelError::WrongState {
                current: self.state,
                expected: ChannelState::Searching,
            });
        }
        debug!("Channel {} pairing with {}", self.number, device);
        self.track(device);
        Ok(())
    }

    /// Close the channel, dropping any queued work
    pub fn close(&mut self) {
        self.start(
            Goal::Close,
            [Step::response(CloseChannel::new(self.number).into())],
        );
    }

    /// Ask the radio for the channel state, the reply updates [Channel::state]
    pub fn request_status(&mut self) {
        self.steps.push_back(Step::reply(
            RequestMessage::new(self.number, RequestableMessageId::ChannelStatus, None).into(),
            RequestableMessageId::ChannelStatus,
        ));
    }

    /// Ask the radio which device the channel is bound to, the reply updates [Channel::device]
    pub fn request_channel_id(&mut self) {
        self.steps.push_back(Step::reply(
            RequestMessage::new(self.number, RequestableMessageId::ChannelId, None).into(),
            RequestableMessageId::ChannelId,
        ));
    }

    /// Forget everything, used after the radio was reset
    pub fn reset_state(&mut self) {
        self.cancel();
        self.goal = None;
        self.mode = None;
        self.found.clear();
        self.interpreter.reset_state();
        self.set_state(ChannelState::UnAssigned);
    }

    pub fn set_power_target(&mut self, watts: f64) -> Result<(), ChannelError> {
        let page = TargetPower::from_watts(Some(watts));
        self.queue_control(page.data_page_number(), page.pack().map_err(CodecError::from)?)
    }

    pub fn set_resistance_target(&mut self, percent: f64) -> Result<(), ChannelError> {
        let page = BasicResistance::from_percent(Some(percent));
        self.queue_control(page.data_page_number(), page.pack().map_err(CodecError::from)?)
    }

    /// Simulated grade in percent with the default rolling resistance
    pub fn set_slope_target(&mut self, grade: f64) -> Result<(), ChannelError> {
        let page = TrackResistance::from_grade(Some(grade), None);
        self.queue_control(page.data_page_number(), page.pack().map_err(CodecError::from)?)
    }

    pub fn set_wind_resistance(
        &mut self,
        coefficient: Option<f64>,
        wind_speed: Option<f64>,
        drafting_factor: Option<f64>,
    ) -> Result<(), ChannelError> {
        let page = WindResistance::from_values(coefficient, wind_speed, drafting_factor);
        self.queue_control(page.data_page_number(), page.pack().map_err(CodecError::from)?)
    }

    pub fn set_user_configuration(&mut self, settings: &UserSettings) -> Result<(), ChannelError> {
        let page = UserConfiguration::from_settings(settings);
        self.queue_control(page.data_page_number(), page.encode())
    }

    /// Ask the device to broadcast `page`
    pub fn request_data_page(&mut self, page: u8) -> Result<(), ChannelError> {
        let request = RequestDataPage::for_page(page);
        self.queue_control(
            request.data_page_number(),
            request.pack().map_err(CodecError::from)?,
        )
    }

    fn queue_control(&mut self, page: u8, data: [u8; DATA_PAGE_SIZE]) -> Result<(), ChannelError> {
        if self.state != ChannelState::Tracking {
            return Err(ChannelError::WrongState {
                current: self.state,
                expected: ChannelState::Tracking,
            });
        }
        if self.controls.len() >= MAX_QUEUED_CONTROLS {
            return Err(ChannelError::ControlQueueFull);
        }
        trace!("Channel {} queued page {}", self.number, page);
        self.controls.push_back((page, data));
        Ok(())
    }

    /// Next message the channel wants on the wire, if any
    pub fn send_message(&mut self, now: Duration, events: &mut dyn EventSink) -> Option<TxMessage> {
        if let Some(msg) = self.poll_configuration(now, events) {
            return Some(msg);
        }
        if self.pending.is_some() || !self.steps.is_empty() {
            return None;
        }
        self.poll_transfer(now, events)
    }

    fn poll_configuration(
        &mut self,
        now: Duration,
        events: &mut dyn EventSink,
    ) -> Option<TxMessage> {
        match &mut self.pending {
            Some(pending) => {
                if now < pending.deadline {
                    return None;
                }
                let id = pending.step.message.get_tx_msg_id();
                if pending.attempts < self.timing.max_retries {
                    pending.attempts += 1;
                    pending.deadline = now + self.timing.response_timeout;
                    pending.awaiting = pending.step.awaiting;
                    warn!(
                        "Channel {} got no reply to {}, retry {}/{}",
                        self.number, id, pending.attempts, self.timing.max_retries
                    );
                    return Some(pending.step.message.clone());
                }
                error!(
                    "Channel {} gave up on {} after {} retries",
                    self.number, id, self.timing.max_retries
                );
                self.fail(id, None, events);
                None
            }
            None => {
                let step = self.steps.pop_front()?;
                let message = step.message.clone();
                trace!("Channel {} sending {}", self.number, message.get_tx_msg_id());
                self.pending = Some(PendingExchange {
                    awaiting: step.awaiting,
                    step,
                    deadline: now + self.timing.response_timeout,
                    attempts: 0,
                });
                Some(message)
            }
        }
    }

    fn poll_transfer(&mut self, now: Duration, events: &mut dyn EventSink) -> Option<TxMessage> {
        if let Some(transfer) = self.transfer {
            return match transfer.state {
                TransferState::InFlight { deadline } if now >= deadline => {
                    warn!(
                        "Channel {} page {} was never acknowledged",
                        self.number, transfer.page
                    );
                    self.transfer_failed(now, events);
                    None
                }
                TransferState::Backoff { retry_at } if now >= retry_at => {
                    debug!(
                        "Channel {} resending page {}, attempt {}",
                        self.number,
                        transfer.page,
                        transfer.attempts + 1
                    );
                    self.transfer = Some(Transfer {
                        state: TransferState::InFlight {
                            deadline: now + self.timing.response_timeout,
                        },
                        ..transfer
                    });
                    Some(AcknowledgedData::new(self.number, transfer.data).into())
                }
                _ => None,
            };
        }
        if self.state != ChannelState::Tracking {
            return None;
        }
        let (page, data) = self.controls.pop_front()?;
        trace!("Channel {} sending page {}", self.number, page);
        self.transfer = Some(Transfer {
            page,
            data,
            attempts: 0,
            state: TransferState::InFlight {
                deadline: now + self.timing.response_timeout,
            },
        });
        Some(AcknowledgedData::new(self.number, data).into())
    }

    /// Consume a message the radio sent for this channel
    pub fn receive_message(&mut self, msg: &AntMessage, now: Duration, events: &mut dyn EventSink) {
        match &msg.message {
            RxMessage::ChannelResponse(response) => self.handle_response(response, now, events),
            RxMessage::ChannelEvent(event) => self.handle_event(event, now, events),
            RxMessage::BroadcastData(data) => {
                self.handle_data(&data.payload.data, &data.extended_info, events)
            }
            RxMessage::AcknowledgedData(data) => {
                self.handle_data(&data.payload.data, &data.extended_info, events)
            }
            RxMessage::ChannelStatus(status) => self.handle_status(status, events),
            RxMessage::ChannelId(id) => self.handle_channel_id(id, events),
            other => debug!("Channel {} dropping {:?}", self.number, other),
        }
    }

    fn handle_response(
        &mut self,
        response: &ChannelResponse,
        now: Duration,
        events: &mut dyn EventSink,
    ) {
        let id = response.message_id;
        let code = response.message_code;

        if id == TxMessageId::AcknowledgedData {
            if code != MessageCode::ResponseNoError {
                warn!("Channel {} transfer rejected: {}", self.number, code);
                self.transfer_failed(now, events);
            }
            return;
        }

        let awaiting = match &self.pending {
            Some(pending) => pending.awaiting,
            None => {
                debug!("Channel {} unexpected response to {}: {}", self.number, id, code);
                return;
            }
        };

        match awaiting {
            Awaiting::Response(expected) if expected == id => (),
            Awaiting::Reply(_) if id == TxMessageId::RequestMessage => {
                if code != MessageCode::ResponseNoError {
                    error!("Channel {} request rejected: {}", self.number, code);
                    self.fail(id, Some(code), events);
                }
                return;
            }
            _ => {
                debug!("Channel {} stray response to {}: {}", self.number, id, code);
                return;
            }
        }

        match (id, code) {
            (_, MessageCode::ResponseNoError) if id == TxMessageId::CloseChannel => {
                if let Some(pending) = &mut self.pending {
                    pending.awaiting = Awaiting::Event(MessageCode::EventChannelClosed);
                    pending.deadline = now + self.timing.response_timeout;
                }
            }
            (_, MessageCode::ResponseNoError) => self.complete_step(events),
            // Unassigning an unassigned channel is not an error worth stopping for
            (TxMessageId::UnAssignChannel, _) => {
                debug!("Channel {} unassign answered {}", self.number, code);
                self.complete_step(events);
            }
            (
                TxMessageId::CloseChannel,
                MessageCode::ChannelInWrongState | MessageCode::ChannelNotOpened,
            ) => {
                debug!("Channel {} already closed", self.number);
                self.complete_step(events);
            }
            _ => {
                error!("Channel {} {} rejected: {}", self.number, id, code);
                self.fail(id, Some(code), events);
            }
        }
    }

    fn handle_event(&mut self, event: &ChannelEvent, now: Duration, events: &mut dyn EventSink) {
        let code = event.payload.message_code;
        let awaiting = self.pending.as_ref().map(|p| p.awaiting);
        if awaiting == Some(Awaiting::Event(code)) {
            self.complete_step(events);
            return;
        }

        match code {
            MessageCode::EventTransferTxCompleted => {
                if let Some(transfer) = self.transfer.take() {
                    debug!("Channel {} page {} acknowledged", self.number, transfer.page);
                    events.publish(AntEvent::ControlAccepted {
                        channel: self.number,
                        page: transfer.page,
                    });
                }
            }
            MessageCode::EventTransferTxFailed => {
                warn!("Channel {} transfer failed", self.number);
                self.transfer_failed(now, events);
            }
            MessageCode::EventRxFailGoToSearch => {
                if self.state == ChannelState::Tracking {
                    debug!("Channel {} lost its device, searching", self.number);
                    self.set_state(ChannelState::Searching);
                }
            }
            MessageCode::EventChannelClosed | MessageCode::EventRxSearchTimeout => {
                let open = matches!(
                    self.state,
                    ChannelState::Searching | ChannelState::Tracking
                );
                if self.goal.is_none() && open {
                    warn!("Channel {} closed unexpectedly ({}), searching again", self.number, code);
                    events.publish(AntEvent::DeviceDisconnected {
                        channel: self.number,
                    });
                    self.interpreter.reset_state();
                    self.search();
                }
            }
            _ => debug!("Channel {} event {}", self.number, code),
        }
    }

    fn handle_data(
        &mut self,
        data: &[u8; DATA_PAGE_SIZE],
        extended_info: &Option<ExtendedInfo>,
        events: &mut dyn EventSink,
    ) {
        match self.mode {
            Some(ChannelMode::Tracking) => {
                if self.state == ChannelState::Searching {
                    debug!("Channel {} reacquired its device", self.number);
                    self.set_state(ChannelState::Tracking);
                }
                if self.state == ChannelState::Tracking {
                    self.interpreter.handle_dp(self.number, data, events);
                }
            }
            Some(ChannelMode::Searching) if self.state == ChannelState::Searching => {
                let device = match extended_info.and_then(|ext| ext.channel_id_output) {
                    Some(id) => DeviceId::from(id),
                    None => {
                        debug!("Channel {} broadcast without channel id", self.number);
                        return;
                    }
                };
                if !self.profile.accepts(device.device_type) || self.found.contains(&device) {
                    return;
                }
                debug!("Channel {} found {}", self.number, device);
                self.found.push(device);
                events.publish(AntEvent::DeviceFound {
                    channel: self.number,
                    device,
                });
            }
            _ => trace!("Channel {} dropping data while {:?}", self.number, self.state),
        }
    }

    fn handle_status(&mut self, status: &ChannelStatus, events: &mut dyn EventSink) {
        self.set_state(status.channel_state);
        self.complete_reply(RequestableMessageId::ChannelStatus, events);
    }

    fn handle_channel_id(&mut self, id: &ChannelId, events: &mut dyn EventSink) {
        let device = DeviceId::from(*id);
        debug!("Channel {} bound to {}", self.number, device);
        self.device = Some(device);
        self.complete_reply(RequestableMessageId::ChannelId, events);
    }

    fn complete_reply(&mut self, id: RequestableMessageId, events: &mut dyn EventSink) {
        if self.pending.as_ref().map(|p| p.awaiting) == Some(Awaiting::Reply(id)) {
            self.complete_step(events);
        }
    }

    fn complete_step(&mut self, events: &mut dyn EventSink) {
        let pending = match self.pending.take() {
            Some(pending) => pending,
            None => return,
        };
        match pending.step.message.get_tx_msg_id() {
            TxMessageId::AssignChannel => self.set_state(ChannelState::Assigned),
            TxMessageId::UnAssignChannel => self.set_state(ChannelState::UnAssigned),
            TxMessageId::CloseChannel
                if matches!(
                    self.state,
                    ChannelState::Searching | ChannelState::Tracking
                ) =>
            {
                self.set_state(ChannelState::Assigned)
            }
            _ => (),
        }
        if pending.step.completes_goal {
            self.finish_goal(events);
        }
    }

    fn finish_goal(&mut self, events: &mut dyn EventSink) {
        match self.goal.take() {
            Some(Goal::Search) => {
                self.mode = Some(ChannelMode::Searching);
                self.set_state(ChannelState::Searching);
            }
            Some(Goal::Track) => {
                self.mode = Some(ChannelMode::Tracking);
                self.set_state(ChannelState::Tracking);
                if let Some(device) = self.device {
                    events.publish(AntEvent::DeviceConnected {
                        channel: self.number,
                        device,
                    });
                }
            }
            Some(Goal::Close) => {
                self.mode = None;
                self.set_state(ChannelState::UnAssigned);
                self.interpreter.reset_state();
                events.publish(AntEvent::DeviceDisconnected {
                    channel: self.number,
                });
            }
            None => (),
        }
    }

    fn transfer_failed(&mut self, now: Duration, events: &mut dyn EventSink) {
        let mut transfer = match self.transfer.take() {
            Some(transfer) => transfer,
            None => return,
        };
        transfer.attempts += 1;
        if transfer.attempts > self.timing.transfer_max_retries {
            error!(
                "Channel {} page {} failed after {} attempts",
                self.number, transfer.page, transfer.attempts
            );
            events.publish(AntEvent::ControlFailed {
                channel: self.number,
                page: transfer.page,
            });
            return;
        }
        transfer.state = TransferState::Backoff {
            retry_at: now + self.timing.transfer_delay(transfer.attempts),
        };
        self.transfer = Some(transfer);
    }

    fn fail(&mut self, step: TxMessageId, code: Option<MessageCode>, events: &mut dyn EventSink) {
        self.pending = None;
        events.publish(AntEvent::ConfigurationFailed {
            channel: self.number,
            step,
            code,
        });
        // Replies to requests do not invalidate the channel configuration
        if self.goal.take().is_some() {
            self.cancel();
            self.mode = None;
            self.set_state(ChannelState::UnAssigned);
        }
    }

    fn start(&mut self, goal: Goal, steps: impl IntoIterator<Item = Step>) {
        self.cancel();
        debug!("Channel {} starting {:?}", self.number, goal);
        self.goal = Some(goal);
        self.steps.extend(steps);
        if let Some(last) = self.steps.back_mut() {
            last.completes_goal = true;
        }
    }

    fn cancel(&mut self) {
        self.steps.clear();
        self.pending = None;
        self.controls.clear();
        self.transfer = None;
    }

    fn set_state(&mut self, state: ChannelState) {
        if self.state != state {
            debug!("Channel {} {:?} -> {:?}", self.number, self.state, state);
            self.state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::config::{ChannelType, ExtendedAssignment};
    use crate::messages::data::{BroadcastData, ChannelIdOutput};
    use crate::messages::{RxMessageHeader, RxMessageId, SyncByte};
    use crate::plus::ANT_PLUS_NETWORK_KEY;

    const NOW: Duration = Duration::from_secs(10);
    const HRM: DeviceId = DeviceId::new(49647, 120, 1);
    const TRAINER: DeviceId = DeviceId::new(12345, 17, 5);

    fn rx(message: RxMessage) -> AntMessage {
        AntMessage {
            header: RxMessageHeader {
                sync: SyncByte::Value,
                msg_length: 0,
                msg_id: RxMessageId::ChannelEvent,
            },
            message,
            checksum: 0,
            valid: true,
        }
    }

    fn response(channel: u8, id: TxMessageId, code: MessageCode) -> AntMessage {
        rx(RxMessage::ChannelResponse(ChannelResponse::new(channel, id, code)))
    }

    fn event(channel: u8, code: MessageCode) -> AntMessage {
        rx(RxMessage::ChannelEvent(ChannelEvent::new(channel, code)))
    }

    fn broadcast(channel: u8, device: Option<DeviceId>, data: [u8; 8]) -> AntMessage {
        let extended_info = device.map(|d| {
            ExtendedInfo::new(
                Some(ChannelIdOutput::new(
                    d.device_number,
                    d.device_type.into(),
                    d.transmission_type.into(),
                )),
                None,
                None,
            )
        });
        rx(RxMessage::BroadcastData(BroadcastData {
            extended_info,
            ..BroadcastData::new(channel, data)
        }))
    }

    /// Answer every step successfully until the channel goes quiet
    fn complete_sequence(channel: &mut Channel, events: &mut Vec<AntEvent>) -> Vec<TxMessage> {
        let mut sent = Vec::new();
        while let Some(msg) = channel.send_message(NOW, events) {
            let id = msg.get_tx_msg_id();
            let number = channel.number();
            sent.push(msg);
            channel.receive_message(&response(number, id, MessageCode::ResponseNoError), NOW, events);
            if id == TxMessageId::CloseChannel {
                channel.receive_message(&event(number, MessageCode::EventChannelClosed), NOW, events);
            }
        }
        sent
    }

    fn ids(messages: &[TxMessage]) -> Vec<TxMessageId> {
        messages.iter().map(|m| m.get_tx_msg_id()).collect()
    }

    fn tracking_channel(profile: Profile, device: DeviceId) -> (Channel, Vec<AntEvent>) {
        let mut channel = Channel::new(1, profile);
        let mut events: Vec<AntEvent> = Vec::new();
        channel.track(device);
        complete_sequence(&mut channel, &mut events);
        assert_eq!(channel.state(), ChannelState::Tracking);
        events.clear();
        (channel, events)
    }

    #[test]
    fn new_channel_is_quiet() {
        let mut channel = Channel::new(1, Profile::HeartRate);
        let mut events: Vec<AntEvent> = Vec::new();
        assert_eq!(channel.send_message(NOW, &mut events), None);
        assert_eq!(channel.state(), ChannelState::UnAssigned);
        assert!(!channel.is_busy());
    }

    #[test]
    fn search_sequence() {
        let mut channel = Channel::new(2, Profile::FitnessEquipment);
        let mut events: Vec<AntEvent> = Vec::new();
        channel.search();
        let sent = complete_sequence(&mut channel, &mut events);
        assert_eq!(
            ids(&sent),
            [
                TxMessageId::UnAssignChannel,
                TxMessageId::SetNetworkKey,
                TxMessageId::AssignChannel,
                TxMessageId::ChannelId,
                TxMessageId::EnableExtRxMessages,
                TxMessageId::LowPrioritySearchTimeout,
                TxMessageId::SearchTimeout,
                TxMessageId::ChannelRfFrequency,
                TxMessageId::ChannelPeriod,
                TxMessageId::OpenChannel,
            ]
        );
        assert_eq!(sent[1], SetNetworkKey::new(0, ANT_PLUS_NETWORK_KEY).into());
        assert_eq!(
            sent[2],
            AssignChannel::new(
                2,
                ChannelType::BidirectionalSlave,
                0,
                Some(ExtendedAssignment::background_scanning())
            )
            .into()
        );
        assert_eq!(sent[3], DeviceId::new(0, 17, 0).to_channel_id(2).into());
        assert_eq!(sent[4], EnableExtRxMessages::new(true).into());
        assert_eq!(sent[5], LowPrioritySearchTimeout::new(2, 255).into());
        assert_eq!(sent[6], SearchTimeout::new(2, 0).into());
        assert_eq!(sent[7], ChannelRfFrequency::new(2, 57).into());
        assert_eq!(sent[8], ChannelPeriod::new(2, 8192).into());
        assert_eq!(channel.state(), ChannelState::Searching);
        assert_eq!(channel.mode(), Some(ChannelMode::Searching));
        assert!(events.is_empty());
        assert!(!channel.is_busy());
    }

    #[test]
    fn one_step_in_flight() {
        let mut channel = Channel::new(1, Profile::HeartRate);
        let mut events: Vec<AntEvent> = Vec::new();
        channel.search();
        assert_eq!(
            channel.send_message(NOW, &mut events),
            Some(UnAssignChannel::new(1).into())
        );
        assert_eq!(channel.send_message(NOW, &mut events), None);
        // Response for another message does not advance
        channel.receive_message(
            &response(1, TxMessageId::OpenChannel, MessageCode::ResponseNoError),
            NOW,
            &mut events,
        );
        assert_eq!(channel.send_message(NOW, &mut events), None);
        channel.receive_message(
            &response(1, TxMessageId::UnAssignChannel, MessageCode::ResponseNoError),
            NOW,
            &mut events,
        );
        assert_eq!(
            channel.send_message(NOW, &mut events),
            Some(SetNetworkKey::new(0, ANT_PLUS_NETWORK_KEY).into())
        );
    }

    #[test]
    fn unassign_tolerates_errors() {
        let mut channel = Channel::new(1, Profile::HeartRate);
        let mut events: Vec<AntEvent> = Vec::new();
        channel.search();
        channel.send_message(NOW, &mut events);
        channel.receive_message(
            &response(1, TxMessageId::UnAssignChannel, MessageCode::ChannelInWrongState),
            NOW,
            &mut events,
        );
        assert!(events.is_empty());
        assert_eq!(
            channel.send_message(NOW, &mut events).map(|m| m.get_tx_msg_id()),
            Some(TxMessageId::SetNetworkKey)
        );
    }

    #[test]
    fn rejected_step_fails_channel() {
        let mut channel = Channel::new(3, Profile::HeartRate);
        let mut events: Vec<AntEvent> = Vec::new();
        channel.search();
        channel.send_message(NOW, &mut events);
        channel.receive_message(
            &response(3, TxMessageId::UnAssignChannel, MessageCode::ResponseNoError),
            NOW,
            &mut events,
        );
        channel.send_message(NOW, &mut events);
        channel.receive_message(
            &response(3, TxMessageId::SetNetworkKey, MessageCode::InvalidNetworkNumber),
            NOW,
            &mut events,
        );
        assert_eq!(
            events,
            [AntEvent::ConfigurationFailed {
                channel: 3,
                step: TxMessageId::SetNetworkKey,
                code: Some(MessageCode::InvalidNetworkNumber),
            }]
        );
        assert_eq!(channel.state(), ChannelState::UnAssigned);
        assert_eq!(channel.send_message(NOW, &mut events), None);
        assert!(!channel.is_busy());
    }

    #[test]
    fn silent_step_retries_then_fails() {
        let mut channel = Channel::new(1, Profile::HeartRate);
        let mut events: Vec<AntEvent> = Vec::new();
        channel.search();
        let start = Duration::ZERO;
        let unassign = Some(UnAssignChannel::new(1).into());
        assert_eq!(channel.send_message(start, &mut events), unassign);
        assert_eq!(
            channel.send_message(start + Duration::from_millis(499), &mut events),
            None
        );
        assert_eq!(
            channel.send_message(start + Duration::from_millis(500), &mut events),
            unassign
        );
        assert_eq!(
            channel.send_message(start + Duration::from_millis(1000), &mut events),
            unassign
        );
        assert_eq!(
            channel.send_message(start + Duration::from_millis(1500), &mut events),
            unassign
        );
        assert!(events.is_empty());
        assert_eq!(
            channel.send_message(start + Duration::from_millis(2000), &mut events),
            None
        );
        assert_eq!(
            events,
            [AntEvent::ConfigurationFailed {
                channel: 1,
                step: TxMessageId::UnAssignChannel,
                code: None,
            }]
        );
        assert_eq!(channel.state(), ChannelState::UnAssigned);
        assert!(!channel.is_busy());
    }

    #[test]
    fn search_finds_devices_once() {
        let mut channel = Channel::new(1, Profile::HeartRate);
        let mut events: Vec<AntEvent> = Vec::new();
        channel.search();
        complete_sequence(&mut channel, &mut events);

        channel.receive_message(&broadcast(1, Some(HRM), [0; 8]), NOW, &mut events);
        channel.receive_message(&broadcast(1, Some(HRM), [1; 8]), NOW, &mut events);
        // Wrong profile and missing id are ignored
        channel.receive_message(&broadcast(1, Some(TRAINER), [0; 8]), NOW, &mut events);
        channel.receive_message(&broadcast(1, None, [0; 8]), NOW, &mut events);

        assert_eq!(
            events,
            [AntEvent::DeviceFound {
                channel: 1,
                device: HRM
            }]
        );
        assert_eq!(channel.found_devices(), [HRM]);
    }

    #[test]
    fn generic_search_accepts_any_device() {
        let mut channel = Channel::new(1, Profile::Generic);
        let mut events: Vec<AntEvent> = Vec::new();
        channel.search();
        complete_sequence(&mut channel, &mut events);
        channel.receive_message(&broadcast(1, Some(HRM), [0; 8]), NOW, &mut events);
        channel.receive_message(&broadcast(1, Some(TRAINER), [0; 8]), NOW, &mut events);
        assert_eq!(channel.found_devices(), [HRM, TRAINER]);
    }

    #[test]
    fn pair_reconfigures_for_tracking() {
        let mut channel = Channel::new(1, Profile::FitnessEquipment);
        let mut events: Vec<AntEvent> = Vec::new();
        channel.search();
        complete_sequence(&mut channel, &mut events);
        channel.receive_message(&broadcast(1, Some(TRAINER), [0; 8]), NOW, &mut events);
        events.clear();

        assert_eq!(channel.pair(TRAINER), Ok(()));
        let sent = complete_sequence(&mut channel, &mut events);
        assert_eq!(
            ids(&sent),
            [
                TxMessageId::EnableExtRxMessages,
                TxMessageId::CloseChannel,
                TxMessageId::UnAssignChannel,
                TxMessageId::SetNetworkKey,
                TxMessageId::AssignChannel,
                TxMessageId::ChannelId,
                TxMessageId::LowPrioritySearchTimeout,
                TxMessageId::SearchTimeout,
                TxMessageId::ChannelRfFrequency,
                TxMessageId::ChannelPeriod,
                TxMessageId::OpenChannel,
            ]
        );
        assert_eq!(sent[0], EnableExtRxMessages::new(false).into());
        assert_eq!(
            sent[4],
            AssignChannel::new(1, ChannelType::BidirectionalSlave, 0, None).into()
        );
        assert_eq!(sent[5], TRAINER.to_channel_id(1).into());
        assert_eq!(sent[6], LowPrioritySearchTimeout::new(1, 2).into());
        assert_eq!(sent[7], SearchTimeout::new(1, 30).into());
        assert_eq!(
            events,
            [AntEvent::DeviceConnected {
                channel: 1,
                device: TRAINER
            }]
        );
        assert_eq!(channel.state(), ChannelState::Tracking);
        assert_eq!(channel.device(), Some(TRAINER));
    }

    #[test]
    fn pair_needs_searching_channel() {
        let mut channel = Channel::new(1, Profile::HeartRate);
        assert_eq!(
            channel.pair(HRM),
            Err(ChannelError::WrongState {
                current: ChannelState::UnAssigned,
                expected: ChannelState::Searching,
            })
        );
    }

    #[test]
    fn track_tolerates_closed_channel() {
        let mut channel = Channel::new(1, Profile::HeartRate);
        let mut events: Vec<AntEvent> = Vec::new();
        channel.track(HRM);
        let ext = channel.send_message(NOW, &mut events).unwrap();
        channel.receive_message(
            &response(1, ext.get_tx_msg_id(), MessageCode::ResponseNoError),
            NOW,
            &mut events,
        );
        assert_eq!(
            channel.send_message(NOW, &mut events),
            Some(CloseChannel::new(1).into())
        );
        channel.receive_message(
            &response(1, TxMessageId::CloseChannel, MessageCode::ChannelNotOpened),
            NOW,
            &mut events,
        );
        assert_eq!(
            channel.send_message(NOW, &mut events),
            Some(UnAssignChannel::new(1).into())
        );
        assert!(events.is_empty());
    }

    #[test]
    fn close_waits_for_closed_event() {
        let (mut channel, mut events) = tracking_channel(Profile::HeartRate, HRM);
        channel.close();
        assert_eq!(
            channel.send_message(NOW, &mut events),
            Some(CloseChannel::new(1).into())
        );
        channel.receive_message(
            &response(1, TxMessageId::CloseChannel, MessageCode::ResponseNoError),
            NOW,
            &mut events,
        );
        assert_eq!(channel.state(), ChannelState::Tracking);
        assert_eq!(channel.send_message(NOW, &mut events), None);
        channel.receive_message(&event(1, MessageCode::EventChannelClosed), NOW, &mut events);
        assert_eq!(channel.state(), ChannelState::UnAssigned);
        assert_eq!(events, [AntEvent::DeviceDisconnected { channel: 1 }]);
        assert!(!channel.is_busy());
    }

    #[test]
    fn tracking_data_is_interpreted() {
        let (mut channel, mut events) = tracking_channel(Profile::HeartRate, HRM);
        channel.receive_message(
            &broadcast(1, None, [0x04, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x12, 0x48]),
            NOW,
            &mut events,
        );
        assert_eq!(events, [AntEvent::HeartRateSample { channel: 1, bpm: 72 }]);
    }

    #[test]
    fn go_to_search_and_reacquire() {
        let (mut channel, mut events) = tracking_channel(Profile::Generic, TRAINER);
        channel.receive_message(&event(1, MessageCode::EventRxFailGoToSearch), NOW, &mut events);
        assert_eq!(channel.state(), ChannelState::Searching);
        channel.receive_message(&broadcast(1, None, [7; 8]), NOW, &mut events);
        assert_eq!(channel.state(), ChannelState::Tracking);
        assert_eq!(
            events,
            [AntEvent::Payload {
                channel: 1,
                data: [7; 8]
            }]
        );
    }

    #[test]
    fn unexpected_close_restarts_search() {
        let (mut channel, mut events) = tracking_channel(Profile::HeartRate, HRM);
        channel.receive_message(&event(1, MessageCode::EventChannelClosed), NOW, &mut events);
        assert_eq!(events, [AntEvent::DeviceDisconnected { channel: 1 }]);
        assert_eq!(
            channel.send_message(NOW, &mut events),
            Some(UnAssignChannel::new(1).into())
        );
    }

    #[test]
    fn control_write_accepted() {
        let (mut channel, mut events) = tracking_channel(Profile::FitnessEquipment, TRAINER);
        channel.set_power_target(250.0).unwrap();
        assert_eq!(
            channel.send_message(NOW, &mut events),
            Some(AcknowledgedData::new(1, [49, 0, 0, 0, 0, 0, 0xE8, 0x03]).into())
        );
        assert_eq!(channel.send_message(NOW, &mut events), None);
        channel.receive_message(&event(1, MessageCode::EventTransferTxCompleted), NOW, &mut events);
        assert_eq!(events, [AntEvent::ControlAccepted { channel: 1, page: 49 }]);
        assert!(!channel.is_busy());
    }

    #[test]
    fn control_writes_go_one_at_a_time() {
        let (mut channel, mut events) = tracking_channel(Profile::FitnessEquipment, TRAINER);
        channel.set_resistance_target(0.0).unwrap();
        channel.set_slope_target(4.8).unwrap();
        assert_eq!(
            channel.send_message(NOW, &mut events),
            Some(AcknowledgedData::new(1, [48, 0, 0, 0, 0, 0, 0, 0]).into())
        );
        assert_eq!(channel.send_message(NOW, &mut events), None);
        channel.receive_message(&event(1, MessageCode::EventTransferTxCompleted), NOW, &mut events);
        assert_eq!(
            channel.send_message(NOW, &mut events),
            Some(AcknowledgedData::new(1, [51, 0, 0, 0, 0, 0x00, 0x50, 80]).into())
        );
    }

    #[test]
    fn control_write_backs_off_then_fails() {
        let timing = Timing::default().with_transfer_max_retries(2);
        let mut channel = Channel::with_timing(1, Profile::FitnessEquipment, timing);
        let mut events: Vec<AntEvent> = Vec::new();
        channel.track(TRAINER);
        complete_sequence(&mut channel, &mut events);
        events.clear();

        channel.request_data_page(25).unwrap();
        let request = Some(AcknowledgedData::new(1, [70, 0xFF, 0xFF, 0xFF, 0xFF, 2, 25, 1]).into());
        let t0 = Duration::ZERO;
        assert_eq!(channel.send_message(t0, &mut events), request);
        channel.receive_message(&event(1, MessageCode::EventTransferTxFailed), t0, &mut events);

        assert_eq!(
            channel.send_message(t0 + Duration::from_millis(249), &mut events),
            None
        );
        let t1 = t0 + Duration::from_millis(250);
        assert_eq!(channel.send_message(t1, &mut events), request);
        channel.receive_message(&event(1, MessageCode::EventTransferTxFailed), t1, &mut events);

        assert_eq!(
            channel.send_message(t1 + Duration::from_millis(499), &mut events),
            None
        );
        let t2 = t1 + Duration::from_millis(500);
        assert_eq!(channel.send_message(t2, &mut events), request);
        assert!(events.is_empty());
        channel.receive_message(&event(1, MessageCode::EventTransferTxFailed), t2, &mut events);

        assert_eq!(events, [AntEvent::ControlFailed { channel: 1, page: 70 }]);
        assert_eq!(channel.send_message(t2 + Duration::from_secs(5), &mut events), None);
    }

    #[test]
    fn unanswered_transfer_counts_as_failure() {
        let (mut channel, mut events) = tracking_channel(Profile::FitnessEquipment, TRAINER);
        channel.set_power_target(100.0).unwrap();
        let t0 = Duration::ZERO;
        let sent = channel.send_message(t0, &mut events);
        assert!(sent.is_some());
        assert_eq!(channel.send_message(t0 + Duration::from_millis(500), &mut events), None);
        assert_eq!(
            channel.send_message(t0 + Duration::from_millis(750), &mut events),
            sent
        );
    }

    #[test]
    fn controls_need_tracking() {
        let mut channel = Channel::new(1, Profile::FitnessEquipment);
        assert_eq!(
            channel.set_power_target(100.0),
            Err(ChannelError::WrongState {
                current: ChannelState::UnAssigned,
                expected: ChannelState::Tracking,
            })
        );
    }

    #[test]
    fn control_queue_is_bounded() {
        let (mut channel, _) = tracking_channel(Profile::FitnessEquipment, TRAINER);
        for _ in 0..MAX_QUEUED_CONTROLS {
            channel.set_power_target(100.0).unwrap();
        }
        assert_eq!(
            channel.set_power_target(100.0),
            Err(ChannelError::ControlQueueFull)
        );
    }

    #[test]
    fn user_configuration_write() {
        let (mut channel, mut events) = tracking_channel(Profile::FitnessEquipment, TRAINER);
        channel.set_user_configuration(&UserSettings::default()).unwrap();
        assert_eq!(
            channel.send_message(NOW, &mut events),
            Some(AcknowledgedData::new(1, [55, 0x4C, 0x1D, 0, 0x8F, 0x0C, 70, 0]).into())
        );
    }

    #[test]
    fn status_request_updates_state() {
        let mut channel = Channel::new(4, Profile::HeartRate);
        let mut events: Vec<AntEvent> = Vec::new();
        channel.request_status();
        assert_eq!(
            channel.send_message(NOW, &mut events),
            Some(RequestMessage::new(4, RequestableMessageId::ChannelStatus, None).into())
        );
        channel.receive_message(
            &response(4, TxMessageId::RequestMessage, MessageCode::ResponseNoError),
            NOW,
            &mut events,
        );
        assert!(channel.is_busy());
        channel.receive_message(
            &rx(RxMessage::ChannelStatus(ChannelStatus {
                channel_number: 4,
                channel_type: ChannelType::BidirectionalSlave,
                network_number: 0,
                channel_state: ChannelState::Searching,
            })),
            NOW,
            &mut events,
        );
        assert_eq!(channel.state(), ChannelState::Searching);
        assert!(!channel.is_busy());
        assert!(events.is_empty());
    }

    #[test]
    fn channel_id_request_updates_device() {
        let mut channel = Channel::new(2, Profile::HeartRate);
        let mut events: Vec<AntEvent> = Vec::new();
        channel.request_channel_id();
        channel.send_message(NOW, &mut events);
        channel.receive_message(
            &rx(RxMessage::ChannelId(HRM.to_channel_id(2))),
            NOW,
            &mut events,
        );
        assert_eq!(channel.device(), Some(HRM));
        assert!(!channel.is_busy());
    }
}
