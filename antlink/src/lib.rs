// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Host side ANT and ANT+ for Rust
//!
//! ## Introduction
//!
//! This crate talks to an ANT radio (USB stick or serial module) from the host. It provides a
//! typed codec for the serial message protocol, a stream framer for raw transport bytes, ANT+
//! data page codecs for heart rate and fitness equipment (FE-C) devices, and per channel state
//! machines that configure the radio, discover devices, pair with them and deliver acknowledged
//! control pages.
//!
//! For documentation of the actual implementation of the ANT stack and what each of these
//! individual messages do please visit the ant website at [thisisant.com](https://www.thisisant.com/)
//!
//! ## Layout
//!  * [messages] typed messages and the [messages::TxMessage] / [messages::RxMessage] enums
//!  * [drivers] frame encoding and decoding, the [drivers::Framer], the [drivers::Transport] seam
//!    and a serial transport over `embedded-hal-nb`
//!  * [plus] profile tables, data pages and the per channel [plus::common::msg_handler::Channel]
//!  * [router] the [router::ChannelPool] that owns the channels and the transport
//!  * [events] everything the stack reports, delivered to an explicit [events::EventSink]
//!
//! Nothing blocks and nothing reads a clock: bytes are pushed in with
//! [router::ChannelPool::on_raw_bytes], writes go out on [router::ChannelPool::process], and both
//! take the current monotonic time.
//!
//! ## Roadmap
//!  * Burst and advanced burst transfers
//!  * no_std support

pub mod bits;
pub mod channel;
pub mod drivers;
pub mod events;
pub mod fields;
pub mod messages;
pub mod plus;
pub mod router;
