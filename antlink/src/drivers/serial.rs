// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::drivers::{Buffer, Transport};
use core::convert::Infallible;
use core::fmt::Debug;
use embedded_hal::digital::{self, OutputPin, PinState};
use embedded_hal_nb::serial::{Read, Write};
use log::trace;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SerialError<E: Debug> {
    #[error("Serial IO error: {0:?}")]
    Io(E),
    #[error("Failed to drive sleep pin {0:?}")]
    PinChange(PinState),
}

/// [Transport] over a UART, with an optional sleep pin held low while writing
pub struct SerialTransport<SERIAL, SLEEP> {
    serial: SERIAL,
    sleep: Option<SLEEP>,
}

impl<SERIAL, SLEEP> SerialTransport<SERIAL, SLEEP>
where
    SERIAL: Read<u8> + Write<u8>,
    SLEEP: OutputPin,
{
    pub fn new(serial: SERIAL, sleep: Option<SLEEP>) -> SerialTransport<SERIAL, SLEEP> {
        SerialTransport { serial, sleep }
    }

    pub fn release(self) -> (SERIAL, Option<SLEEP>) {
        (self.serial, self.sleep)
    }

    fn set_sleep(&mut self, state: PinState) -> Result<(), SerialError<SERIAL::Error>> {
        if let Some(pin) = &mut self.sleep {
            pin.set_state(state)
                .map_err(|_| SerialError::PinChange(state))?;
        }
        Ok(())
    }

    /// Drain whatever the UART has buffered, up to one frame worth of bytes.
    ///
    /// The result is meant to be fed to [crate::router::ChannelPool::on_raw_bytes].
    pub fn read_available(&mut self) -> Result<Buffer, SerialError<SERIAL::Error>> {
        let mut buf = Buffer::new();
        while !buf.is_full() {
            match self.serial.read() {
                Ok(byte) => buf.push(byte),
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(e)) => return Err(SerialError::Io(e)),
            }
        }
        Ok(buf)
    }
}

impl<SERIAL, SLEEP> Transport for SerialTransport<SERIAL, SLEEP>
where
    SERIAL: Read<u8> + Write<u8>,
    SLEEP: OutputPin,
{
    type Error = SerialError<SERIAL::Error>;

    fn open(&mut self) -> Result<(), Self::Error> {
        self.set_sleep(PinState::High)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        trace!("Serial write {:02X?}", bytes);
        self.set_sleep(PinState::Low)?;

        for byte in bytes.iter() {
            nb::block!(self.serial.write(*byte)).map_err(SerialError::Io)?;
        }
        nb::block!(self.serial.flush()).map_err(SerialError::Io)?;

        self.set_sleep(PinState::High)
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        nb::block!(self.serial.flush()).map_err(SerialError::Io)
    }
}

/// Pin type for setups without a sleep line
pub struct StubPin {}

impl digital::ErrorType for StubPin {
    type Error = Infallible;
}

impl OutputPin for StubPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
