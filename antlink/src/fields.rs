// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Physical unit scaling for data page fields.
//!
//! Every scaled field of a data page is described by a [FieldDefinition]. Encoding takes a value in
//! physical units (watts, percent, kilograms...) and produces the raw integer placed on the wire,
//! decoding goes the other way.

/// Static description of a single scaled data page field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FieldDefinition {
    /// Physical units per raw count
    pub resolution: f64,
    /// Physical value represented by raw zero is `-offset`
    pub offset: f64,
    /// Smallest physical value, in the same units as the input
    pub min: f64,
    /// Largest physical value, in the same units as the input
    pub max: f64,
    /// Raw value meaning "not set", passed through unscaled
    pub invalid: u32,
    /// Physical value used when the caller does not provide one
    pub default: Option<f64>,
}

impl FieldDefinition {
    pub const fn new(resolution: f64, min: f64, max: f64, invalid: u32) -> Self {
        Self {
            resolution,
            offset: 0.0,
            min,
            max,
            invalid,
            default: None,
        }
    }

    pub const fn with_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }

    pub const fn with_default(mut self, default: f64) -> Self {
        self.default = Some(default);
        self
    }

    pub fn apply_resolution(&self, value: f64) -> f64 {
        value / self.resolution
    }

    pub fn remove_resolution(&self, value: f64) -> f64 {
        value * self.resolution
    }

    /// Scale `value` and shift it by the offset, the offset itself is scaled first.
    ///
    /// `offset = 200, resolution = 0.01` maps 0 to 20000.
    pub fn apply_offset(&self, value: f64) -> f64 {
        self.apply_resolution(self.offset) + self.apply_resolution(value)
    }

    pub fn remove_offset(&self, value: f64) -> f64 {
        self.remove_resolution(value) - self.offset
    }

    fn transform(&self, value: f64) -> f64 {
        if self.offset == 0.0 {
            self.apply_resolution(value)
        } else {
            self.apply_offset(value)
        }
    }

    /// Smallest raw value a valid input can produce.
    pub fn encoded_min(&self) -> u32 {
        self.transform(self.min).round() as u32
    }

    /// Largest raw value a valid input can produce.
    pub fn encoded_max(&self) -> u32 {
        self.transform(self.max).round() as u32
    }

    /// Encode a physical value.
    ///
    /// A missing value falls back to the default, then to the invalid sentinel. A value equal to
    /// the sentinel is emitted as is, everything else is scaled, rounded and clamped into
    /// `[encoded_min, encoded_max]`.
    pub fn encode(&self, value: Option<f64>) -> u32 {
        let value = match value.or(self.default) {
            Some(v) => v,
            None => return self.invalid,
        };
        if value == self.invalid as f64 {
            return self.invalid;
        }
        let raw = self.transform(value).round();
        let min = self.encoded_min() as f64;
        let max = self.encoded_max() as f64;
        if raw >= max {
            max as u32
        } else if raw < min {
            min as u32
        } else {
            raw as u32
        }
    }

    /// Decode a raw value into physical units, `None` for the invalid sentinel.
    pub fn decode(&self, raw: u32) -> Option<f64> {
        if raw == self.invalid {
            return None;
        }
        Some(self.remove_offset(raw as f64))
    }
}
