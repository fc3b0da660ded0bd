//! Type-safe wrappers for OBD-II measurement units
//!
//! Newtypes around f64 keep km/h, rpm, percent and degrees from being mixed
//! up. They serialize transparently as bare numbers, so dataset files keep
//! their plain `"speed_kmph": 72.4` shape.
//!
//! Measurement units serialize with 4 decimal places to keep payloads small.
//! Coordinates are left untouched.

use serde::{Deserialize, Serialize};

/// Round f64 to 4 decimal places for compact JSON serialization
fn round4<S: serde::Serializer>(val: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64((*val * 10_000.0).round() / 10_000.0)
}

/// Kilometres per hour
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Kmph(#[serde(serialize_with = "round4")] pub f64);

/// Revolutions per minute
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Rpm(#[serde(serialize_with = "round4")] pub f64);

impl Rpm {
    /// Rpm in hundreds, the scale the dashboard chart plots against km/h
    pub fn hundreds(&self) -> f64 {
        self.0 / 100.0
    }
}

/// Percentage on the 0-100 scale, as OBD-II PIDs report it
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Percent(#[serde(serialize_with = "round4")] pub f64);

impl Percent {
    /// Create a new percentage, clamping to [0.0, 100.0]
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 100.0))
    }
}

/// Celsius
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Celsius(#[serde(serialize_with = "round4")] pub f64);

/// WGS84 degrees (latitude or longitude)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Degrees(pub f64);
