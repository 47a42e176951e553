//! Thermal domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Temperature in degrees Celsius, as reported by the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Temperature(u32);

impl Temperature {
    /// Create a new Temperature
    pub const fn new(celsius: u32) -> Self {
        Self(celsius)
    }

    /// Get the temperature in Celsius
    #[inline]
    pub const fn as_celsius(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Temperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°C", self.0)
    }
}

impl From<u32> for Temperature {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Temperature> for u32 {
    fn from(temp: Temperature) -> Self {
        temp.0
    }
}

/// Temperature sensor selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TemperatureSensor {
    /// On-die GPU sensor
    #[default]
    Gpu,
}

impl TemperatureSensor {
    /// Map to the nvml-wrapper sensor enum
    pub fn to_nvml(self) -> nvml_wrapper::enum_wrappers::device::TemperatureSensor {
        match self {
            TemperatureSensor::Gpu => nvml_wrapper::enum_wrappers::device::TemperatureSensor::Gpu,
        }
    }
}
