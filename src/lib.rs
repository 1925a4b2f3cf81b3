//! # Rust Driver for the Lite-On LTR-303ALS Ambient Light Sensor
//!
//! Platform-agnostic `no_std` driver built on the [`embedded-hal`] traits.
//! The driver never blocks: the host calls [`Ltr303::trigger`] from its
//! periodic schedule to start a measurement cycle and [`Ltr303::poll`] from
//! its frequent tick to advance the acquisition state machine one small step
//! at a time. Completed cycles are fanned out through the [`Sink`] trait as
//! raw channel counts, calibrated lux, and the gain/integration time the
//! sample was actually taken with.
//!
//! With automatic mode enabled the driver re-ranges gain and integration
//! time between samples to stay clear of saturation and under-range.
//!
//! ## External Links
//!
//! - [Datasheet]
//! - [Appendix A (lux formula)]
//!
//! [`embedded-hal`]: https://crates.io/crates/embedded-hal
//! [Datasheet]: https://www.mouser.com/datasheet/2/239/Lite-On_LTR-303ALS-01_DS_ver%201.1-1175269.pdf
//! [Appendix A (lux formula)]: https://github.com/aniketpalu/LTR303/blob/main/LTR-303%20329_Appendix%20A%20Ver_1.0_22%20Feb%202013.pdf

#![no_std]

mod adaptive;
mod driver;
mod lux;
pub mod registers;

pub use driver::{DataStatus, Ltr303, DEVICE_ADDRESS};
pub use registers::{Gain, IntegrationTime, MeasurementRepeatRate};

/// Monotonic millisecond timestamp supplied by the host on every call.
pub type Instant = fugit::TimerInstantU32<1_000>;
/// Millisecond duration used for the driver's elapsed-time waits.
pub type Duration = fugit::TimerDurationU32<1_000>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Error<E> {
    I2cError(E),
    ArgumentError,
    UnexpectedDevice,
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Self::I2cError(error)
    }
}

/// One-time configuration consumed by [`Ltr303::new`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Config {
    pub gain: Gain,
    pub integration_time: IntegrationTime,
    /// Interval between the samples the device takes on its own in active
    /// mode. Must be at least as long as the integration time.
    pub repeat_rate: MeasurementRepeatRate,
    /// Multiplicative correction for light lost to glass or a window in
    /// front of the sensor. Must be positive.
    pub glass_attenuation_factor: f32,
    /// Let the driver re-range gain and integration time between samples.
    pub automatic_mode: bool,
    /// Consecutive no-data status polls before a cycle is abandoned.
    pub data_poll_limit: u8,
    /// Status polls spent waiting for the device-reported gain to match the
    /// requested one before the sample is accepted as-is.
    pub auto_gain_poll_limit: u8,
    /// Gain/integration-time adjustments allowed within one cycle.
    pub adjustment_pass_limit: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gain: Gain::X1,
            integration_time: IntegrationTime::Ms100,
            repeat_rate: MeasurementRepeatRate::Ms500,
            glass_attenuation_factor: 1.0,
            automatic_mode: true,
            data_poll_limit: 10,
            auto_gain_poll_limit: 5,
            adjustment_pass_limit: 5,
        }
    }
}

/// Working record for the measurement cycle currently in flight. Reset when
/// a cycle starts, filled in as it advances, published when it completes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct Readings {
    /// Visible + infrared counts.
    pub ch0: u16,
    /// Infrared-only counts.
    pub ch1: u16,
    /// Gain the device reports it applied during the integration window.
    pub actual_gain: Gain,
    pub integration_time: IntegrationTime,
    pub lux: f32,
}

/// Downstream consumers of one completed measurement cycle.
///
/// Every method has a no-op default so a host wires up only the outputs it
/// cares about.
pub trait Sink {
    /// CH0: visible + infrared raw counts.
    fn full_spectrum_counts(&mut self, _counts: u16) {}
    /// CH1: infrared-only raw counts.
    fn infrared_counts(&mut self, _counts: u16) {}
    /// Calibrated illuminance.
    fn ambient_light(&mut self, _lux: f32) {}
    /// Gain multiplier (1–96) the published sample was taken with.
    fn actual_gain(&mut self, _multiplier: u8) {}
    /// Integration time in milliseconds the published sample was taken with.
    fn actual_integration_time(&mut self, _millis: u32) {}
}
