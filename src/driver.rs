//! Device control and the non-blocking acquisition state machine.
//!
//! Each [`Ltr303::poll`] call advances the machine by one small step with at
//! most one logical register access, so the host's cooperative loop is never
//! held up. Waits (post-reset wake-up, integration period after a setting
//! change) are deadlines compared against the host-supplied [`Instant`].

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::adaptive::{self, Adjustment};
use crate::lux;
use crate::registers::{
    ControlRegister, Gain, IntegrationTime, MeasurementRateRegister, StatusRegister,
    REG_ALS_CONTR, REG_ALS_DATA_CH0_HIGH, REG_ALS_DATA_CH0_LOW, REG_ALS_DATA_CH1_HIGH,
    REG_ALS_DATA_CH1_LOW, REG_ALS_MEAS_RATE, REG_ALS_STATUS, REG_MANUFAC_ID, REG_PART_ID,
};
use crate::{Config, Duration, Error, Instant, Readings, Sink};

/// Fixed bus address of the LTR-303ALS.
pub const DEVICE_ADDRESS: u8 = 0x29;

const EXPECTED_PART_ID: u8 = 0xA0;
const EXPECTED_MANUFACTURER_ID: u8 = 0x05;

/// Quiet period between the software-reset write and the activate write.
const RESET_SETTLE_MS: u32 = 2;
/// Standby-to-active wake-up time, waited out across ticks.
const WAKEUP_SETTLE: Duration = Duration::from_ticks(10);

/// Outcome of polling the status register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum DataStatus {
    /// No unread measurement in the data registers.
    NoData,
    /// A measurement is ready but flagged invalid; discard it.
    BadData,
    /// A valid measurement is ready. Carries the gain the device reports it
    /// actually applied, which may differ from the requested gain.
    DataOk(Gain),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    NotInitialized,
    DelayedSetup { until: Instant },
    Idle,
    WaitingForData,
    CollectingDataAuto,
    DataCollected,
    AdjustmentInProgress { until: Instant },
    ReadyToPublish,
    KeepPublishing,
    Failed,
}

/// Per-cycle bookkeeping, reset whenever a new cycle begins.
#[derive(Clone, Copy, Debug, Default)]
struct Cycle {
    readings: Readings,
    data_polls: u8,
    auto_polls: u8,
    adjustment_passes: u8,
}

pub struct Ltr303<I2C> {
    i2c: I2C,
    config: Config,
    state: State,
    cycle: Cycle,
    /// Gain most recently requested of the device.
    gain: Gain,
    /// Integration time most recently requested of the device.
    integration_time: IntegrationTime,
}

impl<I2C: I2c> Ltr303<I2C> {
    /// Validates `config` and wraps the bus. No bus traffic happens until
    /// [`setup`](Self::setup).
    pub fn new(i2c: I2C, config: Config) -> Result<Self, Error<I2C::Error>> {
        if !config.glass_attenuation_factor.is_finite() || config.glass_attenuation_factor <= 0.0 {
            return Err(Error::ArgumentError);
        }
        if matches!(config.gain, Gain::Unknown(_)) {
            return Err(Error::ArgumentError);
        }
        // The device cannot finish a conversion inside a shorter repeat
        // period, so reject the combination up front.
        let Some(repeat_millis) = config.repeat_rate.as_millis() else {
            return Err(Error::ArgumentError);
        };
        if repeat_millis < config.integration_time.as_millis() {
            return Err(Error::ArgumentError);
        }
        Ok(Self {
            i2c,
            state: State::NotInitialized,
            cycle: Cycle::default(),
            gain: config.gain,
            integration_time: config.integration_time,
            config,
        })
    }

    /// Verifies the device identity, then resets and activates the sensor
    /// with the configured gain, integration time and repeat rate.
    ///
    /// `delay` covers only the short settle between the reset and activate
    /// writes; the longer wake-up settle is waited out across subsequent
    /// [`poll`](Self::poll) calls without blocking. An identity mismatch or
    /// a transport fault here leaves the driver permanently inert.
    pub fn setup<D: DelayNs>(
        &mut self,
        delay: &mut D,
        now: Instant,
    ) -> Result<(), Error<I2C::Error>> {
        if self.state != State::NotInitialized {
            return Ok(());
        }
        match self.try_setup(delay, now) {
            Ok(()) => Ok(()),
            Err(error) => {
                self.state = State::Failed;
                Err(error)
            }
        }
    }

    fn try_setup<D: DelayNs>(
        &mut self,
        delay: &mut D,
        now: Instant,
    ) -> Result<(), Error<I2C::Error>> {
        let part_id = self.read_register(REG_PART_ID)?;
        let manufacturer_id = self.read_register(REG_MANUFAC_ID)?;
        if part_id != EXPECTED_PART_ID || manufacturer_id != EXPECTED_MANUFACTURER_ID {
            return Err(Error::UnexpectedDevice);
        }
        self.reset_and_activate(delay)?;
        let rate = MeasurementRateRegister {
            repeat_rate: self.config.repeat_rate,
            integration_time: self.integration_time,
        };
        self.write_register(REG_ALS_MEAS_RATE, rate.encode())?;
        self.state = State::DelayedSetup {
            until: now + WAKEUP_SETTLE,
        };
        Ok(())
    }

    /// Host's periodic callback: starts a new measurement cycle when the
    /// machine is resting, or retires the previously published cycle.
    pub fn trigger(&mut self) {
        match self.state {
            State::Idle => {
                self.cycle = Cycle::default();
                self.cycle.readings.actual_gain = self.gain;
                self.cycle.readings.integration_time = self.integration_time;
                self.state = State::WaitingForData;
            }
            State::KeepPublishing => self.state = State::Idle,
            _ => {}
        }
    }

    /// Host's frequent tick callback: advances the machine by one step.
    ///
    /// A transport fault abandons the cycle in flight and is surfaced once;
    /// the next [`trigger`](Self::trigger) starts fresh.
    pub fn poll<S: Sink>(&mut self, sink: &mut S, now: Instant) -> Result<(), Error<I2C::Error>> {
        match self.advance(sink, now) {
            Ok(()) => Ok(()),
            Err(error) => {
                self.state = State::Idle;
                Err(Error::I2cError(error))
            }
        }
    }

    /// Last completed (or in-flight) measurement record.
    pub fn readings(&self) -> &Readings {
        &self.cycle.readings
    }

    /// Releases the bus.
    pub fn destroy(self) -> I2C {
        self.i2c
    }

    fn advance<S: Sink>(&mut self, sink: &mut S, now: Instant) -> Result<(), I2C::Error> {
        match self.state {
            State::NotInitialized | State::Failed | State::Idle | State::KeepPublishing => {}
            State::DelayedSetup { until } => {
                if now >= until {
                    self.state = State::Idle;
                }
            }
            State::WaitingForData => match self.is_data_ready()? {
                DataStatus::NoData => {
                    self.cycle.data_polls = self.cycle.data_polls.saturating_add(1);
                    if self.cycle.data_polls >= self.config.data_poll_limit {
                        self.state = State::Idle;
                    }
                }
                DataStatus::BadData => self.state = State::Idle,
                DataStatus::DataOk(actual_gain) => {
                    self.cycle.readings.actual_gain = actual_gain;
                    self.read_sensor_data()?;
                    // In automatic mode a sample taken under a stale gain is
                    // re-collected until the device reports the requested one.
                    self.state = if self.config.automatic_mode && actual_gain != self.gain {
                        State::CollectingDataAuto
                    } else {
                        State::DataCollected
                    };
                }
            },
            State::CollectingDataAuto => match self.is_data_ready()? {
                DataStatus::BadData => self.state = State::Idle,
                DataStatus::NoData => {
                    self.cycle.auto_polls = self.cycle.auto_polls.saturating_add(1);
                    if self.cycle.auto_polls >= self.config.auto_gain_poll_limit {
                        // Forward progress beats a perfect gain stamp.
                        self.state = State::DataCollected;
                    }
                }
                DataStatus::DataOk(actual_gain) => {
                    self.cycle.readings.actual_gain = actual_gain;
                    self.read_sensor_data()?;
                    self.cycle.auto_polls = self.cycle.auto_polls.saturating_add(1);
                    if actual_gain == self.gain
                        || self.cycle.auto_polls >= self.config.auto_gain_poll_limit
                    {
                        self.state = State::DataCollected;
                    }
                }
            },
            State::DataCollected => {
                let adjustment = if self.config.automatic_mode
                    && self.cycle.adjustment_passes < self.config.adjustment_pass_limit
                {
                    adaptive::required_adjustment(&self.cycle.readings)
                } else {
                    None
                };
                match adjustment {
                    Some(Adjustment::Gain(gain)) => {
                        self.configure_gain(gain)?;
                        self.gain = gain;
                        self.begin_adjustment_wait(now);
                    }
                    Some(Adjustment::IntegrationTime(time)) => {
                        self.configure_integration_time(time)?;
                        self.integration_time = time;
                        self.begin_adjustment_wait(now);
                    }
                    None => self.state = State::ReadyToPublish,
                }
            }
            State::AdjustmentInProgress { until } => {
                if now >= until {
                    self.cycle.data_polls = 0;
                    self.state = State::WaitingForData;
                }
            }
            State::ReadyToPublish => {
                let lux =
                    lux::compute_lux(&self.cycle.readings, self.config.glass_attenuation_factor);
                self.cycle.readings.lux = lux;
                let readings = self.cycle.readings;
                sink.infrared_counts(readings.ch1);
                sink.full_spectrum_counts(readings.ch0);
                sink.ambient_light(readings.lux);
                sink.actual_gain(readings.actual_gain.multiplier());
                sink.actual_integration_time(readings.integration_time.as_millis());
                self.state = State::KeepPublishing;
            }
        }
        Ok(())
    }

    fn begin_adjustment_wait(&mut self, now: Instant) {
        self.cycle.adjustment_passes += 1;
        // Give the device one full integration period under the new setting
        // before trusting its data registers again.
        let settle = Duration::from_ticks(self.integration_time.as_millis());
        self.state = State::AdjustmentInProgress { until: now + settle };
    }

    fn reset_and_activate<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), I2C::Error> {
        let reset = ControlRegister {
            sw_reset: true,
            ..ControlRegister::default()
        };
        self.write_register(REG_ALS_CONTR, reset.encode())?;
        delay.delay_ms(RESET_SETTLE_MS);
        let activate = ControlRegister {
            active_mode: true,
            gain: self.gain,
            ..ControlRegister::default()
        };
        self.write_register(REG_ALS_CONTR, activate.encode())
    }

    fn configure_gain(&mut self, gain: Gain) -> Result<(), I2C::Error> {
        let mut control = ControlRegister::decode(self.read_register(REG_ALS_CONTR)?);
        control.gain = gain;
        self.write_register(REG_ALS_CONTR, control.encode())
    }

    fn configure_integration_time(&mut self, time: IntegrationTime) -> Result<(), I2C::Error> {
        let mut rate = MeasurementRateRegister::decode(self.read_register(REG_ALS_MEAS_RATE)?);
        rate.integration_time = time;
        self.write_register(REG_ALS_MEAS_RATE, rate.encode())
    }

    fn is_data_ready(&mut self) -> Result<DataStatus, I2C::Error> {
        let status = StatusRegister::decode(self.read_register(REG_ALS_STATUS)?);
        Ok(if !status.new_data {
            DataStatus::NoData
        } else if status.data_invalid {
            DataStatus::BadData
        } else {
            DataStatus::DataOk(status.gain)
        })
    }

    /// CH1 must be read before CH0, low byte first (datasheet pg. 17).
    fn read_sensor_data(&mut self) -> Result<(), I2C::Error> {
        let ch1_low = self.read_register(REG_ALS_DATA_CH1_LOW)?;
        let ch1_high = self.read_register(REG_ALS_DATA_CH1_HIGH)?;
        let ch0_low = self.read_register(REG_ALS_DATA_CH0_LOW)?;
        let ch0_high = self.read_register(REG_ALS_DATA_CH0_HIGH)?;
        self.cycle.readings.ch1 = u16::from_le_bytes([ch1_low, ch1_high]);
        self.cycle.readings.ch0 = u16::from_le_bytes([ch0_low, ch0_high]);
        self.cycle.readings.integration_time = self.integration_time;
        Ok(())
    }

    fn read_register(&mut self, register: u8) -> Result<u8, I2C::Error> {
        let mut data: [u8; 1] = [0];
        self.i2c.write_read(DEVICE_ADDRESS, &[register], &mut data)?;
        Ok(data[0])
    }

    fn write_register(&mut self, register: u8, byte: u8) -> Result<(), I2C::Error> {
        self.i2c.write(DEVICE_ADDRESS, &[register, byte])
    }
}
