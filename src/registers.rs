//! Register map of the LTR-303ALS.
//!
//! Every register is a plain value type with explicit shift/mask
//! `decode`/`encode` functions; reserved bits always encode as zero.
//! Undefined gain and repeat-rate bit patterns decode to an `Unknown`
//! sentinel instead of panicking.

use num_enum::{FromPrimitive, IntoPrimitive};

pub const REG_ALS_CONTR: u8 = 0x80;
pub const REG_ALS_MEAS_RATE: u8 = 0x85;
pub const REG_PART_ID: u8 = 0x86;
pub const REG_MANUFAC_ID: u8 = 0x87;
pub const REG_ALS_DATA_CH1_LOW: u8 = 0x88;
pub const REG_ALS_DATA_CH1_HIGH: u8 = 0x89;
pub const REG_ALS_DATA_CH0_LOW: u8 = 0x8A;
pub const REG_ALS_DATA_CH0_HIGH: u8 = 0x8B;
pub const REG_ALS_STATUS: u8 = 0x8C;

/// Analog gain, 1x–96x. Codes 4 and 5 are not assigned by the datasheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[repr(u8)]
pub enum Gain {
    X1 = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X48 = 6,
    X96 = 7,
    #[num_enum(catch_all)]
    Unknown(u8),
}

impl Default for Gain {
    fn default() -> Self {
        Self::X1
    }
}

impl Gain {
    /// Physical amplification factor. An unknown gain is treated as unity.
    pub const fn multiplier(self) -> u8 {
        match self {
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
            Self::X8 => 8,
            Self::X48 => 48,
            Self::X96 => 96,
            Self::Unknown(_) => 1,
        }
    }
}

/// Time the sensor accumulates charge per sample. All eight codes are
/// assigned, so decoding a 3-bit field is total.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[repr(u8)]
pub enum IntegrationTime {
    #[default]
    Ms100 = 0,
    Ms50 = 1,
    Ms200 = 2,
    Ms400 = 3,
    Ms150 = 4,
    Ms250 = 5,
    Ms300 = 6,
    Ms350 = 7,
}

impl IntegrationTime {
    pub const fn as_millis(self) -> u32 {
        match self {
            Self::Ms100 => 100,
            Self::Ms50 => 50,
            Self::Ms200 => 200,
            Self::Ms400 => 400,
            Self::Ms150 => 150,
            Self::Ms250 => 250,
            Self::Ms300 => 300,
            Self::Ms350 => 350,
        }
    }

    /// Sensitivity relative to the 100 ms reference integration time.
    pub fn multiplier(self) -> f32 {
        self.as_millis() as f32 / 100.0
    }
}

/// Interval between the automatic samples the device takes in active mode.
/// Codes 6 and 7 are not assigned by the datasheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
#[repr(u8)]
pub enum MeasurementRepeatRate {
    Ms50 = 0,
    Ms100 = 1,
    Ms200 = 2,
    Ms500 = 3,
    Ms1000 = 4,
    Ms2000 = 5,
    #[num_enum(catch_all)]
    Unknown(u8),
}

impl Default for MeasurementRepeatRate {
    fn default() -> Self {
        Self::Ms500
    }
}

impl MeasurementRepeatRate {
    pub const fn as_millis(self) -> Option<u32> {
        match self {
            Self::Ms50 => Some(50),
            Self::Ms100 => Some(100),
            Self::Ms200 => Some(200),
            Self::Ms500 => Some(500),
            Self::Ms1000 => Some(1000),
            Self::Ms2000 => Some(2000),
            Self::Unknown(_) => None,
        }
    }
}

/// ALS_CONTR (0x80): operation mode, software reset, gain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct ControlRegister {
    pub active_mode: bool,
    pub sw_reset: bool,
    pub gain: Gain,
}

impl ControlRegister {
    pub fn decode(byte: u8) -> Self {
        Self {
            active_mode: byte & 0x01 != 0,
            sw_reset: byte & 0x02 != 0,
            gain: Gain::from((byte >> 2) & 0x07),
        }
    }

    pub fn encode(self) -> u8 {
        u8::from(self.active_mode)
            | u8::from(self.sw_reset) << 1
            | (u8::from(self.gain) & 0x07) << 2
    }
}

/// ALS_MEAS_RATE (0x85): repeat rate and integration time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct MeasurementRateRegister {
    pub repeat_rate: MeasurementRepeatRate,
    pub integration_time: IntegrationTime,
}

impl MeasurementRateRegister {
    pub fn decode(byte: u8) -> Self {
        Self {
            repeat_rate: MeasurementRepeatRate::from(byte & 0x07),
            integration_time: IntegrationTime::from((byte >> 3) & 0x07),
        }
    }

    pub fn encode(self) -> u8 {
        (u8::from(self.repeat_rate) & 0x07) | (u8::from(self.integration_time) & 0x07) << 3
    }
}

/// ALS_STATUS (0x8C), read-only: data availability/validity and the gain the
/// device actually applied to the pending sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct StatusRegister {
    pub new_data: bool,
    pub gain: Gain,
    pub data_invalid: bool,
}

impl StatusRegister {
    pub fn decode(byte: u8) -> Self {
        Self {
            new_data: byte & 0x04 != 0,
            gain: Gain::from((byte >> 4) & 0x07),
            data_invalid: byte & 0x80 != 0,
        }
    }

    pub fn encode(self) -> u8 {
        u8::from(self.new_data) << 2
            | (u8::from(self.gain) & 0x07) << 4
            | u8::from(self.data_invalid) << 7
    }
}
