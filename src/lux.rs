//! Two-channel photometric conversion per the LTR-303/329 appendix.
//!
//! Channel counts are normalised by the gain multiplier and the
//! integration-time ratio, then run through a fixed table of ratio-bucket
//! coefficients. The result is scaled by the glass attenuation factor and
//! never goes negative.

use crate::Readings;

/// CH1/(CH0+CH1) at or above this ratio carries no usable visible signal.
const SATURATION_RATIO: f32 = 0.85;

struct RatioBucket {
    upper: f32,
    ch0_coeff: f32,
    ch1_coeff: f32,
}

const RATIO_BUCKETS: [RatioBucket; 3] = [
    RatioBucket {
        upper: 0.45,
        ch0_coeff: 1.7743,
        ch1_coeff: 1.1059,
    },
    RatioBucket {
        upper: 0.64,
        ch0_coeff: 4.2785,
        ch1_coeff: -1.9548,
    },
    RatioBucket {
        upper: SATURATION_RATIO,
        ch0_coeff: 0.5926,
        ch1_coeff: 0.1185,
    },
];

pub(crate) fn compute_lux(readings: &Readings, glass_attenuation_factor: f32) -> f32 {
    if readings.ch0 == 0 && readings.ch1 == 0 {
        return 0.0;
    }
    let ch0 = f32::from(readings.ch0);
    let ch1 = f32::from(readings.ch1);
    let ratio = ch1 / (ch0 + ch1);

    let scale =
        f32::from(readings.actual_gain.multiplier()) * readings.integration_time.multiplier();
    let ch0 = ch0 / scale;
    let ch1 = ch1 / scale;

    for bucket in &RATIO_BUCKETS {
        if ratio < bucket.upper {
            let lux = (bucket.ch0_coeff * ch0 + bucket.ch1_coeff * ch1) * glass_attenuation_factor;
            return if lux > 0.0 { lux } else { 0.0 };
        }
    }
    0.0
}
