//! Automatic gain / integration-time re-ranging.
//!
//! At most one setting moves per decision, so the driver converges over
//! successive cycles instead of oscillating. Gain moves before integration
//! time in both directions. When the relevant ladder end is reached and the
//! signal is still saturated or starved the decision is `None`: that light
//! level simply cannot be ranged any better and the sample is published
//! as-is.

use crate::registers::{Gain, IntegrationTime};
use crate::Readings;

/// Both channels at or below this count leave too little signal to resolve.
pub(crate) const LOW_SIGNAL_THRESHOLD: u16 = 20;
/// Either channel at or above this count is close enough to 16-bit full
/// scale to risk clipping.
pub(crate) const NEAR_SATURATION_THRESHOLD: u16 = 58982;

const GAIN_LADDER: [Gain; 6] = [Gain::X1, Gain::X2, Gain::X4, Gain::X8, Gain::X48, Gain::X96];
const TIME_LADDER: [IntegrationTime; 8] = [
    IntegrationTime::Ms50,
    IntegrationTime::Ms100,
    IntegrationTime::Ms150,
    IntegrationTime::Ms200,
    IntegrationTime::Ms250,
    IntegrationTime::Ms300,
    IntegrationTime::Ms350,
    IntegrationTime::Ms400,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Adjustment {
    Gain(Gain),
    IntegrationTime(IntegrationTime),
}

/// Decides whether the sample's settings need to change before it can be
/// trusted, based on the raw counts it was taken with.
pub(crate) fn required_adjustment(readings: &Readings) -> Option<Adjustment> {
    let saturated = readings.ch0 >= NEAR_SATURATION_THRESHOLD
        || readings.ch1 >= NEAR_SATURATION_THRESHOLD;
    let starved =
        readings.ch0 <= LOW_SIGNAL_THRESHOLD && readings.ch1 <= LOW_SIGNAL_THRESHOLD;

    if saturated {
        gain_step(readings.actual_gain, false)
            .map(Adjustment::Gain)
            .or_else(|| time_step(readings.integration_time, false).map(Adjustment::IntegrationTime))
    } else if starved {
        gain_step(readings.actual_gain, true)
            .map(Adjustment::Gain)
            .or_else(|| time_step(readings.integration_time, true).map(Adjustment::IntegrationTime))
    } else {
        None
    }
}

fn gain_step(gain: Gain, up: bool) -> Option<Gain> {
    let position = GAIN_LADDER.iter().position(|g| *g == gain)?;
    let next = if up {
        position + 1
    } else {
        position.checked_sub(1)?
    };
    GAIN_LADDER.get(next).copied()
}

fn time_step(time: IntegrationTime, up: bool) -> Option<IntegrationTime> {
    let position = TIME_LADDER.iter().position(|t| *t == time)?;
    let next = if up {
        position + 1
    } else {
        position.checked_sub(1)?
    };
    TIME_LADDER.get(next).copied()
}

#[cfg(all(test, not(all(target_arch = "arm", target_os = "none"))))]
mod test {
    extern crate std;

    use super::*;

    fn sample(ch0: u16, ch1: u16, gain: Gain, time: IntegrationTime) -> Readings {
        Readings {
            ch0,
            ch1,
            actual_gain: gain,
            integration_time: time,
            lux: 0.0,
        }
    }

    #[test]
    fn dim_scene_raises_gain_first() {
        let r = sample(5, 2, Gain::X1, IntegrationTime::Ms100);
        assert_eq!(required_adjustment(&r), Some(Adjustment::Gain(Gain::X2)));
    }

    #[test]
    fn dim_scene_at_top_gain_raises_integration_time() {
        let r = sample(5, 2, Gain::X96, IntegrationTime::Ms100);
        assert_eq!(
            required_adjustment(&r),
            Some(Adjustment::IntegrationTime(IntegrationTime::Ms150))
        );
    }

    #[test]
    fn dim_scene_at_both_maxima_is_exhausted() {
        let r = sample(0, 0, Gain::X96, IntegrationTime::Ms400);
        assert_eq!(required_adjustment(&r), None);
    }

    #[test]
    fn bright_scene_lowers_gain_first() {
        let r = sample(60000, 100, Gain::X8, IntegrationTime::Ms100);
        assert_eq!(required_adjustment(&r), Some(Adjustment::Gain(Gain::X4)));
    }

    #[test]
    fn bright_scene_at_both_minima_is_exhausted() {
        let r = sample(65535, 65535, Gain::X1, IntegrationTime::Ms50);
        assert_eq!(required_adjustment(&r), None);
    }

    #[test]
    fn well_ranged_scene_needs_no_change() {
        let r = sample(1000, 100, Gain::X4, IntegrationTime::Ms100);
        assert_eq!(required_adjustment(&r), None);
    }

    #[test]
    fn unknown_gain_is_never_adjusted() {
        let r = sample(65535, 65535, Gain::Unknown(4), IntegrationTime::Ms100);
        assert_eq!(
            required_adjustment(&r),
            Some(Adjustment::IntegrationTime(IntegrationTime::Ms50))
        );
    }

    /// Simulated fixed illuminance that saturates at 1x/100 ms: repeated
    /// decisions settle within a handful of passes.
    #[test]
    fn converges_from_saturation_within_bounded_passes() {
        // Counts a scene would produce at the given settings, clipped to
        // the 16-bit ADC range.
        fn scene_counts(base: u32, gain: Gain, time: IntegrationTime) -> u16 {
            let counts = base * u32::from(gain.multiplier()) * time.as_millis() / 100;
            counts.min(65535) as u16
        }

        let base = 70_000;
        let mut gain = Gain::X1;
        let mut time = IntegrationTime::Ms100;
        let mut passes = 0;
        loop {
            let counts = scene_counts(base, gain, time);
            let r = sample(counts, counts / 10, gain, time);
            match required_adjustment(&r) {
                Some(Adjustment::Gain(g)) => gain = g,
                Some(Adjustment::IntegrationTime(t)) => time = t,
                None => break,
            }
            passes += 1;
            assert!(passes <= 5, "adjustment did not converge");
        }
        // 70_000 * 0.5 fits: one integration-time step after the gain floor
        assert_eq!(gain, Gain::X1);
        assert_eq!(time, IntegrationTime::Ms50);
    }

    /// An overwhelmingly bright scene stays saturated at the minimum
    /// settings; the decision reports exhaustion instead of looping.
    #[test]
    fn reports_exhaustion_when_minimum_settings_still_saturate() {
        let mut gain = Gain::X1;
        let mut time = IntegrationTime::Ms100;
        for _ in 0..5 {
            let r = sample(65535, 65535, gain, time);
            match required_adjustment(&r) {
                Some(Adjustment::Gain(g)) => gain = g,
                Some(Adjustment::IntegrationTime(t)) => time = t,
                None => break,
            }
        }
        assert_eq!(gain, Gain::X1);
        assert_eq!(time, IntegrationTime::Ms50);
        let r = sample(65535, 65535, gain, time);
        assert_eq!(required_adjustment(&r), None);
    }
}
