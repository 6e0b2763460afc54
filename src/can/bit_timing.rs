//! Bit timing calculation for CAN controllers
//!
//! [`calculate`] searches the prescaler and segment lengths that get closest
//! to a requested bit rate and sample point within the limits of a
//! controller. Bit rate accuracy takes precedence over the sample point.

use defmt_or_log::trace;
use fugit::HertzU32;

/// Sample point recommended by CAN in Automation, in permille
pub const CIA_SAMPLE_POINT: u16 = 875;
/// Highest bit rate accepted by [`calculate`]
pub const MAX_BITRATE: u32 = 8_000_000;
/// Largest accepted bit rate deviation, in permille
pub const MAX_BITRATE_ERROR: u32 = 25;

const SYNC_SEG: u32 = 1;

/// Segment and prescaler limits of a CAN controller, in time quanta
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Limits {
    /// Shortest time segment 1 (propagation and phase segment 1)
    pub tseg1_min: u32,
    /// Longest time segment 1
    pub tseg1_max: u32,
    /// Shortest time segment 2 (phase segment 2)
    pub tseg2_min: u32,
    /// Longest time segment 2
    pub tseg2_max: u32,
    /// Longest synchronization jump width
    pub sjw_max: u32,
    /// Smallest bit rate prescaler
    pub brp_min: u32,
    /// Largest bit rate prescaler
    pub brp_max: u32,
    /// Prescaler step
    pub brp_inc: u32,
}

impl Limits {
    /// bxCAN (STM32F1/F4 classic CAN)
    pub const BXCAN: Self = Self {
        tseg1_min: 1,
        tseg1_max: 16,
        tseg2_min: 1,
        tseg2_max: 8,
        sjw_max: 4,
        brp_min: 1,
        brp_max: 1024,
        brp_inc: 1,
    };

    /// FDCAN nominal (arbitration) phase
    pub const FDCAN_NOMINAL: Self = Self {
        tseg1_min: 2,
        tseg1_max: 256,
        tseg2_min: 2,
        tseg2_max: 128,
        sjw_max: 128,
        brp_min: 1,
        brp_max: 512,
        brp_inc: 1,
    };

    /// FDCAN data phase
    pub const FDCAN_DATA: Self = Self {
        tseg1_min: 1,
        tseg1_max: 32,
        tseg2_min: 1,
        tseg2_max: 16,
        sjw_max: 16,
        brp_min: 1,
        brp_max: 32,
        brp_inc: 1,
    };
}

/// Computed bit timing
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    /// Bit rate achieved with this timing
    pub bitrate: u32,
    /// Sample point in permille
    pub sample_point: u16,
    /// Bit rate prescaler
    pub brp: u32,
    /// Propagation segment in time quanta
    pub prop_seg: u32,
    /// Phase segment 1 in time quanta
    pub phase_seg1: u32,
    /// Phase segment 2 in time quanta
    pub phase_seg2: u32,
    /// Synchronization jump width in time quanta
    pub sjw: u32,
}

impl Timing {
    /// Time segment 1 as most controllers program it
    pub fn tseg1(&self) -> u32 {
        self.prop_seg + self.phase_seg1
    }

    /// Time quanta per bit
    pub fn time_quanta(&self) -> u32 {
        SYNC_SEG + self.tseg1() + self.phase_seg2
    }
}

/// Bit timing calculation errors
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Bit rate is zero or above [`MAX_BITRATE`]
    BitrateOutOfRange(u32),
    /// Sample point above 1000 permille
    SamplePointOutOfRange(u16),
    /// No prescaler within the limits yields a usable bit rate
    NoValidPrescaler,
    /// The closest bit rate deviates more than [`MAX_BITRATE_ERROR`]
    BitrateErrorTooLarge {
        /// Closest bit rate that could be reached
        achieved: u32,
    },
}

struct Segments {
    tseg1: u32,
    tseg2: u32,
    sample_point: u32,
    error: u32,
}

/// Best split of `nbt_tq` time quanta for `desired_sp`. Tries the rounded
/// down and the rounded up phase segment 2.
fn split_segments(limits: &Limits, desired_sp: u32, nbt_tq: u32) -> Option<Segments> {
    let mut best: Option<Segments> = None;
    for adjust in 0..2 {
        let tseg2 = (nbt_tq - desired_sp * nbt_tq / 1000)
            .saturating_sub(adjust)
            .clamp(limits.tseg2_min, limits.tseg2_max);
        let (tseg1, tseg2) = match nbt_tq.checked_sub(SYNC_SEG + tseg2) {
            Some(tseg1) if tseg1 > limits.tseg1_max => {
                (limits.tseg1_max, nbt_tq.saturating_sub(SYNC_SEG + limits.tseg1_max))
            }
            Some(tseg1) if tseg1 >= limits.tseg1_min => (tseg1, tseg2),
            _ => (
                limits.tseg1_min,
                nbt_tq.saturating_sub(SYNC_SEG + limits.tseg1_min),
            ),
        };
        let sample_point = 1000 * nbt_tq.saturating_sub(tseg2) / nbt_tq;
        let error = desired_sp.abs_diff(sample_point);
        if best.as_ref().map_or(true, |b| error < b.error) {
            best = Some(Segments {
                tseg1,
                tseg2,
                sample_point,
                error,
            });
        }
    }
    best
}

/// Computes the bit timing for `bitrate` from the controller clock `base`.
///
/// `sample_point` is given in permille, 0 selects [`CIA_SAMPLE_POINT`].
/// `sjw` is limited to the controller maximum and to phase segment 2, 0
/// selects 1.
///
/// Candidate bit lengths are tried from long to short, each with the
/// truncated and the rounded up prescaler. The candidate with the smallest
/// bit rate error wins, ties go to the better sample point.
pub fn calculate(
    bitrate: HertzU32,
    sample_point: u16,
    sjw: u32,
    base: HertzU32,
    limits: &Limits,
) -> Result<Timing, Error> {
    let desired = bitrate.raw();
    if desired == 0 || desired > MAX_BITRATE {
        return Err(Error::BitrateOutOfRange(desired));
    }
    if sample_point > 1000 {
        return Err(Error::SamplePointOutOfRange(sample_point));
    }
    let desired_sp = match sample_point {
        0 => u32::from(CIA_SAMPLE_POINT),
        sp => u32::from(sp),
    };
    let base = base.raw();
    let brp_inc = limits.brp_inc.max(1);

    let mut best_br_error = u32::MAX;
    let mut best_sp_error = u32::MAX;
    let mut best: Option<Timing> = None;

    // Twice the bit length, odd values round the prescaler up.
    let longest = (limits.tseg1_max + limits.tseg2_max) * 2 + SYNC_SEG + 1;
    let shortest = (limits.tseg1_min + limits.tseg2_min) * 2 + SYNC_SEG;
    for nbt_tq_x2 in (shortest..=longest).rev() {
        let nbt_tq = nbt_tq_x2 / 2;
        if nbt_tq == 0 {
            continue;
        }
        let brp = (base / (nbt_tq * desired) + nbt_tq_x2 % 2) / brp_inc * brp_inc;
        if brp == 0 || brp < limits.brp_min || brp > limits.brp_max {
            continue;
        }

        let achieved = base / (brp * nbt_tq);
        let br_error = desired.abs_diff(achieved);
        if br_error > best_br_error {
            continue;
        }
        if br_error < best_br_error {
            best_sp_error = u32::MAX;
        }

        let segments = match split_segments(limits, desired_sp, nbt_tq) {
            Some(s) if s.error < best_sp_error => s,
            _ => continue,
        };
        best_sp_error = segments.error;
        best_br_error = br_error;
        let prop_seg = segments.tseg1 / 2;
        best = Some(Timing {
            bitrate: achieved,
            sample_point: segments.sample_point as u16,
            brp,
            prop_seg,
            phase_seg1: segments.tseg1 - prop_seg,
            phase_seg2: segments.tseg2,
            sjw: 1,
        });

        if best_br_error == 0 && best_sp_error == 0 {
            break;
        }
    }

    let mut timing = best.ok_or(Error::NoValidPrescaler)?;
    if sjw != 0 && limits.sjw_max != 0 {
        timing.sjw = sjw.min(limits.sjw_max).min(timing.phase_seg2).max(1);
    }

    if u64::from(best_br_error) * 1000 / u64::from(desired) > u64::from(MAX_BITRATE_ERROR) {
        return Err(Error::BitrateErrorTooLarge {
            achieved: timing.bitrate,
        });
    }
    trace!(
        "bit timing: brp {} tseg1 {} tseg2 {} sample point {}",
        timing.brp,
        timing.tseg1(),
        timing.phase_seg2,
        timing.sample_point
    );
    Ok(timing)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn exact_solution_for_500k_from_8mhz() {
        let timing = calculate(
            HertzU32::kHz(500),
            0,
            0,
            HertzU32::MHz(8),
            &Limits::BXCAN,
        )
        .unwrap();
        assert_eq!(
            timing,
            Timing {
                bitrate: 500_000,
                sample_point: 875,
                brp: 1,
                prop_seg: 6,
                phase_seg1: 7,
                phase_seg2: 2,
                sjw: 1,
            }
        );
        assert_eq!(timing.tseg1(), 13);
        assert_eq!(timing.time_quanta(), 16);
    }

    #[test]
    fn sjw_is_limited_by_phase_segment_2() {
        let timing = calculate(
            HertzU32::kHz(500),
            875,
            4,
            HertzU32::MHz(8),
            &Limits::BXCAN,
        )
        .unwrap();
        assert_eq!(timing.sjw, 2);
    }

    #[test]
    fn fdcan_nominal_from_kernel_clock() {
        let timing = calculate(
            HertzU32::MHz(1),
            800,
            0,
            HertzU32::MHz(40),
            &Limits::FDCAN_NOMINAL,
        )
        .unwrap();
        assert_eq!(timing.bitrate, 1_000_000);
        assert_eq!(timing.brp * timing.time_quanta(), 40);
        assert_eq!(timing.sample_point, 800);
    }

    #[test]
    fn bad_requests_are_rejected() {
        let base = HertzU32::MHz(8);
        assert_eq!(
            calculate(HertzU32::from_raw(0), 0, 0, base, &Limits::BXCAN),
            Err(Error::BitrateOutOfRange(0))
        );
        assert_eq!(
            calculate(HertzU32::MHz(9), 0, 0, base, &Limits::BXCAN),
            Err(Error::BitrateOutOfRange(9_000_000))
        );
        assert_eq!(
            calculate(HertzU32::kHz(500), 1001, 0, base, &Limits::BXCAN),
            Err(Error::SamplePointOutOfRange(1001))
        );
    }

    #[test]
    fn unreachable_bitrate_is_rejected() {
        assert!(matches!(
            calculate(
                HertzU32::MHz(1),
                0,
                0,
                HertzU32::MHz(1),
                &Limits::BXCAN
            ),
            Err(Error::BitrateErrorTooLarge { .. })
        ));
    }
}
