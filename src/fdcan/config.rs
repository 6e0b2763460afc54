//! FDCAN bus configuration

use crate::can::bit_timing::Timing;
use core::ops::RangeInclusive;
use fugit::HertzU32;

/// Configuration for the CAN bus
#[derive(Copy, Clone, Debug)]
pub struct CanConfig {
    /// Run peripheral in CAN-FD mode
    pub mode: Mode,
    /// Internal loop back: transmitted frames are received, the TX pin stays
    /// recessive unless combined with [`Self::bus_monitoring`]
    pub loopback: bool,
    /// Bus monitoring: the controller only listens and never sends dominant
    /// bits
    pub bus_monitoring: bool,
    /// Retransmit frames that lost arbitration or were disturbed by errors
    pub automatic_retransmission: bool,
    /// Bit timing parameters for everything except the data phase of bit rate
    /// switched FD frames.
    pub nominal_timing: BitTiming,
    /// Timestamp configuration
    pub timestamp: Timestamp,
    /// RX FIFO 0
    pub rx_fifo_0: RxFifoConfig,
    /// RX FIFO 1
    pub rx_fifo_1: RxFifoConfig,
    /// Tx configuration
    pub tx: TxConfig,
    /// Handling of frames no filter element matched
    pub global_filter: GlobalFilter,
    /// Kernel clock divider shared by all instances, 1 or an even value up
    /// to 30. Only the instance holding `CKDIV` programs it; the others use
    /// it to derive their time quanta and must be given the same value.
    pub clock_divider: u8,
}

impl CanConfig {
    /// Create an instance
    ///
    /// Nominal bitrate value must be provided, all other settings come
    /// pre-populated with default values.
    pub fn new(bitrate: HertzU32) -> Self {
        Self {
            mode: Default::default(),
            loopback: false,
            bus_monitoring: false,
            automatic_retransmission: true,
            nominal_timing: BitTiming::new(bitrate),
            timestamp: Default::default(),
            rx_fifo_0: Default::default(),
            rx_fifo_1: Default::default(),
            tx: Default::default(),
            global_filter: Default::default(),
            clock_divider: 1,
        }
    }

    /// `CKDIV.PDIV` encoding of [`Self::clock_divider`]
    pub(crate) fn pdiv(&self) -> Option<u8> {
        match self.clock_divider {
            1 => Some(0),
            d @ 2..=30 if d % 2 == 0 => Some(d / 2),
            _ => None,
        }
    }
}

/// Denotes a TX related configuration
#[derive(Default, Copy, Clone, Debug)]
pub struct TxConfig {
    /// TX queue submode
    pub tx_queue_submode: TxQueueMode,
}

/// Bit-timing parameters
///
/// The bit time is determined by
/// - the time quantum `t_q`, which is a fraction of the peripheral clock
/// - the number of time quanta in a bit time, determined by `phase_seg_1` and
///   `phase_seg_2`
///
/// The fields hold *real* values; the register encodings (value minus one)
/// are handled when the configuration is applied.
///
/// Default values are:
/// - sjw: 0x4
/// - phase_seg_1: 0xB
/// - phase_seg_2: 0x4
///
/// Default time quanta in a bit time is 16 (phase_seg_1 + phase_seg_2 +
/// synchronization segment (1)).
///
/// A timing computed by [`crate::can::bit_timing::calculate`] converts with
/// `From`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BitTiming {
    /// Synchronization jump width
    pub sjw: u8,
    /// Propagation time and phase time before sample point
    pub phase_seg_1: u16,
    /// Time after sample point
    pub phase_seg_2: u8,
    /// The bitrate of the bus. The kernel clock must be divisible into time
    /// quanta such that the bit time determined by `phase_seg_1` and
    /// `phase_seg_2` is a whole number of time quanta.
    pub bitrate: HertzU32,
}

impl BitTiming {
    /// Create an instance
    ///
    /// Nominal bitrate value must be provided, all other settings come
    /// pre-populated with default values.
    pub fn new(bitrate: HertzU32) -> Self {
        Self {
            sjw: 0x4,
            phase_seg_1: 0xB,
            phase_seg_2: 0x4,
            bitrate,
        }
    }
}

impl From<Timing> for BitTiming {
    /// Out of range segment lengths saturate and are reported when the
    /// configuration is applied.
    fn from(t: Timing) -> Self {
        Self {
            sjw: u8::try_from(t.sjw).unwrap_or(u8::MAX),
            phase_seg_1: u16::try_from(t.tseg1()).unwrap_or(u16::MAX),
            phase_seg_2: u8::try_from(t.phase_seg2).unwrap_or(u8::MAX),
            bitrate: HertzU32::from_raw(t.bitrate),
        }
    }
}

/// Counting mode of the timestamp counter
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeStampSelect {
    /// Counter value always 0
    #[default]
    Zero = 0,
    /// Counter incremented according to the prescaler
    Increment = 1,
    /// External counter (TIM3) is used
    External = 2,
}

/// Timestamp counter configuration
#[derive(Copy, Clone, Debug)]
pub struct Timestamp {
    /// Counting mode of time stamp timer
    pub select: TimeStampSelect,
    /// Time stamp timer prescaler, bit times per tick
    /// Valid values are: 1 <= ts_prescale <= 16
    pub prescaler: u8,
}

impl Default for Timestamp {
    fn default() -> Self {
        Self {
            select: TimeStampSelect::Zero,
            prescaler: 1,
        }
    }
}

/// Misconfigurations of [`BitTiming`].
#[derive(Debug, Clone, PartialEq)]
pub enum BitTimingError {
    /// SJW is outside the wrapped `RangeInclusive`
    SynchronizationJumpWidthOutOfRange(RangeInclusive<u32>),
    /// Phase segment 1 is outside the wrapped `RangeInclusive`
    PhaseSeg1OutOfRange(RangeInclusive<u32>),
    /// Phase segment 2 is outside the wrapped `RangeInclusive`
    PhaseSeg2OutOfRange(RangeInclusive<u32>),
    /// Total bit time quanta is outside the wrapped `RangeInclusive`
    BitTimeOutOfRange(RangeInclusive<u32>),
    /// Prescaler is outside the wrapped `RangeInclusive`
    PrescalerOutOfRange(RangeInclusive<u32>),
    /// No valid prescaler could be found
    ///
    /// The following requirement must be met:
    /// - `can_clock` must be divisible by `bitrate * bit_time_quanta`
    NoValidPrescaler {
        /// Kernel clock after the clock divider
        can_clock: HertzU32,
        /// Bitrate requested in [`BitTiming`]
        bitrate: HertzU32,
        /// Time quanta per bit selected by [`BitTiming`]
        bit_time_quanta: u32,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for BitTimingError {
    fn format(&self, f: defmt::Formatter) {
        let (name, range) = match self {
            Self::SynchronizationJumpWidthOutOfRange(r) => ("SynchronizationJumpWidth", r),
            Self::PhaseSeg1OutOfRange(r) => ("PhaseSeg1", r),
            Self::PhaseSeg2OutOfRange(r) => ("PhaseSeg2", r),
            Self::BitTimeOutOfRange(r) => ("BitTime", r),
            Self::PrescalerOutOfRange(r) => ("Prescaler", r),
            Self::NoValidPrescaler {
                can_clock,
                bitrate,
                bit_time_quanta,
            } => {
                return defmt::write!(
                    f,
                    "NoValidPrescaler(can_clock: {} Hz, bitrate: {} Hz, bit_time_quanta: {})",
                    can_clock.raw(),
                    bitrate.raw(),
                    bit_time_quanta
                )
            }
        };
        defmt::write!(f, "{=str}OutOfRange({}..={})", name, range.start(), range.end())
    }
}

/// Valid values of a BitTiming struct
#[derive(Clone)]
pub(crate) struct BitTimingRanges {
    sjw: RangeInclusive<u32>,
    phase_seg_1: RangeInclusive<u32>,
    phase_seg_2: RangeInclusive<u32>,
    /// The bit time, in time quanta
    time_quanta_per_bit: RangeInclusive<u32>,
    prescaler: RangeInclusive<u32>,
}

pub(crate) const NOMINAL_BIT_TIMING_RANGES: BitTimingRanges = BitTimingRanges {
    sjw: 1..=128,
    phase_seg_1: 2..=256,
    phase_seg_2: 2..=128,
    time_quanta_per_bit: 5..=385,
    prescaler: 1..=512,
};

pub(crate) const DATA_BIT_TIMING_RANGES: BitTimingRanges = BitTimingRanges {
    sjw: 1..=16,
    phase_seg_1: 1..=32,
    phase_seg_2: 1..=16,
    time_quanta_per_bit: 3..=49,
    prescaler: 1..=32,
};

impl BitTiming {
    /// Returns the number of time quanta that make up one bit time, `t_bit /
    /// t_q`
    pub fn time_quanta_per_bit(&self) -> u32 {
        1 + u32::from(self.phase_seg_1) + u32::from(self.phase_seg_2)
    }

    fn check(&self, valid: &BitTimingRanges) -> Result<(), BitTimingError> {
        if !valid.sjw.contains(&self.sjw.into()) {
            Err(BitTimingError::SynchronizationJumpWidthOutOfRange(
                valid.sjw.clone(),
            ))
        } else if !valid.phase_seg_1.contains(&self.phase_seg_1.into()) {
            Err(BitTimingError::PhaseSeg1OutOfRange(
                valid.phase_seg_1.clone(),
            ))
        } else if !valid.phase_seg_2.contains(&self.phase_seg_2.into()) {
            Err(BitTimingError::PhaseSeg2OutOfRange(
                valid.phase_seg_2.clone(),
            ))
        } else if !valid
            .time_quanta_per_bit
            .contains(&self.time_quanta_per_bit())
        {
            Err(BitTimingError::BitTimeOutOfRange(
                valid.time_quanta_per_bit.clone(),
            ))
        } else {
            Ok(())
        }
    }

    pub(crate) fn prescaler(
        &self,
        f_can: HertzU32,
        valid: &BitTimingRanges,
    ) -> Result<u16, BitTimingError> {
        self.check(valid)?;
        let f_out = self.bitrate;
        let bit_time_quanta = self.time_quanta_per_bit();
        let f_q = f_out.raw().saturating_mul(bit_time_quanta);
        match f_can.raw().checked_rem(f_q) {
            Some(0) => {
                let prescaler = f_can.raw() / f_q;
                if valid.prescaler.contains(&prescaler) {
                    Ok(prescaler as u16)
                } else {
                    Err(BitTimingError::PrescalerOutOfRange(valid.prescaler.clone()))
                }
            }
            _ => Err(BitTimingError::NoValidPrescaler {
                can_clock: f_can,
                bitrate: f_out,
                bit_time_quanta,
            }),
        }
    }
}

/// Enable/disable CAN-FD and related features
#[derive(Default, Copy, Clone, Debug)]
pub enum Mode {
    /// Classic mode with 8-bytes data. Reception of an FD frame is considered
    /// an error.
    #[default]
    Classic,
    /// Transmission and reception of CAN FD frames (with up to 64 bytes of
    /// data) is enabled. This does not prevent use of classic CAN frames.
    Fd {
        /// If `true`, FD frames can be transmitted with bit rate switching.
        ///
        /// Regardless of this setting, data phase timing still must be
        /// configured as *reception* of bit-rate-switched messages is still
        /// possible.
        allow_bit_rate_switching: bool,
        /// Bit timing parameters for the data phase of bit rate switched FD
        /// frames.
        data_phase_timing: BitTiming,
        /// Enables transmitter delay compensation, needed for data bit rates
        /// where the transceiver loop delay exceeds the sample point. The
        /// secondary sample point is placed at the data phase sample point.
        transceiver_delay_compensation: bool,
    },
}

/// Denotes a RX FIFO configuration
#[derive(Default, Copy, Clone, Debug)]
pub struct RxFifoConfig {
    /// FIFO mode
    pub mode: RxFifoMode,
}

/// Mode of operation for the RX FIFO
#[derive(Default, Copy, Clone, Debug)]
pub struct RxFifoMode(RxFifoModeVariant);

impl RxFifoMode {
    /// Blocking mode
    ///
    /// When the RX FIFO is full, incoming messages are dropped until at least
    /// one message has been read out from the FIFO.
    pub fn blocking() -> Self {
        Self(RxFifoModeVariant::Blocking)
    }

    /// Overwriting mode
    ///
    /// When the RX FIFO is full, the oldest message will be deleted and a new
    /// message will take its place.
    ///
    /// # Safety
    /// The peripheral provides no synchronization that guarantees the
    /// integrity of an element being read while it is overwritten. The
    /// oldest element should not be read while the FIFO is full; it is up
    /// to the application to keep up with the bus.
    pub unsafe fn overwrite() -> Self {
        Self(RxFifoModeVariant::Overwrite)
    }
}

/// Mode of operation for the RX FIFO (inner enum)
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
pub enum RxFifoModeVariant {
    /// Blocking mode
    ///
    /// More details at [`RxFifoMode::blocking`]
    #[default]
    Blocking,
    /// Overwriting mode
    ///
    /// More details at [`RxFifoMode::overwrite`]
    Overwrite,
}

impl From<RxFifoMode> for bool {
    fn from(val: RxFifoMode) -> Self {
        match val.0 {
            RxFifoModeVariant::Overwrite => true,
            RxFifoModeVariant::Blocking => false,
        }
    }
}

impl From<RxFifoMode> for RxFifoModeVariant {
    fn from(val: RxFifoMode) -> Self {
        val.0
    }
}

/// Mode of operation for the transmit queue
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxQueueMode {
    /// Messages are sent according to the order they are enqueued
    #[default]
    Fifo,
    /// Messages are sent according to their priority
    ///
    /// Lower ID means higher priority. Messages of the same ID are sent in an
    /// arbitrary order. This is the same order as arbitration on the bus would
    /// give.
    Priority,
}

impl From<TxQueueMode> for bool {
    fn from(val: TxQueueMode) -> Self {
        match val {
            TxQueueMode::Priority => true,
            TxQueueMode::Fifo => false,
        }
    }
}

/// Destination of frames that matched no filter element
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NonMatchingAction {
    /// Store in RX FIFO 0
    Fifo0 = 0,
    /// Store in RX FIFO 1
    Fifo1 = 1,
    /// Discard
    #[default]
    Reject = 2,
}

/// Global filter settings (`RXGFC`)
#[derive(Default, Copy, Clone, Debug)]
pub struct GlobalFilter {
    /// Non-matching frames with standard IDs
    pub non_matching_standard: NonMatchingAction,
    /// Non-matching frames with extended IDs
    pub non_matching_extended: NonMatchingAction,
    /// Reject all remote frames with standard IDs
    pub reject_remote_standard: bool,
    /// Reject all remote frames with extended IDs
    pub reject_remote_extended: bool,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::can::bit_timing::{calculate, Limits};

    #[cfg(feature = "defmt")]
    #[test]
    fn bit_timing_error_is_loggable() {
        fn loggable<T: defmt::Format>() {}
        loggable::<BitTimingError>();
        loggable::<crate::fdcan::bus::ConfigurationError>();
    }

    #[test]
    fn prescaler_requires_exact_division() {
        let timing = BitTiming::new(HertzU32::kHz(500));
        assert_eq!(timing.time_quanta_per_bit(), 16);
        assert_eq!(
            timing.prescaler(HertzU32::MHz(40), &NOMINAL_BIT_TIMING_RANGES),
            Ok(5)
        );
        assert_eq!(
            timing.prescaler(HertzU32::MHz(25), &NOMINAL_BIT_TIMING_RANGES),
            Err(BitTimingError::NoValidPrescaler {
                can_clock: HertzU32::MHz(25),
                bitrate: HertzU32::kHz(500),
                bit_time_quanta: 16,
            })
        );
    }

    #[test]
    fn ranges_are_checked() {
        let mut timing = BitTiming::new(HertzU32::MHz(1));
        timing.sjw = 17;
        assert!(matches!(
            timing.prescaler(HertzU32::MHz(16), &DATA_BIT_TIMING_RANGES),
            Err(BitTimingError::SynchronizationJumpWidthOutOfRange(_))
        ));
        assert!(timing
            .prescaler(HertzU32::MHz(16), &NOMINAL_BIT_TIMING_RANGES)
            .is_ok());
        let slow = BitTiming::new(HertzU32::Hz(1000));
        assert!(matches!(
            slow.prescaler(HertzU32::MHz(16), &DATA_BIT_TIMING_RANGES),
            Err(BitTimingError::PrescalerOutOfRange(_))
        ));
    }

    #[test]
    fn calculated_timing_converts() {
        let t = calculate(
            HertzU32::kHz(500),
            875,
            1,
            HertzU32::MHz(40),
            &Limits::FDCAN_NOMINAL,
        )
        .unwrap();
        let timing = BitTiming::from(t);
        assert_eq!(timing.time_quanta_per_bit(), t.time_quanta());
        assert_eq!(
            timing.prescaler(HertzU32::MHz(40), &NOMINAL_BIT_TIMING_RANGES),
            Ok(t.brp as u16)
        );
    }

    #[test]
    fn clock_divider_encoding() {
        let mut config = CanConfig::new(HertzU32::kHz(500));
        assert_eq!(config.pdiv(), Some(0));
        config.clock_divider = 30;
        assert_eq!(config.pdiv(), Some(15));
        config.clock_divider = 3;
        assert_eq!(config.pdiv(), None);
        config.clock_divider = 32;
        assert_eq!(config.pdiv(), None);
    }
}
