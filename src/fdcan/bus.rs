//! Bus level state and the configuration life cycle

use super::config::{
    BitTimingError, CanConfig, Mode, DATA_BIT_TIMING_RANGES, NOMINAL_BIT_TIMING_RANGES,
};
use super::filter::{FiltersExtended, FiltersStandard};
use super::interrupt::InterruptConfiguration;
use super::messageram::MessageRam;
use super::rx_fifo::{Fifo0, Fifo1, RxFifo};
use super::tx_buffers::Tx;
use super::tx_event_fifo::TxEventFifo;
use crate::poll::{self, Timeout};
use crate::reg::fdcan::{Ecr, Psr, RegisterBlock, TXBC_TFQM};
use core::fmt::{self, Debug};
use core::marker::PhantomData;
use defmt_or_log::{debug, trace, warn};
use fugit::HertzU32;
use opencm3_core::{Dependencies, FdcanId};

/// Printable PSR field
#[derive(Copy, Clone)]
pub struct ProtocolStatus(pub Psr);

impl From<Psr> for ProtocolStatus {
    fn from(value: Psr) -> Self {
        Self(value)
    }
}

impl Debug for ProtocolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let psr = &self.0;

        f.debug_struct("ProtocolStatus")
            .field("tdcv", &psr.tdcv())
            .field("pxe", &psr.pxe())
            .field("redl", &psr.redl())
            .field("rbrs", &psr.rbrs())
            .field("resi", &psr.resi())
            .field("dlec", &psr.dlec())
            .field("bo", &psr.bo())
            .field("ew", &psr.ew())
            .field("ep", &psr.ep())
            .field("act", &psr.act())
            .field("lec", &psr.lec())
            .finish()
    }
}

/// Printable ECR field
#[derive(Copy, Clone)]
pub struct ErrorCounters(pub Ecr);

impl From<Ecr> for ErrorCounters {
    fn from(value: Ecr) -> Self {
        Self(value)
    }
}

impl Debug for ErrorCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ecr = &self.0;

        f.debug_struct("ErrorCounters")
            .field("cel", &ecr.cel())
            .field("rec", &ecr.rec())
            .field("rp", &ecr.rp())
            .field("tec", &ecr.tec())
            .finish()
    }
}

/// Errors that may occur during configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigurationError {
    /// Problems with the bit timing configuration
    BitTiming(BitTimingError),
    /// Time stamp prescaler value is not in the range [1, 16]
    InvalidTimeStampPrescaler,
    /// Clock divider is neither 1 nor an even value up to 30
    InvalidClockDivider,
    /// The controller did not leave initialization mode
    Timeout(Timeout),
}

impl From<BitTimingError> for ConfigurationError {
    fn from(value: BitTimingError) -> Self {
        Self::BitTiming(value)
    }
}

impl From<Timeout> for ConfigurationError {
    fn from(value: Timeout) -> Self {
        Self::Timeout(value)
    }
}

/// Index is out of bounds
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfBounds;

/// Common CAN bus functionality
pub trait CanBus {
    /// Read error counters
    fn error_counters(&self) -> ErrorCounters;
    /// Read additional status information
    fn protocol_status(&self) -> ProtocolStatus;
    /// Get current time
    fn ts_count(&self) -> u16;
}

/// A CAN bus that is not in configuration mode (CCE=0). Some errors (including
/// Bus_Off) can asynchronously stop bus operation (INIT=1), which will require
/// user intervention to reactivate the bus to resume sending and receiving
/// messages.
pub struct Fdcan<Id, D> {
    /// Controls enabling and line selection of interrupts.
    pub interrupts: InterruptConfiguration<Id>,
    /// Receive FIFO 0
    pub rx_fifo_0: RxFifo<Fifo0, Id>,
    /// Receive FIFO 1
    pub rx_fifo_1: RxFifo<Fifo1, Id>,
    /// Transmit buffers
    pub tx: Tx<Id>,
    /// Events of transmitted messages
    pub tx_event_fifo: TxEventFifo<Id>,

    /// Implementation details. The field is public to allow destructuring.
    pub internals: Internals<Id, D>,
}

/// Implementation details.
pub struct Internals<Id, D> {
    dependencies: D,
    config: CanConfig,
    filters_standard: FiltersStandard<Id>,
    filters_extended: FiltersExtended<Id>,
    _id: PhantomData<Id>,
}

impl<Id: FdcanId, D: Dependencies<Id>> Internals<Id, D> {
    fn regs(&self) -> &RegisterBlock {
        // Safety: `dependencies` proves ownership of the register block.
        unsafe { crate::reg::block::<Id, RegisterBlock>() }
    }

    /// Switches between "Software Initialization" mode and "Normal Operation".
    /// In Software Initialization, messages are not received or transmitted.
    /// In Normal Operation, messages can be transmitted and received, but
    /// the configuration cannot be changed.
    pub fn set_init(&mut self, init: bool) -> Result<(), Timeout> {
        let cccr = &self.regs().cccr;
        if cccr.read().init() == init {
            return Ok(());
        }
        cccr.modify(|_, w| w.set_init(init));
        poll::until(|| cccr.read().init() == init)
    }

    fn enable_cce(&mut self) -> Result<(), Timeout> {
        let cccr = &self.regs().cccr;
        cccr.modify(|_, w| w.set_cce(true));
        poll::until(|| cccr.read().cce())
    }

    /// Kernel clock after the shared clock divider
    fn can_clock(&self) -> HertzU32 {
        let divider = u32::from(self.config.clock_divider.max(1));
        self.dependencies.peripheral_clock() / divider
    }
}

/// A CAN bus in configuration mode. Before messages can be sent and received,
/// it needs to be [`Self::finalize`]d.
pub struct FdcanConfigurable<Id, D>(
    /// The type invariant of CCE=0 is broken while this is wrapped.
    Fdcan<Id, D>,
);

impl<Id: FdcanId, D: Dependencies<Id>> FdcanConfigurable<Id, D> {
    /// Raw access to the registers.
    ///
    /// # Safety
    /// The abstraction assumes that it has exclusive ownership of the
    /// registers. Direct access can break such assumptions.
    pub unsafe fn registers(&self) -> &RegisterBlock {
        self.0.registers()
    }

    /// Allows reconfiguring the acceptance filters for standard IDs.
    pub fn filters_standard(&mut self) -> &mut FiltersStandard<Id> {
        &mut self.0.internals.filters_standard
    }

    /// Allows reconfiguring the acceptance filters for extended IDs.
    pub fn filters_extended(&mut self) -> &mut FiltersExtended<Id> {
        &mut self.0.internals.filters_extended
    }

    /// Allows reconfiguring interrupts.
    pub fn interrupts(&mut self) -> &mut InterruptConfiguration<Id> {
        &mut self.0.interrupts
    }

    /// Allows reconfiguring the bus parameters applied by [`Self::finalize`].
    pub fn config(&mut self) -> &mut CanConfig {
        &mut self.0.internals.config
    }

    /// Apply parameters from a bus config struct
    fn apply_bus_config(&mut self) -> Result<(), ConfigurationError> {
        let internals = &self.0.internals;
        let can = internals.regs();
        let config = &internals.config;
        if !(1..=16).contains(&config.timestamp.prescaler) {
            return Err(ConfigurationError::InvalidTimeStampPrescaler);
        }
        let pdiv = config
            .pdiv()
            .ok_or(ConfigurationError::InvalidClockDivider)?;
        let can_clock = internals.can_clock();

        let nominal = config.nominal_timing;
        let nominal_prescaler = nominal.prescaler(can_clock, &NOMINAL_BIT_TIMING_RANGES)?;
        can.nbtp.write(|w| {
            w.set_nsjw(nominal.sjw - 1);
            w.set_ntseg1((nominal.phase_seg_1 - 1) as u8);
            w.set_ntseg2(nominal.phase_seg_2 - 1);
            w.set_nbrp(nominal_prescaler - 1);
        });

        match config.mode {
            Mode::Classic => can.cccr.modify(|_, w| {
                w.set_fdoe(false);
                w.set_brse(false);
            }),
            Mode::Fd {
                allow_bit_rate_switching,
                data_phase_timing: data,
                transceiver_delay_compensation,
            } => {
                let data_prescaler = data.prescaler(can_clock, &DATA_BIT_TIMING_RANGES)?;
                can.cccr.modify(|_, w| {
                    w.set_fdoe(true);
                    w.set_brse(allow_bit_rate_switching);
                });
                can.dbtp.write(|w| {
                    w.set_dsjw(data.sjw - 1);
                    w.set_dtseg1((data.phase_seg_1 - 1) as u8);
                    w.set_dtseg2(data.phase_seg_2 - 1);
                    w.set_dbrp((data_prescaler - 1) as u8);
                    w.set_tdc(transceiver_delay_compensation);
                });
                if transceiver_delay_compensation {
                    // Offset in kernel clock periods up to the sample point.
                    let offset = data_prescaler * (1 + data.phase_seg_1);
                    can.tdcr.write(|w| w.set_tdco(offset.min(0x7f) as u8));
                }
            }
        }

        // Test mode has to be enabled for loop back, TEST is reset by
        // hardware when it is disabled.
        can.cccr.modify(|_, w| {
            w.set_test(config.loopback);
            w.set_mon(config.bus_monitoring);
            w.set_dar(!config.automatic_retransmission);
        });
        can.test.modify(|_, w| w.set_lbck(config.loopback));

        can.txbc.modify(|r, w| {
            *w = if config.tx.tx_queue_submode.into() {
                r | TXBC_TFQM
            } else {
                r & !TXBC_TFQM
            }
        });

        let filters_standard = internals.filters_standard.len() as u8;
        let filters_extended = internals.filters_extended.len() as u8;
        can.rxgfc.write(|w| {
            w.set_f0om(config.rx_fifo_0.mode.into());
            w.set_f1om(config.rx_fifo_1.mode.into());
            w.set_anfs(config.global_filter.non_matching_standard as u8);
            w.set_anfe(config.global_filter.non_matching_extended as u8);
            w.set_rrfs(config.global_filter.reject_remote_standard);
            w.set_rrfe(config.global_filter.reject_remote_extended);
            w.set_lss(filters_standard);
            w.set_lse(filters_extended);
        });

        can.tscc.write(|w| {
            w.set_tss(config.timestamp.select as u8);
            // Prescaler is 1 + tcp value.
            w.set_tcp(config.timestamp.prescaler - 1);
        });

        if Id::CLOCK_DIVIDER {
            can.ckdiv.write(|w| *w = u32::from(pdiv));
        }

        trace!(
            "fdcan: nominal prescaler {}, {} standard and {} extended filters",
            nominal_prescaler,
            filters_standard,
            filters_extended
        );
        Ok(())
    }

    /// Create new can peripheral.
    ///
    /// Requests initialization mode, enables configuration changes and
    /// zeroes the message RAM of the instance. Fails if the controller does
    /// not acknowledge, usually because its kernel clock is not running.
    ///
    /// The returned peripheral is not operational; use [`Self::finalize`] to
    /// finish configuration and start transmitting and receiving.
    pub fn new(bitrate: HertzU32, dependencies: D) -> Result<Self, Timeout> {
        // Safety: `dependencies` implies ownership of the instance and with
        // it of its message RAM section.
        let MessageRam {
            filters_standard,
            filters_extended,
            rx_fifo_0,
            rx_fifo_1,
            tx_event_fifo,
            tx_buffers,
        } = unsafe { MessageRam::take::<Id>() };

        let can = Fdcan {
            // Safety: `Dependencies` is a singleton, so the components are
            // constructed once. The registers delegated to them are not
            // touched by any other code.
            interrupts: unsafe { InterruptConfiguration::new() },
            rx_fifo_0: unsafe { RxFifo::new(rx_fifo_0) },
            rx_fifo_1: unsafe { RxFifo::new(rx_fifo_1) },
            tx: unsafe { Tx::new(tx_buffers) },
            tx_event_fifo: unsafe { TxEventFifo::new(tx_event_fifo) },
            internals: Internals {
                dependencies,
                config: CanConfig::new(bitrate),
                // Safety: The memory is zeroed by `take`, so all filters are
                // initially disabled.
                filters_standard: unsafe { FiltersStandard::new(filters_standard) },
                filters_extended: unsafe { FiltersExtended::new(filters_extended) },
                _id: PhantomData,
            },
        };
        debug!("fdcan: entering configuration mode");
        can.configure()
    }

    /// Locks the configuration and enters normal operation.
    pub fn finalize(mut self) -> Result<Fdcan<Id, D>, ConfigurationError> {
        self.apply_bus_config()?;

        let mut can = self.0;
        // Enter normal operation (CCE is cleared by hardware)
        if let Err(e) = can.internals.set_init(false) {
            warn!("fdcan: controller did not leave initialization mode");
            return Err(e.into());
        }
        debug!("fdcan: normal operation");
        Ok(can)
    }

    /// Returns the dependencies, leaving the controller in initialization
    /// mode.
    pub fn release(self) -> D {
        self.0.internals.dependencies
    }
}

impl<Id: FdcanId, D: Dependencies<Id>> Fdcan<Id, D> {
    /// Raw access to the registers.
    ///
    /// # Safety
    /// The abstraction assumes that it has exclusive ownership of the
    /// registers. Direct access can break such assumptions.
    pub unsafe fn registers(&self) -> &RegisterBlock {
        crate::reg::block::<Id, RegisterBlock>()
    }

    /// Returns to configuration mode. Pending transmissions are aborted.
    pub fn configure(mut self) -> Result<FdcanConfigurable<Id, D>, Timeout> {
        self.internals.set_init(true)?;
        self.internals.enable_cce()?;
        Ok(FdcanConfigurable(self))
    }
}

impl<Id: FdcanId, D: Dependencies<Id>> CanBus for Fdcan<Id, D> {
    fn error_counters(&self) -> ErrorCounters {
        self.internals.regs().ecr.read().into()
    }

    fn protocol_status(&self) -> ProtocolStatus {
        self.internals.regs().psr.read().into()
    }

    fn ts_count(&self) -> u16 {
        self.internals.regs().tscv.read() as u16
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fdcan::config::{NonMatchingAction, RxFifoMode, TxQueueMode};
    use crate::fdcan::filter::{Action, Filter};
    use crate::fdcan::message::{tx, Raw};
    use crate::fdcan::messageram::SIZE;
    use crate::testing::{fake_peripheral, FixedClock};
    use embedded_can::StandardId;

    macro_rules! fdcan {
        ($can:ident, $ram:ident, $owner:expr) => {
            fake_peripheral!($can, 0x104 / 4 + 1);
            fake_peripheral!($ram, SIZE / 4);
            unsafe impl FdcanId for $can {
                const CLOCK_DIVIDER: bool = $owner;
                fn message_ram() -> *const () {
                    $ram::block().as_ptr()
                }
            }
        };
    }

    #[test]
    fn new_enters_configuration_mode_and_clears_ram() {
        fdcan!(Can, Ram, false);
        Ram::block().set_word(0x278, 0xdead_beef);
        let can = FdcanConfigurable::<Can, _>::new(HertzU32::kHz(500), FixedClock(HertzU32::MHz(40)))
            .unwrap();
        assert_eq!(Can::block().word(0x18), 0b11);
        assert_eq!(Ram::block().word(0x278), 0);
        let _ = can.release();
    }

    #[test]
    fn finalize_programs_classic_bus() {
        fdcan!(Can, Ram, true);
        let mut can =
            FdcanConfigurable::<Can, _>::new(HertzU32::kHz(500), FixedClock(HertzU32::MHz(32)))
                .unwrap();
        let filter = Filter::Classic {
            action: Action::StoreFifo1,
            filter: StandardId::new(0x100).unwrap(),
            mask: StandardId::new(0x700).unwrap(),
        };
        can.filters_standard().push(filter).unwrap();
        let config = can.config();
        config.automatic_retransmission = false;
        config.tx.tx_queue_submode = TxQueueMode::Priority;
        config.rx_fifo_1.mode = unsafe { RxFifoMode::overwrite() };
        config.global_filter.non_matching_extended = NonMatchingAction::Fifo0;
        config.timestamp.prescaler = 4;
        config.clock_divider = 2;

        let _can = can.finalize().unwrap();
        let block = Can::block();
        // 16 MHz / (500 kHz * 16): prescaler 2, sjw 4, tseg1 11, tseg2 4.
        assert_eq!(block.word(0x1c), 3 << 25 | 1 << 16 | 10 << 8 | 3);
        // INIT cleared, CCE left set in the fake, DAR set.
        assert_eq!(block.word(0x18), 1 << 6 | 1 << 1);
        assert_eq!(block.word(0xc8), TXBC_TFQM);
        assert_eq!(block.word(0x80), 1 << 16 | 1 << 8 | 2 << 4);
        assert_eq!(block.word(0x20), 3 << 16);
        assert_eq!(block.word(0x100), 1);
        assert_eq!(Ram::block().word(0), 2 << 30 | 2 << 27 | 0x100 << 16 | 0x700);
    }

    #[test]
    fn finalize_programs_fd_data_phase() {
        fdcan!(Can, Ram, false);
        let mut can =
            FdcanConfigurable::<Can, _>::new(HertzU32::kHz(500), FixedClock(HertzU32::MHz(80)))
                .unwrap();
        let mut data_phase_timing = crate::fdcan::config::BitTiming::new(HertzU32::MHz(2));
        data_phase_timing.sjw = 2;
        data_phase_timing.phase_seg_1 = 14;
        data_phase_timing.phase_seg_2 = 5;
        can.config().mode = Mode::Fd {
            allow_bit_rate_switching: true,
            data_phase_timing,
            transceiver_delay_compensation: true,
        };
        can.config().loopback = true;
        can.config().clock_divider = 2;

        let can = can.finalize().unwrap();
        let block = Can::block();
        // 80 MHz / 2 / (2 MHz * 20): prescaler 1.
        assert_eq!(block.word(0x0c), 1 << 23 | 13 << 8 | 4 << 4 | 1);
        assert_eq!(block.word(0x48), 15 << 8);
        assert_eq!(block.word(0x18) & 0x3c1, 1 << 9 | 1 << 8 | 1 << 7);
        assert_eq!(block.word(0x10), 1 << 4);
        // Not the divider owner.
        assert_eq!(block.word(0x100), 0);
        assert_eq!(can.ts_count(), 0);
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        fdcan!(Can, Ram, false);
        let mut can =
            FdcanConfigurable::<Can, _>::new(HertzU32::kHz(500), FixedClock(HertzU32::MHz(25)))
                .unwrap();
        can.config().timestamp.prescaler = 17;
        let err = can.finalize().err().unwrap();
        assert_eq!(err, ConfigurationError::InvalidTimeStampPrescaler);

        let mut can =
            FdcanConfigurable::<Can, _>::new(HertzU32::kHz(500), FixedClock(HertzU32::MHz(25)))
                .unwrap();
        can.config().clock_divider = 5;
        let err = can.finalize().err().unwrap();
        assert_eq!(err, ConfigurationError::InvalidClockDivider);

        let can =
            FdcanConfigurable::<Can, _>::new(HertzU32::kHz(500), FixedClock(HertzU32::MHz(25)))
                .unwrap();
        assert!(matches!(
            can.finalize().err().unwrap(),
            ConfigurationError::BitTiming(BitTimingError::NoValidPrescaler { .. })
        ));
    }

    #[test]
    fn transmit_after_reconfiguration() {
        fdcan!(Can, Ram, false);
        let can =
            FdcanConfigurable::<Can, _>::new(HertzU32::kHz(500), FixedClock(HertzU32::MHz(40)))
                .unwrap();
        let can = can.finalize().unwrap();
        let mut can = can.configure().unwrap().finalize().unwrap();

        let message = tx::MessageBuilder {
            id: StandardId::new(0x42).unwrap().into(),
            frame_type: tx::FrameType::Classic(tx::ClassicFrameType::Data(&[1, 2, 3, 4])),
            store_tx_event: Some(9),
        }
        .build()
        .unwrap();
        can.tx.transmit_queued(message).unwrap();
        assert_eq!(Can::block().word(0xd4), 1);
        assert_eq!(Ram::block().word(0x278), 0x42 << 18);
        assert_eq!(Ram::block().word(0x27c), 9 << 24 | 1 << 23 | 4 << 16);
        assert_eq!(Ram::block().word(0x280), u32::from_le_bytes([1, 2, 3, 4]));
        assert_eq!(message.decoded_dlc(), 4);
    }
}
