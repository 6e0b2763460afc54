//! Analog to digital converter, STM32F1
//!
//! [`Adc`] drives one 12-bit successive approximation converter with its
//! regular group (up to 16 channels, results in DR) and injected group (up
//! to 4 channels, results in JDR1..4).
//!
//! ```no_run
//! # use opencm3::adc::{Adc, SampleTime};
//! # fn example<D: opencm3::core::Dependencies<opencm3::stm32f1::ADC1>>(dependencies: D) -> Result<(), opencm3::adc::Error> {
//! let mut adc = Adc::<opencm3::stm32f1::ADC1, _>::new(dependencies);
//! adc.power_on();
//! adc.reset_calibration()?;
//! adc.calibrate()?;
//! adc.set_sample_time_on_all_channels(SampleTime::Cycles28_5);
//! adc.set_regular_sequence(&[0, 3, 16])?;
//! adc.enable_scan_mode();
//! # Ok(())
//! # }
//! ```

mod oneshot;

pub use oneshot::AdcChannel;

use crate::poll::{self, Timeout};
use crate::reg::adc::{sr, RegisterBlock, JSQR_JL_SHIFT, SMP_WIDTH, SQ_WIDTH, SQR1_L_SHIFT};
use crate::reg::RegisterValue as _;
use core::marker::PhantomData;
use defmt_or_log::{trace, warn};
use fugit::HertzU32;
use opencm3_core::{AdcId, Dependencies};

/// Highest channel number. 16 is the temperature sensor, 17 VREFINT.
pub const MAX_CHANNEL: u8 = 17;
/// Length limit of the regular sequence
pub const REGULAR_SEQUENCE_MAX: usize = 16;
/// Length limit of the injected sequence
pub const INJECTED_SEQUENCE_MAX: usize = 4;

/// Errors reported by the ADC driver
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Channel number above [`MAX_CHANNEL`]
    InvalidChannel(u8),
    /// Sequence is empty or longer than the group allows
    InvalidSequenceLength(usize),
    /// Discontinuous bursts are 1 to 8 channels long
    InvalidDiscontinuousLength(u8),
    /// Dual mode is only configured on the master converter
    NotMaster,
    /// The converter has no DMA request line
    NoDma,
    /// Calibration or conversion start did not complete
    Timeout(Timeout),
}

impl From<Timeout> for Error {
    fn from(value: Timeout) -> Self {
        Self::Timeout(value)
    }
}

/// Sampling time of a channel in ADC clock cycles
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleTime {
    /// 1.5 cycles
    #[default]
    Cycles1_5 = 0,
    /// 7.5 cycles
    Cycles7_5 = 1,
    /// 13.5 cycles
    Cycles13_5 = 2,
    /// 28.5 cycles
    Cycles28_5 = 3,
    /// 41.5 cycles
    Cycles41_5 = 4,
    /// 55.5 cycles
    Cycles55_5 = 5,
    /// 71.5 cycles
    Cycles71_5 = 6,
    /// 239.5 cycles
    Cycles239_5 = 7,
}

/// External trigger of the regular group (EXTSEL), as wired to ADC1 and
/// ADC2. ADC3 routes other timer events to the same selector values.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegularTrigger {
    /// TIM1 CC1
    Tim1Cc1 = 0,
    /// TIM1 CC2
    Tim1Cc2 = 1,
    /// TIM1 CC3
    Tim1Cc3 = 2,
    /// TIM2 CC2
    Tim2Cc2 = 3,
    /// TIM3 TRGO
    Tim3Trgo = 4,
    /// TIM4 CC4
    Tim4Cc4 = 5,
    /// EXTI line 11 or TIM8 TRGO
    Exti11 = 6,
    /// SWSTART bit
    Software = 7,
}

/// External trigger of the injected group (JEXTSEL), as wired to ADC1 and
/// ADC2
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InjectedTrigger {
    /// TIM1 TRGO
    Tim1Trgo = 0,
    /// TIM1 CC4
    Tim1Cc4 = 1,
    /// TIM2 TRGO
    Tim2Trgo = 2,
    /// TIM2 CC1
    Tim2Cc1 = 3,
    /// TIM3 CC4
    Tim3Cc4 = 4,
    /// TIM4 TRGO
    Tim4Trgo = 5,
    /// EXTI line 15 or TIM8 CC4
    Exti15 = 6,
    /// JSWSTART bit
    Software = 7,
}

/// Dual converter mode (DUALMOD)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DualMode {
    /// Converters run independently
    #[default]
    Independent = 0,
    /// Regular simultaneous and injected simultaneous
    RegularInjectedSimultaneous = 1,
    /// Regular simultaneous and alternate trigger
    RegularSimultaneousAlternateTrigger = 2,
    /// Injected simultaneous and fast interleaved
    InjectedSimultaneousFastInterleaved = 3,
    /// Injected simultaneous and slow interleaved
    InjectedSimultaneousSlowInterleaved = 4,
    /// Injected simultaneous only
    InjectedSimultaneous = 5,
    /// Regular simultaneous only
    RegularSimultaneous = 6,
    /// Fast interleaved only
    FastInterleaved = 7,
    /// Slow interleaved only
    SlowInterleaved = 8,
    /// Alternate trigger only
    AlternateTrigger = 9,
}

/// Slot of the injected group, selects JDRx and JOFRx
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InjectedRank {
    /// JDR1 / JOFR1
    J1 = 0,
    /// JDR2 / JOFR2
    J2 = 1,
    /// JDR3 / JOFR3
    J3 = 2,
    /// JDR4 / JOFR4
    J4 = 3,
}

fn check_channel(channel: u8) -> Result<(), Error> {
    if channel > MAX_CHANNEL {
        Err(Error::InvalidChannel(channel))
    } else {
        Ok(())
    }
}

/// Converter `Id` with its clock dependencies `D`
pub struct Adc<Id, D> {
    dependencies: D,
    /// Channel of the one-shot conversion in flight
    pending: Option<u8>,
    _id: PhantomData<Id>,
}

impl<Id: AdcId, D: Dependencies<Id>> Adc<Id, D> {
    /// Takes ownership of the converter. The registers are left untouched.
    pub fn new(dependencies: D) -> Self {
        Self {
            dependencies,
            pending: None,
            _id: PhantomData,
        }
    }

    /// Releases the dependencies.
    pub fn release(self) -> D {
        self.dependencies
    }

    /// Raw access to the registers.
    ///
    /// # Safety
    /// The abstraction assumes that it has exclusive ownership of the
    /// registers. Direct access can break such assumptions.
    pub unsafe fn registers(&self) -> &RegisterBlock {
        crate::reg::block::<Id, RegisterBlock>()
    }

    fn regs(&self) -> &RegisterBlock {
        // Safety: `dependencies` implies exclusive ownership of the converter.
        unsafe { self.registers() }
    }

    /// ADC clock
    pub fn clock(&self) -> HertzU32 {
        self.dependencies.peripheral_clock()
    }

    /// Wakes the converter up. The first conversion may start after the
    /// stabilization time t_STAB (1 us).
    ///
    /// Setting ADON on a running converter starts a conversion, so nothing is
    /// written if it is already powered.
    pub fn power_on(&mut self) {
        if !self.is_powered() {
            self.regs().cr2.modify(|_, w| w.set_adon(true));
        }
    }

    /// Powers the converter down.
    pub fn power_off(&mut self) {
        self.regs().cr2.modify(|_, w| w.set_adon(false));
    }

    /// `true` if the converter is powered.
    pub fn is_powered(&self) -> bool {
        self.regs().cr2.read().adon()
    }

    /// Resets the calibration registers.
    pub fn reset_calibration(&mut self) -> Result<(), Error> {
        self.regs().cr2.modify(|_, w| w.set_rstcal(true));
        poll::until(|| !self.regs().cr2.read().rstcal()).map_err(|e| {
            warn!("ADC calibration reset timed out");
            e.into()
        })
    }

    /// Runs the self-calibration. The converter must be powered for at least
    /// two ADC clock cycles.
    pub fn calibrate(&mut self) -> Result<(), Error> {
        trace!("ADC calibration");
        self.regs().cr2.modify(|_, w| w.set_cal(true));
        poll::until(|| !self.regs().cr2.read().cal()).map_err(|e| {
            warn!("ADC calibration timed out");
            e.into()
        })
    }

    /// Converts all channels of the selected group in one go.
    pub fn enable_scan_mode(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_scan(true));
    }

    /// Converts only the first channel of the group.
    pub fn disable_scan_mode(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_scan(false));
    }

    /// Restarts the regular group as soon as it is converted.
    pub fn set_continuous_conversion_mode(&mut self) {
        self.regs().cr2.modify(|_, w| w.set_cont(true));
    }

    /// Converts the regular group once per trigger.
    pub fn set_single_conversion_mode(&mut self) {
        self.regs().cr2.modify(|_, w| w.set_cont(false));
    }

    /// Converts the regular group in bursts of `length` channels, one burst
    /// per trigger.
    pub fn enable_discontinuous_mode_regular(&mut self, length: u8) -> Result<(), Error> {
        if !(1..=8).contains(&length) {
            return Err(Error::InvalidDiscontinuousLength(length));
        }
        self.regs().cr1.modify(|_, w| {
            w.set_discen(true);
            w.set_discnum(length - 1);
        });
        Ok(())
    }

    /// Converts the regular group in one go per trigger.
    pub fn disable_discontinuous_mode_regular(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_discen(false));
    }

    /// Converts one channel of the injected group per trigger.
    pub fn enable_discontinuous_mode_injected(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_jdiscen(true));
    }

    /// Converts the injected group in one go per trigger.
    pub fn disable_discontinuous_mode_injected(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_jdiscen(false));
    }

    /// Converts the injected group right after the regular group. Disables
    /// the external trigger of the injected group, which must stay off in
    /// this mode.
    pub fn enable_automatic_injected_group_conversion(&mut self) {
        self.disable_external_trigger_injected();
        self.regs().cr1.modify(|_, w| w.set_jauto(true));
    }

    /// Injected group conversions are triggered separately.
    pub fn disable_automatic_injected_group_conversion(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_jauto(false));
    }

    /// Places the 12-bit results in the upper bits of the data registers.
    pub fn set_left_aligned(&mut self) {
        self.regs().cr2.modify(|_, w| w.set_align(true));
    }

    /// Places the 12-bit results in the lower bits of the data registers.
    pub fn set_right_aligned(&mut self) {
        self.regs().cr2.modify(|_, w| w.set_align(false));
    }

    /// Requests a DMA transfer after every regular conversion.
    pub fn enable_dma(&mut self) -> Result<(), Error> {
        if !Id::HAS_DMA {
            return Err(Error::NoDma);
        }
        self.regs().cr2.modify(|_, w| w.set_dma(true));
        Ok(())
    }

    /// Stops the DMA requests.
    pub fn disable_dma(&mut self) {
        self.regs().cr2.modify(|_, w| w.set_dma(false));
    }

    /// Connects the temperature sensor (channel 16) and VREFINT (channel
    /// 17).
    pub fn enable_temperature_sensor(&mut self) {
        self.regs().cr2.modify(|_, w| w.set_tsvrefe(true));
    }

    /// Disconnects the temperature sensor and VREFINT.
    pub fn disable_temperature_sensor(&mut self) {
        self.regs().cr2.modify(|_, w| w.set_tsvrefe(false));
    }

    /// Guards the regular channels with the analog watchdog.
    pub fn enable_analog_watchdog_regular(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_awden(true));
    }

    /// Stops guarding the regular channels.
    pub fn disable_analog_watchdog_regular(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_awden(false));
    }

    /// Guards the injected channels with the analog watchdog.
    pub fn enable_analog_watchdog_injected(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_jawden(true));
    }

    /// Stops guarding the injected channels.
    pub fn disable_analog_watchdog_injected(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_jawden(false));
    }

    /// The analog watchdog guards every channel of the enabled groups.
    pub fn enable_analog_watchdog_on_all_channels(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_awdsgl(false));
    }

    /// The analog watchdog guards `channel` only.
    pub fn enable_analog_watchdog_on_selected_channel(&mut self, channel: u8) -> Result<(), Error> {
        check_channel(channel)?;
        self.regs().cr1.modify(|_, w| {
            w.set_awdch(channel);
            w.set_awdsgl(true);
        });
        Ok(())
    }

    /// Upper watchdog threshold, 12 bits. Compared before data alignment.
    pub fn set_watchdog_high_threshold(&mut self, threshold: u16) {
        self.regs().htr.write(|w| *w = u32::from(threshold & 0xfff));
    }

    /// Lower watchdog threshold, 12 bits.
    pub fn set_watchdog_low_threshold(&mut self, threshold: u16) {
        self.regs().ltr.write(|w| *w = u32::from(threshold & 0xfff));
    }

    /// Interrupt at the end of each regular conversion (or group in scan
    /// mode).
    pub fn enable_eoc_interrupt(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_eocie(true));
    }

    /// Disables the regular end of conversion interrupt.
    pub fn disable_eoc_interrupt(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_eocie(false));
    }

    /// Interrupt at the end of the injected group.
    pub fn enable_eoc_interrupt_injected(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_jeocie(true));
    }

    /// Disables the injected end of conversion interrupt.
    pub fn disable_eoc_interrupt_injected(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_jeocie(false));
    }

    /// Interrupt when the analog watchdog trips.
    pub fn enable_awd_interrupt(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_awdie(true));
    }

    /// Disables the analog watchdog interrupt.
    pub fn disable_awd_interrupt(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_awdie(false));
    }

    /// Sets the sampling time of `channel`.
    pub fn set_sample_time(&mut self, channel: u8, time: SampleTime) -> Result<(), Error> {
        check_channel(channel)?;
        // SMPR1 holds channels 10 and up, SMPR2 channels 0 to 9.
        let (reg, slot) = if channel < 10 {
            (&self.regs().smpr[1], channel)
        } else {
            (&self.regs().smpr[0], channel - 10)
        };
        reg.modify(|_, w| w.set_field(u32::from(slot) * SMP_WIDTH, SMP_WIDTH, time as u32));
        Ok(())
    }

    /// Sets the sampling time of every channel.
    pub fn set_sample_time_on_all_channels(&mut self, time: SampleTime) {
        let replicate = |count: u32| {
            (0..count).fold(0, |acc, slot| acc | (time as u32) << (slot * SMP_WIDTH))
        };
        self.regs().smpr[0].write(|w| *w = replicate(u32::from(MAX_CHANNEL) - 9));
        self.regs().smpr[1].write(|w| *w = replicate(10));
    }

    /// Programs the regular group, converted in the order of `channels`.
    /// Restarts a conversion in progress.
    pub fn set_regular_sequence(&mut self, channels: &[u8]) -> Result<(), Error> {
        if channels.is_empty() || channels.len() > REGULAR_SEQUENCE_MAX {
            return Err(Error::InvalidSequenceLength(channels.len()));
        }
        let mut sqr = [0u32; 3];
        for (rank, &channel) in channels.iter().enumerate() {
            check_channel(channel)?;
            // SQR3 holds ranks 1-6, SQR2 ranks 7-12 and SQR1 ranks 13-16.
            let reg = 2 - rank / 6;
            sqr[reg].set_field((rank % 6) as u32 * SQ_WIDTH, SQ_WIDTH, u32::from(channel));
        }
        sqr[0] |= (channels.len() as u32 - 1) << SQR1_L_SHIFT;
        for (reg, value) in self.regs().sqr.iter().zip(sqr) {
            reg.write(|w| *w = value);
        }
        Ok(())
    }

    /// Programs the injected group. Its channels occupy the last JSQR slots,
    /// so the results of a group of length n land in JDR1..JDRn.
    pub fn set_injected_sequence(&mut self, channels: &[u8]) -> Result<(), Error> {
        let len = channels.len();
        if len == 0 || len > INJECTED_SEQUENCE_MAX {
            return Err(Error::InvalidSequenceLength(len));
        }
        let mut jsqr = (len as u32 - 1) << JSQR_JL_SHIFT;
        let first_slot = INJECTED_SEQUENCE_MAX - len;
        for (i, &channel) in channels.iter().enumerate() {
            check_channel(channel)?;
            jsqr.set_field(
                (first_slot + i) as u32 * SQ_WIDTH,
                SQ_WIDTH,
                u32::from(channel),
            );
        }
        self.regs().jsqr.write(|w| *w = jsqr);
        Ok(())
    }

    /// Value subtracted from the injected results of `rank`, 12 bits.
    pub fn set_injected_offset(&mut self, rank: InjectedRank, offset: u16) {
        self.regs().jofr[rank as usize].write(|w| *w = u32::from(offset & 0xfff));
    }

    /// Starts regular conversions on `trigger`.
    pub fn enable_external_trigger_regular(&mut self, trigger: RegularTrigger) {
        self.regs().cr2.modify(|_, w| {
            w.set_extsel(trigger as u8);
            w.set_exttrig(true);
        });
    }

    /// Regular conversions ignore external events.
    pub fn disable_external_trigger_regular(&mut self) {
        self.regs().cr2.modify(|_, w| w.set_exttrig(false));
    }

    /// Starts injected conversions on `trigger`.
    pub fn enable_external_trigger_injected(&mut self, trigger: InjectedTrigger) {
        self.regs().cr2.modify(|_, w| {
            w.set_jextsel(trigger as u8);
            w.set_jexttrig(true);
        });
    }

    /// Injected conversions ignore external events.
    pub fn disable_external_trigger_injected(&mut self) {
        self.regs().cr2.modify(|_, w| w.set_jexttrig(false));
    }

    /// Starts the regular group by software. The trigger must be enabled
    /// with [`RegularTrigger::Software`]. Waits until the conversion has
    /// started.
    pub fn start_conversion_regular(&mut self) -> Result<(), Error> {
        self.regs().cr2.modify(|_, w| w.set_swstart(true));
        poll::until(|| !self.regs().cr2.read().swstart())?;
        Ok(())
    }

    /// Starts the injected group by software. The trigger must be enabled
    /// with [`InjectedTrigger::Software`]. Waits until the conversion has
    /// started.
    pub fn start_conversion_injected(&mut self) -> Result<(), Error> {
        self.regs().cr2.modify(|_, w| w.set_jswstart(true));
        poll::until(|| !self.regs().cr2.read().jswstart())?;
        Ok(())
    }

    /// `true` once the regular conversion completed. Cleared by reading the
    /// result.
    pub fn eoc(&self) -> bool {
        self.regs().sr.read().eoc()
    }

    /// `true` once the injected group completed.
    pub fn eoc_injected(&self) -> bool {
        self.regs().sr.read().jeoc()
    }

    /// Clears the injected end of conversion flag.
    pub fn clear_eoc_injected(&mut self) {
        // Safety: SR flags are rc_w0, writing 1 leaves a flag as is.
        unsafe { self.regs().sr.write_bits(!sr::JEOC) }
    }

    /// `true` if the analog watchdog tripped.
    pub fn awd(&self) -> bool {
        self.regs().sr.read().awd()
    }

    /// Clears the analog watchdog flag.
    pub fn clear_awd(&mut self) {
        // Safety: SR flags are rc_w0, writing 1 leaves a flag as is.
        unsafe { self.regs().sr.write_bits(!sr::AWD) }
    }

    /// Result of the last regular conversion. On ADC1 in dual mode the
    /// upper half word holds the ADC2 result.
    pub fn read_regular(&mut self) -> u32 {
        self.regs().dr.read()
    }

    /// Result of the injected conversion in `rank`, offset already
    /// subtracted.
    pub fn read_injected(&mut self, rank: InjectedRank) -> u32 {
        self.regs().jdr[rank as usize].read()
    }

    /// Selects the dual converter mode. Only the master converter (ADC1)
    /// has the DUALMOD field.
    pub fn set_dual_mode(&mut self, mode: DualMode) -> Result<(), Error> {
        if !Id::MASTER {
            return Err(Error::NotMaster);
        }
        self.regs().cr1.modify(|_, w| w.set_dualmod(mode as u8));
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{fake_peripheral, FixedClock};

    const SR: usize = 0x00;
    const CR1: usize = 0x04;
    const CR2: usize = 0x08;
    const SMPR1: usize = 0x0c;
    const SMPR2: usize = 0x10;
    const JOFR3: usize = 0x1c;
    const HTR: usize = 0x24;
    const SQR1: usize = 0x2c;
    const SQR2: usize = 0x30;
    const SQR3: usize = 0x34;
    const JSQR: usize = 0x38;
    const JDR2: usize = 0x40;
    const DR: usize = 0x4c;

    macro_rules! adc {
        ($name:ident) => {
            adc!($name, false, true)
        };
        ($name:ident, $master:expr, $dma:expr) => {{
            unsafe impl AdcId for $name {
                const MASTER: bool = $master;
                const HAS_DMA: bool = $dma;
            }
            Adc::<$name, _>::new(FixedClock(HertzU32::MHz(12)))
        }};
    }

    #[test]
    fn power_on_does_not_retrigger() {
        fake_peripheral!(Regs, 20);
        let mut adc = adc!(Regs);
        adc.power_on();
        assert!(adc.is_powered());
        Regs::block().set_word(CR2, 1 | (1 << 22));
        adc.power_on();
        assert_eq!(Regs::block().word(CR2), 1 | (1 << 22));
        adc.power_off();
        assert!(!adc.is_powered());
        assert_eq!(adc.clock().to_MHz(), 12);
    }

    #[test]
    fn calibration_times_out_if_hardware_never_finishes() {
        fake_peripheral!(Regs, 20);
        let mut adc = adc!(Regs);
        assert_eq!(adc.reset_calibration(), Err(Error::Timeout(Timeout)));
        assert_eq!(adc.calibrate(), Err(Error::Timeout(Timeout)));
        assert_eq!(Regs::block().word(CR2), 0b1100);
    }

    #[test]
    fn regular_sequence_spans_three_registers() {
        fake_peripheral!(Regs, 20);
        let mut adc = adc!(Regs);
        let channels = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];
        adc.set_regular_sequence(&channels).unwrap();
        assert_eq!(
            Regs::block().word(SQR3),
            1 | 2 << 5 | 3 << 10 | 4 << 15 | 5 << 20 | 6 << 25
        );
        assert_eq!(
            Regs::block().word(SQR2),
            7 | 8 << 5 | 9 << 10 | 10 << 15 | 11 << 20 | 12 << 25
        );
        assert_eq!(
            Regs::block().word(SQR1),
            13 | 14 << 5 | 15 << 10 | 16 << 15 | 15 << 20
        );

        adc.set_regular_sequence(&[17]).unwrap();
        assert_eq!(Regs::block().word(SQR3), 17);
        assert_eq!(Regs::block().word(SQR2), 0);
        assert_eq!(Regs::block().word(SQR1), 0);
    }

    #[test]
    fn invalid_sequences_are_rejected() {
        fake_peripheral!(Regs, 20);
        let mut adc = adc!(Regs);
        assert_eq!(
            adc.set_regular_sequence(&[]),
            Err(Error::InvalidSequenceLength(0))
        );
        assert_eq!(
            adc.set_regular_sequence(&[0; 17]),
            Err(Error::InvalidSequenceLength(17))
        );
        assert_eq!(
            adc.set_regular_sequence(&[0, 18]),
            Err(Error::InvalidChannel(18))
        );
        assert_eq!(
            adc.set_injected_sequence(&[0; 5]),
            Err(Error::InvalidSequenceLength(5))
        );
        assert_eq!(Regs::block().word(SQR1), 0);
        assert_eq!(Regs::block().word(JSQR), 0);
    }

    #[test]
    fn injected_sequence_is_right_aligned() {
        fake_peripheral!(Regs, 20);
        let mut adc = adc!(Regs);
        adc.set_injected_sequence(&[4, 9]).unwrap();
        assert_eq!(Regs::block().word(JSQR), 4 << 10 | 9 << 15 | 1 << 20);
        adc.set_injected_sequence(&[1, 2, 3, 4]).unwrap();
        assert_eq!(
            Regs::block().word(JSQR),
            1 | 2 << 5 | 3 << 10 | 4 << 15 | 3 << 20
        );
    }

    #[test]
    fn sample_times() {
        fake_peripheral!(Regs, 20);
        let mut adc = adc!(Regs);
        adc.set_sample_time(0, SampleTime::Cycles239_5).unwrap();
        adc.set_sample_time(9, SampleTime::Cycles7_5).unwrap();
        adc.set_sample_time(17, SampleTime::Cycles55_5).unwrap();
        assert_eq!(Regs::block().word(SMPR2), 7 | 1 << 27);
        assert_eq!(Regs::block().word(SMPR1), 5 << 21);
        assert_eq!(
            adc.set_sample_time(18, SampleTime::Cycles1_5),
            Err(Error::InvalidChannel(18))
        );

        adc.set_sample_time_on_all_channels(SampleTime::Cycles239_5);
        assert_eq!(Regs::block().word(SMPR2), 0x3fff_ffff);
        assert_eq!(Regs::block().word(SMPR1), 0x00ff_ffff);
    }

    #[test]
    fn modes_and_watchdog() {
        fake_peripheral!(Regs, 20);
        let mut adc = adc!(Regs);
        adc.enable_scan_mode();
        adc.enable_discontinuous_mode_regular(8).unwrap();
        adc.enable_analog_watchdog_on_selected_channel(5).unwrap();
        adc.enable_analog_watchdog_regular();
        adc.enable_eoc_interrupt();
        assert_eq!(
            Regs::block().word(CR1),
            5 | 1 << 5 | 1 << 8 | 1 << 9 | 1 << 11 | 7 << 13 | 1 << 23
        );
        assert_eq!(
            adc.enable_discontinuous_mode_regular(0),
            Err(Error::InvalidDiscontinuousLength(0))
        );
        assert_eq!(
            adc.enable_discontinuous_mode_regular(9),
            Err(Error::InvalidDiscontinuousLength(9))
        );
        adc.set_watchdog_high_threshold(0xffff);
        assert_eq!(Regs::block().word(HTR), 0xfff);
        adc.set_injected_offset(InjectedRank::J3, 100);
        assert_eq!(Regs::block().word(JOFR3), 100);
    }

    #[test]
    fn automatic_injection_disables_injected_trigger() {
        fake_peripheral!(Regs, 20);
        let mut adc = adc!(Regs);
        adc.enable_external_trigger_injected(InjectedTrigger::Tim2Cc1);
        adc.enable_external_trigger_regular(RegularTrigger::Software);
        assert_eq!(Regs::block().word(CR2), 3 << 12 | 1 << 15 | 7 << 17 | 1 << 20);
        adc.enable_automatic_injected_group_conversion();
        assert_eq!(Regs::block().word(CR2), 3 << 12 | 7 << 17 | 1 << 20);
        assert_eq!(Regs::block().word(CR1), 1 << 10);
    }

    #[test]
    fn results_and_flags() {
        fake_peripheral!(Regs, 20);
        let mut adc = adc!(Regs);
        assert!(!adc.eoc());
        Regs::block().set_word(SR, 0b111);
        Regs::block().set_word(DR, 0x0abc);
        Regs::block().set_word(JDR2, 0x0123);
        assert!(adc.eoc());
        assert!(adc.eoc_injected());
        assert!(adc.awd());
        assert_eq!(adc.read_regular(), 0x0abc);
        assert_eq!(adc.read_injected(InjectedRank::J2), 0x0123);
    }

    #[test]
    fn flags_are_cleared_without_read_back() {
        fake_peripheral!(Regs, 20);
        let mut adc = adc!(Regs);
        Regs::block().set_word(SR, 0b1_0111);
        adc.clear_eoc_injected();
        assert_eq!(Regs::block().word(SR), !0b100);
        Regs::block().set_word(SR, 0b1_0111);
        adc.clear_awd();
        assert_eq!(Regs::block().word(SR), !0b001);
    }

    #[test]
    fn dual_mode_and_dma_depend_on_the_instance() {
        fake_peripheral!(Master, 20);
        fake_peripheral!(Slave, 20);
        let mut master = adc!(Master, true, true);
        let mut slave = adc!(Slave, false, false);
        master
            .set_dual_mode(DualMode::RegularSimultaneous)
            .unwrap();
        assert_eq!(Master::block().word(CR1), 6 << 16);
        assert_eq!(
            slave.set_dual_mode(DualMode::RegularSimultaneous),
            Err(Error::NotMaster)
        );
        assert_eq!(master.enable_dma(), Ok(()));
        assert_eq!(slave.enable_dma(), Err(Error::NoDma));
        assert_eq!(Slave::block().word(CR2), 0);
    }
}
