//! Features of the advanced-control timers: repetition counter,
//! complementary outputs, break and dead-time.

use super::{Channel, Error, Polarity, Timer};
use crate::reg::tim::{ccer, CR2_OIS_SHIFT};
use crate::reg::RegisterValue as _;
use bitfield::bitfield;
use opencm3_core::{AdvancedTimerId, Dependencies};

/// Complementary output of a capture/compare channel. Channel 4 has none.
///
/// Mode, preload, fast mode, clear enable and compare value are shared with
/// the main output of the channel and set through [`Channel`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ComplementaryChannel {
    /// OC1N
    C1N = 0,
    /// OC2N
    C2N = 1,
    /// OC3N
    C3N = 2,
}

impl ComplementaryChannel {
    fn ccer_bit(self, bit: u32) -> u32 {
        1 << (self as u32 * 4 + bit)
    }

    fn ois(self) -> u32 {
        1 << (CR2_OIS_SHIFT + self as u32 * 2 + 1)
    }
}

impl Channel {
    fn ois(self) -> u32 {
        1 << (CR2_OIS_SHIFT + self as u32 * 2)
    }
}

bitfield! {
    /// Set of outputs whose idle state (OISx / OISxN) is changed at once
    #[derive(Copy, Clone, Default, PartialEq, Eq)]
    pub struct IdleOutputs(u32);
    impl Debug;

    /// OC1
    pub ois1, set_ois1: 8;
    /// OC1N
    pub ois1n, set_ois1n: 9;
    /// OC2
    pub ois2, set_ois2: 10;
    /// OC2N
    pub ois2n, set_ois2n: 11;
    /// OC3
    pub ois3, set_ois3: 12;
    /// OC3N
    pub ois3n, set_ois3n: 13;
    /// OC4
    pub ois4, set_ois4: 14;
}

const OIS_MASK: u32 = 0x7f << CR2_OIS_SHIFT;

/// Write protection of the break and dead-time configuration (LOCK)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LockLevel {
    /// No write protection
    #[default]
    Off = 0,
    /// DTG, BKE, BKP, AOE, OISx and OISxN locked
    Level1 = 1,
    /// Level 1 plus CCxP, CCxNP, OSSR and OSSI
    Level2 = 2,
    /// Level 2 plus OCxM and OCxPE
    Level3 = 3,
}

/// Encodes a dead time of `ticks` t_DTS periods into the DTG field.
///
/// Dead times above 127 ticks are only available in steps of 2 (up to 254),
/// 8 (256 to 504) and 16 (512 to 1008) and are rounded down to the nearest
/// available value.
pub fn deadtime_from_ticks(ticks: u16) -> Result<u8, Error> {
    let dtg = match ticks {
        0..=127 => ticks,
        128..=255 => 0x80 | (ticks / 2 - 64),
        256..=511 => 0xc0 | (ticks / 8 - 32),
        512..=1008 => 0xe0 | (ticks / 16 - 32),
        _ => return Err(Error::DeadTimeOutOfRange),
    };
    Ok(dtg as u8)
}

/// Dead time in t_DTS periods encoded by a DTG field value.
pub fn deadtime_ticks(dtg: u8) -> u16 {
    let dtg = u16::from(dtg);
    match dtg >> 5 {
        0..=3 => dtg,
        4 | 5 => 2 * (64 + (dtg & 0x3f)),
        6 => 8 * (32 + (dtg & 0x1f)),
        _ => 16 * (32 + (dtg & 0x1f)),
    }
}

impl<Id: AdvancedTimerId, D: Dependencies<Id>> Timer<Id, D> {
    /// Sets the number of counter periods between two update events.
    pub fn set_repetition_counter(&mut self, value: u16) {
        // Safety: RCR has no reserved bit patterns in the low half word.
        unsafe { self.regs().rcr.write_bits(value.into()) }
    }

    /// Complementary output is active high.
    pub fn set_ocn_polarity_high(&mut self, channel: ComplementaryChannel) {
        let mask = channel.ccer_bit(ccer::CCNP);
        self.regs().ccer.modify(|_, w| w.set_mask(mask, false));
    }

    /// Complementary output is active low.
    pub fn set_ocn_polarity_low(&mut self, channel: ComplementaryChannel) {
        let mask = channel.ccer_bit(ccer::CCNP);
        self.regs().ccer.modify(|_, w| w.set_mask(mask, true));
    }

    /// Drives the complementary output pin.
    pub fn enable_ocn_output(&mut self, channel: ComplementaryChannel) {
        let mask = channel.ccer_bit(ccer::CCNE);
        self.regs().ccer.modify(|_, w| w.set_mask(mask, true));
    }

    /// Releases the complementary output pin.
    pub fn disable_ocn_output(&mut self, channel: ComplementaryChannel) {
        let mask = channel.ccer_bit(ccer::CCNE);
        self.regs().ccer.modify(|_, w| w.set_mask(mask, false));
    }

    /// The output is high while the main output is disabled (MOE = 0).
    pub fn set_oc_idle_state_set(&mut self, channel: Channel) {
        let mask = channel.ois();
        self.regs().cr2.modify(|_, w| w.set_mask(mask, true));
    }

    /// The output is low while the main output is disabled (MOE = 0).
    pub fn set_oc_idle_state_unset(&mut self, channel: Channel) {
        let mask = channel.ois();
        self.regs().cr2.modify(|_, w| w.set_mask(mask, false));
    }

    /// The complementary output is high while the main output is disabled.
    pub fn set_ocn_idle_state_set(&mut self, channel: ComplementaryChannel) {
        let mask = channel.ois();
        self.regs().cr2.modify(|_, w| w.set_mask(mask, true));
    }

    /// The complementary output is low while the main output is disabled.
    pub fn set_ocn_idle_state_unset(&mut self, channel: ComplementaryChannel) {
        let mask = channel.ois();
        self.regs().cr2.modify(|_, w| w.set_mask(mask, false));
    }

    /// Sets the idle state of all `outputs` high at once.
    pub fn set_output_idle_state(&mut self, outputs: IdleOutputs) {
        self.regs()
            .cr2
            .modify(|_, w| w.set_mask(outputs.0 & OIS_MASK, true));
    }

    /// Sets the idle state of all `outputs` low at once.
    pub fn reset_output_idle_state(&mut self, outputs: IdleOutputs) {
        self.regs()
            .cr2
            .modify(|_, w| w.set_mask(outputs.0 & OIS_MASK, false));
    }

    /// Preloaded CCxE, CCxNE and OCxM bits are updated on COMG or a rising
    /// edge on TRGI, not only on COMG.
    pub fn enable_compare_control_update_on_trigger(&mut self) {
        self.regs().cr2.modify(|_, w| w.set_ccus(true));
    }

    /// Preloaded control bits are only updated on COMG.
    pub fn disable_compare_control_update_on_trigger(&mut self) {
        self.regs().cr2.modify(|_, w| w.set_ccus(false));
    }

    /// CCxE, CCxNE and OCxM are preloaded and updated on a commutation event.
    pub fn enable_preload_complementary_enable_bits(&mut self) {
        self.regs().cr2.modify(|_, w| w.set_ccpc(true));
    }

    /// CCxE, CCxNE and OCxM take effect immediately.
    pub fn disable_preload_complementary_enable_bits(&mut self) {
        self.regs().cr2.modify(|_, w| w.set_ccpc(false));
    }

    /// Main output enable (MOE).
    pub fn enable_break_main_output(&mut self) {
        self.regs().bdtr.modify(|_, w| w.set_moe(true));
    }

    /// Disables all outputs enabled through CCxE / CCxNE.
    pub fn disable_break_main_output(&mut self) {
        self.regs().bdtr.modify(|_, w| w.set_moe(false));
    }

    /// MOE is set again by the next update event after a break.
    pub fn enable_break_automatic_output(&mut self) {
        self.regs().bdtr.modify(|_, w| w.set_aoe(true));
    }

    /// MOE can only be set by software.
    pub fn disable_break_automatic_output(&mut self) {
        self.regs().bdtr.modify(|_, w| w.set_aoe(false));
    }

    /// Selects the active level of the break input.
    pub fn set_break_polarity(&mut self, polarity: Polarity) {
        self.regs()
            .bdtr
            .modify(|_, w| w.set_bkp(polarity == Polarity::High));
    }

    /// Break input active high.
    pub fn set_break_polarity_high(&mut self) {
        self.set_break_polarity(Polarity::High);
    }

    /// Break input active low.
    pub fn set_break_polarity_low(&mut self) {
        self.set_break_polarity(Polarity::Low);
    }

    /// Enables the break input.
    pub fn enable_break(&mut self) {
        self.regs().bdtr.modify(|_, w| w.set_bke(true));
    }

    /// Disables the break input.
    pub fn disable_break(&mut self) {
        self.regs().bdtr.modify(|_, w| w.set_bke(false));
    }

    /// Disabled outputs drive their inactive level while MOE = 1 (OSSR).
    pub fn set_enabled_off_state_in_run_mode(&mut self) {
        self.regs().bdtr.modify(|_, w| w.set_ossr(true));
    }

    /// Disabled outputs are released while MOE = 1.
    pub fn set_disabled_off_state_in_run_mode(&mut self) {
        self.regs().bdtr.modify(|_, w| w.set_ossr(false));
    }

    /// Outputs drive their idle level while MOE = 0 (OSSI).
    pub fn set_enabled_off_state_in_idle_mode(&mut self) {
        self.regs().bdtr.modify(|_, w| w.set_ossi(true));
    }

    /// Outputs are released while MOE = 0.
    pub fn set_disabled_off_state_in_idle_mode(&mut self) {
        self.regs().bdtr.modify(|_, w| w.set_ossi(false));
    }

    /// Sets the lock level. The field can be written only once after reset.
    pub fn set_break_lock(&mut self, lock: LockLevel) {
        self.regs().bdtr.modify(|_, w| w.set_lock(lock as u8));
    }

    /// Sets the raw DTG field, see [`deadtime_from_ticks`].
    pub fn set_deadtime(&mut self, dtg: u8) {
        self.regs().bdtr.modify(|_, w| w.set_dtg(dtg));
    }

    /// Sets the dead time to `ticks` t_DTS periods, rounded down to the
    /// nearest encodable value.
    pub fn set_deadtime_ticks(&mut self, ticks: u16) -> Result<(), Error> {
        let dtg = deadtime_from_ticks(ticks)?;
        self.set_deadtime(dtg);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{fake_peripheral, FixedClock};
    use fugit::RateExtU32 as _;
    use opencm3_core::TimerId;

    const CR2: usize = 0x04;
    const CCER: usize = 0x20;
    const BDTR: usize = 0x44;

    #[test]
    fn deadtime_encoding_ranges() {
        assert_eq!(deadtime_from_ticks(100), Ok(100));
        assert_eq!(deadtime_from_ticks(128), Ok(0x80));
        assert_eq!(deadtime_from_ticks(255), Ok(0xbf));
        assert_eq!(deadtime_from_ticks(256), Ok(0xc0));
        assert_eq!(deadtime_from_ticks(504), Ok(0xdf));
        assert_eq!(deadtime_from_ticks(1008), Ok(0xff));
        assert_eq!(deadtime_from_ticks(1009), Err(Error::DeadTimeOutOfRange));
    }

    #[test]
    fn deadtime_rounds_down() {
        for ticks in [0, 127, 129, 300, 511, 700, 1008] {
            let encoded = deadtime_ticks(deadtime_from_ticks(ticks).unwrap());
            assert!(encoded <= ticks);
            assert!(ticks - encoded < 16);
        }
        assert_eq!(deadtime_ticks(0xff), 1008);
        assert_eq!(deadtime_ticks(0xa0), 192);
    }

    #[test]
    fn deadtime_and_lock_replace_their_fields() {
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        unsafe impl AdvancedTimerId for Tim {}
        let mut tim = Timer::<Tim, _>::new(FixedClock(72.MHz()));
        tim.set_deadtime(0xff);
        tim.set_break_lock(LockLevel::Level3);
        tim.enable_break_main_output();
        tim.set_deadtime(0x12);
        tim.set_break_lock(LockLevel::Level1);
        assert_eq!(Tim::block().word(BDTR), (1 << 15) | (1 << 8) | 0x12);
    }

    #[test]
    fn break_configuration() {
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        unsafe impl AdvancedTimerId for Tim {}
        let mut tim = Timer::<Tim, _>::new(FixedClock(72.MHz()));
        tim.enable_break();
        tim.set_break_polarity_high();
        tim.enable_break_automatic_output();
        tim.set_enabled_off_state_in_run_mode();
        tim.set_enabled_off_state_in_idle_mode();
        assert_eq!(Tim::block().word(BDTR), 0b0111_1100 << 8);
        tim.set_break_polarity_low();
        tim.disable_break_automatic_output();
        tim.set_disabled_off_state_in_idle_mode();
        assert_eq!(Tim::block().word(BDTR), 0b0001_1000 << 8);
    }

    #[test]
    fn complementary_outputs() {
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        unsafe impl AdvancedTimerId for Tim {}
        let mut tim = Timer::<Tim, _>::new(FixedClock(72.MHz()));
        tim.enable_ocn_output(ComplementaryChannel::C2N);
        tim.set_ocn_polarity_low(ComplementaryChannel::C3N);
        tim.enable_oc_output(Channel::C2);
        assert_eq!(Tim::block().word(CCER), (0b0101 << 4) | (0b1000 << 8));
        tim.set_ocn_polarity_high(ComplementaryChannel::C3N);
        tim.disable_ocn_output(ComplementaryChannel::C2N);
        assert_eq!(Tim::block().word(CCER), 1 << 4);
    }

    #[test]
    fn idle_states() {
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        unsafe impl AdvancedTimerId for Tim {}
        let mut tim = Timer::<Tim, _>::new(FixedClock(72.MHz()));
        tim.set_oc_idle_state_set(Channel::C4);
        tim.set_ocn_idle_state_set(ComplementaryChannel::C1N);
        assert_eq!(Tim::block().word(CR2), (1 << 14) | (1 << 9));

        let mut outputs = IdleOutputs::default();
        outputs.set_ois1(true);
        outputs.set_ois3n(true);
        tim.set_output_idle_state(outputs);
        assert_eq!(Tim::block().word(CR2), (1 << 14) | (1 << 13) | (1 << 9) | (1 << 8));

        tim.reset_output_idle_state(IdleOutputs(u32::MAX));
        tim.enable_preload_complementary_enable_bits();
        assert_eq!(Tim::block().word(CR2), 1);
    }

    #[test]
    fn compare_control_update_source() {
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        unsafe impl AdvancedTimerId for Tim {}
        let mut tim = Timer::<Tim, _>::new(FixedClock(72.MHz()));
        tim.enable_preload_complementary_enable_bits();
        tim.enable_compare_control_update_on_trigger();
        assert_eq!(Tim::block().word(CR2), 0b101);
        tim.disable_compare_control_update_on_trigger();
        assert_eq!(Tim::block().word(CR2), 1);
        tim.disable_preload_complementary_enable_bits();
        assert_eq!(Tim::block().word(CR2), 0);
    }

    #[test]
    fn repetition_counter() {
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        unsafe impl AdvancedTimerId for Tim {}
        let mut tim = Timer::<Tim, _>::new(FixedClock(72.MHz()));
        tim.set_repetition_counter(3);
        tim.set_deadtime_ticks(300).unwrap();
        assert_eq!(Tim::block().word(0x30), 3);
        assert_eq!(Tim::block().word(BDTR), 0xc0 | (300 / 8 - 32));
    }
}
