//! Timer driver
//!
//! [`Timer`] covers the register layout shared by the basic, general purpose
//! and advanced-control timers of the STM32 families (and the GD32 clones).
//! Features that only exist on the advanced-control timers (repetition
//! counter, complementary outputs, break and dead-time) are only available
//! when the instance implements [`AdvancedTimerId`].
//!
//! ```no_run
//! # use opencm3::timer::{Alignment, Channel, ClockDivision, Direction, OcMode, Timer};
//! # fn example<D: opencm3::core::Dependencies<opencm3::stm32f1::TIM2>>(dependencies: D) {
//! let mut tim = Timer::<opencm3::stm32f1::TIM2, _>::new(dependencies);
//! tim.set_mode(ClockDivision::Div1, Alignment::Edge, Direction::Up);
//! tim.set_prescaler(71);
//! tim.set_period(999);
//! tim.set_oc_mode(Channel::C1, OcMode::Pwm1);
//! tim.set_oc_value(Channel::C1, 250);
//! tim.enable_oc_output(Channel::C1);
//! tim.enable_counter();
//! # }
//! ```
//!
//! [`AdvancedTimerId`]: opencm3_core::AdvancedTimerId

mod advanced;
mod channel;
pub mod interrupt;
pub mod pwm;

pub use advanced::{
    deadtime_from_ticks, deadtime_ticks, ComplementaryChannel, IdleOutputs, LockLevel,
};
pub use channel::{Channel, IcInput, InputFilter, OcMode, Polarity, Prescaler};
pub use interrupt::{DmaRequest, Event, EventSet, FlagSet, InterruptSet, Overcapture};

use crate::rcc::{Rcc, RccPeripheral};
use crate::reg::tim::RegisterBlock;
use core::marker::PhantomData;
use defmt_or_log::{debug, trace};
use fugit::HertzU32;
use opencm3_core::{Dependencies, PeripheralId, TimerId};

/// Errors reported by the timer driver
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The instance has no option register (`TIMx_OR`)
    NoOptionRegister,
    /// The requested frequency is zero or higher than the timer input clock,
    /// or too low to be reached with a 16-bit prescaler and period
    InvalidFrequency,
    /// The input can not be routed to the capture channel
    InvalidInput {
        /// Capture channel
        channel: Channel,
        /// Requested input
        input: IcInput,
    },
    /// Dead time does not fit in the DTG encoding
    DeadTimeOutOfRange,
}

/// Clock division between the timer clock and the dead-time / digital filter
/// sampling clock (CKD)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockDivision {
    /// t_DTS = t_CK_INT
    #[default]
    Div1 = 0,
    /// t_DTS = 2 * t_CK_INT
    Div2 = 1,
    /// t_DTS = 4 * t_CK_INT
    Div4 = 2,
}

/// Counter alignment (CMS)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Alignment {
    /// Edge-aligned, counting in the selected direction
    #[default]
    Edge = 0,
    /// Center-aligned, compare flags set when counting down
    Center1 = 1,
    /// Center-aligned, compare flags set when counting up
    Center2 = 2,
    /// Center-aligned, compare flags set in both directions
    Center3 = 3,
}

/// Counting direction (DIR)
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Upcounter
    #[default]
    Up,
    /// Downcounter
    Down,
}

/// Trigger output (TRGO) selection (MMS)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MasterMode {
    /// UG bit
    Reset = 0,
    /// Counter enable
    Enable = 1,
    /// Update event
    Update = 2,
    /// Capture/compare 1 match
    ComparePulse = 3,
    /// OC1REF
    CompareOc1Ref = 4,
    /// OC2REF
    CompareOc2Ref = 5,
    /// OC3REF
    CompareOc3Ref = 6,
    /// OC4REF
    CompareOc4Ref = 7,
}

/// Slave mode selection (SMS)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlaveMode {
    /// Internal clock
    Disabled = 0,
    /// Encoder mode 1, counting on TI2FP1 edges
    Encoder1 = 1,
    /// Encoder mode 2, counting on TI1FP2 edges
    Encoder2 = 2,
    /// Encoder mode 3, counting on both edges
    Encoder3 = 3,
    /// Rising trigger edge reinitializes the counter
    Reset = 4,
    /// Counter runs while the trigger is high
    Gated = 5,
    /// Rising trigger edge starts the counter
    Trigger = 6,
    /// Rising trigger edges clock the counter
    ExternalClock1 = 7,
}

/// Trigger selection (TS)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    /// Internal trigger 0
    Itr0 = 0,
    /// Internal trigger 1
    Itr1 = 1,
    /// Internal trigger 2
    Itr2 = 2,
    /// Internal trigger 3
    Itr3 = 3,
    /// TI1 edge detector
    Ti1FEd = 4,
    /// Filtered timer input 1
    Ti1Fp1 = 5,
    /// Filtered timer input 2
    Ti2Fp2 = 6,
    /// External trigger input
    Etrf = 7,
}

/// Time base configuration applied by [`Timer::configure_time_base`]
#[derive(Debug, Copy, Clone, Default)]
pub struct TimeBase {
    /// Counter clock is the timer clock divided by `prescaler + 1`
    pub prescaler: u16,
    /// Auto-reload value
    pub period: u32,
    /// Dead-time and filter sampling clock division
    pub clock_division: ClockDivision,
    /// Counter alignment
    pub alignment: Alignment,
    /// Counting direction, ignored for center-aligned modes
    pub direction: Direction,
    /// Buffer the auto-reload register until the next update event
    pub preload: bool,
    /// Stop the counter at the next update event
    pub one_shot: bool,
}

/// Timer peripheral `Id` with its clock dependencies `D`
pub struct Timer<Id, D> {
    dependencies: D,
    _id: PhantomData<Id>,
}

impl<Id: TimerId, D: Dependencies<Id>> Timer<Id, D> {
    /// Takes ownership of the timer. The registers are left untouched.
    pub fn new(dependencies: D) -> Self {
        Self {
            dependencies,
            _id: PhantomData,
        }
    }

    /// Releases the dependencies. The timer keeps running in its current
    /// configuration.
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

    pub(crate) fn regs(&self) -> &RegisterBlock {
        // Safety: `dependencies` implies exclusive ownership of the timer.
        unsafe { self.registers() }
    }

    /// Frequency of the timer input clock
    pub fn clock(&self) -> HertzU32 {
        self.dependencies.peripheral_clock()
    }

    /// Resets all timer registers through the reset controller.
    pub fn reset<R: PeripheralId>(&mut self, rcc: &mut Rcc<R>)
    where
        Id: RccPeripheral,
    {
        debug!("timer reset");
        rcc.periph_reset_pulse::<Id>();
    }

    /// Enables the interrupts and DMA requests in `interrupts`. Others remain
    /// unchanged.
    pub fn enable_irq(&mut self, interrupts: InterruptSet) {
        self.regs().dier.modify(|r, w| *w = r | interrupts.bits());
    }

    /// Disables the interrupts and DMA requests in `interrupts`. Others remain
    /// unchanged.
    pub fn disable_irq(&mut self, interrupts: InterruptSet) {
        self.regs().dier.modify(|r, w| *w = r & !interrupts.bits());
    }

    /// `true` if `event` is both enabled as an interrupt and flagged, i.e. it
    /// is a reason for the timer interrupt to be pending.
    pub fn interrupt_source(&self, event: Event) -> bool {
        let mask = u32::from(event);
        self.regs().sr.bits() & self.regs().dier.bits() & mask != 0
    }

    /// Current status flags
    pub fn flags(&self) -> FlagSet {
        FlagSet::from_bits(self.regs().sr.bits())
    }

    /// `true` if any of the `flags` is set
    pub fn get_flag(&self, flags: FlagSet) -> bool {
        self.flags().bits() & flags.bits() != 0
    }

    /// Clears `flags`. Other flags remain unchanged.
    pub fn clear_flag(&mut self, flags: FlagSet) {
        // Safety: All defined bits are rc_w0, writing 1 leaves a flag as is.
        unsafe { self.regs().sr.write_bits(!flags.bits()) }
    }

    /// Requests `events` by software, in addition to any pending ones.
    pub fn generate_event(&mut self, events: EventSet) {
        self.regs().egr.modify(|r, w| *w = r | events.bits());
    }

    /// Requests exactly `events` by software. All events are cleared by
    /// hardware on completion.
    pub fn force_event(&mut self, events: EventSet) {
        // Safety: Reserved bits of `EventSet` are never set.
        unsafe { self.regs().egr.write_bits(events.bits()) }
    }

    /// Sets clock division, alignment and direction in one go.
    pub fn set_mode(
        &mut self,
        clock_division: ClockDivision,
        alignment: Alignment,
        direction: Direction,
    ) {
        self.regs().cr1.modify(|_, w| {
            w.set_ckd(clock_division as u8);
            w.set_cms(alignment as u8);
            w.set_dir(direction == Direction::Down);
        });
    }

    /// Applies `config` and generates an update event so that the prescaler
    /// takes effect immediately.
    pub fn configure_time_base(&mut self, config: &TimeBase) {
        self.set_mode(config.clock_division, config.alignment, config.direction);
        if config.preload {
            self.enable_preload();
        } else {
            self.disable_preload();
        }
        if config.one_shot {
            self.one_shot_mode();
        } else {
            self.continuous_mode();
        }
        self.set_prescaler(config.prescaler.into());
        self.set_period(config.period);
        self.generate_event(Event::Update.into());
    }

    /// Sets the dead-time and digital filter sampling clock division.
    pub fn set_clock_division(&mut self, clock_division: ClockDivision) {
        self.regs().cr1.modify(|_, w| w.set_ckd(clock_division as u8));
    }

    /// Buffers the auto-reload register until the next update event.
    pub fn enable_preload(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_arpe(true));
    }

    /// Writes to the auto-reload register take effect immediately.
    pub fn disable_preload(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_arpe(false));
    }

    /// Selects edge or one of the center-aligned modes.
    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.regs().cr1.modify(|_, w| w.set_cms(alignment as u8));
    }

    /// Counts up. Read-only while in center-aligned mode.
    pub fn direction_up(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_dir(false));
    }

    /// Counts down. Read-only while in center-aligned mode.
    pub fn direction_down(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_dir(true));
    }

    /// Stops the counter at the next update event.
    pub fn one_shot_mode(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_opm(true));
    }

    /// Keeps counting across update events.
    pub fn continuous_mode(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_opm(false));
    }

    /// Update events are generated by overflow, UG and the slave mode
    /// controller.
    pub fn update_on_any(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_urs(false));
    }

    /// Update events are only generated by counter overflow/underflow.
    pub fn update_on_overflow(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_urs(true));
    }

    /// Allows update events.
    pub fn enable_update_event(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_udis(false));
    }

    /// Suppresses update events; shadow registers keep their values.
    pub fn disable_update_event(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_udis(true));
    }

    /// Starts counting.
    pub fn enable_counter(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_cen(true));
    }

    /// Stops counting.
    pub fn disable_counter(&mut self) {
        self.regs().cr1.modify(|_, w| w.set_cen(false));
    }

    /// Sets the counter clock to the timer clock divided by `value + 1`.
    pub fn set_prescaler(&mut self, value: u32) {
        // Safety: PSC has no reserved bit patterns.
        unsafe { self.regs().psc.write_bits(value & 0xffff) }
    }

    /// Sets the auto-reload value.
    pub fn set_period(&mut self, period: u32) {
        // Safety: ARR has no reserved bit patterns.
        unsafe { self.regs().arr.write_bits(period) }
    }

    /// Current counter value
    pub fn get_counter(&self) -> u32 {
        self.regs().cnt.bits()
    }

    /// Overwrites the counter.
    pub fn set_counter(&mut self, count: u32) {
        // Safety: CNT has no reserved bit patterns.
        unsafe { self.regs().cnt.write_bits(count) }
    }

    /// Picks prescaler and period so that update events occur at
    /// `frequency`. The period is maximized for the best duty cycle
    /// resolution.
    pub fn set_frequency(&mut self, frequency: HertzU32) -> Result<(), Error> {
        let clock = self.clock().to_Hz();
        let frequency = frequency.to_Hz();
        if frequency == 0 || frequency > clock {
            return Err(Error::InvalidFrequency);
        }
        let ticks = clock / frequency;
        let prescaler = (ticks - 1) / (1 << 16);
        if prescaler > 0xffff {
            return Err(Error::InvalidFrequency);
        }
        let period = ticks / (prescaler + 1) - 1;
        trace!("timer prescaler {} period {}", prescaler, period);
        self.set_prescaler(prescaler);
        self.set_period(period);
        Ok(())
    }

    /// Frequency of update events resulting from the current prescaler and
    /// period
    pub fn frequency(&self) -> HertzU32 {
        let prescaler = self.regs().psc.bits() + 1;
        let period = self.regs().arr.bits().saturating_add(1);
        HertzU32::from_raw(self.clock().to_Hz() / prescaler / period)
    }

    /// Selects the trigger output (TRGO) source.
    pub fn set_master_mode(&mut self, mode: MasterMode) {
        self.regs().cr2.modify(|_, w| w.set_mms(mode as u8));
    }

    /// Connects the XOR of CH1, CH2 and CH3 to TI1.
    pub fn set_ti1_ch123_xor(&mut self) {
        self.regs().cr2.modify(|_, w| w.set_ti1s(true));
    }

    /// Connects CH1 to TI1.
    pub fn set_ti1_ch1(&mut self) {
        self.regs().cr2.modify(|_, w| w.set_ti1s(false));
    }

    /// Capture/compare DMA requests are sent on capture/compare events.
    pub fn set_dma_on_compare_event(&mut self) {
        self.regs().cr2.modify(|_, w| w.set_ccds(false));
    }

    /// Capture/compare DMA requests are sent on update events.
    pub fn set_dma_on_update_event(&mut self) {
        self.regs().cr2.modify(|_, w| w.set_ccds(true));
    }

    /// Selects the slave mode.
    pub fn slave_set_mode(&mut self, mode: SlaveMode) {
        self.regs().smcr.modify(|_, w| w.set_sms(mode as u8));
    }

    /// Selects the trigger input of the slave mode controller.
    pub fn slave_set_trigger(&mut self, trigger: Trigger) {
        self.regs().smcr.modify(|_, w| w.set_ts(trigger as u8));
    }

    /// Sets the external trigger digital filter.
    pub fn slave_set_filter(&mut self, filter: InputFilter) {
        self.regs().smcr.modify(|_, w| w.set_etf(filter as u8));
    }

    /// Sets the external trigger prescaler.
    pub fn slave_set_prescaler(&mut self, prescaler: Prescaler) {
        self.regs().smcr.modify(|_, w| w.set_etps(prescaler as u8));
    }

    /// Sets the external trigger polarity.
    pub fn slave_set_polarity(&mut self, polarity: Polarity) {
        self.regs()
            .smcr
            .modify(|_, w| w.set_etp(polarity == Polarity::Low));
    }

    /// Writes the instance specific option register (input remapping on
    /// STM32F2 TIM2/TIM5). Bits outside of the instance option fields are
    /// ignored.
    pub fn set_option(&mut self, option: u32) -> Result<(), Error> {
        let mask = Id::OPTION_MASK;
        if mask == 0 {
            return Err(Error::NoOptionRegister);
        }
        self.regs()
            .or
            .modify(|r, w| *w = (r & !mask) | (option & mask));
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{fake_peripheral, FixedClock};
    use fugit::RateExtU32 as _;

    fn timer<Id: TimerId>(clock: u32) -> Timer<Id, FixedClock> {
        Timer::new(FixedClock(clock.Hz()))
    }

    #[test]
    fn set_mode_writes_cr1_fields() {
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        let mut tim = timer::<Tim>(8_000_000);
        Tim::block().set_word(0x00, 1 << 7);
        tim.set_mode(ClockDivision::Div4, Alignment::Center2, Direction::Down);
        assert_eq!(Tim::block().word(0x00), (2 << 8) | (1 << 7) | (2 << 5) | (1 << 4));
        tim.direction_up();
        tim.enable_counter();
        tim.one_shot_mode();
        assert_eq!(Tim::block().word(0x00), (2 << 8) | (1 << 7) | (2 << 5) | 0b1001);
    }

    #[test]
    fn clear_flag_writes_inverted_mask() {
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        let mut tim = timer::<Tim>(8_000_000);
        tim.clear_flag([Event::Update, Event::CaptureCompare2].into_iter().collect());
        assert_eq!(Tim::block().word(0x10), !0b101);
    }

    #[test]
    fn clear_flag_reaches_overcapture_flags() {
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        let mut tim = timer::<Tim>(8_000_000);
        Tim::block().set_word(0x10, (1 << 11) | (1 << 3));
        assert!(tim.get_flag(Overcapture(Channel::C3).into()));
        tim.clear_flag(FlagSet::from(Event::CaptureCompare3) | Overcapture(Channel::C3).into());
        assert_eq!(Tim::block().word(0x10), !((1 << 11) | (1 << 3)));
    }

    #[test]
    fn interrupt_source_requires_enable_and_flag() {
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        let mut tim = timer::<Tim>(8_000_000);
        Tim::block().set_word(0x10, 0b11);
        assert!(!tim.interrupt_source(Event::Update));
        tim.enable_irq([Event::Update].into_iter().collect());
        assert!(tim.interrupt_source(Event::Update));
        assert!(!tim.interrupt_source(Event::CaptureCompare1));
        assert!(tim.get_flag(Event::CaptureCompare1.into()));
        tim.disable_irq([Event::Update].into_iter().collect());
        assert_eq!(Tim::block().word(0x0c), 0);
    }

    #[test]
    fn force_event_overwrites_generate_event_accumulates() {
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        let mut tim = timer::<Tim>(8_000_000);
        tim.generate_event(Event::Update.into());
        tim.generate_event(Event::Trigger.into());
        assert_eq!(Tim::block().word(0x14), 0x41);
        tim.force_event(Event::Break.into());
        assert_eq!(Tim::block().word(0x14), 0x80);
    }

    #[test]
    fn set_frequency_maximizes_period() {
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        let mut tim = timer::<Tim>(72_000_000);
        tim.set_frequency(1.kHz()).unwrap();
        assert_eq!(Tim::block().word(0x28), 1);
        assert_eq!(Tim::block().word(0x2c), 35_999);
        assert_eq!(tim.frequency(), 1.kHz::<1, 1>());

        tim.set_frequency(10.kHz()).unwrap();
        assert_eq!(Tim::block().word(0x28), 0);
        assert_eq!(Tim::block().word(0x2c), 7_199);
    }

    #[test]
    fn set_frequency_rejects_unreachable_values() {
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        let mut tim = timer::<Tim>(72_000_000);
        assert_eq!(tim.set_frequency(0.Hz()), Err(Error::InvalidFrequency));
        assert_eq!(tim.set_frequency(73.MHz()), Err(Error::InvalidFrequency));
    }

    #[test]
    fn slave_mode_fields() {
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        let mut tim = timer::<Tim>(8_000_000);
        tim.slave_set_mode(SlaveMode::Encoder3);
        tim.slave_set_trigger(Trigger::Ti2Fp2);
        tim.slave_set_filter(InputFilter::DtfDiv32N8);
        tim.slave_set_prescaler(Prescaler::Div4);
        tim.slave_set_polarity(Polarity::Low);
        assert_eq!(
            Tim::block().word(0x08),
            3 | (6 << 4) | (0xf << 8) | (2 << 12) | (1 << 15)
        );
    }

    #[test]
    fn master_mode_and_dma_selection() {
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        let mut tim = timer::<Tim>(8_000_000);
        tim.set_master_mode(MasterMode::CompareOc2Ref);
        tim.set_dma_on_update_event();
        tim.set_ti1_ch123_xor();
        assert_eq!(Tim::block().word(0x04), (5 << 4) | (1 << 3) | (1 << 7));
    }

    #[test]
    fn option_register_is_masked() {
        fake_peripheral!(Tim2, 32);
        unsafe impl TimerId for Tim2 {
            const OPTION_MASK: u32 = 0b11 << 10;
        }
        fake_peripheral!(Tim3, 32);
        unsafe impl TimerId for Tim3 {}

        let mut tim2 = timer::<Tim2>(8_000_000);
        Tim2::block().set_word(0x50, 0b10 << 10);
        tim2.set_option(0xffff_f5ff).unwrap();
        assert_eq!(Tim2::block().word(0x50), 0b01 << 10);

        let mut tim3 = timer::<Tim3>(8_000_000);
        assert_eq!(tim3.set_option(1 << 10), Err(Error::NoOptionRegister));
    }

    #[test]
    fn update_event_control() {
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        let mut tim = timer::<Tim>(8_000_000);
        tim.update_on_overflow();
        tim.disable_update_event();
        assert_eq!(Tim::block().word(0x00), 0b110);
        tim.enable_update_event();
        assert_eq!(Tim::block().word(0x00), 0b100);
        tim.update_on_any();
        assert_eq!(Tim::block().word(0x00), 0);
    }

    #[test]
    fn alignment_and_clock_division_keep_other_fields() {
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        let mut tim = timer::<Tim>(8_000_000);
        Tim::block().set_word(0x00, 1 | (1 << 7));
        tim.set_alignment(Alignment::Center3);
        tim.set_clock_division(ClockDivision::Div2);
        assert_eq!(Tim::block().word(0x00), 1 | (1 << 7) | (3 << 5) | (1 << 8));
        tim.set_alignment(Alignment::Edge);
        tim.set_clock_division(ClockDivision::Div1);
        assert_eq!(Tim::block().word(0x00), 1 | (1 << 7));
    }

    #[test]
    fn counter_is_read_and_written_through_cnt() {
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        let mut tim = timer::<Tim>(8_000_000);
        tim.set_counter(0x1234);
        assert_eq!(Tim::block().word(0x24), 0x1234);
        Tim::block().set_word(0x24, 0xbeef);
        assert_eq!(tim.get_counter(), 0xbeef);
    }

    #[test]
    fn dma_request_source() {
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        let mut tim = timer::<Tim>(8_000_000);
        Tim::block().set_word(0x04, 5 << 4);
        tim.set_dma_on_update_event();
        assert_eq!(Tim::block().word(0x04), (5 << 4) | (1 << 3));
        tim.set_dma_on_compare_event();
        assert_eq!(Tim::block().word(0x04), 5 << 4);
    }

    #[test]
    fn reset_releases_the_timer_from_reset() {
        use crate::rcc::{Bus, ClockDomain};

        fake_peripheral!(Regs, 12);
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        unsafe impl RccPeripheral for Tim {
            const BUS: Bus = Bus::Apb1;
            const BIT: u8 = 2;
            const CLOCK: ClockDomain = ClockDomain::Apb1Timer;
        }

        let mut rcc = unsafe { Rcc::<Regs>::new() };
        let mut tim = timer::<Tim>(8_000_000);
        Regs::block().set_word(0x10, (1 << 2) | (1 << 5));
        Regs::block().set_word(0x1c, 1 << 2);
        tim.reset(&mut rcc);
        assert_eq!(Regs::block().word(0x10), 1 << 5);
        assert_eq!(Regs::block().word(0x1c), 1 << 2);
    }

    #[test]
    fn time_base_generates_update() {
        fake_peripheral!(Tim, 32);
        unsafe impl TimerId for Tim {}
        let mut tim = timer::<Tim>(8_000_000);
        tim.configure_time_base(&TimeBase {
            prescaler: 7,
            period: 999,
            preload: true,
            ..Default::default()
        });
        assert_eq!(Tim::block().word(0x00), 1 << 7);
        assert_eq!(Tim::block().word(0x28), 7);
        assert_eq!(Tim::block().word(0x2c), 999);
        assert_eq!(Tim::block().word(0x14), 1);
    }
}
