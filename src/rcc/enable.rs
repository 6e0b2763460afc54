use super::Rcc;
use crate::poll::Timeout;
use crate::reg::rcc::RegisterBlock;
use crate::reg::{Reg, RegisterValue as _};
use core::marker::PhantomData;
use defmt_or_log::debug;
use fugit::HertzU32;
use opencm3_core::{Dependencies, PeripheralId};

/// Errors reported by the reset and clock controller
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// PLL multiplication factors range from 2 to 16
    InvalidPllMultiplier(u8),
    /// The peripheral clock is already enabled, so another driver may own
    /// the peripheral
    AlreadyEnabled,
    /// The clock tree cannot change while an [`Enabled`] token is alive
    ClocksFrozen,
    /// The clock tree was changed without [`Rcc::clock_setup`], or a setup
    /// failed halfway
    UnknownClocks,
    /// An oscillator did not become ready
    Timeout(Timeout),
}

impl From<Timeout> for Error {
    fn from(value: Timeout) -> Self {
        Self::Timeout(value)
    }
}

/// Bus a peripheral is attached to. Selects the clock enable and reset
/// registers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bus {
    /// AHB: AHBENR, AHBRSTR
    Ahb,
    /// APB1: APB1ENR, APB1RSTR
    Apb1,
    /// APB2: APB2ENR, APB2RSTR
    Apb2,
}

/// Clock a peripheral kernel runs from
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockDomain {
    /// HCLK
    Ahb,
    /// PCLK1
    Apb1,
    /// PCLK2
    Apb2,
    /// Timer clock of APB1, twice PCLK1 unless the APB1 prescaler is 1
    Apb1Timer,
    /// Timer clock of APB2, twice PCLK2 unless the APB2 prescaler is 1
    Apb2Timer,
    /// ADC clock
    Adc,
}

/// Peripheral whose clock is gated and whose reset is controlled by the RCC.
///
/// # Safety
/// `BUS` and `BIT` must select the clock enable and reset bits of the
/// peripheral identified by `Self`.
pub unsafe trait RccPeripheral: PeripheralId {
    /// Bus the peripheral is attached to
    const BUS: Bus;
    /// Bit position in the enable and reset registers of `BUS`
    const BIT: u8;
    /// Clock the peripheral runs from
    const CLOCK: ClockDomain;
}

/// Proof that the clock of peripheral `P` is enabled. Handed to peripheral
/// drivers as their [`Dependencies`].
pub struct Enabled<P> {
    clock: HertzU32,
    _peripheral: PhantomData<P>,
}

impl<P> Enabled<P> {
    /// Frequency of the peripheral clock
    pub fn clock(&self) -> HertzU32 {
        self.clock
    }
}

// Safety: `Rcc::enable` only hands out tokens with the clock enabled, and
// only one token exists per peripheral since enabling it twice fails. The
// clock tree is frozen while a token is alive, and only `unsafe` calls gate
// the clock off behind its back.
unsafe impl<P: RccPeripheral> Dependencies<P> for Enabled<P> {
    fn peripheral_clock(&self) -> HertzU32 {
        self.clock
    }
}

impl RegisterBlock {
    fn enr(&self, bus: Bus) -> &Reg<u32> {
        match bus {
            Bus::Ahb => &self.ahbenr,
            Bus::Apb1 => &self.apb1enr,
            Bus::Apb2 => &self.apb2enr,
        }
    }

    fn rstr(&self, bus: Bus) -> &Reg<u32> {
        match bus {
            Bus::Ahb => &self.ahbrstr,
            Bus::Apb1 => &self.apb1rstr,
            Bus::Apb2 => &self.apb2rstr,
        }
    }
}

impl<Id: PeripheralId> Rcc<Id> {
    /// Enables the clock of peripheral `P`. [`Self::enable`] refuses `P`
    /// afterwards.
    pub fn periph_clock_enable<P: RccPeripheral>(&mut self) {
        let mask = 1 << P::BIT;
        self.regs()
            .enr(P::BUS)
            .modify(|_, w| w.set_mask(mask, true));
    }

    /// Disables the clock of peripheral `P`.
    ///
    /// # Safety
    /// No [`Enabled`] token of `P` may be alive. Its driver would keep
    /// accessing an unclocked peripheral. Prefer [`Self::disable`].
    ///
    /// ```compile_fail
    /// # use opencm3::{rcc::Rcc, stm32f1::{RCC, TIM2}};
    /// let mut rcc = unsafe { Rcc::<RCC>::new() };
    /// let tim2 = rcc.enable::<TIM2>();
    /// rcc.periph_clock_disable::<TIM2>();
    /// ```
    pub unsafe fn periph_clock_disable<P: RccPeripheral>(&mut self) {
        let mask = 1 << P::BIT;
        self.regs()
            .enr(P::BUS)
            .modify(|_, w| w.set_mask(mask, false));
    }

    /// `true` if the clock of peripheral `P` is enabled.
    pub fn periph_clock_enabled<P: RccPeripheral>(&self) -> bool {
        self.regs().enr(P::BUS).read().any(1 << P::BIT)
    }

    /// Resets peripheral `P`: all of its registers return to their reset
    /// values.
    pub fn periph_reset_pulse<P: RccPeripheral>(&mut self) {
        self.periph_reset_hold::<P>();
        self.periph_reset_release::<P>();
    }

    /// Holds peripheral `P` in reset until [`Self::periph_reset_release`].
    pub fn periph_reset_hold<P: RccPeripheral>(&mut self) {
        let mask = 1 << P::BIT;
        self.regs()
            .rstr(P::BUS)
            .modify(|_, w| w.set_mask(mask, true));
    }

    /// Releases peripheral `P` from reset.
    pub fn periph_reset_release<P: RccPeripheral>(&mut self) {
        let mask = 1 << P::BIT;
        self.regs()
            .rstr(P::BUS)
            .modify(|_, w| w.set_mask(mask, false));
    }

    /// Enables the clock of peripheral `P` and returns the token its driver
    /// needs. The clock tree stays frozen until the token is returned
    /// through [`Self::disable`].
    pub fn enable<P: RccPeripheral>(&mut self) -> Result<Enabled<P>, Error> {
        let clocks = self.clocks.ok_or(Error::UnknownClocks)?;
        if self.periph_clock_enabled::<P>() {
            return Err(Error::AlreadyEnabled);
        }
        self.periph_clock_enable::<P>();
        self.tokens += 1;
        let clock = clocks.frequency(P::CLOCK);
        debug!("peripheral clock enabled at {} Hz", clock.to_Hz());
        Ok(Enabled {
            clock,
            _peripheral: PhantomData,
        })
    }

    /// Disables the clock of the peripheral owned by `token`.
    ///
    /// A token that is dropped instead keeps the clock tree frozen.
    pub fn disable<P: RccPeripheral>(&mut self, token: Enabled<P>) {
        drop(token);
        self.tokens = self.tokens.saturating_sub(1);
        // Safety: `token` was the only token of `P`.
        unsafe { self.periph_clock_disable::<P>() };
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::flash::Flash;
    use crate::rcc::{ApbPrescaler, ClockSetup, Clocks};
    use crate::testing::fake_peripheral;

    const APB1RSTR: usize = 0x10;
    const APB2ENR: usize = 0x18;
    const APB1ENR: usize = 0x1c;
    const READY: u32 = (1 << 1) | (1 << 17) | (1 << 25);

    macro_rules! rcc_peripheral {
        ($name:ident, $bus:ident[$bit:expr], $clock:ident) => {
            enum $name {}
            unsafe impl PeripheralId for $name {
                fn address() -> *const () {
                    core::ptr::null()
                }
            }
            unsafe impl RccPeripheral for $name {
                const BUS: Bus = Bus::$bus;
                const BIT: u8 = $bit;
                const CLOCK: ClockDomain = ClockDomain::$clock;
            }
        };
    }

    #[test]
    fn gating_and_reset_use_the_bus_registers() {
        fake_peripheral!(Regs, 12);
        rcc_peripheral!(Tim3, Apb1[1], Apb1Timer);

        let mut rcc = unsafe { Rcc::<Regs>::new() };
        rcc.periph_clock_enable::<Tim3>();
        assert_eq!(Regs::block().word(APB1ENR), 0b10);
        assert!(rcc.periph_clock_enabled::<Tim3>());
        rcc.periph_reset_hold::<Tim3>();
        assert_eq!(Regs::block().word(APB1RSTR), 0b10);
        rcc.periph_reset_release::<Tim3>();
        assert_eq!(Regs::block().word(APB1RSTR), 0);
        unsafe { rcc.periph_clock_disable::<Tim3>() };
        assert_eq!(Regs::block().word(APB1ENR), 0);
    }

    #[test]
    fn enable_hands_out_one_token() {
        fake_peripheral!(Regs, 12);
        rcc_peripheral!(Adc1, Apb2[9], Adc);

        let mut rcc = unsafe { Rcc::<Regs>::new() };
        let token = rcc.enable::<Adc1>().unwrap();
        assert_eq!(token.peripheral_clock().to_MHz(), 4);
        assert_eq!(Regs::block().word(APB2ENR), 1 << 9);
        assert!(matches!(rcc.enable::<Adc1>(), Err(Error::AlreadyEnabled)));
        assert_eq!(rcc.live_tokens(), 1);
        rcc.disable(token);
        assert_eq!(Regs::block().word(APB2ENR), 0);
        assert_eq!(rcc.live_tokens(), 0);
        assert!(rcc.enable::<Adc1>().is_ok());
    }

    #[test]
    fn tokens_report_the_applied_clock_tree() {
        fake_peripheral!(Regs, 12);
        fake_peripheral!(Acr, 1);
        rcc_peripheral!(Tim2, Apb1[0], Apb1Timer);
        Regs::block().set_word(0x00, READY);

        let mut rcc = unsafe { Rcc::<Regs>::new() };
        let mut flash = unsafe { Flash::<Acr>::new() };
        assert_eq!(rcc.clocks(), Some(Clocks::default()));
        rcc.clock_setup(&mut flash, &ClockSetup::HSE_8MHZ_72MHZ)
            .unwrap();
        let token = rcc.enable::<Tim2>().unwrap();
        assert_eq!(token.peripheral_clock().to_MHz(), 72);
    }

    #[test]
    fn clock_tree_is_frozen_while_a_token_lives() {
        fake_peripheral!(Regs, 12);
        fake_peripheral!(Acr, 1);
        rcc_peripheral!(Tim2, Apb1[0], Apb1Timer);
        Regs::block().set_word(0x00, READY);

        let mut rcc = unsafe { Rcc::<Regs>::new() };
        let mut flash = unsafe { Flash::<Acr>::new() };
        let token = rcc.enable::<Tim2>().unwrap();
        let cfgr = Regs::block().word(0x04);

        assert_eq!(
            rcc.clock_setup(&mut flash, &ClockSetup::HSE_8MHZ_72MHZ),
            Err(Error::ClocksFrozen)
        );
        assert_eq!(rcc.set_ppre1(ApbPrescaler::Div2), Err(Error::ClocksFrozen));
        assert_eq!(Regs::block().word(0x00), READY);
        assert_eq!(Regs::block().word(0x04), cfgr);
        assert_eq!(token.peripheral_clock().to_MHz(), 8);
        assert_eq!(rcc.clocks(), Some(Clocks::default()));

        rcc.disable(token);
        assert!(rcc
            .clock_setup(&mut flash, &ClockSetup::HSE_8MHZ_72MHZ)
            .is_ok());
    }

    #[test]
    fn hand_configured_tree_must_be_declared() {
        fake_peripheral!(Regs, 12);
        rcc_peripheral!(Tim2, Apb1[0], Apb1Timer);

        let mut rcc = unsafe { Rcc::<Regs>::new() };
        rcc.set_ppre1(ApbPrescaler::Div2).unwrap();
        assert_eq!(rcc.clocks(), None);
        assert!(matches!(rcc.enable::<Tim2>(), Err(Error::UnknownClocks)));
        assert_eq!(Regs::block().word(APB1ENR), 0);

        unsafe { rcc.set_clocks(ClockSetup::HSE_8MHZ_72MHZ.clocks()) };
        let token = rcc.enable::<Tim2>().unwrap();
        assert_eq!(token.peripheral_clock().to_MHz(), 72);
    }

    #[test]
    fn failed_setup_leaves_the_tree_unknown() {
        fake_peripheral!(Regs, 12);
        fake_peripheral!(Acr, 1);
        rcc_peripheral!(Tim2, Apb1[0], Apb1Timer);
        Regs::block().set_word(0x00, 1 << 1);

        let mut rcc = unsafe { Rcc::<Regs>::new() };
        let mut flash = unsafe { Flash::<Acr>::new() };
        assert!(rcc
            .clock_setup(&mut flash, &ClockSetup::HSE_8MHZ_72MHZ)
            .is_err());
        assert!(matches!(rcc.enable::<Tim2>(), Err(Error::UnknownClocks)));
    }
}
