//! Reset and clock control, STM32F1
//!
//! [`Rcc`] owns the RCC register block. It switches the oscillators and the
//! clock tree, gates the peripheral clocks and resets peripherals. Peripheral
//! drivers get their clock frequency from an [`Enabled`] token, which
//! implements [`Dependencies`] and is handed out by [`Rcc::enable`]. The
//! frequency comes from the clock tree `Rcc` applied last, and the tree
//! cannot change while a token is alive.
//!
//! The common clock trees are available as [`ClockSetup`] presets:
//!
//! ```no_run
//! # use opencm3::{flash::Flash, rcc::{ClockSetup, Rcc}, stm32f1::{FLASH, RCC}};
//! # fn example() -> Result<(), opencm3::rcc::Error> {
//! let mut rcc = unsafe { Rcc::<RCC>::new() };
//! let mut flash = unsafe { Flash::<FLASH>::new() };
//! let clocks = rcc.clock_setup(&mut flash, &ClockSetup::HSE_8MHZ_72MHZ)?;
//! assert_eq!(clocks.sysclk().to_MHz(), 72);
//! # Ok(())
//! # }
//! ```
//!
//! [`Dependencies`]: opencm3_core::Dependencies

mod clocks;
mod enable;

pub use clocks::{ClockSetup, Clocks, PllInput};
pub use enable::{Bus, ClockDomain, Enabled, Error, RccPeripheral};

use crate::poll::{self, Timeout};
use crate::reg::rcc::{cir, RegisterBlock};
use crate::reg::RegisterValue as _;
use bitfield::bitfield;
use core::marker::PhantomData;
use defmt_or_log::trace;
use opencm3_core::PeripheralId;

/// Clock sources that can be switched on and off
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Osc {
    /// Phase locked loop
    Pll,
    /// External high-speed oscillator
    Hse,
    /// Internal high-speed oscillator
    Hsi,
    /// External low-speed oscillator
    Lse,
    /// Internal low-speed oscillator
    Lsi,
}

impl Osc {
    /// Position of the ready flag in CIR. The interrupt enable and the clear
    /// bit follow at fixed distances.
    fn cir_bit(self) -> u32 {
        match self {
            Osc::Lsi => 0,
            Osc::Lse => 1,
            Osc::Hsi => 2,
            Osc::Hse => 3,
            Osc::Pll => 4,
        }
    }
}

/// External oscillators, the only ones that can be bypassed by an external
/// clock signal
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExternalOsc {
    /// External high-speed oscillator
    Hse,
    /// External low-speed oscillator
    Lse,
}

/// System clock source (SW / SWS)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SysClk {
    /// HSI
    Hsi = 0,
    /// HSE
    Hse = 1,
    /// PLL output
    Pll = 2,
}

/// PLL entry clock (PLLSRC)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PllSource {
    /// HSI divided by two
    HsiDiv2,
    /// HSE, optionally divided by two, see [`PllXtpre`]
    Hse,
}

/// HSE divider in front of the PLL (PLLXTPRE)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PllXtpre {
    /// HSE is not divided
    Div1,
    /// HSE is divided by two
    Div2,
}

/// AHB prescaler (HPRE)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AhbPrescaler {
    /// SYSCLK not divided
    Div1 = 0,
    /// SYSCLK / 2
    Div2 = 8,
    /// SYSCLK / 4
    Div4 = 9,
    /// SYSCLK / 8
    Div8 = 10,
    /// SYSCLK / 16
    Div16 = 11,
    /// SYSCLK / 64
    Div64 = 12,
    /// SYSCLK / 128
    Div128 = 13,
    /// SYSCLK / 256
    Div256 = 14,
    /// SYSCLK / 512
    Div512 = 15,
}

impl AhbPrescaler {
    /// Division factor
    pub const fn divisor(self) -> u32 {
        match self {
            AhbPrescaler::Div1 => 1,
            AhbPrescaler::Div2 => 2,
            AhbPrescaler::Div4 => 4,
            AhbPrescaler::Div8 => 8,
            AhbPrescaler::Div16 => 16,
            AhbPrescaler::Div64 => 64,
            AhbPrescaler::Div128 => 128,
            AhbPrescaler::Div256 => 256,
            AhbPrescaler::Div512 => 512,
        }
    }
}

/// APB prescaler (PPRE1, PPRE2)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ApbPrescaler {
    /// HCLK not divided
    Div1 = 0,
    /// HCLK / 2
    Div2 = 4,
    /// HCLK / 4
    Div4 = 5,
    /// HCLK / 8
    Div8 = 6,
    /// HCLK / 16
    Div16 = 7,
}

impl ApbPrescaler {
    /// Division factor
    pub const fn divisor(self) -> u32 {
        match self {
            ApbPrescaler::Div1 => 1,
            ApbPrescaler::Div2 => 2,
            ApbPrescaler::Div4 => 4,
            ApbPrescaler::Div8 => 8,
            ApbPrescaler::Div16 => 16,
        }
    }
}

/// ADC prescaler (ADCPRE)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcPrescaler {
    /// PCLK2 / 2
    Div2 = 0,
    /// PCLK2 / 4
    Div4 = 1,
    /// PCLK2 / 6
    Div6 = 2,
    /// PCLK2 / 8
    Div8 = 3,
}

impl AdcPrescaler {
    /// Division factor
    pub const fn divisor(self) -> u32 {
        (self as u32 + 1) * 2
    }
}

/// USB prescaler (USBPRE)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbPrescaler {
    /// PLL clock divided by 1.5
    Div1_5,
    /// PLL clock not divided
    Div1,
}

/// Microcontroller clock output source (MCO)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mco {
    /// No clock
    NoClock = 0,
    /// System clock
    Sysclk = 4,
    /// HSI
    Hsi = 5,
    /// HSE
    Hse = 6,
    /// PLL clock divided by two
    PllDiv2 = 7,
}

bitfield! {
    /// Causes of the last resets (CSR flags)
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct ResetFlags(u32);
    impl Debug;

    /// NRST pin
    pub pin, _: 26;
    /// Power-on / power-down reset
    pub por, _: 27;
    /// Software reset
    pub software, _: 28;
    /// Independent watchdog
    pub independent_watchdog, _: 29;
    /// Window watchdog
    pub window_watchdog, _: 30;
    /// Low-power management
    pub low_power, _: 31;
}

/// Reset and clock controller `Id`
///
/// Keeps track of the clock tree it configured and of the [`Enabled`]
/// tokens it handed out. While a token is alive the clock tree is frozen:
/// [`Self::clock_setup`] and the prescaler and system clock setters fail
/// with [`Error::ClocksFrozen`].
pub struct Rcc<Id> {
    /// `None` after the tree was changed by hand or a setup failed halfway
    clocks: Option<Clocks>,
    tokens: u32,
    _id: PhantomData<Id>,
}

impl<Id: PeripheralId> Rcc<Id> {
    /// Takes ownership of the reset and clock controller.
    ///
    /// # Safety
    /// Only one `Rcc` may exist for the same `Id`, and no other code may
    /// touch the RCC registers while it exists. The clock tree must be in
    /// its reset state, see [`Clocks::default`].
    pub unsafe fn new() -> Self {
        Self {
            clocks: Some(Clocks::default()),
            tokens: 0,
            _id: PhantomData,
        }
    }

    /// The current clock tree, `None` if it is not known.
    pub fn clocks(&self) -> Option<Clocks> {
        self.clocks
    }

    /// Declares the clock tree after configuring it with the individual
    /// setters.
    ///
    /// # Safety
    /// `clocks` must describe the frequencies the hardware runs at.
    pub unsafe fn set_clocks(&mut self, clocks: Clocks) {
        self.clocks = Some(clocks);
    }

    /// Number of [`Enabled`] tokens that were handed out and not returned
    pub fn live_tokens(&self) -> u32 {
        self.tokens
    }

    /// Refuses changes of the clock tree while a token is alive. Otherwise
    /// the tree becomes unknown until it is set up again.
    fn thaw(&mut self) -> Result<(), Error> {
        if self.tokens != 0 {
            return Err(Error::ClocksFrozen);
        }
        self.clocks = None;
        Ok(())
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
        // Safety: `new` makes `self` the owner of the registers.
        unsafe { self.registers() }
    }

    /// Switches an oscillator on. It is usable once
    /// [`Self::is_osc_ready`] returns `true`.
    pub fn osc_on(&mut self, osc: Osc) {
        let regs = self.regs();
        match osc {
            Osc::Pll => regs.cr.modify(|_, w| w.set_pllon(true)),
            Osc::Hse => regs.cr.modify(|_, w| w.set_hseon(true)),
            Osc::Hsi => regs.cr.modify(|_, w| w.set_hsion(true)),
            Osc::Lse => regs.bdcr.modify(|_, w| w.set_lseon(true)),
            Osc::Lsi => regs.csr.modify(|_, w| w.set_lsion(true)),
        }
    }

    /// Switches an oscillator off. The oscillator driving the system clock
    /// keeps running.
    pub fn osc_off(&mut self, osc: Osc) {
        let regs = self.regs();
        match osc {
            Osc::Pll => regs.cr.modify(|_, w| w.set_pllon(false)),
            Osc::Hse => regs.cr.modify(|_, w| w.set_hseon(false)),
            Osc::Hsi => regs.cr.modify(|_, w| w.set_hsion(false)),
            Osc::Lse => regs.bdcr.modify(|_, w| w.set_lseon(false)),
            Osc::Lsi => regs.csr.modify(|_, w| w.set_lsion(false)),
        }
    }

    /// `true` when the oscillator is stable.
    pub fn is_osc_ready(&self, osc: Osc) -> bool {
        let regs = self.regs();
        match osc {
            Osc::Pll => regs.cr.read().pllrdy(),
            Osc::Hse => regs.cr.read().hserdy(),
            Osc::Hsi => regs.cr.read().hsirdy(),
            Osc::Lse => regs.bdcr.read().lserdy(),
            Osc::Lsi => regs.csr.read().lsirdy(),
        }
    }

    /// Waits until the oscillator is stable.
    pub fn wait_for_osc_ready(&self, osc: Osc) -> Result<(), Timeout> {
        poll::until(|| self.is_osc_ready(osc))
    }

    /// Feeds an external clock signal instead of a crystal to `osc`. Only
    /// effective while the oscillator is off.
    pub fn osc_bypass_enable(&mut self, osc: ExternalOsc) {
        match osc {
            ExternalOsc::Hse => self.regs().cr.modify(|_, w| w.set_hsebyp(true)),
            ExternalOsc::Lse => self.regs().bdcr.modify(|_, w| w.set_lsebyp(true)),
        }
    }

    /// Drives a crystal with `osc`. Only effective while the oscillator is
    /// off.
    pub fn osc_bypass_disable(&mut self, osc: ExternalOsc) {
        match osc {
            ExternalOsc::Hse => self.regs().cr.modify(|_, w| w.set_hsebyp(false)),
            ExternalOsc::Lse => self.regs().bdcr.modify(|_, w| w.set_lsebyp(false)),
        }
    }

    /// Enables the ready interrupt of `osc`.
    pub fn osc_ready_int_enable(&mut self, osc: Osc) {
        let mask = 1 << (osc.cir_bit() + cir::IE_SHIFT);
        self.regs().cir.modify(|_, w| w.set_mask(mask, true));
    }

    /// Disables the ready interrupt of `osc`.
    pub fn osc_ready_int_disable(&mut self, osc: Osc) {
        let mask = 1 << (osc.cir_bit() + cir::IE_SHIFT);
        self.regs().cir.modify(|_, w| w.set_mask(mask, false));
    }

    /// Clears the ready interrupt flag of `osc`.
    pub fn osc_ready_int_clear(&mut self, osc: Osc) {
        let mask = 1 << (osc.cir_bit() + cir::CLEAR_SHIFT);
        self.regs().cir.modify(|_, w| w.set_mask(mask, true));
    }

    /// `true` if the ready interrupt of `osc` is flagged.
    pub fn osc_ready_int_flag(&self, osc: Osc) -> bool {
        self.regs().cir.read().any(1 << osc.cir_bit())
    }

    /// Enables the clock security system. A failure of HSE switches the
    /// system clock to HSI and raises an NMI.
    pub fn css_enable(&mut self) {
        self.regs().cr.modify(|_, w| w.set_csson(true));
    }

    /// Disables the clock security system.
    pub fn css_disable(&mut self) {
        self.regs().cr.modify(|_, w| w.set_csson(false));
    }

    /// Clears the clock security system interrupt flag.
    pub fn css_int_clear(&mut self) {
        self.regs().cir.modify(|_, w| w.set_mask(cir::CSSC, true));
    }

    /// `true` if the clock security system detected an HSE failure.
    pub fn css_int_flag(&self) -> bool {
        self.regs().cir.read().any(cir::CSSF)
    }

    /// Switches the system clock. The switch takes effect once the source is
    /// ready, see [`Self::system_clock_source`].
    pub fn set_sysclk_source(&mut self, source: SysClk) -> Result<(), Error> {
        self.thaw()?;
        self.regs().cfgr.modify(|_, w| w.set_sw(source as u8));
        Ok(())
    }

    /// Clock currently driving the system clock
    pub fn system_clock_source(&self) -> SysClk {
        match self.regs().cfgr.read().sws() {
            0 => SysClk::Hsi,
            1 => SysClk::Hse,
            _ => SysClk::Pll,
        }
    }

    /// Sets the PLL multiplication factor, 2 to 16.
    pub fn set_pll_multiplication_factor(&mut self, factor: u8) -> Result<(), Error> {
        if !(2..=16).contains(&factor) {
            return Err(Error::InvalidPllMultiplier(factor));
        }
        // x16 is encoded as 0b1110, 0b1111 is an undocumented alias.
        self.regs().cfgr.modify(|_, w| w.set_pllmul(factor - 2));
        Ok(())
    }

    /// Selects the PLL entry clock. Only effective while the PLL is off.
    pub fn set_pll_source(&mut self, source: PllSource) {
        self.regs()
            .cfgr
            .modify(|_, w| w.set_pllsrc(source == PllSource::Hse));
    }

    /// Selects the HSE divider in front of the PLL.
    pub fn set_pllxtpre(&mut self, xtpre: PllXtpre) {
        self.regs()
            .cfgr
            .modify(|_, w| w.set_pllxtpre(xtpre == PllXtpre::Div2));
    }

    /// Sets the AHB prescaler.
    pub fn set_hpre(&mut self, prescaler: AhbPrescaler) -> Result<(), Error> {
        self.thaw()?;
        self.regs().cfgr.modify(|_, w| w.set_hpre(prescaler as u8));
        Ok(())
    }

    /// Sets the APB1 prescaler. PCLK1 must not exceed 36 MHz.
    pub fn set_ppre1(&mut self, prescaler: ApbPrescaler) -> Result<(), Error> {
        self.thaw()?;
        self.regs().cfgr.modify(|_, w| w.set_ppre1(prescaler as u8));
        Ok(())
    }

    /// Sets the APB2 prescaler.
    pub fn set_ppre2(&mut self, prescaler: ApbPrescaler) -> Result<(), Error> {
        self.thaw()?;
        self.regs().cfgr.modify(|_, w| w.set_ppre2(prescaler as u8));
        Ok(())
    }

    /// Sets the ADC prescaler. The ADC clock must not exceed 14 MHz.
    pub fn set_adcpre(&mut self, prescaler: AdcPrescaler) -> Result<(), Error> {
        self.thaw()?;
        self.regs().cfgr.modify(|_, w| w.set_adcpre(prescaler as u8));
        Ok(())
    }

    /// Sets the USB prescaler. The USB clock must be 48 MHz.
    pub fn set_usbpre(&mut self, prescaler: UsbPrescaler) {
        self.regs()
            .cfgr
            .modify(|_, w| w.set_usbpre(prescaler == UsbPrescaler::Div1));
    }

    /// Selects the clock routed to the MCO pin.
    pub fn set_mco(&mut self, mco: Mco) {
        self.regs().cfgr.modify(|_, w| w.set_mco(mco as u8));
    }

    /// Resets the backup domain (RTC, LSE and backup registers).
    pub fn backupdomain_reset(&mut self) {
        self.regs().bdcr.modify(|_, w| w.set_bdrst(true));
        self.regs().bdcr.modify(|_, w| w.set_bdrst(false));
    }

    /// Flags of the resets that occurred since the flags were last cleared
    pub fn reset_cause(&self) -> ResetFlags {
        ResetFlags(self.regs().csr.bits() & 0xfc00_0000)
    }

    /// Clears the reset flags.
    pub fn clear_reset_flags(&mut self) {
        trace!("clearing reset flags");
        self.regs().csr.modify(|_, w| w.set_rmvf(true));
    }
}
