use super::{
    AdcPrescaler, AhbPrescaler, ApbPrescaler, ClockDomain, Error, Osc, PllSource, PllXtpre, Rcc,
    SysClk, UsbPrescaler,
};
use crate::flash::{Flash, Latency};
use defmt_or_log::{debug, trace};
use fugit::HertzU32;
use opencm3_core::PeripheralId;

const HSI: u32 = 8_000_000;

/// Clock entering the PLL
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PllInput {
    /// HSI divided by two, 4 MHz
    HsiDiv2,
    /// HSE crystal or external clock
    Hse {
        /// HSE frequency
        frequency: HertzU32,
        /// Divide HSE by two in front of the PLL
        divide_by_2: bool,
    },
}

impl PllInput {
    fn frequency(&self) -> u32 {
        match self {
            PllInput::HsiDiv2 => HSI / 2,
            PllInput::Hse {
                frequency,
                divide_by_2: true,
            } => frequency.raw() / 2,
            PllInput::Hse { frequency, .. } => frequency.raw(),
        }
    }
}

/// A PLL driven clock tree, applied by [`Rcc::clock_setup`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockSetup {
    /// PLL entry clock
    pub pll_input: PllInput,
    /// PLL multiplication factor, 2 to 16
    pub pll_mul: u8,
    /// AHB prescaler
    pub hpre: AhbPrescaler,
    /// APB1 prescaler
    pub ppre1: ApbPrescaler,
    /// APB2 prescaler
    pub ppre2: ApbPrescaler,
    /// ADC prescaler
    pub adcpre: AdcPrescaler,
    /// USB prescaler, left untouched if `None`
    pub usbpre: Option<UsbPrescaler>,
    /// Flash wait states for the resulting SYSCLK
    pub latency: Latency,
}

impl ClockSetup {
    /// HSI, 24 MHz SYSCLK
    pub const HSI_24MHZ: Self = Self {
        pll_input: PllInput::HsiDiv2,
        pll_mul: 6,
        hpre: AhbPrescaler::Div1,
        ppre1: ApbPrescaler::Div1,
        ppre2: ApbPrescaler::Div1,
        adcpre: AdcPrescaler::Div2,
        usbpre: None,
        latency: Latency::Ws0,
    };

    /// HSI, 48 MHz SYSCLK with a 48 MHz USB clock
    pub const HSI_48MHZ: Self = Self {
        pll_input: PllInput::HsiDiv2,
        pll_mul: 12,
        hpre: AhbPrescaler::Div1,
        ppre1: ApbPrescaler::Div2,
        ppre2: ApbPrescaler::Div1,
        adcpre: AdcPrescaler::Div8,
        usbpre: Some(UsbPrescaler::Div1),
        latency: Latency::Ws1,
    };

    /// HSI, 64 MHz SYSCLK
    pub const HSI_64MHZ: Self = Self {
        pll_input: PllInput::HsiDiv2,
        pll_mul: 16,
        hpre: AhbPrescaler::Div1,
        ppre1: ApbPrescaler::Div2,
        ppre2: ApbPrescaler::Div1,
        adcpre: AdcPrescaler::Div8,
        usbpre: None,
        latency: Latency::Ws2,
    };

    /// 8 MHz HSE, 24 MHz SYSCLK
    pub const HSE_8MHZ_24MHZ: Self = Self {
        pll_input: PllInput::Hse {
            frequency: HertzU32::from_raw(8_000_000),
            divide_by_2: false,
        },
        pll_mul: 3,
        hpre: AhbPrescaler::Div1,
        ppre1: ApbPrescaler::Div1,
        ppre2: ApbPrescaler::Div1,
        adcpre: AdcPrescaler::Div2,
        usbpre: None,
        latency: Latency::Ws0,
    };

    /// 8 MHz HSE, 72 MHz SYSCLK
    pub const HSE_8MHZ_72MHZ: Self = Self {
        pll_input: PllInput::Hse {
            frequency: HertzU32::from_raw(8_000_000),
            divide_by_2: false,
        },
        pll_mul: 9,
        hpre: AhbPrescaler::Div1,
        ppre1: ApbPrescaler::Div2,
        ppre2: ApbPrescaler::Div1,
        adcpre: AdcPrescaler::Div8,
        usbpre: None,
        latency: Latency::Ws2,
    };

    /// 12 MHz HSE, 72 MHz SYSCLK
    pub const HSE_12MHZ_72MHZ: Self = Self {
        pll_input: PllInput::Hse {
            frequency: HertzU32::from_raw(12_000_000),
            divide_by_2: false,
        },
        pll_mul: 6,
        hpre: AhbPrescaler::Div1,
        ppre1: ApbPrescaler::Div2,
        ppre2: ApbPrescaler::Div1,
        adcpre: AdcPrescaler::Div6,
        usbpre: None,
        latency: Latency::Ws2,
    };

    /// 16 MHz HSE, 72 MHz SYSCLK
    pub const HSE_16MHZ_72MHZ: Self = Self {
        pll_input: PllInput::Hse {
            frequency: HertzU32::from_raw(16_000_000),
            divide_by_2: true,
        },
        pll_mul: 9,
        hpre: AhbPrescaler::Div1,
        ppre1: ApbPrescaler::Div2,
        ppre2: ApbPrescaler::Div1,
        adcpre: AdcPrescaler::Div6,
        usbpre: None,
        latency: Latency::Ws2,
    };

    /// SYSCLK produced by this setup
    pub fn sysclk(&self) -> HertzU32 {
        HertzU32::from_raw(self.pll_input.frequency() * u32::from(self.pll_mul))
    }

    /// Bus clocks produced by this setup
    pub fn clocks(&self) -> Clocks {
        Clocks::derive(
            self.sysclk().raw(),
            self.hpre,
            self.ppre1,
            self.ppre2,
            self.adcpre,
        )
    }
}

/// Frozen clock tree frequencies
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Clocks {
    sysclk: HertzU32,
    hclk: HertzU32,
    pclk1: HertzU32,
    pclk2: HertzU32,
    adcclk: HertzU32,
    timclk1: HertzU32,
    timclk2: HertzU32,
}

/// Timers run at twice the APB clock unless the APB prescaler is 1.
fn timer_clock(pclk: u32, ppre: ApbPrescaler) -> u32 {
    match ppre {
        ApbPrescaler::Div1 => pclk,
        _ => pclk * 2,
    }
}

impl Clocks {
    fn derive(
        sysclk: u32,
        hpre: AhbPrescaler,
        ppre1: ApbPrescaler,
        ppre2: ApbPrescaler,
        adcpre: AdcPrescaler,
    ) -> Self {
        let hclk = sysclk / hpre.divisor();
        let pclk1 = hclk / ppre1.divisor();
        let pclk2 = hclk / ppre2.divisor();
        Self {
            sysclk: HertzU32::from_raw(sysclk),
            hclk: HertzU32::from_raw(hclk),
            pclk1: HertzU32::from_raw(pclk1),
            pclk2: HertzU32::from_raw(pclk2),
            adcclk: HertzU32::from_raw(pclk2 / adcpre.divisor()),
            timclk1: HertzU32::from_raw(timer_clock(pclk1, ppre1)),
            timclk2: HertzU32::from_raw(timer_clock(pclk2, ppre2)),
        }
    }

    /// System clock
    pub fn sysclk(&self) -> HertzU32 {
        self.sysclk
    }

    /// AHB clock
    pub fn hclk(&self) -> HertzU32 {
        self.hclk
    }

    /// APB1 clock
    pub fn pclk1(&self) -> HertzU32 {
        self.pclk1
    }

    /// APB2 clock
    pub fn pclk2(&self) -> HertzU32 {
        self.pclk2
    }

    /// ADC clock
    pub fn adcclk(&self) -> HertzU32 {
        self.adcclk
    }

    /// Clock of the timers on APB1
    pub fn timclk1(&self) -> HertzU32 {
        self.timclk1
    }

    /// Clock of the timers on APB2
    pub fn timclk2(&self) -> HertzU32 {
        self.timclk2
    }

    /// Clock of `domain`
    pub fn frequency(&self, domain: ClockDomain) -> HertzU32 {
        match domain {
            ClockDomain::Ahb => self.hclk,
            ClockDomain::Apb1 => self.pclk1,
            ClockDomain::Apb2 => self.pclk2,
            ClockDomain::Apb1Timer => self.timclk1,
            ClockDomain::Apb2Timer => self.timclk2,
            ClockDomain::Adc => self.adcclk,
        }
    }
}

/// The clock tree after reset: everything runs from the 8 MHz HSI.
impl Default for Clocks {
    fn default() -> Self {
        Self::derive(
            HSI,
            AhbPrescaler::Div1,
            ApbPrescaler::Div1,
            ApbPrescaler::Div1,
            AdcPrescaler::Div2,
        )
    }
}

impl<Id: PeripheralId> Rcc<Id> {
    /// Switches the system clock to the PLL configured by `setup`.
    ///
    /// The system clock first falls back to HSI (and HSE, if the PLL is fed
    /// from it) so that the PLL can be reconfigured. The flash wait states
    /// are raised before the PLL output is selected.
    ///
    /// Fails with [`Error::ClocksFrozen`] while an [`Enabled`] token is
    /// alive. If an oscillator does not start, the clock tree is left
    /// unknown and [`Rcc::enable`] fails until a setup succeeds.
    ///
    /// [`Enabled`]: super::Enabled
    pub fn clock_setup<F: PeripheralId>(
        &mut self,
        flash: &mut Flash<F>,
        setup: &ClockSetup,
    ) -> Result<Clocks, Error> {
        if self.tokens != 0 {
            return Err(Error::ClocksFrozen);
        }
        if !(2..=16).contains(&setup.pll_mul) {
            return Err(Error::InvalidPllMultiplier(setup.pll_mul));
        }

        trace!("switching to HSI");
        self.osc_on(Osc::Hsi);
        self.wait_for_osc_ready(Osc::Hsi)?;
        self.set_sysclk_source(SysClk::Hsi)?;

        if let PllInput::Hse { .. } = setup.pll_input {
            trace!("switching to HSE");
            self.osc_on(Osc::Hse);
            self.wait_for_osc_ready(Osc::Hse)?;
            self.set_sysclk_source(SysClk::Hse)?;
        }

        self.set_hpre(setup.hpre)?;
        self.set_adcpre(setup.adcpre)?;
        self.set_ppre1(setup.ppre1)?;
        self.set_ppre2(setup.ppre2)?;
        if let Some(usbpre) = setup.usbpre {
            self.set_usbpre(usbpre);
        }
        flash.set_latency(setup.latency);

        self.set_pll_multiplication_factor(setup.pll_mul)?;
        match setup.pll_input {
            PllInput::HsiDiv2 => self.set_pll_source(PllSource::HsiDiv2),
            PllInput::Hse { divide_by_2, .. } => {
                self.set_pll_source(PllSource::Hse);
                self.set_pllxtpre(if divide_by_2 {
                    PllXtpre::Div2
                } else {
                    PllXtpre::Div1
                });
            }
        }

        trace!("switching to PLL");
        self.osc_on(Osc::Pll);
        self.wait_for_osc_ready(Osc::Pll)?;
        self.set_sysclk_source(SysClk::Pll)?;

        let clocks = setup.clocks();
        debug!("SYSCLK {} Hz", clocks.sysclk().to_Hz());
        self.clocks = Some(clocks);
        Ok(clocks)
    }
}
