//! Reset and clock control (RCC) registers, STM32F1 layout

use super::{register_values, Reg};
use bitfield::bitfield;

/// RCC register block
#[repr(C)]
pub struct RegisterBlock {
    /// 0x00 - Clock control register
    pub cr: Reg<Cr>,
    /// 0x04 - Clock configuration register
    pub cfgr: Reg<Cfgr>,
    /// 0x08 - Clock interrupt register
    pub cir: Reg<u32>,
    /// 0x0c - APB2 peripheral reset register
    pub apb2rstr: Reg<u32>,
    /// 0x10 - APB1 peripheral reset register
    pub apb1rstr: Reg<u32>,
    /// 0x14 - AHB peripheral clock enable register
    pub ahbenr: Reg<u32>,
    /// 0x18 - APB2 peripheral clock enable register
    pub apb2enr: Reg<u32>,
    /// 0x1c - APB1 peripheral clock enable register
    pub apb1enr: Reg<u32>,
    /// 0x20 - Backup domain control register
    pub bdcr: Reg<Bdcr>,
    /// 0x24 - Control/status register
    pub csr: Reg<Csr>,
    /// 0x28 - AHB peripheral reset register (connectivity line)
    pub ahbrstr: Reg<u32>,
    /// 0x2c - Clock configuration register 2 (connectivity line)
    pub cfgr2: Reg<u32>,
}

bitfield! {
    /// CR
    #[derive(Copy, Clone)]
    pub struct Cr(u32);
    impl Debug;
    /// Internal high-speed clock enable
    pub hsion, set_hsion: 0;
    /// Internal high-speed clock ready
    pub hsirdy, _: 1;
    /// Internal high-speed clock trimming
    pub u8, hsitrim, set_hsitrim: 7, 3;
    /// Internal high-speed clock calibration
    pub u8, hsical, _: 15, 8;
    /// External high-speed clock enable
    pub hseon, set_hseon: 16;
    /// External high-speed clock ready
    pub hserdy, _: 17;
    /// External high-speed clock bypass
    pub hsebyp, set_hsebyp: 18;
    /// Clock security system enable
    pub csson, set_csson: 19;
    /// PLL enable
    pub pllon, set_pllon: 24;
    /// PLL ready
    pub pllrdy, _: 25;
}

bitfield! {
    /// CFGR
    #[derive(Copy, Clone)]
    pub struct Cfgr(u32);
    impl Debug;
    /// System clock switch
    pub u8, sw, set_sw: 1, 0;
    /// System clock switch status
    pub u8, sws, _: 3, 2;
    /// AHB prescaler
    pub u8, hpre, set_hpre: 7, 4;
    /// APB low-speed prescaler (APB1)
    pub u8, ppre1, set_ppre1: 10, 8;
    /// APB high-speed prescaler (APB2)
    pub u8, ppre2, set_ppre2: 13, 11;
    /// ADC prescaler
    pub u8, adcpre, set_adcpre: 15, 14;
    /// PLL entry clock source, set for HSE
    pub pllsrc, set_pllsrc: 16;
    /// HSE divider for PLL entry
    pub pllxtpre, set_pllxtpre: 17;
    /// PLL multiplication factor
    pub u8, pllmul, set_pllmul: 21, 18;
    /// USB prescaler, set when the PLL clock is not divided
    pub usbpre, set_usbpre: 22;
    /// Microcontroller clock output
    pub u8, mco, set_mco: 26, 24;
}

/// CIR bit positions. Ready flags start at bit 0, the matching interrupt
/// enables at bit 8 and the clear bits at bit 16.
pub mod cir {
    /// Ready interrupt enables
    pub const IE_SHIFT: u32 = 8;
    /// Ready flag clear bits
    pub const CLEAR_SHIFT: u32 = 16;
    /// Clock security system interrupt flag
    pub const CSSF: u32 = 1 << 7;
    /// Clock security system interrupt clear
    pub const CSSC: u32 = 1 << 23;
}

bitfield! {
    /// BDCR
    #[derive(Copy, Clone)]
    pub struct Bdcr(u32);
    impl Debug;
    /// External low-speed oscillator enable
    pub lseon, set_lseon: 0;
    /// External low-speed oscillator ready
    pub lserdy, _: 1;
    /// External low-speed oscillator bypass
    pub lsebyp, set_lsebyp: 2;
    /// RTC clock source selection
    pub u8, rtcsel, set_rtcsel: 9, 8;
    /// RTC clock enable
    pub rtcen, set_rtcen: 15;
    /// Backup domain software reset
    pub bdrst, set_bdrst: 16;
}

bitfield! {
    /// CSR
    #[derive(Copy, Clone)]
    pub struct Csr(u32);
    impl Debug;
    /// Internal low-speed oscillator enable
    pub lsion, set_lsion: 0;
    /// Internal low-speed oscillator ready
    pub lsirdy, _: 1;
    /// Remove reset flags
    pub rmvf, set_rmvf: 24;
    /// Reset flags, PINRSTF to LPWRRSTF
    pub u8, reset_flags, _: 31, 26;
}

register_values!(Cr, Cfgr, Bdcr, Csr);

#[cfg(test)]
mod test {
    use super::*;
    use core::mem::offset_of;

    #[test]
    fn register_offsets() {
        assert_eq!(offset_of!(RegisterBlock, cir), 0x08);
        assert_eq!(offset_of!(RegisterBlock, apb1rstr), 0x10);
        assert_eq!(offset_of!(RegisterBlock, apb1enr), 0x1c);
        assert_eq!(offset_of!(RegisterBlock, bdcr), 0x20);
        assert_eq!(offset_of!(RegisterBlock, cfgr2), 0x2c);
    }

    #[test]
    fn cfgr_fields() {
        let mut cfgr = Cfgr(0);
        cfgr.set_pllmul(7);
        cfgr.set_ppre1(4);
        cfgr.set_adcpre(2);
        cfgr.set_pllsrc(true);
        assert_eq!(cfgr.0, (7 << 18) | (4 << 8) | (2 << 14) | (1 << 16));
    }
}
