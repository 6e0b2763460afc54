//! Analog to digital converter registers, STM32F1 (ADC v1) layout

use super::{register_values, Reg};
use bitfield::bitfield;

/// ADC register block
#[repr(C)]
pub struct RegisterBlock {
    /// 0x00 - Status register
    pub sr: Reg<Sr>,
    /// 0x04 - Control register 1
    pub cr1: Reg<Cr1>,
    /// 0x08 - Control register 2
    pub cr2: Reg<Cr2>,
    /// 0x0c - Sample time registers, SMPR1 (channels 10-17) and SMPR2
    /// (channels 0-9)
    pub smpr: [Reg<u32>; 2],
    /// 0x14 - Injected channel data offset registers
    pub jofr: [Reg<u32>; 4],
    /// 0x24 - Watchdog high threshold register
    pub htr: Reg<u32>,
    /// 0x28 - Watchdog low threshold register
    pub ltr: Reg<u32>,
    /// 0x2c - Regular sequence registers SQR1..SQR3
    pub sqr: [Reg<u32>; 3],
    /// 0x38 - Injected sequence register
    pub jsqr: Reg<u32>,
    /// 0x3c - Injected data registers
    pub jdr: [Reg<u32>; 4],
    /// 0x4c - Regular data register
    pub dr: Reg<u32>,
}

/// SR flags, cleared by writing 0
pub mod sr {
    /// Analog watchdog flag
    pub const AWD: u32 = 1 << 0;
    /// Injected channel end of conversion
    pub const JEOC: u32 = 1 << 2;
}

bitfield! {
    /// SR
    #[derive(Copy, Clone)]
    pub struct Sr(u32);
    impl Debug;
    /// Analog watchdog flag
    pub awd, set_awd: 0;
    /// End of conversion
    pub eoc, set_eoc: 1;
    /// Injected channel end of conversion
    pub jeoc, set_jeoc: 2;
    /// Injected channel start flag
    pub jstrt, set_jstrt: 3;
    /// Regular channel start flag
    pub strt, set_strt: 4;
}

bitfield! {
    /// CR1
    #[derive(Copy, Clone)]
    pub struct Cr1(u32);
    impl Debug;
    /// Analog watchdog channel
    pub u8, awdch, set_awdch: 4, 0;
    /// End of conversion interrupt enable
    pub eocie, set_eocie: 5;
    /// Analog watchdog interrupt enable
    pub awdie, set_awdie: 6;
    /// Injected end of conversion interrupt enable
    pub jeocie, set_jeocie: 7;
    /// Scan mode
    pub scan, set_scan: 8;
    /// Watchdog on a single channel
    pub awdsgl, set_awdsgl: 9;
    /// Automatic injected group conversion
    pub jauto, set_jauto: 10;
    /// Discontinuous mode on regular channels
    pub discen, set_discen: 11;
    /// Discontinuous mode on injected channels
    pub jdiscen, set_jdiscen: 12;
    /// Discontinuous mode channel count minus one
    pub u8, discnum, set_discnum: 15, 13;
    /// Dual mode selection (ADC1 only)
    pub u8, dualmod, set_dualmod: 19, 16;
    /// Analog watchdog on injected channels
    pub jawden, set_jawden: 22;
    /// Analog watchdog on regular channels
    pub awden, set_awden: 23;
}

bitfield! {
    /// CR2
    #[derive(Copy, Clone)]
    pub struct Cr2(u32);
    impl Debug;
    /// A/D converter on / start conversion
    pub adon, set_adon: 0;
    /// Continuous conversion
    pub cont, set_cont: 1;
    /// A/D calibration
    pub cal, set_cal: 2;
    /// Reset calibration
    pub rstcal, set_rstcal: 3;
    /// Direct memory access mode
    pub dma, set_dma: 8;
    /// Data alignment, set for left alignment
    pub align, set_align: 11;
    /// External event select for injected group
    pub u8, jextsel, set_jextsel: 14, 12;
    /// External trigger conversion mode for injected channels
    pub jexttrig, set_jexttrig: 15;
    /// External event select for regular group
    pub u8, extsel, set_extsel: 19, 17;
    /// External trigger conversion mode for regular channels
    pub exttrig, set_exttrig: 20;
    /// Start conversion of injected channels
    pub jswstart, set_jswstart: 21;
    /// Start conversion of regular channels
    pub swstart, set_swstart: 22;
    /// Temperature sensor and VREFINT enable
    pub tsvrefe, set_tsvrefe: 23;
}

/// Width of one channel field in the sample time registers
pub const SMP_WIDTH: u32 = 3;
/// Width of one channel field in the sequence registers
pub const SQ_WIDTH: u32 = 5;
/// Regular sequence length field (L) in SQR1
pub const SQR1_L_SHIFT: u32 = 20;
/// Injected sequence length field (JL) in JSQR
pub const JSQR_JL_SHIFT: u32 = 20;

register_values!(Sr, Cr1, Cr2);

#[cfg(test)]
mod test {
    use super::*;
    use core::mem::offset_of;

    #[test]
    fn register_offsets() {
        assert_eq!(offset_of!(RegisterBlock, smpr), 0x0c);
        assert_eq!(offset_of!(RegisterBlock, jofr), 0x14);
        assert_eq!(offset_of!(RegisterBlock, htr), 0x24);
        assert_eq!(offset_of!(RegisterBlock, sqr), 0x2c);
        assert_eq!(offset_of!(RegisterBlock, jsqr), 0x38);
        assert_eq!(offset_of!(RegisterBlock, jdr), 0x3c);
        assert_eq!(offset_of!(RegisterBlock, dr), 0x4c);
    }
}
