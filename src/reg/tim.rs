//! Timer (TIMx) registers

use super::{register_values, Reg};
use bitfield::bitfield;

/// Timer register block
#[repr(C)]
pub struct RegisterBlock {
    /// 0x00 - Control register 1
    pub cr1: Reg<Cr1>,
    /// 0x04 - Control register 2
    pub cr2: Reg<Cr2>,
    /// 0x08 - Slave mode control register
    pub smcr: Reg<Smcr>,
    /// 0x0c - DMA/interrupt enable register
    pub dier: Reg<u32>,
    /// 0x10 - Status register
    pub sr: Reg<u32>,
    /// 0x14 - Event generation register
    pub egr: Reg<u32>,
    /// 0x18 - Capture/compare mode registers (channels 1-2 and 3-4)
    pub ccmr: [Reg<u32>; 2],
    /// 0x20 - Capture/compare enable register
    pub ccer: Reg<u32>,
    /// 0x24 - Counter
    pub cnt: Reg<u32>,
    /// 0x28 - Prescaler
    pub psc: Reg<u32>,
    /// 0x2c - Auto-reload register
    pub arr: Reg<u32>,
    /// 0x30 - Repetition counter register
    pub rcr: Reg<u32>,
    /// 0x34 - Capture/compare registers 1-4
    pub ccr: [Reg<u32>; 4],
    /// 0x44 - Break and dead-time register
    pub bdtr: Reg<Bdtr>,
    /// 0x48 - DMA control register
    pub dcr: Reg<u32>,
    /// 0x4c - DMA address for full transfer
    pub dmar: Reg<u32>,
    /// 0x50 - Option register
    pub or: Reg<u32>,
}

bitfield! {
    /// CR1
    #[derive(Copy, Clone)]
    pub struct Cr1(u32);
    impl Debug;
    /// Counter enable
    pub cen, set_cen: 0;
    /// Update disable
    pub udis, set_udis: 1;
    /// Update request source
    pub urs, set_urs: 2;
    /// One-pulse mode
    pub opm, set_opm: 3;
    /// Direction, set when counting down
    pub dir, set_dir: 4;
    /// Center-aligned mode selection
    pub u8, cms, set_cms: 6, 5;
    /// Auto-reload preload enable
    pub arpe, set_arpe: 7;
    /// Clock division
    pub u8, ckd, set_ckd: 9, 8;
}

bitfield! {
    /// CR2
    #[derive(Copy, Clone)]
    pub struct Cr2(u32);
    impl Debug;
    /// Capture/compare preloaded control
    pub ccpc, set_ccpc: 0;
    /// Capture/compare control update selection
    pub ccus, set_ccus: 2;
    /// Capture/compare DMA selection
    pub ccds, set_ccds: 3;
    /// Master mode selection
    pub u8, mms, set_mms: 6, 4;
    /// TI1 selection (XOR of CH1..CH3)
    pub ti1s, set_ti1s: 7;
}

/// Output idle state bits (OISx, OISxN) start here, one bit per output
pub const CR2_OIS_SHIFT: u32 = 8;

bitfield! {
    /// SMCR
    #[derive(Copy, Clone)]
    pub struct Smcr(u32);
    impl Debug;
    /// Slave mode selection
    pub u8, sms, set_sms: 2, 0;
    /// Trigger selection
    pub u8, ts, set_ts: 6, 4;
    /// Master/slave mode
    pub msm, set_msm: 7;
    /// External trigger filter
    pub u8, etf, set_etf: 11, 8;
    /// External trigger prescaler
    pub u8, etps, set_etps: 13, 12;
    /// External clock enable
    pub ece, set_ece: 14;
    /// External trigger polarity
    pub etp, set_etp: 15;
}

/// Field offsets inside one 8-bit half of CCMRx. Output compare and input
/// capture share the register; the interpretation depends on CCxS.
pub mod ccmr {
    /// Capture/compare selection, 2 bits
    pub const CCS: u32 = 0;
    /// Output compare fast enable
    pub const OCFE: u32 = 2;
    /// Output compare preload enable
    pub const OCPE: u32 = 3;
    /// Output compare mode, 3 bits
    pub const OCM: u32 = 4;
    /// Output compare clear enable
    pub const OCCE: u32 = 7;
    /// Input capture prescaler, 2 bits
    pub const ICPSC: u32 = 2;
    /// Input capture filter, 4 bits
    pub const ICF: u32 = 4;
}

/// Bit offsets inside one 4-bit group of CCER
pub mod ccer {
    /// Capture/compare output enable
    pub const CCE: u32 = 0;
    /// Capture/compare output polarity
    pub const CCP: u32 = 1;
    /// Complementary output enable
    pub const CCNE: u32 = 2;
    /// Complementary output polarity
    pub const CCNP: u32 = 3;
}

bitfield! {
    /// BDTR
    #[derive(Copy, Clone)]
    pub struct Bdtr(u32);
    impl Debug;
    /// Dead-time generator setup
    pub u8, dtg, set_dtg: 7, 0;
    /// Lock configuration
    pub u8, lock, set_lock: 9, 8;
    /// Off-state selection for idle mode
    pub ossi, set_ossi: 10;
    /// Off-state selection for run mode
    pub ossr, set_ossr: 11;
    /// Break enable
    pub bke, set_bke: 12;
    /// Break polarity
    pub bkp, set_bkp: 13;
    /// Automatic output enable
    pub aoe, set_aoe: 14;
    /// Main output enable
    pub moe, set_moe: 15;
}

register_values!(Cr1, Cr2, Smcr, Bdtr);

#[cfg(test)]
mod test {
    use super::*;
    use core::mem::offset_of;

    #[test]
    fn register_offsets() {
        assert_eq!(offset_of!(RegisterBlock, smcr), 0x08);
        assert_eq!(offset_of!(RegisterBlock, sr), 0x10);
        assert_eq!(offset_of!(RegisterBlock, ccmr), 0x18);
        assert_eq!(offset_of!(RegisterBlock, ccer), 0x20);
        assert_eq!(offset_of!(RegisterBlock, cnt), 0x24);
        assert_eq!(offset_of!(RegisterBlock, rcr), 0x30);
        assert_eq!(offset_of!(RegisterBlock, ccr), 0x34);
        assert_eq!(offset_of!(RegisterBlock, bdtr), 0x44);
        assert_eq!(offset_of!(RegisterBlock, or), 0x50);
    }

    #[test]
    fn cr1_fields() {
        let mut cr1 = Cr1(0);
        cr1.set_cms(3);
        cr1.set_ckd(2);
        cr1.set_arpe(true);
        assert_eq!(cr1.0, (3 << 5) | (2 << 8) | (1 << 7));
    }
}
