//! FD-CAN registers, STM32G4 layout

use super::{register_values, Reg};
use bitfield::bitfield;

/// FD-CAN register block
#[repr(C)]
pub struct RegisterBlock {
    /// 0x000 - Core release register
    pub crel: Reg<u32>,
    /// 0x004 - Endian register
    pub endn: Reg<u32>,
    _reserved0: u32,
    /// 0x00c - Data bit timing and prescaler register
    pub dbtp: Reg<Dbtp>,
    /// 0x010 - Test register
    pub test: Reg<Test>,
    /// 0x014 - RAM watchdog register
    pub rwd: Reg<u32>,
    /// 0x018 - CC control register
    pub cccr: Reg<Cccr>,
    /// 0x01c - Nominal bit timing and prescaler register
    pub nbtp: Reg<Nbtp>,
    /// 0x020 - Timestamp counter configuration register
    pub tscc: Reg<Tscc>,
    /// 0x024 - Timestamp counter value register
    pub tscv: Reg<u32>,
    /// 0x028 - Timeout counter configuration register
    pub tocc: Reg<u32>,
    /// 0x02c - Timeout counter value register
    pub tocv: Reg<u32>,
    _reserved1: [u32; 4],
    /// 0x040 - Error counter register
    pub ecr: Reg<Ecr>,
    /// 0x044 - Protocol status register
    pub psr: Reg<Psr>,
    /// 0x048 - Transmitter delay compensation register
    pub tdcr: Reg<Tdcr>,
    _reserved2: u32,
    /// 0x050 - Interrupt register
    pub ir: Reg<u32>,
    /// 0x054 - Interrupt enable register
    pub ie: Reg<u32>,
    /// 0x058 - Interrupt line select register, one bit per interrupt group
    pub ils: Reg<u32>,
    /// 0x05c - Interrupt line enable register
    pub ile: Reg<u32>,
    _reserved3: [u32; 8],
    /// 0x080 - Global filter configuration register
    pub rxgfc: Reg<Rxgfc>,
    /// 0x084 - Extended ID and mask register
    pub xidam: Reg<u32>,
    /// 0x088 - High-priority message status register
    pub hpms: Reg<u32>,
    _reserved4: u32,
    /// 0x090 - Rx FIFO 0 status and acknowledge registers
    pub rxf0: RxFifoRegs,
    /// 0x098 - Rx FIFO 1 status and acknowledge registers
    pub rxf1: RxFifoRegs,
    _reserved5: [u32; 10],
    /// 0x0c8 - Tx buffer configuration register
    pub txbc: Reg<u32>,
    /// 0x0cc - Tx FIFO/queue status register
    pub txfqs: Reg<Txfqs>,
    /// 0x0d0 - Tx buffer request pending register
    pub txbrp: Reg<u32>,
    /// 0x0d4 - Tx buffer add request register
    pub txbar: Reg<u32>,
    /// 0x0d8 - Tx buffer cancellation request register
    pub txbcr: Reg<u32>,
    /// 0x0dc - Tx buffer transmission occurred register
    pub txbto: Reg<u32>,
    /// 0x0e0 - Tx buffer cancellation finished register
    pub txbcf: Reg<u32>,
    /// 0x0e4 - Tx buffer transmission interrupt enable register
    pub txbtie: Reg<u32>,
    /// 0x0e8 - Tx buffer cancellation finished interrupt enable register
    pub txbcie: Reg<u32>,
    /// 0x0ec - Tx event FIFO status register
    pub txefs: Reg<FifoStatus>,
    /// 0x0f0 - Tx event FIFO acknowledge register
    pub txefa: Reg<u32>,
    _reserved6: [u32; 3],
    /// 0x100 - Clock divider register (FDCAN1 only, shared by all instances)
    pub ckdiv: Reg<u32>,
}

/// Status and acknowledge registers of one Rx FIFO
#[repr(C)]
pub struct RxFifoRegs {
    /// Rx FIFO status
    pub s: Reg<FifoStatus>,
    /// Rx FIFO acknowledge
    pub a: Reg<u32>,
}

bitfield! {
    /// CCCR
    #[derive(Copy, Clone)]
    pub struct Cccr(u32);
    impl Debug;
    /// Initialization
    pub init, set_init: 0;
    /// Configuration change enable
    pub cce, set_cce: 1;
    /// Restricted operation mode
    pub asm, set_asm: 2;
    /// Clock stop acknowledge
    pub csa, _: 3;
    /// Clock stop request
    pub csr, set_csr: 4;
    /// Bus monitoring mode
    pub mon, set_mon: 5;
    /// Disable automatic retransmission
    pub dar, set_dar: 6;
    /// Test mode enable
    pub test, set_test: 7;
    /// FD operation enable
    pub fdoe, set_fdoe: 8;
    /// Bit rate switching enable
    pub brse, set_brse: 9;
    /// Protocol exception handling disable
    pub pxhd, set_pxhd: 12;
    /// Edge filtering during bus integration
    pub efbi, set_efbi: 13;
    /// Transmit pause
    pub txp, set_txp: 14;
    /// Non ISO operation
    pub niso, set_niso: 15;
}

bitfield! {
    /// NBTP, every field holds the value minus one
    #[derive(Copy, Clone)]
    pub struct Nbtp(u32);
    impl Debug;
    /// Nominal time segment after sample point
    pub u8, ntseg2, set_ntseg2: 6, 0;
    /// Nominal time segment before sample point
    pub u8, ntseg1, set_ntseg1: 15, 8;
    /// Bit rate prescaler
    pub u16, nbrp, set_nbrp: 24, 16;
    /// Nominal resynchronization jump width
    pub u8, nsjw, set_nsjw: 31, 25;
}

bitfield! {
    /// DBTP, every timing field holds the value minus one
    #[derive(Copy, Clone)]
    pub struct Dbtp(u32);
    impl Debug;
    /// Synchronization jump width
    pub u8, dsjw, set_dsjw: 3, 0;
    /// Data time segment after sample point
    pub u8, dtseg2, set_dtseg2: 7, 4;
    /// Data time segment before sample point
    pub u8, dtseg1, set_dtseg1: 12, 8;
    /// Data bit rate prescaler
    pub u8, dbrp, set_dbrp: 20, 16;
    /// Transceiver delay compensation
    pub tdc, set_tdc: 23;
}

bitfield! {
    /// TEST
    #[derive(Copy, Clone)]
    pub struct Test(u32);
    impl Debug;
    /// Loop back mode
    pub lbck, set_lbck: 4;
    /// Control of transmit pin
    pub u8, tx, set_tx: 6, 5;
    /// Receive pin
    pub rx, _: 7;
}

bitfield! {
    /// TSCC
    #[derive(Copy, Clone)]
    pub struct Tscc(u32);
    impl Debug;
    /// Timestamp select
    pub u8, tss, set_tss: 1, 0;
    /// Timestamp counter prescaler minus one
    pub u8, tcp, set_tcp: 19, 16;
}

bitfield! {
    /// ECR
    #[derive(Copy, Clone)]
    pub struct Ecr(u32);
    impl Debug;
    /// Transmit error counter
    pub u8, tec, _: 7, 0;
    /// Receive error counter
    pub u8, rec, _: 14, 8;
    /// Receive error passive
    pub rp, _: 15;
    /// CAN error logging
    pub u8, cel, _: 23, 16;
}

bitfield! {
    /// PSR
    #[derive(Copy, Clone)]
    pub struct Psr(u32);
    impl Debug;
    /// Last error code
    pub u8, lec, _: 2, 0;
    /// Activity
    pub u8, act, _: 4, 3;
    /// Error passive
    pub ep, _: 5;
    /// Warning status
    pub ew, _: 6;
    /// Bus off status
    pub bo, _: 7;
    /// Data last error code
    pub u8, dlec, _: 10, 8;
    /// ESI flag of last received FD frame
    pub resi, _: 11;
    /// BRS flag of last received FD frame
    pub rbrs, _: 12;
    /// Received FD message
    pub redl, _: 13;
    /// Protocol exception event
    pub pxe, _: 14;
    /// Transmitter delay compensation value
    pub u8, tdcv, _: 22, 16;
}

bitfield! {
    /// TDCR
    #[derive(Copy, Clone)]
    pub struct Tdcr(u32);
    impl Debug;
    /// Transmitter delay compensation filter window length
    pub u8, tdcf, set_tdcf: 6, 0;
    /// Transmitter delay compensation offset
    pub u8, tdco, set_tdco: 14, 8;
}

bitfield! {
    /// RXGFC
    #[derive(Copy, Clone)]
    pub struct Rxgfc(u32);
    impl Debug;
    /// Reject remote frames extended
    pub rrfe, set_rrfe: 0;
    /// Reject remote frames standard
    pub rrfs, set_rrfs: 1;
    /// Accept non-matching frames extended
    pub u8, anfe, set_anfe: 3, 2;
    /// Accept non-matching frames standard
    pub u8, anfs, set_anfs: 5, 4;
    /// FIFO 1 operation mode, set for overwrite
    pub f1om, set_f1om: 8;
    /// FIFO 0 operation mode, set for overwrite
    pub f0om, set_f0om: 9;
    /// List size standard
    pub u8, lss, set_lss: 20, 16;
    /// List size extended
    pub u8, lse, set_lse: 27, 24;
}

bitfield! {
    /// Status of a three element FIFO (RXFnS, TXEFS)
    #[derive(Copy, Clone)]
    pub struct FifoStatus(u32);
    impl Debug;
    /// Fill level
    pub u8, fill_level, _: 3, 0;
    /// Get index
    pub u8, get_index, _: 9, 8;
    /// Put index
    pub u8, put_index, _: 17, 16;
    /// FIFO full
    pub full, _: 24;
    /// Message or event lost
    pub lost, _: 25;
}

bitfield! {
    /// TXFQS
    #[derive(Copy, Clone)]
    pub struct Txfqs(u32);
    impl Debug;
    /// Tx FIFO free level
    pub u8, tffl, _: 2, 0;
    /// Tx FIFO get index
    pub u8, tfgi, _: 9, 8;
    /// Tx FIFO/queue put index
    pub u8, tfqpi, _: 17, 16;
    /// Tx FIFO/queue full
    pub tfqf, _: 21;
}

/// Tx FIFO/queue mode bit in TXBC, set for queue mode
pub const TXBC_TFQM: u32 = 1 << 24;

register_values!(Cccr, Nbtp, Dbtp, Test, Tscc, Ecr, Psr, Tdcr, Rxgfc, FifoStatus, Txfqs);

#[cfg(test)]
mod test {
    use super::*;
    use core::mem::offset_of;

    #[test]
    fn register_offsets() {
        assert_eq!(offset_of!(RegisterBlock, dbtp), 0x00c);
        assert_eq!(offset_of!(RegisterBlock, cccr), 0x018);
        assert_eq!(offset_of!(RegisterBlock, ecr), 0x040);
        assert_eq!(offset_of!(RegisterBlock, ir), 0x050);
        assert_eq!(offset_of!(RegisterBlock, ile), 0x05c);
        assert_eq!(offset_of!(RegisterBlock, rxgfc), 0x080);
        assert_eq!(offset_of!(RegisterBlock, rxf0), 0x090);
        assert_eq!(offset_of!(RegisterBlock, rxf1), 0x098);
        assert_eq!(offset_of!(RegisterBlock, txbc), 0x0c8);
        assert_eq!(offset_of!(RegisterBlock, txbcie), 0x0e8);
        assert_eq!(offset_of!(RegisterBlock, txefa), 0x0f0);
        assert_eq!(offset_of!(RegisterBlock, ckdiv), 0x100);
    }

    #[test]
    fn nominal_timing_fields() {
        let mut nbtp = Nbtp(0);
        nbtp.set_nsjw(3);
        nbtp.set_nbrp(0x1ff);
        nbtp.set_ntseg1(12);
        nbtp.set_ntseg2(1);
        assert_eq!(nbtp.0, (3 << 25) | (0x1ff << 16) | (12 << 8) | 1);
    }
}
