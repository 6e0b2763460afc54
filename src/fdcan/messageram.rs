//! Message RAM of an FDCAN instance
//!
//! Unlike the generic M_CAN, the G4 FDCAN has no start address or size
//! registers. Each instance owns a fixed 0x350 byte section of SRAMCAN with
//! the layout below, so the element counts are constants.

use super::filter::{FilterExtendedId, FilterStandardId, EXTENDED_FILTERS, STANDARD_FILTERS};
use super::message::{rx, tx, TxEvent};
use opencm3_core::FdcanId;
use vcell::VolatileCell;

/// Elements in each RX FIFO
pub const RX_FIFO_ELEMENTS: usize = 3;
/// Elements in the TX event FIFO
pub const TX_EVENT_ELEMENTS: usize = 3;
/// TX buffers
pub const TX_BUFFERS: usize = 3;
/// Size of the message RAM section of one instance in bytes
pub const SIZE: usize = 0x350;

#[repr(C)]
pub(super) struct MessageRam {
    pub(super) filters_standard: [VolatileCell<FilterStandardId>; STANDARD_FILTERS],
    pub(super) filters_extended: [VolatileCell<FilterExtendedId>; EXTENDED_FILTERS],
    pub(super) rx_fifo_0: [VolatileCell<rx::Message>; RX_FIFO_ELEMENTS],
    pub(super) rx_fifo_1: [VolatileCell<rx::Message>; RX_FIFO_ELEMENTS],
    pub(super) tx_event_fifo: [VolatileCell<TxEvent>; TX_EVENT_ELEMENTS],
    pub(super) tx_buffers: [VolatileCell<tx::Message>; TX_BUFFERS],
}

const _: () = assert!(core::mem::size_of::<MessageRam>() == SIZE);

impl MessageRam {
    /// Zeroes the message RAM section of `Id` and hands it out.
    ///
    /// # Safety
    /// The caller must own the instance `Id` and must not create another
    /// reference to its message RAM while the returned one is alive.
    pub(super) unsafe fn take<Id: FdcanId>() -> &'static mut Self {
        let words = Id::message_ram() as *mut u32;
        // SRAMCAN only supports word accesses.
        for i in 0..SIZE / 4 {
            core::ptr::write_volatile(words.add(i), 0);
        }
        // Safety: All bits 0 is a valid value for every element.
        &mut *(words as *mut Self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use core::mem::offset_of;

    #[test]
    fn section_layout() {
        assert_eq!(offset_of!(MessageRam, filters_extended), 0x070);
        assert_eq!(offset_of!(MessageRam, rx_fifo_0), 0x0b0);
        assert_eq!(offset_of!(MessageRam, rx_fifo_1), 0x188);
        assert_eq!(offset_of!(MessageRam, tx_event_fifo), 0x260);
        assert_eq!(offset_of!(MessageRam, tx_buffers), 0x278);
    }
}
