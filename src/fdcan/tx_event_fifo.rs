//! Information about successfully transmitted messages
//!
//! Events are only generated for messages with [`store_tx_event`] set.
//!
//! [`store_tx_event`]: crate::fdcan::message::tx::MessageBuilder::store_tx_event

use super::message::TxEvent;
use crate::reg::fdcan::RegisterBlock;
use core::marker::PhantomData;
use opencm3_core::FdcanId;
use vcell::VolatileCell;

/// Transmit event queue on peripheral `P`
pub struct TxEventFifo<P> {
    memory: &'static mut [VolatileCell<TxEvent>],
    _markers: PhantomData<P>,
}

impl<P: FdcanId> TxEventFifo<P> {
    /// # Safety
    /// The caller must be the owner of the peripheral referenced by `P`. The
    /// constructed type assumes ownership of TXEFS and TXEFA. Do not keep
    /// multiple instances for the same peripheral.
    pub(crate) unsafe fn new(memory: &'static mut [VolatileCell<TxEvent>]) -> Self {
        Self {
            memory,
            _markers: PhantomData,
        }
    }

    fn regs(&self) -> &RegisterBlock {
        // Safety: `Self` owns TXEFS and TXEFA.
        unsafe { crate::reg::block::<P, RegisterBlock>() }
    }

    /// Returns the number of elements in the queue
    pub fn len(&self) -> usize {
        self.regs().txefs.read().fill_level().into()
    }

    /// Returns `true` if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of elements the queue can hold
    pub fn capacity(&self) -> usize {
        self.memory.len()
    }

    /// `true` if the queue is full
    pub fn is_full(&self) -> bool {
        self.regs().txefs.read().full()
    }

    /// `true` if an event was discarded because the queue was full
    pub fn event_lost(&self) -> bool {
        self.regs().txefs.read().lost()
    }

    /// Takes the first event from the queue
    pub fn pop(&mut self) -> Option<TxEvent> {
        let status = self.regs().txefs.read();
        if status.fill_level() == 0 {
            return None;
        }
        let get_index = status.get_index();
        let event = self.memory.get(usize::from(get_index))?.get();
        self.regs().txefa.write(|w| *w = u32::from(get_index));
        Some(event)
    }
}
