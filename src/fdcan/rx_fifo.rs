//! Receive FIFOs

use super::message::rx;
use crate::reg::fdcan::{RegisterBlock, RxFifoRegs};
use core::convert::Infallible;
use core::marker::PhantomData;
use opencm3_core::FdcanId;
use vcell::VolatileCell;

/// Receive FIFO `F` on peripheral `P`.
pub struct RxFifo<F, P> {
    memory: &'static mut [VolatileCell<rx::Message>],
    _markers: PhantomData<(F, P)>,
}

/// Value of the type-level FIFO selection enum representing FIFO 0.
pub enum Fifo0 {}
/// Value of the type-level FIFO selection enum representing FIFO 1.
pub enum Fifo1 {}

/// Provides raw access to the registers controlling the RX FIFO.
pub trait GetRxFifoRegs {
    /// # Safety
    /// Direct access can break assumptions made by the abstraction.
    unsafe fn registers(&self) -> &RxFifoRegs;
}

impl<P: FdcanId> GetRxFifoRegs for RxFifo<Fifo0, P> {
    unsafe fn registers(&self) -> &RxFifoRegs {
        &crate::reg::block::<P, RegisterBlock>().rxf0
    }
}

impl<P: FdcanId> GetRxFifoRegs for RxFifo<Fifo1, P> {
    unsafe fn registers(&self) -> &RxFifoRegs {
        &crate::reg::block::<P, RegisterBlock>().rxf1
    }
}

impl<F, P: FdcanId> RxFifo<F, P>
where
    Self: GetRxFifoRegs,
{
    /// # Safety
    /// The caller must be the owner of the peripheral referenced by `P`. The
    /// constructed type assumes ownership of RXFnS and RXFnA. Do not keep
    /// multiple instances for the same FIFO and peripheral.
    pub(crate) unsafe fn new(memory: &'static mut [VolatileCell<rx::Message>]) -> Self {
        Self {
            memory,
            _markers: PhantomData,
        }
    }

    fn regs(&self) -> &RxFifoRegs {
        // Safety: The RxFifo owns the registers.
        unsafe { self.registers() }
    }

    /// Returns the number of elements in the queue
    pub fn len(&self) -> usize {
        self.regs().s.read().fill_level().into()
    }

    /// Returns `true` if the queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of elements the queue can hold
    pub fn capacity(&self) -> usize {
        self.memory.len()
    }

    /// `true` if every element holds an unread message
    pub fn is_full(&self) -> bool {
        self.regs().s.read().full()
    }

    /// `true` if a message was dropped (blocking mode) or overwritten
    /// (overwrite mode) since reset. The flag is cleared by the
    /// corresponding `MessageLost` interrupt flag.
    pub fn message_lost(&self) -> bool {
        self.regs().s.read().lost()
    }

    /// Returns a received frame if available. Note that the FIFO also
    /// implements [`Iterator`] to receive messages until the queue is empty.
    pub fn receive(&mut self) -> nb::Result<rx::Message, Infallible> {
        let status = self.regs().s.read();
        if status.fill_level() == 0 {
            return Err(nb::Error::WouldBlock);
        }
        let get_index = status.get_index();
        let message = self
            .memory
            .get(usize::from(get_index))
            .ok_or(nb::Error::WouldBlock)?
            .get();
        // Mark the message as read.
        self.regs().a.write(|w| *w = u32::from(get_index));
        Ok(message)
    }
}

impl<F, P: FdcanId> Iterator for RxFifo<F, P>
where
    Self: GetRxFifoRegs,
{
    type Item = rx::Message;

    fn next(&mut self) -> Option<Self::Item> {
        self.receive().ok()
    }
}
