//! Transmit buffers
//!
//! The G4 has three TX buffers, all of them part of the FIFO/queue. There
//! are no dedicated buffers in the M_CAN sense; [`Tx::transmit_dedicated`]
//! addresses a buffer by index and bypasses the queue put index.

use super::bus::OutOfBounds;
use super::message::tx;
use crate::reg::fdcan::RegisterBlock;
use core::convert::Infallible;
use core::marker::PhantomData;
use opencm3_core::FdcanId;
use vcell::VolatileCell;

/// Transmit queue on peripheral `P`
pub struct Tx<P> {
    memory: &'static mut [VolatileCell<tx::Message>],
    _markers: PhantomData<P>,
}

impl<P: FdcanId> Tx<P> {
    /// # Safety
    /// The caller must be the owner of the peripheral referenced by `P`. The
    /// constructed type assumes ownership of TXFQS, TXBRP, TXBAR, TXBCR,
    /// TXBTO, TXBCF, TXBTIE and TXBCIE. Do not keep multiple instances for
    /// the same peripheral.
    pub(crate) unsafe fn new(memory: &'static mut [VolatileCell<tx::Message>]) -> Self {
        Self {
            memory,
            _markers: PhantomData,
        }
    }

    fn regs(&self) -> &RegisterBlock {
        // Safety: `Self` owns the transmit buffer registers.
        unsafe { crate::reg::block::<P, RegisterBlock>() }
    }

    fn add_request(&self, index: usize) {
        self.regs().txbar.write(|w| *w = 1 << index);
    }

    fn is_buffer_in_use(&self, index: usize) -> bool {
        let add_requests = self.regs().txbar.read();
        let pending = self.regs().txbrp.read();
        (add_requests | pending) & (1 << index) != 0
    }

    /// Puts a frame in the specified transmit buffer to be sent on the bus.
    /// Fails with [`nb::Error::WouldBlock`] if the transmit buffer is full.
    fn transmit(&mut self, index: usize, message: tx::Message) -> nb::Result<(), OutOfBounds> {
        let slot = self.memory.get(index).ok_or(OutOfBounds)?;
        if self.is_buffer_in_use(index) {
            return Err(nb::Error::WouldBlock);
        }
        slot.set(message);
        self.add_request(index);
        Ok(())
    }

    /// Returns the put index if available. `None` if the queue is full.
    fn find_put_index(&self) -> Option<usize> {
        let status = self.regs().txfqs.read();
        if status.tfqf() {
            None
        } else {
            Some(status.tfqpi().into())
        }
    }

    fn poll_canceled(&self, to_be_canceled: TxBufferSet) -> nb::Result<(), Infallible> {
        let already_canceled = self.get_cancellation_flags();
        if already_canceled.0 & to_be_canceled.0 == to_be_canceled.0 {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// Puts a frame in the transmit buffer at `index`, regardless of the
    /// queue put index. Fails with [`nb::Error::WouldBlock`] while the buffer
    /// has a pending request. Mixing this with [`Self::transmit_queued`]
    /// confuses the FIFO order.
    pub fn transmit_dedicated(
        &mut self,
        index: usize,
        message: tx::Message,
    ) -> nb::Result<(), OutOfBounds> {
        self.transmit(index, message)
    }

    /// Puts a frame in the queue to be sent on the bus.
    /// Fails with [`nb::Error::WouldBlock`] if the queue is full.
    pub fn transmit_queued(&mut self, message: tx::Message) -> nb::Result<(), OutOfBounds> {
        let index = self.find_put_index().ok_or(nb::Error::WouldBlock)?;
        self.transmit(index, message)
    }

    /// Number of free buffers in the queue
    pub fn free_level(&self) -> usize {
        self.regs().txfqs.read().tffl().into()
    }

    /// Allow [`Interrupt::TransmissionCancellationFinished`] to be triggered by
    /// `to_be_enabled`. Interrupts for other buffers remain unchanged.
    ///
    /// [`Interrupt::TransmissionCancellationFinished`]: crate::fdcan::interrupt::Interrupt::TransmissionCancellationFinished
    pub fn enable_cancellation_interrupt(&mut self, to_be_enabled: TxBufferSet) {
        self.regs().txbcie.modify(|r, w| *w = r | to_be_enabled.0);
    }

    /// Disallow [`Interrupt::TransmissionCancellationFinished`] to be
    /// triggered by `to_be_disabled`.
    ///
    /// [`Interrupt::TransmissionCancellationFinished`]: crate::fdcan::interrupt::Interrupt::TransmissionCancellationFinished
    pub fn disable_cancellation_interrupt(&mut self, to_be_disabled: TxBufferSet) {
        self.regs().txbcie.modify(|r, w| *w = r & !to_be_disabled.0);
    }

    /// Allow [`Interrupt::TransmissionCompleted`] to be triggered by
    /// `to_be_enabled`. Interrupts for other buffers remain unchanged.
    ///
    /// [`Interrupt::TransmissionCompleted`]: crate::fdcan::interrupt::Interrupt::TransmissionCompleted
    pub fn enable_transmission_completed_interrupt(&mut self, to_be_enabled: TxBufferSet) {
        self.regs().txbtie.modify(|r, w| *w = r | to_be_enabled.0);
    }

    /// Disallow [`Interrupt::TransmissionCompleted`] to be triggered by
    /// `to_be_disabled`.
    ///
    /// [`Interrupt::TransmissionCompleted`]: crate::fdcan::interrupt::Interrupt::TransmissionCompleted
    pub fn disable_transmission_completed_interrupt(&mut self, to_be_disabled: TxBufferSet) {
        self.regs().txbtie.modify(|r, w| *w = r & !to_be_disabled.0);
    }

    /// Returns the set of buffers that the peripheral indicates have been
    /// cancelled. The flags are only cleared when a new transmission is
    /// requested for the buffer.
    pub fn get_cancellation_flags(&self) -> TxBufferSet {
        TxBufferSet(self.regs().txbcf.read() & TxBufferSet::all().0)
    }

    /// Returns the set of buffers that the peripheral indicates have been
    /// successfully transmitted. The flags are only cleared when a new
    /// transmission is requested for the buffer.
    pub fn get_transmission_completed_flags(&self) -> TxBufferSet {
        TxBufferSet(self.regs().txbto.read() & TxBufferSet::all().0)
    }

    /// Iterates over [`Self::get_cancellation_flags`].
    pub fn iter_cancellation_flags(&self) -> Iter {
        self.get_cancellation_flags().iter()
    }

    /// Iterates over [`Self::get_transmission_completed_flags`].
    pub fn iter_transmission_completed_flags(&self) -> Iter {
        self.get_transmission_completed_flags().iter()
    }

    /// Request cancellation of `to_be_canceled`. Returns
    /// [`nb::Error::WouldBlock`] until the cancellation is finished. A buffer
    /// whose transmission already started may still finish successfully, in
    /// which case its transmission completed flag is set as well.
    pub fn cancel_multi(&mut self, to_be_canceled: TxBufferSet) -> nb::Result<(), Infallible> {
        self.poll_canceled(to_be_canceled).or_else(|_| {
            self.regs().txbcr.write(|w| *w = to_be_canceled.0);
            self.poll_canceled(to_be_canceled)
        })
    }

    /// Request cancellation of a transmit buffer. See [`Self::cancel_multi`].
    pub fn cancel(&mut self, index: usize) -> nb::Result<(), Infallible> {
        self.cancel_multi([index].into_iter().collect())
    }
}

/// A set of transmit buffers
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TxBufferSet(pub u32);

impl FromIterator<usize> for TxBufferSet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        let set = iter
            .into_iter()
            .filter(|i| *i < super::messageram::TX_BUFFERS)
            .fold(0, |set, i| set | 1 << i);
        TxBufferSet(set)
    }
}

impl TxBufferSet {
    /// Returns the set of all transmit buffers
    pub fn all() -> Self {
        Self((1 << super::messageram::TX_BUFFERS) - 1)
    }

    /// An iterator visiting all elements in ascending order.
    pub fn iter(&self) -> Iter {
        Iter {
            flags: *self,
            index: 0,
        }
    }
}

/// An iterator over the buffer indexes of the buffers in a [`TxBufferSet`].
///
/// This `struct` is created by [`TxBufferSet::iter`].
pub struct Iter {
    flags: TxBufferSet,
    index: u8,
}

impl Iterator for Iter {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < 32 {
            let i = self.index;
            self.index += 1;
            if self.flags.0 & (1 << i) != 0 {
                return Some(i.into());
            }
        }
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fdcan::message::Raw;
    use crate::testing::fake_peripheral;
    use embedded_can::StandardId;

    fn message(id: u16) -> tx::Message {
        tx::MessageBuilder {
            id: StandardId::new(id).unwrap().into(),
            frame_type: tx::FrameType::Classic(tx::ClassicFrameType::Data(&[id as u8])),
            store_tx_event: None,
        }
        .build()
        .unwrap()
    }

    fn empty_buffers() -> &'static mut [VolatileCell<tx::Message>; 3] {
        Box::leak(Box::new([0, 0, 0].map(|_| VolatileCell::new(message(0)))))
    }

    #[test]
    fn queued_transmission_uses_put_index() {
        fake_peripheral!(Can, 0x104 / 4 + 1);
        unsafe impl FdcanId for Can {
            fn message_ram() -> *const () {
                core::ptr::null()
            }
        }
        let block = Can::block();
        let memory = empty_buffers();
        let ptr = memory.as_ptr();
        let mut tx = unsafe { Tx::<Can>::new(memory) };

        block.set_word(0xcc, 1 << 16 | 3);
        tx.transmit_queued(message(0x55)).unwrap();
        assert_eq!(block.word(0xd4), 1 << 1);
        assert_eq!(unsafe { (*ptr.add(1)).get() }.id(), message(0x55).id());
        assert_eq!(tx.free_level(), 3);

        block.set_word(0xcc, 1 << 21);
        assert!(matches!(
            tx.transmit_queued(message(1)),
            Err(nb::Error::WouldBlock)
        ));
    }

    #[test]
    fn dedicated_transmission_checks_index_and_pending() {
        fake_peripheral!(Can, 0x104 / 4 + 1);
        unsafe impl FdcanId for Can {
            fn message_ram() -> *const () {
                core::ptr::null()
            }
        }
        let block = Can::block();
        let mut tx = unsafe { Tx::<Can>::new(empty_buffers()) };

        assert!(matches!(
            tx.transmit_dedicated(3, message(1)),
            Err(nb::Error::Other(OutOfBounds))
        ));
        block.set_word(0xd0, 1 << 2);
        assert!(matches!(
            tx.transmit_dedicated(2, message(1)),
            Err(nb::Error::WouldBlock)
        ));
        block.set_word(0xd0, 0);
        assert!(tx.transmit_dedicated(2, message(1)).is_ok());
        assert_eq!(block.word(0xd4), 1 << 2);
    }

    #[test]
    fn cancellation_polls_finished_flags() {
        fake_peripheral!(Can, 0x104 / 4 + 1);
        unsafe impl FdcanId for Can {
            fn message_ram() -> *const () {
                core::ptr::null()
            }
        }
        let block = Can::block();
        let mut tx = unsafe { Tx::<Can>::new(empty_buffers()) };

        assert!(matches!(tx.cancel(1), Err(nb::Error::WouldBlock)));
        assert_eq!(block.word(0xd8), 1 << 1);
        block.set_word(0xe0, 1 << 1);
        assert!(tx.cancel(1).is_ok());
        assert_eq!(tx.iter_cancellation_flags().collect::<Vec<_>>(), [1]);

        tx.enable_transmission_completed_interrupt(TxBufferSet::all());
        tx.disable_transmission_completed_interrupt([0].into_iter().collect());
        assert_eq!(block.word(0xe4), 0b110);
    }

    #[test]
    fn buffer_set_ignores_missing_buffers() {
        let set: TxBufferSet = [0, 2, 5].into_iter().collect();
        assert_eq!(set, TxBufferSet(0b101));
        assert_eq!(set.iter().collect::<Vec<_>>(), [0, 2]);
        assert_eq!(TxBufferSet::all(), TxBufferSet(0b111));
    }
}
