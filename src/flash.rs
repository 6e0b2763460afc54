//! Flash access control, STM32F1

use crate::reg::flash::RegisterBlock;
use core::marker::PhantomData;
use opencm3_core::PeripheralId;

/// Flash wait states. The required number depends on SYSCLK.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Latency {
    /// SYSCLK up to 24 MHz
    Ws0 = 0,
    /// SYSCLK up to 48 MHz
    Ws1 = 1,
    /// SYSCLK up to 72 MHz
    Ws2 = 2,
}

/// Flash interface `Id`
pub struct Flash<Id> {
    _id: PhantomData<Id>,
}

impl<Id: PeripheralId> Flash<Id> {
    /// # Safety
    /// Only one `Flash` may exist for the same `Id`.
    pub unsafe fn new() -> Self {
        Self { _id: PhantomData }
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

    /// Sets the number of wait states. Increase before raising SYSCLK.
    pub fn set_latency(&mut self, latency: Latency) {
        self.regs()
            .acr
            .modify(|_, w| w.set_latency(latency as u8));
    }

    /// Current number of wait states
    pub fn latency(&self) -> Latency {
        match self.regs().acr.read().latency() {
            0 => Latency::Ws0,
            1 => Latency::Ws1,
            _ => Latency::Ws2,
        }
    }

    /// Enables the prefetch buffer. Only while SYSCLK runs from HSI or
    /// below 24 MHz.
    pub fn prefetch_enable(&mut self) {
        self.regs().acr.modify(|_, w| w.set_prftbe(true));
    }

    /// Disables the prefetch buffer.
    pub fn prefetch_disable(&mut self) {
        self.regs().acr.modify(|_, w| w.set_prftbe(false));
    }

    /// `true` if the prefetch buffer is enabled.
    pub fn is_prefetch_enabled(&self) -> bool {
        self.regs().acr.read().prftbs()
    }

    /// Enables half-cycle flash access, only allowed below 8 MHz.
    pub fn halfcycle_enable(&mut self) {
        self.regs().acr.modify(|_, w| w.set_hlfcya(true));
    }

    /// Disables half-cycle flash access.
    pub fn halfcycle_disable(&mut self) {
        self.regs().acr.modify(|_, w| w.set_hlfcya(false));
    }
}
