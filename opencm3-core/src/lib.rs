#![no_std]
#![warn(missing_docs)]

//! `opencm3-core` provides the identity and ownership abstractions shared
//! between the [`opencm3`] drivers and the chip-specific instance tables.
//!
//! A peripheral instance is represented by an uninhabited marker type
//! implementing [`PeripheralId`] (and one of the class traits such as
//! [`TimerId`]). Drivers are constructed from a value implementing
//! [`Dependencies`] for that marker, which proves that the peripheral clock is
//! running and that the register block is not accessed anywhere else.
//!
//! Traits from this crate are not supposed to be implemented by the
//! application developer; implementations are provided by the instance
//! modules of [`opencm3`] and by the RCC enable tokens.
//!
//! [`opencm3`]: <https://docs.rs/crate/opencm3/>

pub use fugit;

/// Trait representing a peripheral instance
///
/// Types implementing this trait are expected to be marker types identifying a
/// specific instance of a peripheral available on the platform. It only
/// conveys *where* the register block is located, not that it can be
/// accessed. The latter is expressed by the [`Dependencies`] trait.
///
/// # Safety
/// `PeripheralId::address` returns the start of a valid register block of the
/// peripheral class the type is additionally marked with, and always returns
/// the same address.
///
/// # Examples
/// ```no_run
/// use opencm3_core::{PeripheralId, TimerId};
///
/// pub enum Tim2 {}
///
/// unsafe impl PeripheralId for Tim2 {
///     fn address() -> *const () {
///         0x4000_0000 as *const _
///     }
/// }
///
/// unsafe impl TimerId for Tim2 {}
/// ```
pub unsafe trait PeripheralId {
    /// Address of the register block controlling the peripheral instance
    fn address() -> *const ();
}

/// General purpose or basic timer (TIMx register layout)
///
/// # Safety
/// [`PeripheralId::address`] points to a timer register block.
pub unsafe trait TimerId: PeripheralId {
    /// Writable bits of the option register (`TIMx_OR`), zero if the
    /// instance has none.
    const OPTION_MASK: u32 = 0;
}

/// Advanced-control timer (TIM1/TIM8 class)
///
/// Provides the repetition counter, complementary outputs and the
/// break/dead-time register.
///
/// # Safety
/// The timer instance implements the advanced-control feature set.
pub unsafe trait AdvancedTimerId: TimerId {}

/// Analog to digital converter with the STM32F1 register layout
///
/// # Safety
/// [`PeripheralId::address`] points to an ADC register block.
pub unsafe trait AdcId: PeripheralId {
    /// `true` for the master converter of a dual pair, the only one whose
    /// DUALMOD field is writable.
    const MASTER: bool = false;
    /// `true` if the converter can raise DMA requests.
    const HAS_DMA: bool = true;
}

/// FDCAN controller with a fixed message RAM layout (STM32G4)
///
/// # Safety
/// [`PeripheralId::address`] points to an FDCAN register block and
/// [`FdcanId::message_ram`] to the message RAM section assigned to that
/// instance.
pub unsafe trait FdcanId: PeripheralId {
    /// `true` for the instance whose register block holds the kernel clock
    /// divider (`CKDIV`) shared by all instances.
    const CLOCK_DIVIDER: bool = false;

    /// Start of the message RAM section of the instance
    fn message_ram() -> *const ();
}

/// Trait representing peripheral dependencies
///
/// Structs implementing [`Dependencies`] should
/// - enclose all object representable dependencies of the peripheral and
///   release them upon destruction
/// - be constructible only when it is safe and sound to interact with the
///   peripheral (its bus clock is enabled)
/// - be a singleton (only a single instance of [`Dependencies`] for a specific
///   [`PeripheralId`] must exist at the same time)
///
/// # Safety
/// While a [`Dependencies`] type instance exists
/// - the clock feeding the peripheral must not change
/// - the register block must not be accessed by other parts of the program
pub unsafe trait Dependencies<Id: PeripheralId> {
    /// Frequency of the clock driving the peripheral kernel.
    ///
    /// For timers this is the timer input clock (twice the APB clock when
    /// the APB prescaler is not 1), for ADCs the ADC clock and for FDCAN the
    /// kernel clock.
    fn peripheral_clock(&self) -> fugit::HertzU32;
}
