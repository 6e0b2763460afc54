//! RAM backed peripheral instances for host tests

use core::cell::UnsafeCell;
use fugit::HertzU32;
use opencm3_core::{Dependencies, PeripheralId};

/// Zero initialized memory standing in for a register block.
#[repr(C, align(8))]
pub(crate) struct FakeBlock<const N: usize>(UnsafeCell<[u32; N]>);

// Every test declares its own instance marker, so a block is only ever
// touched from a single test thread.
unsafe impl<const N: usize> Sync for FakeBlock<N> {}

impl<const N: usize> FakeBlock<N> {
    pub(crate) const fn new() -> Self {
        Self(UnsafeCell::new([0; N]))
    }

    pub(crate) fn as_ptr(&self) -> *const () {
        self.0.get() as *const ()
    }

    /// Reads the word at byte `offset`.
    pub(crate) fn word(&self, offset: usize) -> u32 {
        assert!(offset % 4 == 0 && offset / 4 < N);
        unsafe { core::ptr::read_volatile((self.0.get() as *const u32).add(offset / 4)) }
    }

    /// Writes the word at byte `offset`, e.g. to fake a status flag set by
    /// hardware.
    pub(crate) fn set_word(&self, offset: usize, value: u32) {
        assert!(offset % 4 == 0 && offset / 4 < N);
        unsafe { core::ptr::write_volatile((self.0.get() as *mut u32).add(offset / 4), value) }
    }
}

/// Declares an uninhabited instance marker whose registers live in a static
/// [`FakeBlock`] of `$words` words.
macro_rules! fake_peripheral {
    ($name:ident, $words:expr) => {
        enum $name {}

        impl $name {
            fn block() -> &'static $crate::testing::FakeBlock<{ $words }> {
                static BLOCK: $crate::testing::FakeBlock<{ $words }> =
                    $crate::testing::FakeBlock::new();
                &BLOCK
            }
        }

        unsafe impl opencm3_core::PeripheralId for $name {
            fn address() -> *const () {
                Self::block().as_ptr()
            }
        }
    };
}
pub(crate) use fake_peripheral;

/// Clock dependency with a fixed frequency.
pub(crate) struct FixedClock(pub HertzU32);

unsafe impl<Id: PeripheralId> Dependencies<Id> for FixedClock {
    fn peripheral_clock(&self) -> HertzU32 {
        self.0
    }
}
