//! Register blocks of the supported peripherals
//!
//! Every register is a [`Reg`] wrapping a volatile 32-bit word. The value
//! types are declared with [`bitfield`] and implement [`RegisterValue`], which
//! gives `read`/`write`/`modify` accessors in the usual PAC flavour:
//!
//! ```ignore
//! tim.cr1.modify(|_, w| w.set_cen(true));
//! let counting_down = tim.cr1.read().dir();
//! ```
//!
//! [`bitfield`]: https://docs.rs/bitfield

pub mod adc;
pub mod fdcan;
pub mod flash;
pub mod rcc;
pub mod tim;

use core::marker::PhantomData;
use vcell::VolatileCell;

/// Value stored in a [`Reg`]
pub trait RegisterValue: Copy {
    /// Wraps raw register contents
    fn from_bits(bits: u32) -> Self;
    /// Raw register contents
    fn bits(&self) -> u32;

    /// Sets or clears all bits of `mask`.
    fn set_mask(&mut self, mask: u32, value: bool) {
        let bits = if value {
            self.bits() | mask
        } else {
            self.bits() & !mask
        };
        *self = Self::from_bits(bits);
    }

    /// `true` if any bit of `mask` is set.
    fn any(&self, mask: u32) -> bool {
        self.bits() & mask != 0
    }

    /// Reads the `width` bits wide field starting at `shift`.
    fn field(&self, shift: u32, width: u32) -> u32 {
        (self.bits() >> shift) & field_mask(width)
    }

    /// Replaces the `width` bits wide field starting at `shift`. Bits of
    /// `value` that do not fit are dropped.
    fn set_field(&mut self, shift: u32, width: u32, value: u32) {
        let mask = field_mask(width) << shift;
        *self = Self::from_bits((self.bits() & !mask) | ((value << shift) & mask));
    }
}

fn field_mask(width: u32) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1 << width) - 1
    }
}

impl RegisterValue for u32 {
    fn from_bits(bits: u32) -> Self {
        bits
    }

    fn bits(&self) -> u32 {
        *self
    }
}

/// Implements [`RegisterValue`] for `bitfield!` newtypes declared in the
/// invoking module.
macro_rules! register_values {
    ($($name:ident),* $(,)?) => {
        $(
            impl $crate::reg::RegisterValue for $name {
                fn from_bits(bits: u32) -> Self {
                    Self(bits)
                }

                fn bits(&self) -> u32 {
                    self.0
                }
            }
        )*
    };
}
pub(crate) use register_values;

/// A memory mapped 32-bit register holding values of type `T`
#[repr(transparent)]
pub struct Reg<T: RegisterValue> {
    cell: VolatileCell<u32>,
    _value: PhantomData<T>,
}

impl<T: RegisterValue> Reg<T> {
    /// Reads the register.
    #[inline(always)]
    pub fn read(&self) -> T {
        T::from_bits(self.cell.get())
    }

    /// Writes a value built by `f`, starting from all zeros.
    #[inline(always)]
    pub fn write<F: FnOnce(&mut T)>(&self, f: F) {
        let mut value = T::from_bits(0);
        f(&mut value);
        self.cell.set(value.bits());
    }

    /// Read-modify-write. `f` receives the current value and a copy of it to
    /// be altered and written back.
    #[inline(always)]
    pub fn modify<F: FnOnce(&T, &mut T)>(&self, f: F) {
        let read = self.read();
        let mut value = read;
        f(&read, &mut value);
        self.cell.set(value.bits());
    }

    /// Raw register contents.
    #[inline(always)]
    pub fn bits(&self) -> u32 {
        self.cell.get()
    }

    /// Writes raw bits to the register.
    ///
    /// # Safety
    /// Passing an incorrect value can cause undefined behaviour. See reference
    /// manual.
    #[inline(always)]
    pub unsafe fn write_bits(&self, bits: u32) {
        self.cell.set(bits);
    }
}

/// Register block of type `B` located at the address of `Id`.
///
/// # Safety
/// `Id` must point to a register block of type `B` and the caller must own
/// the registers it touches through the returned reference.
pub(crate) unsafe fn block<'a, Id: opencm3_core::PeripheralId, B>() -> &'a B {
    &*(Id::address() as *const B)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_field_drops_overflowing_bits() {
        let mut v = 0xffff_ffff_u32;
        v.set_field(4, 3, 0b1010);
        assert_eq!(v, 0xffff_ffaf);
        assert_eq!(v.field(4, 3), 0b010);
    }

    #[test]
    fn set_mask_sets_and_clears() {
        let mut v = 0_u32;
        v.set_mask(0x81, true);
        assert!(v.any(0x80));
        v.set_mask(0x01, false);
        assert_eq!(v, 0x80);
    }

    #[test]
    fn modify_keeps_untouched_bits() {
        let reg: Reg<u32> = Reg {
            cell: VolatileCell::new(0x1234_0000),
            _value: PhantomData,
        };
        reg.modify(|r, w| *w = r | 0x5);
        assert_eq!(reg.bits(), 0x1234_0005);
        reg.write(|w| *w |= 0x2);
        assert_eq!(reg.read(), 0x2);
    }
}
