//! Peripheral instances of the STM32G4 family
//!
//! Only the FD-CAN controllers are provided. Their clocks are controlled by
//! the G4 RCC, which is not covered by [`crate::rcc`]; the application
//! supplies the [`Dependencies`] of an instance.
//!
//! [`Dependencies`]: opencm3_core::Dependencies

use opencm3_core::{FdcanId, PeripheralId};

/// Start of SRAMCAN, the message RAM shared by the controllers
const SRAMCAN: usize = 0x4000_A400;

macro_rules! fdcan {
    ($(#[$attr:meta])* $name:ident, $address:expr, $index:expr, $divider:expr) => {
        $(#[$attr])*
        pub enum $name {}

        unsafe impl PeripheralId for $name {
            fn address() -> *const () {
                $address as *const ()
            }
        }

        unsafe impl FdcanId for $name {
            const CLOCK_DIVIDER: bool = $divider;

            fn message_ram() -> *const () {
                (SRAMCAN + $index * crate::fdcan::messageram::SIZE) as *const ()
            }
        }
    };
}

fdcan!(
    /// FD-CAN controller 1, holds the clock divider of all controllers
    FDCAN1,
    0x4000_6400,
    0,
    true
);
fdcan!(
    /// FD-CAN controller 2
    FDCAN2,
    0x4000_6800,
    1,
    false
);
fdcan!(
    /// FD-CAN controller 3
    FDCAN3,
    0x4000_6C00,
    2,
    false
);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn message_ram_sections_follow_each_other() {
        assert_eq!(FDCAN1::message_ram() as usize, 0x4000_A400);
        assert_eq!(FDCAN3::message_ram() as usize, 0x4000_A400 + 2 * 0x350);
        assert!(FDCAN1::CLOCK_DIVIDER && !FDCAN2::CLOCK_DIVIDER);
    }
}
