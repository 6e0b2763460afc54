//! Peripheral instances of the STM32F1 family
//!
//! Addresses follow the connectivity line and XL-density memory map. Not
//! every device implements every instance.

use crate::rcc::{Bus, ClockDomain, RccPeripheral};
use opencm3_core::{AdcId, AdvancedTimerId, PeripheralId, TimerId};

macro_rules! instance {
    ($(#[$attr:meta])* $name:ident, $address:expr, $bus:ident[$bit:expr], $clock:ident) => {
        instance!($(#[$attr])* $name, $address);

        unsafe impl RccPeripheral for $name {
            const BUS: Bus = Bus::$bus;
            const BIT: u8 = $bit;
            const CLOCK: ClockDomain = ClockDomain::$clock;
        }
    };
    ($(#[$attr:meta])* $name:ident, $address:expr) => {
        $(#[$attr])*
        pub enum $name {}

        unsafe impl PeripheralId for $name {
            fn address() -> *const () {
                $address as *const ()
            }
        }
    };
}

instance!(
    /// Reset and clock control
    RCC,
    0x4002_1000
);
instance!(
    /// Flash interface
    FLASH,
    0x4002_2000
);

instance!(
    /// Advanced-control timer 1
    TIM1,
    0x4001_2C00,
    Apb2[11],
    Apb2Timer
);
instance!(
    /// General purpose timer 2
    TIM2,
    0x4000_0000,
    Apb1[0],
    Apb1Timer
);
instance!(
    /// General purpose timer 3
    TIM3,
    0x4000_0400,
    Apb1[1],
    Apb1Timer
);
instance!(
    /// General purpose timer 4
    TIM4,
    0x4000_0800,
    Apb1[2],
    Apb1Timer
);
instance!(
    /// General purpose timer 5
    TIM5,
    0x4000_0C00,
    Apb1[3],
    Apb1Timer
);
instance!(
    /// Basic timer 6
    TIM6,
    0x4000_1000,
    Apb1[4],
    Apb1Timer
);
instance!(
    /// Basic timer 7
    TIM7,
    0x4000_1400,
    Apb1[5],
    Apb1Timer
);
instance!(
    /// Advanced-control timer 8
    TIM8,
    0x4001_3400,
    Apb2[13],
    Apb2Timer
);

unsafe impl TimerId for TIM1 {}
unsafe impl TimerId for TIM2 {}
unsafe impl TimerId for TIM3 {}
unsafe impl TimerId for TIM4 {}
unsafe impl TimerId for TIM5 {}
unsafe impl TimerId for TIM6 {}
unsafe impl TimerId for TIM7 {}
unsafe impl TimerId for TIM8 {}
unsafe impl AdvancedTimerId for TIM1 {}
unsafe impl AdvancedTimerId for TIM8 {}

instance!(
    /// ADC 1, master of the dual converter pair
    ADC1,
    0x4001_2400,
    Apb2[9],
    Adc
);
instance!(
    /// ADC 2, slave of the dual converter pair
    ADC2,
    0x4001_2800,
    Apb2[10],
    Adc
);
instance!(
    /// ADC 3
    ADC3,
    0x4001_3C00,
    Apb2[15],
    Adc
);

unsafe impl AdcId for ADC1 {
    const MASTER: bool = true;
}
// ADC2 has no DMA request line, its results are read through ADC1 in dual
// mode.
unsafe impl AdcId for ADC2 {
    const HAS_DMA: bool = false;
}
unsafe impl AdcId for ADC3 {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn timers_are_clocked_from_their_bus() {
        assert_eq!(TIM1::BUS, Bus::Apb2);
        assert_eq!(TIM1::CLOCK, ClockDomain::Apb2Timer);
        assert_eq!(TIM5::BIT, 3);
        assert_eq!(TIM5::CLOCK, ClockDomain::Apb1Timer);
        assert_eq!(TIM8::address() as usize, 0x4001_3400);
    }

    #[test]
    fn adc_roles() {
        assert!(ADC1::MASTER);
        assert!(!ADC2::MASTER && !ADC2::HAS_DMA);
        assert!(ADC3::HAS_DMA);
        assert_eq!(ADC3::BIT, 15);
    }
}
