#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
//! # opencm3
//!
//! ## Overview
//! Register level drivers for the peripherals of STM32 (and GD32)
//! Cortex-M microcontrollers:
//!
//! - [`timer`]: basic, general purpose and advanced-control timers with
//!   output compare, input capture, PWM and break/dead-time
//! - [`rcc`] and [`flash`]: STM32F1 clock tree presets, peripheral clock
//!   gating and reset
//! - [`adc`]: STM32F1 ADC sequencer, calibration and conversions
//! - [`can`]: controller independent CAN bit timing calculation
//! - [`fdcan`]: STM32G4 FD-CAN controller
//!
//! Every peripheral instance is an uninhabited marker type (see [`stm32f1`]
//! and [`stm32g4`]) implementing the traits of [`opencm3_core`]. A driver
//! takes ownership of an instance by consuming a value implementing
//! [`Dependencies`] for it, which proves that the peripheral clock runs and
//! reports its frequency. [`rcc::Rcc::enable`] hands out such values on the
//! F1 and keeps the clock tree frozen while they are alive.
//!
//! ```no_run
//! use opencm3::rcc::{ClockSetup, Rcc};
//! use opencm3::stm32f1::{FLASH, RCC, TIM2};
//! use opencm3::timer::Timer;
//!
//! # fn example() -> Result<(), opencm3::rcc::Error> {
//! let mut rcc = unsafe { Rcc::<RCC>::new() };
//! let mut flash = unsafe { opencm3::flash::Flash::<FLASH>::new() };
//! rcc.clock_setup(&mut flash, &ClockSetup::HSE_8MHZ_72MHZ)?;
//! let tim2 = rcc.enable::<TIM2>()?;
//! let mut timer = Timer::<TIM2, _>::new(tim2);
//! timer.enable_counter();
//! # Ok(())
//! # }
//! ```
//!
//! All waits on hardware are bounded and fail with [`poll::Timeout`].
//!
//! ## Logging
//! Configuration steps are logged through `defmt-or-log`. Enable the `defmt`
//! or the `log` feature to route them to the respective framework.
//!
//! [`Dependencies`]: opencm3_core::Dependencies

pub mod adc;
pub mod can;
pub mod fdcan;
pub mod flash;
pub mod poll;
pub mod prelude;
pub mod rcc;
pub mod reg;
pub mod stm32f1;
pub mod stm32g4;
pub mod timer;

#[cfg(test)]
mod testing;

pub use embedded_can;
pub use embedded_hal;
pub use opencm3_core as core;
