//! Traits needed to call the methods of the drivers, imported anonymously

pub use crate::fdcan::bus::CanBus as _;
pub use crate::fdcan::message::Raw as _;
pub use embedded_can::Frame as _;
pub use embedded_hal::adc::OneShot as _;
pub use embedded_hal::PwmPin as _;
