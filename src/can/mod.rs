//! Controller independent CAN helpers

pub mod bit_timing;
