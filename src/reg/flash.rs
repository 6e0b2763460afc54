//! Flash interface registers, STM32F1 layout

use super::{register_values, Reg};
use bitfield::bitfield;

/// Flash interface register block. Only the access control register is
/// used; programming and option bytes are out of scope.
#[repr(C)]
pub struct RegisterBlock {
    /// 0x00 - Flash access control register
    pub acr: Reg<Acr>,
}

bitfield! {
    /// ACR
    #[derive(Copy, Clone)]
    pub struct Acr(u32);
    impl Debug;
    /// Wait states
    pub u8, latency, set_latency: 2, 0;
    /// Flash half cycle access enable
    pub hlfcya, set_hlfcya: 3;
    /// Prefetch buffer enable
    pub prftbe, set_prftbe: 4;
    /// Prefetch buffer status
    pub prftbs, _: 5;
}

register_values!(Acr);
