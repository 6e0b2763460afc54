//! [`embedded_hal::PwmPin`] view of an output compare channel

use super::{Channel, OcMode, Timer};
use opencm3_core::{Dependencies, TimerId};

/// An output compare channel borrowed from a [`Timer`] and driven as a PWM
/// output. The duty cycle is the compare value. The output is active while
/// the counter is below it, so the maximum duty cycle is the auto-reload
/// value plus one.
///
/// CCRx of a 16-bit timer cannot hold 0x1_0000. With an auto-reload value of
/// 0xFFFF the maximum duty cycle reads back as 0.
pub struct PwmChannel<'a, Id: TimerId, D: Dependencies<Id>> {
    timer: &'a mut Timer<Id, D>,
    channel: Channel,
}

impl<Id: TimerId, D: Dependencies<Id>> Timer<Id, D> {
    /// Puts `channel` in PWM mode 1 with preloaded compare value and returns
    /// a handle implementing [`embedded_hal::PwmPin`]. The output stays
    /// disabled until [`PwmPin::enable`] is called.
    ///
    /// [`PwmPin::enable`]: embedded_hal::PwmPin::enable
    pub fn pwm_channel(&mut self, channel: Channel) -> PwmChannel<'_, Id, D> {
        self.set_oc_mode(channel, OcMode::Pwm1);
        self.enable_oc_preload(channel);
        PwmChannel {
            timer: self,
            channel,
        }
    }
}

impl<Id: TimerId, D: Dependencies<Id>> PwmChannel<'_, Id, D> {
    /// The channel driven by this handle
    pub fn channel(&self) -> Channel {
        self.channel
    }
}

impl<Id: TimerId, D: Dependencies<Id>> embedded_hal::PwmPin for PwmChannel<'_, Id, D> {
    type Duty = u32;

    fn disable(&mut self) {
        self.timer.disable_oc_output(self.channel);
    }

    fn enable(&mut self) {
        self.timer.enable_oc_output(self.channel);
    }

    fn get_duty(&self) -> Self::Duty {
        self.timer.get_oc_value(self.channel)
    }

    fn get_max_duty(&self) -> Self::Duty {
        self.timer.regs().arr.bits().saturating_add(1)
    }

    fn set_duty(&mut self, duty: Self::Duty) {
        let duty = duty.min(self.get_max_duty());
        self.timer.set_oc_value(self.channel, duty);
    }
}
