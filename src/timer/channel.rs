//! Output compare and input capture channels

use super::{Error, Timer};
use crate::reg::tim::{ccer, ccmr};
use crate::reg::RegisterValue as _;
use opencm3_core::{Dependencies, TimerId};

/// Capture/compare channel
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    /// Channel 1
    C1 = 0,
    /// Channel 2
    C2 = 1,
    /// Channel 3
    C3 = 2,
    /// Channel 4
    C4 = 3,
}

impl Channel {
    /// All channels in ascending order
    pub const ALL: [Channel; 4] = [Channel::C1, Channel::C2, Channel::C3, Channel::C4];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// CCMR register holding the channel
    fn ccmr(self) -> usize {
        self.index() / 2
    }

    /// Offset of the channel half inside its CCMR register
    fn ccmr_shift(self) -> u32 {
        (self.index() as u32 % 2) * 8
    }

    pub(crate) fn ccer_bit(self, bit: u32) -> u32 {
        1 << (self.index() as u32 * 4 + bit)
    }
}

/// Output compare mode (OCxM)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OcMode {
    /// Comparison has no effect on the output
    Frozen = 0,
    /// Output goes active on match
    Active = 1,
    /// Output goes inactive on match
    Inactive = 2,
    /// Output toggles on match
    Toggle = 3,
    /// Output forced inactive
    ForceLow = 4,
    /// Output forced active
    ForceHigh = 5,
    /// Active while counter is below the compare value (counting up)
    Pwm1 = 6,
    /// Inactive while counter is below the compare value (counting up)
    Pwm2 = 7,
}

/// Output polarity, input capture edge or external trigger polarity
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Active high / rising edge / non-inverted
    #[default]
    High,
    /// Active low / falling edge / inverted
    Low,
}

/// Digital filter applied to a timer input (ICxF, ETF)
///
/// Variants name the sampling clock and the number of consecutive equal
/// samples required, e.g. `DtfDiv8N6` samples at f_DTS / 8 and needs 6
/// samples.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputFilter {
    /// No filter, sampling at f_DTS
    #[default]
    Off = 0,
    /// f_CK_INT, N = 2
    CkIntN2 = 1,
    /// f_CK_INT, N = 4
    CkIntN4 = 2,
    /// f_CK_INT, N = 8
    CkIntN8 = 3,
    /// f_DTS / 2, N = 6
    DtfDiv2N6 = 4,
    /// f_DTS / 2, N = 8
    DtfDiv2N8 = 5,
    /// f_DTS / 4, N = 6
    DtfDiv4N6 = 6,
    /// f_DTS / 4, N = 8
    DtfDiv4N8 = 7,
    /// f_DTS / 8, N = 6
    DtfDiv8N6 = 8,
    /// f_DTS / 8, N = 8
    DtfDiv8N8 = 9,
    /// f_DTS / 16, N = 5
    DtfDiv16N5 = 10,
    /// f_DTS / 16, N = 6
    DtfDiv16N6 = 11,
    /// f_DTS / 16, N = 8
    DtfDiv16N8 = 12,
    /// f_DTS / 32, N = 5
    DtfDiv32N5 = 13,
    /// f_DTS / 32, N = 6
    DtfDiv32N6 = 14,
    /// f_DTS / 32, N = 8
    DtfDiv32N8 = 15,
}

/// Input capture or external trigger prescaler
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Prescaler {
    /// Every edge
    #[default]
    Off = 0,
    /// Every 2nd edge
    Div2 = 1,
    /// Every 4th edge
    Div4 = 2,
    /// Every 8th edge
    Div8 = 3,
}

/// Signal routed to a capture channel (CCxS)
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IcInput {
    /// Channel configured as output
    Out,
    /// Timer input 1
    Ti1,
    /// Timer input 2
    Ti2,
    /// Internal trigger input
    Trc,
    /// Timer input 3
    Ti3,
    /// Timer input 4
    Ti4,
}

impl IcInput {
    /// CCxS encoding of routing `self` to `channel`. Each channel can capture
    /// its own input or the other input of its pair.
    fn selection(self, channel: Channel) -> Result<u32, Error> {
        use Channel::*;
        use IcInput::*;
        let ccs = match (channel, self) {
            (_, Out) => 0,
            (_, Trc) => 3,
            (C1, Ti1) | (C2, Ti2) | (C3, Ti3) | (C4, Ti4) => 1,
            (C1, Ti2) | (C2, Ti1) | (C3, Ti4) | (C4, Ti3) => 2,
            _ => return Err(Error::InvalidInput { channel, input: self }),
        };
        Ok(ccs)
    }
}

impl<Id: TimerId, D: Dependencies<Id>> Timer<Id, D> {
    fn modify_ccmr(&mut self, channel: Channel, f: impl FnOnce(&mut u32, u32)) {
        let shift = channel.ccmr_shift();
        self.regs().ccmr[channel.ccmr()].modify(|_, w| f(w, shift));
    }

    fn set_ccer(&mut self, mask: u32, value: bool) {
        self.regs().ccer.modify(|_, w| w.set_mask(mask, value));
    }

    /// Sets the output compare mode and configures the channel as output.
    pub fn set_oc_mode(&mut self, channel: Channel, mode: OcMode) {
        self.modify_ccmr(channel, |w, shift| {
            w.set_field(shift + ccmr::CCS, 2, 0);
            w.set_field(shift + ccmr::OCM, 3, mode as u32);
        });
    }

    /// The output reference is cleared by a high level on ETRF.
    pub fn enable_oc_clear(&mut self, channel: Channel) {
        self.modify_ccmr(channel, |w, shift| w.set_mask(1 << (shift + ccmr::OCCE), true));
    }

    /// ETRF has no effect on the output reference.
    pub fn disable_oc_clear(&mut self, channel: Channel) {
        self.modify_ccmr(channel, |w, shift| w.set_mask(1 << (shift + ccmr::OCCE), false));
    }

    /// A trigger acts on the output as if a compare match occurred, without
    /// waiting for the comparison.
    pub fn set_oc_fast_mode(&mut self, channel: Channel) {
        self.modify_ccmr(channel, |w, shift| w.set_mask(1 << (shift + ccmr::OCFE), true));
    }

    /// The output follows the comparison only.
    pub fn set_oc_slow_mode(&mut self, channel: Channel) {
        self.modify_ccmr(channel, |w, shift| w.set_mask(1 << (shift + ccmr::OCFE), false));
    }

    /// Buffers the compare value until the next update event.
    pub fn enable_oc_preload(&mut self, channel: Channel) {
        self.modify_ccmr(channel, |w, shift| w.set_mask(1 << (shift + ccmr::OCPE), true));
    }

    /// Compare value writes take effect immediately.
    pub fn disable_oc_preload(&mut self, channel: Channel) {
        self.modify_ccmr(channel, |w, shift| w.set_mask(1 << (shift + ccmr::OCPE), false));
    }

    /// Output is active high.
    pub fn set_oc_polarity_high(&mut self, channel: Channel) {
        self.set_ccer(channel.ccer_bit(ccer::CCP), false);
    }

    /// Output is active low.
    pub fn set_oc_polarity_low(&mut self, channel: Channel) {
        self.set_ccer(channel.ccer_bit(ccer::CCP), true);
    }

    /// Drives the output pin from the channel.
    pub fn enable_oc_output(&mut self, channel: Channel) {
        self.set_ccer(channel.ccer_bit(ccer::CCE), true);
    }

    /// Releases the output pin.
    pub fn disable_oc_output(&mut self, channel: Channel) {
        self.set_ccer(channel.ccer_bit(ccer::CCE), false);
    }

    /// Sets the compare value.
    pub fn set_oc_value(&mut self, channel: Channel, value: u32) {
        // Safety: CCRx has no reserved bit patterns.
        unsafe { self.regs().ccr[channel.index()].write_bits(value) }
    }

    /// Compare value, or the last captured counter value in input mode
    pub fn get_oc_value(&self, channel: Channel) -> u32 {
        self.regs().ccr[channel.index()].bits()
    }

    /// Sets the digital filter of the channel input.
    pub fn ic_set_filter(&mut self, channel: Channel, filter: InputFilter) {
        self.modify_ccmr(channel, |w, shift| {
            w.set_field(shift + ccmr::ICF, 4, filter as u32)
        });
    }

    /// Sets the number of events between two captures.
    pub fn ic_set_prescaler(&mut self, channel: Channel, prescaler: Prescaler) {
        self.modify_ccmr(channel, |w, shift| {
            w.set_field(shift + ccmr::ICPSC, 2, prescaler as u32)
        });
    }

    /// Routes `input` to the capture channel. Channels 1 and 2 can capture
    /// TI1 or TI2, channels 3 and 4 TI3 or TI4, all of them TRC.
    pub fn ic_set_input(&mut self, channel: Channel, input: IcInput) -> Result<(), Error> {
        let ccs = input.selection(channel)?;
        self.modify_ccmr(channel, |w, shift| w.set_field(shift + ccmr::CCS, 2, ccs));
        Ok(())
    }

    /// Selects the capture edge.
    pub fn ic_set_polarity(&mut self, channel: Channel, polarity: Polarity) {
        self.set_ccer(channel.ccer_bit(ccer::CCP), polarity == Polarity::Low);
    }

    /// Enables capture.
    pub fn ic_enable(&mut self, channel: Channel) {
        self.set_ccer(channel.ccer_bit(ccer::CCE), true);
    }

    /// Disables capture.
    pub fn ic_disable(&mut self, channel: Channel) {
        self.set_ccer(channel.ccer_bit(ccer::CCE), false);
    }
}
