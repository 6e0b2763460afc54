//! Timer interrupt, DMA request, status flag and event sets

use super::Channel;
use bitfield::bitfield;

bitfield! {
    /// A set of timer interrupt and DMA request enables (DIER).
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct InterruptSet(u32);
    impl Debug;

    /// Update interrupt
    pub uie, set_uie: 0;
    /// Capture/compare 1 interrupt
    pub cc1ie, set_cc1ie: 1;
    /// Capture/compare 2 interrupt
    pub cc2ie, set_cc2ie: 2;
    /// Capture/compare 3 interrupt
    pub cc3ie, set_cc3ie: 3;
    /// Capture/compare 4 interrupt
    pub cc4ie, set_cc4ie: 4;
    /// Commutation interrupt
    pub comie, set_comie: 5;
    /// Trigger interrupt
    pub tie, set_tie: 6;
    /// Break interrupt
    pub bie, set_bie: 7;
    /// Update DMA request
    pub ude, set_ude: 8;
    /// Capture/compare 1 DMA request
    pub cc1de, set_cc1de: 9;
    /// Capture/compare 2 DMA request
    pub cc2de, set_cc2de: 10;
    /// Capture/compare 3 DMA request
    pub cc3de, set_cc3de: 11;
    /// Capture/compare 4 DMA request
    pub cc4de, set_cc4de: 12;
    /// Commutation DMA request
    pub comde, set_comde: 13;
    /// Trigger DMA request
    pub tde, set_tde: 14;
}

bitfield! {
    /// A set of timer status flags (SR).
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct FlagSet(u32);

    /// Update interrupt flag
    pub uif, set_uif: 0;
    /// Capture/compare 1 interrupt flag
    pub cc1if, set_cc1if: 1;
    /// Capture/compare 2 interrupt flag
    pub cc2if, set_cc2if: 2;
    /// Capture/compare 3 interrupt flag
    pub cc3if, set_cc3if: 3;
    /// Capture/compare 4 interrupt flag
    pub cc4if, set_cc4if: 4;
    /// Commutation interrupt flag
    pub comif, set_comif: 5;
    /// Trigger interrupt flag
    pub tif, set_tif: 6;
    /// Break interrupt flag
    pub bif, set_bif: 7;
    /// Capture/compare 1 overcapture flag
    pub cc1of, set_cc1of: 9;
    /// Capture/compare 2 overcapture flag
    pub cc2of, set_cc2of: 10;
    /// Capture/compare 3 overcapture flag
    pub cc3of, set_cc3of: 11;
    /// Capture/compare 4 overcapture flag
    pub cc4of, set_cc4of: 12;
}

bitfield! {
    /// A set of software generated events (EGR).
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct EventSet(u32);
    impl Debug;

    /// Update generation
    pub ug, set_ug: 0;
    /// Capture/compare 1 generation
    pub cc1g, set_cc1g: 1;
    /// Capture/compare 2 generation
    pub cc2g, set_cc2g: 2;
    /// Capture/compare 3 generation
    pub cc3g, set_cc3g: 3;
    /// Capture/compare 4 generation
    pub cc4g, set_cc4g: 4;
    /// Capture/compare control update generation
    pub comg, set_comg: 5;
    /// Trigger generation
    pub tg, set_tg: 6;
    /// Break generation
    pub bg, set_bg: 7;
}

impl InterruptSet {
    /// Raw DIER bits
    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl FlagSet {
    /// Raw SR bits
    pub fn bits(&self) -> u32 {
        self.0
    }

    pub(crate) fn from_bits(bits: u32) -> Self {
        Self(bits & 0x1eff)
    }
}

impl EventSet {
    /// Raw EGR bits
    pub fn bits(&self) -> u32 {
        self.0
    }
}

/// A single timer event. The same bit position identifies the interrupt
/// enable, the status flag and the software event generation bit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// UIF
    Update = 0,
    /// CC1IF
    CaptureCompare1 = 1,
    /// CC2IF
    CaptureCompare2 = 2,
    /// CC3IF
    CaptureCompare3 = 3,
    /// CC4IF
    CaptureCompare4 = 4,
    /// COMIF
    Commutation = 5,
    /// TIF
    Trigger = 6,
    /// BIF
    Break = 7,
}

/// A single DMA request source.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaRequest {
    /// UDE
    Update = 8,
    /// CC1DE
    CaptureCompare1 = 9,
    /// CC2DE
    CaptureCompare2 = 10,
    /// CC3DE
    CaptureCompare3 = 11,
    /// CC4DE
    CaptureCompare4 = 12,
    /// COMDE
    Commutation = 13,
    /// TDE
    Trigger = 14,
}

/// The overcapture flag (CCxOF) of an input capture channel. Set when a
/// capture happens while the capture flag of the previous one is still set.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Overcapture(pub Channel);

impl From<Overcapture> for u32 {
    fn from(x: Overcapture) -> Self {
        1 << (9 + x.0.index())
    }
}

impl From<Event> for u32 {
    fn from(x: Event) -> Self {
        1 << x as u32
    }
}

impl From<DmaRequest> for u32 {
    fn from(x: DmaRequest) -> Self {
        1 << x as u32
    }
}

impl TryFrom<u8> for Event {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use Event::*;
        let ret = match value {
            0 => Update,
            1 => CaptureCompare1,
            2 => CaptureCompare2,
            3 => CaptureCompare3,
            4 => CaptureCompare4,
            5 => Commutation,
            6 => Trigger,
            7 => Break,
            other => return Err(other),
        };
        Ok(ret)
    }
}

impl FromIterator<Event> for InterruptSet {
    fn from_iter<T: IntoIterator<Item = Event>>(iter: T) -> Self {
        InterruptSet(iter.into_iter().fold(0, |set, e| set | u32::from(e)))
    }
}

impl FromIterator<DmaRequest> for InterruptSet {
    fn from_iter<T: IntoIterator<Item = DmaRequest>>(iter: T) -> Self {
        InterruptSet(iter.into_iter().fold(0, |set, r| set | u32::from(r)))
    }
}

impl FromIterator<Event> for FlagSet {
    fn from_iter<T: IntoIterator<Item = Event>>(iter: T) -> Self {
        FlagSet(iter.into_iter().fold(0, |set, e| set | u32::from(e)))
    }
}

impl FromIterator<Overcapture> for FlagSet {
    fn from_iter<T: IntoIterator<Item = Overcapture>>(iter: T) -> Self {
        FlagSet(iter.into_iter().fold(0, |set, o| set | u32::from(o)))
    }
}

impl FromIterator<Event> for EventSet {
    fn from_iter<T: IntoIterator<Item = Event>>(iter: T) -> Self {
        EventSet(iter.into_iter().fold(0, |set, e| set | u32::from(e)))
    }
}

impl From<Event> for FlagSet {
    fn from(e: Event) -> Self {
        FlagSet(e.into())
    }
}

impl From<Overcapture> for FlagSet {
    fn from(o: Overcapture) -> Self {
        FlagSet(o.into())
    }
}

impl core::ops::BitOr for FlagSet {
    type Output = FlagSet;

    fn bitor(self, rhs: FlagSet) -> FlagSet {
        FlagSet(self.0 | rhs.0)
    }
}

impl From<Event> for EventSet {
    fn from(e: Event) -> Self {
        EventSet(e.into())
    }
}

impl FlagSet {
    /// An iterator visiting the flagged interrupt events in ascending order.
    /// Overcapture flags are not events and are skipped.
    pub fn iter(&self) -> Iter {
        Iter {
            flags: *self,
            index: 0,
        }
    }
}

impl core::fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "FlagSet {{ ")?;
        for (i, name) in [
            "UIF", "CC1IF", "CC2IF", "CC3IF", "CC4IF", "COMIF", "TIF", "BIF", "", "CC1OF",
            "CC2OF", "CC3OF", "CC4OF",
        ]
        .iter()
        .enumerate()
        {
            if self.0 & (1 << i) != 0 && !name.is_empty() {
                write!(f, "{} ", name)?;
            }
        }
        write!(f, "}}")
    }
}

/// An iterator over the events of a [`FlagSet`].
///
/// This `struct` is created by [`FlagSet::iter`].
pub struct Iter {
    flags: FlagSet,
    index: u8,
}

impl Iterator for Iter {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        while let Ok(event) = Event::try_from(self.index) {
            self.index += 1;
            if self.flags.0 & u32::from(event) != 0 {
                return Some(event);
            }
        }
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn iter_skips_overcapture_flags() {
        let flags = FlagSet::from_bits(0x1e03);
        assert!(flags.cc4of());
        assert_eq!(
            flags.iter().collect::<Vec<_>>(),
            [Event::Update, Event::CaptureCompare1]
        );
    }

    #[test]
    fn overcapture_flags_follow_the_capture_flags() {
        let flags: FlagSet = [Overcapture(Channel::C1), Overcapture(Channel::C4)]
            .into_iter()
            .collect();
        assert_eq!(flags.bits(), (1 << 9) | (1 << 12));
        assert!(flags.cc1of() && flags.cc4of());

        let both = FlagSet::from(Event::CaptureCompare2) | Overcapture(Channel::C2).into();
        assert_eq!(both.bits(), (1 << 2) | (1 << 10));
        assert_eq!(both.iter().collect::<Vec<_>>(), [Event::CaptureCompare2]);
    }

    #[test]
    fn reserved_status_bits_are_dropped() {
        assert_eq!(FlagSet::from_bits(0xffff_ffff).bits(), 0x1eff);
    }

    #[test]
    fn interrupts_and_dma_requests_share_dier() {
        let irq: InterruptSet = [Event::Update, Event::Break].into_iter().collect();
        let dma: InterruptSet = [DmaRequest::CaptureCompare2].into_iter().collect();
        assert_eq!(irq.bits(), 0x81);
        assert_eq!(dma.bits(), 1 << 10);
        assert!(dma.cc2de());
    }
}
