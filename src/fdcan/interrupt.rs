//! Interrupt flags, enables and line selection
//!
//! On the G4 the line select register `ILS` has one bit per interrupt
//! *group*, not per interrupt. Moving an interrupt to a line moves every
//! interrupt of its group; see [`Group`].

use crate::reg::fdcan::RegisterBlock;
use crate::reg::Reg;
use bitfield::bitfield;
use core::marker::PhantomData;
use opencm3_core::FdcanId;

/// FDCAN interrupt lines
///
/// The peripheral provides two interrupt lines to the NVIC (`FDCANx_IT0`
/// and `FDCANx_IT1`).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptLine {
    /// IT0 line
    Line0,
    /// IT1 line
    Line1,
}

bitfield! {
    /// A set of FDCAN interrupts.
    #[derive(Copy, Clone, PartialEq, Eq)]
    pub struct InterruptSet(u32);

    /// Access to Reserved Address
    pub ara, set_ara: 23;
    /// Protocol Error in Data phase
    pub ped, set_ped: 22;
    /// Protocol Error in Arbitration phase
    pub pea, set_pea: 21;
    /// Watchdog
    pub wdi, set_wdi: 20;
    /// Bus Off
    pub bo, set_bo: 19;
    /// Warning status changed
    pub ew, set_ew: 18;
    /// Error Passive
    pub ep, set_ep: 17;
    /// Error Logging Overflow
    pub elo, set_elo: 16;
    /// Timeout Occurred
    pub too, set_too: 15;
    /// Message RAM Access Failure
    pub mraf, set_mraf: 14;
    /// Timestamp Wraparound
    pub tsw, set_tsw: 13;
    /// Tx Event FIFO Element Lost
    pub tefl, set_tefl: 12;
    /// Tx Event FIFO Full
    pub teff, set_teff: 11;
    /// Tx Event FIFO New Entry
    pub tefn, set_tefn: 10;
    /// Tx FIFO Empty
    pub tfe, set_tfe: 9;
    /// Transmission Cancellation Finished
    pub tcf, set_tcf: 8;
    /// Transmission Completed
    pub tc, set_tc: 7;
    /// High Priority Message
    pub hpm, set_hpm: 6;
    /// Rx FIFO 1 Message Lost
    pub rf1l, set_rf1l: 5;
    /// Rx FIFO 1 Full
    pub rf1f, set_rf1f: 4;
    /// Rx FIFO 1 New Message
    pub rf1n, set_rf1n: 3;
    /// Rx FIFO 0 Message Lost
    pub rf0l, set_rf0l: 2;
    /// Rx FIFO 0 Full
    pub rf0f, set_rf0f: 1;
    /// Rx FIFO 0 New Message
    pub rf0n, set_rf0n: 0;
}

/// Bits of IR that correspond to interrupts
const ALL: u32 = 0x00ff_ffff;

impl InterruptSet {
    /// The empty set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every interrupt of the peripheral
    pub const fn all() -> Self {
        Self(ALL)
    }

    /// An iterator visiting all elements in ascending bit order.
    pub fn iter(&self) -> Iter {
        Iter {
            flags: *self,
            index: 0,
        }
    }

    /// Line select bits of the groups touched by this set
    fn groups(&self) -> u32 {
        Group::ALL
            .iter()
            .filter(|g| self.0 & g.members() != 0)
            .fold(0, |ils, g| ils | 1 << *g as u32)
    }
}

impl FromIterator<Interrupt> for InterruptSet {
    fn from_iter<T: IntoIterator<Item = Interrupt>>(iter: T) -> Self {
        InterruptSet(iter.into_iter().fold(0, |set, int| set | u32::from(int)))
    }
}

impl core::fmt::Debug for InterruptSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// A single interrupt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Interrupt {
    /// RF0N
    RxFifo0NewMessage = 0,
    /// RF0F
    RxFifo0Full = 1,
    /// RF0L
    RxFifo0MessageLost = 2,
    /// RF1N
    RxFifo1NewMessage = 3,
    /// RF1F
    RxFifo1Full = 4,
    /// RF1L
    RxFifo1MessageLost = 5,
    /// HPM
    HighPriorityMessage = 6,
    /// TC
    TransmissionCompleted = 7,
    /// TCF
    TransmissionCancellationFinished = 8,
    /// TFE
    TxFifoEmpty = 9,
    /// TEFN
    TxEventFifoNewEntry = 10,
    /// TEFF
    TxEventFifoFull = 11,
    /// TEFL
    TxEventFifoElementLost = 12,
    /// TSW
    TimestampWraparound = 13,
    /// MRAF
    MessageRamAccessFailure = 14,
    /// TOO
    TimeoutOccurred = 15,
    /// ELO
    ErrorLoggingOverflow = 16,
    /// EP
    ErrorPassive = 17,
    /// EW
    WarningStatusChanged = 18,
    /// BO
    BusOff = 19,
    /// WDI
    Watchdog = 20,
    /// PEA
    ProtocolErrorArbitration = 21,
    /// PED
    ProtocolErrorData = 22,
    /// ARA
    AccessToReservedAddress = 23,
}

impl From<Interrupt> for u32 {
    fn from(x: Interrupt) -> Self {
        1 << x as u32
    }
}

impl From<Interrupt> for InterruptSet {
    fn from(x: Interrupt) -> Self {
        InterruptSet(x.into())
    }
}

/// The number does not name an interrupt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InvalidInterruptNumber;

impl TryFrom<u8> for Interrupt {
    type Error = InvalidInterruptNumber;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use Interrupt::*;
        let ret = match value {
            0 => RxFifo0NewMessage,
            1 => RxFifo0Full,
            2 => RxFifo0MessageLost,
            3 => RxFifo1NewMessage,
            4 => RxFifo1Full,
            5 => RxFifo1MessageLost,
            6 => HighPriorityMessage,
            7 => TransmissionCompleted,
            8 => TransmissionCancellationFinished,
            9 => TxFifoEmpty,
            10 => TxEventFifoNewEntry,
            11 => TxEventFifoFull,
            12 => TxEventFifoElementLost,
            13 => TimestampWraparound,
            14 => MessageRamAccessFailure,
            15 => TimeoutOccurred,
            16 => ErrorLoggingOverflow,
            17 => ErrorPassive,
            18 => WarningStatusChanged,
            19 => BusOff,
            20 => Watchdog,
            21 => ProtocolErrorArbitration,
            22 => ProtocolErrorData,
            23 => AccessToReservedAddress,
            24.. => Err(InvalidInterruptNumber)?,
        };
        Ok(ret)
    }
}

/// Interrupt groups sharing one line select bit
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Group {
    /// RF0N, RF0F, RF0L
    RxFifo0 = 0,
    /// RF1N, RF1F, RF1L
    RxFifo1 = 1,
    /// HPM, TC, TCF
    StatusMessage = 2,
    /// TFE, TEFN, TEFF, TEFL
    TxFifoError = 3,
    /// TSW, MRAF, TOO
    Misc = 4,
    /// ELO, EP
    BitLineError = 5,
    /// EW, BO, WDI, PEA, PED, ARA
    ProtocolError = 6,
}

impl Group {
    const ALL: [Group; 7] = [
        Group::RxFifo0,
        Group::RxFifo1,
        Group::StatusMessage,
        Group::TxFifoError,
        Group::Misc,
        Group::BitLineError,
        Group::ProtocolError,
    ];

    /// IR bits belonging to the group
    pub fn members(&self) -> u32 {
        match self {
            Group::RxFifo0 => 0x0000_0007,
            Group::RxFifo1 => 0x0000_0038,
            Group::StatusMessage => 0x0000_01c0,
            Group::TxFifoError => 0x0000_1e00,
            Group::Misc => 0x0000_e000,
            Group::BitLineError => 0x0003_0000,
            Group::ProtocolError => 0x00fc_0000,
        }
    }
}

/// An iterator over the items of an [`InterruptSet`].
///
/// This `struct` is created by [`InterruptSet::iter`].
pub struct Iter {
    flags: InterruptSet,
    index: u8,
}

impl Iterator for Iter {
    type Item = Interrupt;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let i = self.index;
            self.index = self.index.saturating_add(1);
            // No gaps in the flags, so this is `Some` until every interrupt
            // has been checked.
            let int = Interrupt::try_from(i).ok()?;
            if self.flags.0 & (1 << i) != 0 {
                return Some(int);
            }
        }
    }
}

/// Has exclusive access to a set of interrupts for FDCAN peripheral `P`.
/// Permits safe access to the owned interrupt flags.
pub struct OwnedInterruptSet<P>(InterruptSet, PhantomData<P>);

/// An input [`InterruptSet`] contained interrupts that were not available. The
/// set wrapped in the error indicates which elements caused the problem.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MaskError(pub InterruptSet);

impl<Id: FdcanId> OwnedInterruptSet<Id> {
    /// Assumes exclusive ownership of `interrupts`.
    ///
    /// # Safety
    /// Each interrupt of a peripheral can only be contained in one
    /// `OwnedInterruptSet`, otherwise registers will be mutably aliased.
    ///
    /// The reserved bits must not be included.
    unsafe fn new(interrupts: InterruptSet) -> Self {
        Self(interrupts, PhantomData)
    }

    /// Moves ownership of the interrupts described by `subset` from `self` to
    /// the return value. If `self` does not contain `subset`, an error is
    /// returned.
    fn split(&mut self, subset: InterruptSet) -> Result<Self, MaskError> {
        let missing = !self.0 .0 & subset.0;
        if missing != 0 {
            Err(MaskError(InterruptSet(missing)))
        } else {
            self.0 .0 &= !subset.0;
            // Safety: No aliasing is introduced since `subset` is moved from `self`.
            unsafe { Ok(Self::new(subset)) }
        }
    }

    /// Assume ownership of the interrupts in `other`.
    fn join(&mut self, other: Self) {
        debug_assert!(self.0 .0 & other.0 .0 == 0);
        self.0 .0 |= other.0 .0;
    }

    /// The interrupts owned by this set
    pub fn interrupts(&self) -> InterruptSet {
        self.0
    }

    /// Clears the flagged interrupts owned by this `OwnedInterruptSet` and
    /// provides an iterator over the flags that were cleared.
    pub fn iter_flagged(&self) -> Iter {
        let interrupts = self.interrupt_flags();
        self.clear_interrupts(interrupts);
        interrupts.iter()
    }

    /// # Safety
    /// This gives access to reads and writes of IR. The bits not owned by
    /// this set must not be affected by these writes and must not be relied
    /// on by these reads.
    unsafe fn ir(&self) -> &Reg<u32> {
        &crate::reg::block::<Id, RegisterBlock>().ir
    }

    /// Get the subset of interrupts in this set that are currently flagged.
    pub fn interrupt_flags(&self) -> InterruptSet {
        // Safety: The mask ensures that only flags under our control are returned.
        let masked = unsafe { self.ir().bits() } & self.0 .0;
        InterruptSet(masked)
    }

    /// Clear the indicated `interrupts`. Interrupts not owned by this
    /// `OwnedInterruptSet` are silently ignored.
    pub fn clear_interrupts(&self, interrupts: InterruptSet) {
        let masked = interrupts.0 & self.0 .0;
        // Safety: Writing a 0 bit leaves the flag unchanged, so masking the write with
        // the owned interrupts leaves all other flags alone.
        unsafe { self.ir().write_bits(masked) }
    }
}

/// Controls enabling and line selection of interrupts.
pub struct InterruptConfiguration<P> {
    disabled: OwnedInterruptSet<P>,
}

impl<Id: FdcanId> InterruptConfiguration<Id> {
    /// # Safety
    /// This type takes ownership of ILS, ILE, IE and IR. Do not use them
    /// elsewhere. Do not instantiate more than once.
    pub(crate) unsafe fn new() -> Self {
        let v = Self {
            disabled: OwnedInterruptSet::new(InterruptSet::all()),
        };
        let regs = v.regs();
        regs.ie.write(|w| *w = 0);
        regs.ils.write(|w| *w = 0);
        regs.ile.write(|w| *w = 0);
        v
    }

    fn regs(&self) -> &RegisterBlock {
        // Safety: The constructor sets self up to have exclusive access to
        // the interrupt registers.
        unsafe { crate::reg::block::<Id, RegisterBlock>() }
    }

    /// Request to enable the set of `interrupts` on the chosen interrupt line.
    /// Fails if some of the requested interrupts are already enabled.
    ///
    /// The line is selected for the whole group of every requested
    /// interrupt, see [`Group`].
    pub fn enable(
        &mut self,
        interrupts: InterruptSet,
        line: InterruptLine,
    ) -> Result<OwnedInterruptSet<Id>, MaskError> {
        let interrupts = self.disabled.split(interrupts)?;
        self.set_line(&interrupts, line);
        self.set_enabled(&interrupts, true);
        Ok(interrupts)
    }

    /// Disable the set of `interrupts` and move ownership back to the
    /// `InterruptConfiguration`.
    pub fn disable(&mut self, interrupts: OwnedInterruptSet<Id>) {
        self.set_enabled(&interrupts, false);
        self.disabled.join(interrupts);
    }

    /// Routes the groups of `interrupts` to `line`. Other interrupts of the
    /// same groups follow.
    pub fn set_line(&mut self, interrupts: &OwnedInterruptSet<Id>, line: InterruptLine) {
        self.enable_line(line);
        let groups = interrupts.0.groups();
        self.regs().ils.modify(|r, w| {
            *w = match line {
                InterruptLine::Line0 => r & !groups,
                InterruptLine::Line1 => r | groups,
            }
        });
    }

    fn enable_line(&mut self, line: InterruptLine) {
        self.regs().ile.modify(|r, w| {
            *w = r
                | match line {
                    InterruptLine::Line0 => 1,
                    InterruptLine::Line1 => 2,
                }
        });
    }

    fn set_enabled(&mut self, interrupts: &OwnedInterruptSet<Id>, enabled: bool) {
        let mask = interrupts.0 .0;
        self.regs().ie.modify(|r, w| {
            *w = if enabled { r | mask } else { r & !mask };
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::fake_peripheral;

    #[test]
    fn iter_preserves_length() {
        assert_eq!(InterruptSet(0).iter().count(), 0);
        assert_eq!(InterruptSet(1).iter().count(), 1);
        assert_eq!(InterruptSet(0x0055_5555).iter().count(), 12);
        assert_eq!(InterruptSet(0x00ff_ffff).iter().count(), 24);
        assert_eq!(InterruptSet(0xffff_ffff).iter().count(), 24);
    }

    #[test]
    fn iter_collect_drops_reserved_bits() {
        let collect = |int| InterruptSet::from_iter(InterruptSet(int).iter()).0;
        assert_eq!(collect(0x00aa_aaaa), 0x00aa_aaaa);
        assert_eq!(collect(0xffff_ffff), ALL);
    }

    #[test]
    fn groups_cover_every_interrupt_once() {
        let mut seen = 0;
        for g in Group::ALL {
            assert_eq!(seen & g.members(), 0);
            seen |= g.members();
        }
        assert_eq!(seen, ALL);
        let set: InterruptSet = [Interrupt::RxFifo1Full, Interrupt::BusOff]
            .into_iter()
            .collect();
        assert_eq!(set.groups(), 1 << 1 | 1 << 6);
    }

    #[test]
    fn enable_selects_line_per_group() {
        fake_peripheral!(Can, 0x104 / 4 + 1);
        unsafe impl FdcanId for Can {
            fn message_ram() -> *const () {
                core::ptr::null()
            }
        }
        let block = Can::block();
        let mut config = unsafe { InterruptConfiguration::<Can>::new() };

        let rx: InterruptSet = [Interrupt::RxFifo0NewMessage].into_iter().collect();
        let owned = config.enable(rx, InterruptLine::Line1).unwrap();
        assert_eq!(block.word(0x54), 1);
        assert_eq!(block.word(0x58), 1);
        assert_eq!(block.word(0x5c), 2);
        assert!(config.enable(rx, InterruptLine::Line0).is_err());

        block.set_word(0x50, 0b11);
        assert_eq!(owned.interrupt_flags(), rx);
        let flagged: Vec<_> = owned.iter_flagged().collect();
        assert_eq!(flagged, [Interrupt::RxFifo0NewMessage]);
        assert_eq!(block.word(0x50), 1);

        config.disable(owned);
        assert_eq!(block.word(0x54), 0);
        assert!(config.enable(rx, InterruptLine::Line0).is_ok());
        assert_eq!(block.word(0x58), 0);
    }
}
