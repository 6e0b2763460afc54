//! Message filters
//!
//! The G4 message RAM holds 28 standard and 8 extended filter elements.
//! Filters are evaluated in list order; the list sizes programmed into
//! `RXGFC.LSS/LSE` on finalize are the number of pushed filters.

use core::marker::PhantomData;
use embedded_can::{ExtendedId, StandardId};
use vcell::VolatileCell;

/// Standard ID filter elements per instance
pub const STANDARD_FILTERS: usize = 28;
/// Extended ID filter elements per instance
pub const EXTENDED_FILTERS: usize = 8;

/// Filter list for 11-bit identifiers
pub type FiltersStandard<P> = Filters<P, FilterStandardId>;
/// Filter list for 29-bit identifiers
pub type FiltersExtended<P> = Filters<P, FilterExtendedId>;

/// Acceptance filters for incoming messages
pub struct Filters<P, T: 'static> {
    memory: &'static mut [VolatileCell<T>],
    len: usize,
    _markers: PhantomData<P>,
}

impl<P, T: Copy + Default> Filters<P, T> {
    /// # Safety
    /// All filters are assumed to be disabled initially. This is the case if
    /// the memory is zeroed.
    pub(crate) unsafe fn new(memory: &'static mut [VolatileCell<T>]) -> Self {
        Self {
            memory,
            len: 0,
            _markers: PhantomData,
        }
    }

    /// Overwrites the `filter` at `index`.
    /// Returns back the `filter` if the `index` is out of range.
    fn set<F: Copy + Into<T>>(&mut self, index: usize, filter: F) -> Result<(), F> {
        self.memory
            .get_mut(index)
            .map(|f| f.set(filter.into()))
            .ok_or(filter)
    }

    /// Appends a `filter` to the back of the list. Returns the assigned index
    /// if successful. Returns back the `filter` if the list is full.
    pub fn push<F: Copy + Into<T>>(&mut self, filter: F) -> Result<usize, F> {
        let index = self.len;
        self.set(index, filter)?;
        self.len += 1;
        Ok(index)
    }

    /// Replaces the filter at `index`, which must already be in use.
    pub fn replace<F: Copy + Into<T>>(&mut self, index: usize, filter: F) -> Result<(), F> {
        if index >= self.len {
            return Err(filter);
        }
        self.set(index, filter)
    }

    /// Disables all filters and empties the list.
    pub fn clear(&mut self) {
        for f in self.memory.iter_mut() {
            f.set(T::default());
        }
        self.len = 0;
    }

    /// Number of filters in use
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` if no filter is in use
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of filters the list can hold
    pub fn capacity(&self) -> usize {
        self.memory.len()
    }
}

/// 11-bit filter in the peripheral's representation
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterStandardId(pub(crate) u32);
/// 29-bit filter in the peripheral's representation
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterExtendedId(pub(crate) [u32; 2]);

/// Message filter field for 11-bit RX messages
#[derive(Copy, Clone, Debug)]
pub enum Filter {
    /// The filter is skipped
    Disabled,
    /// Range filter from low to high IDs
    Range {
        /// Action to take on a matched element
        action: Action,
        /// Lower filter limit
        low: StandardId,
        /// Upper filter limit
        high: StandardId,
    },
    /// Filter for two IDs
    Dual {
        /// Action to take on a matched element
        action: Action,
        /// Individual filter 1
        id1: StandardId,
        /// Individual filter 2
        id2: StandardId,
    },
    /// Traditional filter/mask CAN filter
    Classic {
        /// Action to take on a matched element
        action: Action,
        /// ID filter
        filter: StandardId,
        /// ID mask
        mask: StandardId,
    },
}

/// Message filter field for 29-bit RX messages
#[derive(Copy, Clone, Debug)]
pub enum ExtFilter {
    /// The filter is skipped
    Disabled,
    /// Range filter from low to high IDs, with the extended ID AND mask
    /// (`XIDAM`) applied to the received ID
    MaskedRange {
        /// Action to take on a matched element
        action: Action,
        /// Lower filter limit
        low: ExtendedId,
        /// Upper filter limit
        high: ExtendedId,
    },
    /// Filter for two IDs
    Dual {
        /// Action to take on a matched element
        action: Action,
        /// Individual filter 1
        id1: ExtendedId,
        /// Individual filter 2
        id2: ExtendedId,
    },
    /// Traditional filter/mask CAN filter
    Classic {
        /// Action to take on a matched element
        action: Action,
        /// ID filter
        filter: ExtendedId,
        /// ID mask
        mask: ExtendedId,
    },
    /// Range filter from low to high IDs without XIDAM
    Range {
        /// Action to take on a matched element
        action: Action,
        /// Lower filter limit
        low: ExtendedId,
        /// Upper filter limit
        high: ExtendedId,
    },
}

/// Filter element configurations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    /// Store in RX FIFO 0 if filter matches
    StoreFifo0,
    /// Store in RX FIFO 1 if filter matches
    StoreFifo1,
    /// Reject ID if filter matches
    Reject,
    /// Set priority if filter matches
    Priority,
    /// Set priority and store in FIFO 0 if filter matches
    PriorityFifo0,
    /// Set priority and store in FIFO 1 if filter matches
    PriorityFifo1,
}

impl From<Action> for u32 {
    fn from(val: Action) -> Self {
        match val {
            Action::StoreFifo0 => 0x1,
            Action::StoreFifo1 => 0x2,
            Action::Reject => 0x3,
            Action::Priority => 0x4,
            Action::PriorityFifo0 => 0x5,
            Action::PriorityFifo1 => 0x6,
        }
    }
}

impl From<Filter> for FilterStandardId {
    fn from(val: Filter) -> Self {
        let (sft, action, id1, id2) = match val {
            Filter::Disabled => return FilterStandardId(0),
            Filter::Range { action, low, high } => (0, action, low, high),
            Filter::Dual { action, id1, id2 } => (1, action, id1, id2),
            Filter::Classic {
                action,
                filter,
                mask,
            } => (2, action, filter, mask),
        };
        let action: u32 = action.into();
        FilterStandardId(
            sft << 30 | action << 27 | u32::from(id1.as_raw()) << 16 | u32::from(id2.as_raw()),
        )
    }
}

impl From<ExtFilter> for FilterExtendedId {
    fn from(val: ExtFilter) -> Self {
        let (eft, action, id1, id2) = match val {
            ExtFilter::Disabled => return FilterExtendedId([0, 0]),
            ExtFilter::MaskedRange { action, low, high } => (0, action, low, high),
            ExtFilter::Dual { action, id1, id2 } => (1, action, id1, id2),
            ExtFilter::Classic {
                action,
                filter,
                mask,
            } => (2, action, filter, mask),
            ExtFilter::Range { action, low, high } => (3, action, low, high),
        };
        let action: u32 = action.into();
        FilterExtendedId([action << 29 | id1.as_raw(), eft << 30 | id2.as_raw()])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn std(id: u16) -> StandardId {
        StandardId::new(id).unwrap()
    }

    fn ext(id: u32) -> ExtendedId {
        ExtendedId::new(id).unwrap()
    }

    #[test]
    fn standard_element_encoding() {
        let f: FilterStandardId = Filter::Range {
            action: Action::StoreFifo1,
            low: std(0x100),
            high: std(0x1ff),
        }
        .into();
        assert_eq!(f.0, 2 << 27 | 0x100 << 16 | 0x1ff);

        let f: FilterStandardId = Filter::Classic {
            action: Action::Reject,
            filter: std(0x7f0),
            mask: std(0x7ff),
        }
        .into();
        assert_eq!(f.0, 2 << 30 | 3 << 27 | 0x7f0 << 16 | 0x7ff);

        let f: FilterStandardId = Filter::Disabled.into();
        assert_eq!(f.0, 0);
    }

    #[test]
    fn extended_element_encoding() {
        let f: FilterExtendedId = ExtFilter::Dual {
            action: Action::PriorityFifo0,
            id1: ext(0x1234_5678),
            id2: ext(0x10),
        }
        .into();
        assert_eq!(f.0, [5 << 29 | 0x1234_5678, 1 << 30 | 0x10]);

        let f: FilterExtendedId = ExtFilter::MaskedRange {
            action: Action::StoreFifo0,
            low: ext(1),
            high: ext(2),
        }
        .into();
        assert_eq!(f.0, [1 << 29 | 1, 2]);

        let f: FilterExtendedId = ExtFilter::Range {
            action: Action::StoreFifo0,
            low: ext(1),
            high: ext(2),
        }
        .into();
        assert_eq!(f.0, [1 << 29 | 1, 3 << 30 | 2]);
    }

    #[test]
    fn push_until_full() {
        let memory: &'static mut [VolatileCell<FilterStandardId>; 2] = Box::leak(Box::new([
            VolatileCell::new(FilterStandardId(0)),
            VolatileCell::new(FilterStandardId(0)),
        ]));
        let mut filters = unsafe { FiltersStandard::<()>::new(memory) };
        let f = Filter::Dual {
            action: Action::StoreFifo0,
            id1: std(1),
            id2: std(2),
        };
        assert_eq!(filters.push(f).ok(), Some(0));
        assert_eq!(filters.push(Filter::Disabled).ok(), Some(1));
        assert!(filters.push(f).is_err());
        assert_eq!(filters.len(), 2);
        assert!(filters.replace(1, f).is_ok());
        assert!(filters.replace(2, f).is_err());

        filters.clear();
        assert!(filters.is_empty());
        assert_eq!(filters.capacity(), 2);
    }
}
