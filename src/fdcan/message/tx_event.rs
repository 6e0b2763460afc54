//! Events for messages sent on the bus

use super::*;

impl Raw for TxEvent {
    fn id(&self) -> Id {
        self.0.id()
    }
    fn decoded_dlc(&self) -> usize {
        self.0.decoded_dlc()
    }
    fn dlc(&self) -> u8 {
        self.0.dlc()
    }
    fn fd_format(&self) -> bool {
        self.0.fd_format()
    }
    fn is_remote_frame(&self) -> bool {
        self.0.is_remote_frame()
    }
    fn data(&self) -> &[u8] {
        self.0.data()
    }
    fn is_extended(&self) -> bool {
        self.0.is_extended()
    }
    fn is_transmitter_error_passive(&self) -> bool {
        self.0.is_transmitter_error_passive()
    }
    fn bit_rate_switching(&self) -> bool {
        self.0.bit_rate_switching()
    }
}

/// TX event FIFO element in the peripheral's representation
#[repr(transparent)]
#[derive(Copy, Clone, Debug)]
pub struct TxEvent(pub(crate) RawMessage<0>);

impl TxEvent {
    /// Marker of the transmitted message, see
    /// [`MessageBuilder::store_tx_event`](super::tx::MessageBuilder::store_tx_event).
    pub fn message_marker(&self) -> u8 {
        (self.0.header[1] >> 24) as u8
    }

    /// Kind of event
    pub fn event_type(&self) -> TxEventType {
        TxEventType::from((self.0.header[1] >> 22) & 3)
    }

    /// Timestamp counter value captured at start of frame transmission
    pub fn timestamp(&self) -> u16 {
        self.0.header[1] as u16
    }
}

/// Event type field of a [`TxEvent`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxEventType {
    /// Reserved value
    Reserved,
    /// Transmitted
    TxEvent = 1,
    /// Transmitted in spite of a cancellation request
    TxInSpiteOfCancellation = 2,
}

impl From<u32> for TxEventType {
    fn from(value: u32) -> Self {
        match value {
            1 => Self::TxEvent,
            2 => Self::TxInSpiteOfCancellation,
            _ => Self::Reserved,
        }
    }
}
