//! Handling of messages/frames
//!
//! Every element of the G4 message RAM has room for 64 data bytes, so
//! messages are always [`MAX_DATA`] sized. The header words follow the
//! layout of the RX/TX buffer elements, `T0`/`R0` first.

pub mod rx;
pub mod tx;
mod tx_event;

pub use tx_event::{TxEvent, TxEventType};

use core::cmp::min;
use embedded_can::{ExtendedId, Frame, Id, StandardId};

/// Data bytes of a message RAM element
pub const MAX_DATA: usize = 64;

/// Data does not fit in the backing buffer or cannot be encoded in a DLC
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TooMuchData;

/// CAN frame/message.
#[derive(Copy, Clone, Debug)]
pub enum Message {
    /// Message received from a CAN bus
    Rx(rx::Message),
    /// Message that may be transmitted to a CAN bus
    Tx(tx::Message),
}

impl Message {
    fn raw(&self) -> &RawMessage<MAX_DATA> {
        match self {
            Self::Rx(rx::Message(m)) | Self::Tx(tx::Message(m)) => m,
        }
    }
}

impl Frame for Message {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        tx::MessageBuilder {
            id: id.into(),
            frame_type: tx::FrameType::Classic(tx::ClassicFrameType::Data(data)),
            store_tx_event: None,
        }
        .build()
        .ok()
        .map(Self::Tx)
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > 8 {
            return None;
        }
        tx::MessageBuilder {
            id: id.into(),
            frame_type: tx::FrameType::Classic(tx::ClassicFrameType::Remote { desired_len: dlc }),
            store_tx_event: None,
        }
        .build()
        .ok()
        .map(Self::Tx)
    }

    fn is_extended(&self) -> bool {
        self.raw().is_extended()
    }

    fn is_remote_frame(&self) -> bool {
        self.raw().is_remote_frame()
    }

    fn id(&self) -> Id {
        self.raw().id()
    }

    fn dlc(&self) -> usize {
        self.raw().dlc().into()
    }

    fn data(&self) -> &[u8] {
        self.raw().data()
    }
}

/// RX or TX element in the peripheral's representation
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub(crate) struct RawMessage<const N: usize> {
    pub(crate) header: [u32; 2],
    pub(crate) data: [u8; N],
}

/// Header fields shared by received, transmitted and event elements.
pub trait Raw {
    /// Returns the CAN identifier of the message
    fn id(&self) -> Id;
    /// Data length in bytes
    fn decoded_dlc(&self) -> usize;
    /// Data length code
    fn dlc(&self) -> u8;
    /// True if the header indicates that the frame uses the CAN FD format
    fn fd_format(&self) -> bool;
    /// Remote Transmission Request
    fn is_remote_frame(&self) -> bool;
    /// Data field
    fn data(&self) -> &[u8];
    /// Check if the frame uses and extended (29-bit) ID
    fn is_extended(&self) -> bool;
    /// `true` if the sender of the message indicates that it is in "error
    /// passive" state.
    fn is_transmitter_error_passive(&self) -> bool;
    /// `true` if bit rate switching is used
    fn bit_rate_switching(&self) -> bool;
}

impl<const N: usize> Raw for RawMessage<N> {
    fn id(&self) -> Id {
        if self.is_extended() {
            ExtendedId::new(self.header[0] & ExtendedId::MAX.as_raw())
                .map(Id::Extended)
                .unwrap_or(Id::Extended(ExtendedId::ZERO))
        } else {
            let raw = (self.header[0] >> 18) as u16 & StandardId::MAX.as_raw();
            StandardId::new(raw)
                .map(Id::Standard)
                .unwrap_or(Id::Standard(StandardId::ZERO))
        }
    }

    fn decoded_dlc(&self) -> usize {
        dlc_to_len(self.dlc(), self.fd_format())
    }

    fn dlc(&self) -> u8 {
        ((self.header[1] >> 16) & 0xf) as u8 // DLC
    }

    fn fd_format(&self) -> bool {
        self.header[1] & (1 << 21) != 0 // FDF
    }

    fn is_remote_frame(&self) -> bool {
        self.header[0] & (1 << 29) != 0 // RTR
    }

    fn data(&self) -> &[u8] {
        if self.is_remote_frame() {
            return &[];
        }
        self.data
            .get(..min(self.decoded_dlc(), self.data.len()))
            .unwrap_or(&[])
    }

    fn is_extended(&self) -> bool {
        self.header[0] & (1 << 30) != 0 // XTD
    }

    fn is_transmitter_error_passive(&self) -> bool {
        self.header[0] & (1 << 31) != 0 // ESI
    }

    fn bit_rate_switching(&self) -> bool {
        self.header[1] & (1 << 20) != 0 // BRS
    }
}

/// Finds the smallest data length code that encodes at least `len` bytes.
///
/// Payloads between the FD sizes are padded up to the next size. Classic
/// frames carry at most 8 bytes, FD frames at most 64.
pub fn len_to_dlc(len: usize, fd_format: bool) -> Result<u8, TooMuchData> {
    match (len, fd_format) {
        (0..=8, _) => Ok(len as u8),
        (_, false) => Err(TooMuchData),
        (9..=12, true) => Ok(9),
        (13..=16, true) => Ok(10),
        (17..=20, true) => Ok(11),
        (21..=24, true) => Ok(12),
        (25..=32, true) => Ok(13),
        (33..=48, true) => Ok(14),
        (49..=64, true) => Ok(15),
        _ => Err(TooMuchData),
    }
}

/// Converts data length code to a length in bytes
pub fn dlc_to_len(dlc: u8, fd_format: bool) -> usize {
    match (dlc, fd_format) {
        (0..=8, _) => dlc.into(),
        (_, false) => 8,
        (9, true) => 12,
        (10, true) => 16,
        (11, true) => 20,
        (12, true) => 24,
        (13, true) => 32,
        (14, true) => 48,
        _ => 64,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dlc_rounds_up_to_next_fd_size() {
        assert_eq!(len_to_dlc(0, false), Ok(0));
        assert_eq!(len_to_dlc(8, false), Ok(8));
        assert_eq!(len_to_dlc(9, false), Err(TooMuchData));
        assert_eq!(len_to_dlc(9, true), Ok(9));
        assert_eq!(len_to_dlc(12, true), Ok(9));
        assert_eq!(len_to_dlc(13, true), Ok(10));
        assert_eq!(len_to_dlc(33, true), Ok(14));
        assert_eq!(len_to_dlc(64, true), Ok(15));
        assert_eq!(len_to_dlc(65, true), Err(TooMuchData));
        // Would wrap to 0 if truncated to a byte.
        assert_eq!(len_to_dlc(256, true), Err(TooMuchData));
    }

    #[test]
    fn dlc_decodes_per_format() {
        assert_eq!(dlc_to_len(8, false), 8);
        assert_eq!(dlc_to_len(15, false), 8);
        assert_eq!(dlc_to_len(9, true), 12);
        assert_eq!(dlc_to_len(13, true), 32);
        assert_eq!(dlc_to_len(15, true), 64);
    }

    #[test]
    fn frame_trait_builds_classic_messages() {
        let id = StandardId::new(0x123).unwrap();
        let m = <Message as Frame>::new(id, &[1, 2, 3]).unwrap();
        assert_eq!(m.id(), Id::Standard(id));
        assert_eq!(m.dlc(), 3);
        assert_eq!(m.data(), &[1, 2, 3]);
        assert!(!m.is_extended());
        assert!(<Message as Frame>::new(id, &[0; 9]).is_none());

        let ext = ExtendedId::new(0x1234_5678).unwrap();
        let r = <Message as Frame>::new_remote(ext, 4).unwrap();
        assert!(r.is_remote_frame());
        assert!(r.is_extended());
        assert_eq!(r.dlc(), 4);
        assert_eq!(r.data(), &[] as &[u8]);
        assert!(<Message as Frame>::new_remote(ext, 9).is_none());
    }
}
