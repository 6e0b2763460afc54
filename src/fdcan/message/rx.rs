//! Messages received from the bus.

use super::*;

/// RX FIFO element in the peripheral's representation
#[repr(transparent)]
#[derive(Copy, Clone, Debug)]
pub struct Message(pub(crate) RawMessage<MAX_DATA>);

impl Raw for Message {
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

impl Message {
    /// Create a transmission object from rx object
    pub fn as_tx_builder(&self) -> tx::MessageBuilder<'_> {
        tx::MessageBuilder {
            id: self.id(),
            frame_type: if self.fd_format() {
                tx::FrameType::FlexibleDatarate {
                    payload: self.data(),
                    bit_rate_switching: self.bit_rate_switching(),
                    force_error_state_indicator: false,
                }
            } else if self.is_remote_frame() {
                tx::FrameType::Classic(tx::ClassicFrameType::Remote {
                    desired_len: self.decoded_dlc(),
                })
            } else {
                tx::FrameType::Classic(tx::ClassicFrameType::Data(self.data()))
            },
            store_tx_event: None,
        }
    }

    /// Timestamp counter value captured on start of frame reception
    pub fn timestamp(&self) -> u16 {
        self.0.header[1] as u16
    }

    /// Index of the filter that accepted the frame. `None` if no filter
    /// matched, but the message was accepted due to the global filter.
    pub fn filter_index(&self) -> Option<u8> {
        if self.accepted_non_matching_frame() {
            None
        } else {
            Some(((self.0.header[1] >> 24) & 0x1f) as u8)
        }
    }

    /// `true` if no filter matched, but the message was accepted due to the
    /// global filter. See also [`Self::filter_index`]
    pub fn accepted_non_matching_frame(&self) -> bool {
        self.0.header[1] & (1 << 31) != 0 // ANMF
    }
}
