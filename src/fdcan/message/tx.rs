//! Messages to be sent on the bus

use super::*;

/// TX buffer element in the peripheral's representation
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
    /// Message marker copied into the TX event, if an event is requested.
    pub fn message_marker(&self) -> Option<u8> {
        if self.0.header[1] & (1 << 23) != 0 {
            Some((self.0.header[1] >> 24) as u8)
        } else {
            None
        }
    }
}

/// Selects the type of the Classic CAN frame.
#[derive(Copy, Clone, Debug)]
pub enum ClassicFrameType<'a> {
    /// 0-8 byte message payload
    Data(&'a [u8]),
    /// Requests transmission of the identified frame
    Remote {
        /// Length, in bytes, of the requested frame
        desired_len: usize,
    },
}

/// Selects frame type along with the valid payload type and configuration
/// specific to the chosen format.
#[derive(Copy, Clone, Debug)]
pub enum FrameType<'a> {
    /// Classic CAN
    Classic(ClassicFrameType<'a>),
    /// CAN FD frame. The peripheral must be configured with
    /// [`Mode::Fd`](crate::fdcan::config::Mode::Fd) to send it.
    FlexibleDatarate {
        /// 0-64 byte message payload. Lengths between the FD sizes are
        /// padded with zeros.
        payload: &'a [u8],
        /// Parts of the frame are transmitted at a higher bit rate. Bit rate
        /// switching must be allowed in the peripheral configuration as well.
        bit_rate_switching: bool,
        /// If `true`, the error state indicator of the message will indicate
        /// 'error passive'. If `false`, the actual state of the
        /// peripheral will be indicated.
        force_error_state_indicator: bool,
    },
}

/// Describes a CAN message/frame that is not yet converted to the
/// representation the peripheral understands.
#[derive(Copy, Clone, Debug)]
pub struct MessageBuilder<'a> {
    /// CAN identifier for the frame
    pub id: Id,
    /// Message frame type with a payload
    pub frame_type: FrameType<'a>,
    /// If `Some(marker)`, this message will store an event identified by
    /// `marker` in the TX event queue.
    pub store_tx_event: Option<u8>,
}

impl<'a> MessageBuilder<'a> {
    /// Create the message in the format required by the peripheral.
    pub fn build(self) -> Result<Message, TooMuchData> {
        let mut data = [0; MAX_DATA];

        let mut copy_payload = |d: &[u8]| -> Result<(), TooMuchData> {
            data.get_mut(..d.len())
                .ok_or(TooMuchData)?
                .copy_from_slice(d);
            Ok(())
        };

        let id_field = match self.id {
            Id::Standard(id) => (id.as_raw() as u32) << 18,
            Id::Extended(id) => id.as_raw(),
        };
        let xtd = matches!(self.id, Id::Extended(_));
        let (fdf, brs, esi, rtr, len) = match self.frame_type {
            FrameType::Classic(ClassicFrameType::Data(payload)) => {
                copy_payload(payload)?;
                (false, false, false, false, payload.len())
            }
            FrameType::Classic(ClassicFrameType::Remote { desired_len }) => {
                (false, false, false, true, desired_len)
            }
            FrameType::FlexibleDatarate {
                payload,
                bit_rate_switching,
                force_error_state_indicator,
            } => {
                copy_payload(payload)?;
                (
                    true,
                    bit_rate_switching,
                    force_error_state_indicator,
                    false,
                    payload.len(),
                )
            }
        };
        let dlc = len_to_dlc(len, fdf)?;
        let efc = self.store_tx_event.is_some();
        let mm = self.store_tx_event.unwrap_or(0);

        let t0 = id_field | (rtr as u32) << 29 | (xtd as u32) << 30 | (esi as u32) << 31;
        let t1 = (u32::from(dlc) << 16)
            | ((brs as u32) << 20)
            | ((fdf as u32) << 21)
            | ((efc as u32) << 23)
            | (u32::from(mm) << 24);
        Ok(Message(RawMessage {
            header: [t0, t1],
            data,
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn header_words() {
        let m = MessageBuilder {
            id: StandardId::new(0x7ff).unwrap().into(),
            frame_type: FrameType::Classic(ClassicFrameType::Data(&[1, 2])),
            store_tx_event: Some(0x5a),
        }
        .build()
        .unwrap();
        assert_eq!(m.0.header, [0x7ff << 18, 0x5a << 24 | 1 << 23 | 2 << 16]);
        assert_eq!(m.message_marker(), Some(0x5a));

        let m = MessageBuilder {
            id: ExtendedId::new(0x1fff_ffff).unwrap().into(),
            frame_type: FrameType::FlexibleDatarate {
                payload: &[0; 20],
                bit_rate_switching: true,
                force_error_state_indicator: true,
            },
            store_tx_event: None,
        }
        .build()
        .unwrap();
        assert_eq!(m.0.header[0], 1 << 31 | 1 << 30 | 0x1fff_ffff);
        assert_eq!(m.0.header[1], 1 << 21 | 1 << 20 | 11 << 16);
        assert_eq!(m.message_marker(), None);
    }

    #[test]
    fn payload_is_padded_to_the_encoded_length() {
        let m = MessageBuilder {
            id: StandardId::ZERO.into(),
            frame_type: FrameType::FlexibleDatarate {
                payload: &[0xff; 13],
                bit_rate_switching: false,
                force_error_state_indicator: false,
            },
            store_tx_event: None,
        }
        .build()
        .unwrap();
        assert_eq!(m.decoded_dlc(), 16);
        assert_eq!(&m.data()[..13], &[0xff; 13]);
        assert_eq!(&m.data()[13..], &[0; 3]);
    }

    #[test]
    fn oversized_payloads_are_rejected() {
        let classic = MessageBuilder {
            id: StandardId::ZERO.into(),
            frame_type: FrameType::Classic(ClassicFrameType::Data(&[0; 12])),
            store_tx_event: None,
        };
        assert_eq!(classic.build().err(), Some(TooMuchData));

        let fd = MessageBuilder {
            id: StandardId::ZERO.into(),
            frame_type: FrameType::FlexibleDatarate {
                payload: &[0; 65],
                bit_rate_switching: false,
                force_error_state_indicator: false,
            },
            store_tx_event: None,
        };
        assert_eq!(fd.build().err(), Some(TooMuchData));
    }
}
