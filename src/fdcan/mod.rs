//! FD-CAN controller, STM32G4
//!
//! The G4 embeds up to three Bosch M_CAN derived controllers that support
//! classic CAN and CAN FD with bit rate switching. Each instance owns a fixed
//! section of the shared SRAMCAN, so unlike the generic M_CAN there is no
//! message RAM layout to choose: every instance gets 28 standard and 8
//! extended filter elements, two RX FIFOs of three elements, a TX event FIFO
//! of three elements and three TX buffers forming a FIFO or priority queue.
//!
//! A controller is brought up with [`FdcanConfigurable::new`], configured and
//! then [`finalize`]d into an operational [`Fdcan`]. Its components
//! ([`Fdcan::tx`], [`Fdcan::rx_fifo_0`] etc.) are public fields so they can
//! be moved to different interrupt handlers.
//!
//! ```no_run
//! # use opencm3::fdcan::{filter::{Action, Filter}, message::tx, FdcanConfigurable};
//! # use opencm3::core::fugit::HertzU32;
//! # use opencm3::embedded_can::StandardId;
//! # fn example<D: opencm3::core::Dependencies<opencm3::stm32g4::FDCAN1>>(dependencies: D) -> Result<(), opencm3::fdcan::bus::ConfigurationError> {
//! let mut can = FdcanConfigurable::<opencm3::stm32g4::FDCAN1, _>::new(
//!     HertzU32::kHz(500),
//!     dependencies,
//! )?;
//! can.filters_standard()
//!     .push(Filter::Classic {
//!         action: Action::StoreFifo0,
//!         filter: StandardId::ZERO,
//!         mask: StandardId::ZERO,
//!     })
//!     .ok();
//! let mut can = can.finalize()?;
//!
//! let message = tx::MessageBuilder {
//!     id: StandardId::new(0x123).unwrap().into(),
//!     frame_type: tx::FrameType::Classic(tx::ClassicFrameType::Data(&[1, 2, 3])),
//!     store_tx_event: None,
//! }
//! .build()
//! .unwrap();
//! nb::block!(can.tx.transmit_queued(message)).ok();
//! if let Ok(received) = can.rx_fifo_0.receive() {
//!     let _ = received;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`finalize`]: FdcanConfigurable::finalize

pub mod bus;
pub mod config;
pub mod filter;
pub mod interrupt;
pub mod message;
pub mod messageram;
pub mod rx_fifo;
pub mod tx_buffers;
pub mod tx_event_fifo;

pub use bus::{CanBus, Fdcan, FdcanConfigurable};
