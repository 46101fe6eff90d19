//! The packet-based firmware-fetch protocol: a [`Storage`](bridgeboot_traits::storage::Storage)
//! implementation over a reliable datagram transport, so the boot controller
//! can drive the TFTF image engine from an interconnect peer exactly as it
//! would from flash.
#![cfg_attr(not(any(test, feature = "_test")), no_std)]

pub mod channel;
pub mod control;
pub mod error;
pub mod frame;
pub mod storage;

pub use channel::Channel;
pub use control::ControlResponder;
pub use error::FetchError;
pub use storage::FetchStorage;
