//! The boot controller: sequences fuse validation, the flash directory and
//! image engines, and the packet firmware-fetch protocol into one boot
//! attempt, falling back from flash to the interconnect on failure.
//!
//! Generalized from `original_source/common/src/2ndstage_start.c`'s
//! `bootrom_main`, in the shape of `ec_slimloader::start`/`Board`
//! (`ec-slimloader/src/lib.rs`): a top-level `start` function generic
//! over a `Platform` collaborator trait that owns everything chip-specific.
#![cfg_attr(not(any(test, feature = "_test")), no_std)]

pub mod controller;
pub mod endpoint_id;
pub mod error;
pub mod fuse;

#[cfg(feature = "cortex-m")]
pub mod jump;

pub use controller::start;
pub use error::FuseError;
pub use fuse::ValidatedFuses;
