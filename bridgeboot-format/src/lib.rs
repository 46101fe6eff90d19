//! Parsers and streaming engines for the two on-flash formats this boot
//! core understands: the FFFF directory and the TFTF image container.
//!
//! Both engines read through the traits in `bridgeboot-traits` rather than
//! owning a storage backend, so the same code drives either a flash
//! [`bridgeboot_traits::storage::RandomAccessStorage`] or a packet-fetched
//! [`bridgeboot_traits::storage::Storage`].
#![cfg_attr(not(any(test, feature = "_test")), no_std)]

pub mod error;
pub mod ffff;
pub mod tftf;

/// In-memory [`Storage`][bridgeboot_traits::storage::Storage] double, used by
/// this crate's own unit tests and by the `_test`-gated fuzz targets in `fuzz/`.
#[cfg(any(test, feature = "_test"))]
pub mod testutil;

pub use error::{FfffError, TftfError};
