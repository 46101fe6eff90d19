//! Errors from e-fuse validation. Group base `0x10`.
//!
//! Numeric values follow `original_source/common/include/error.h`'s
//! `BRE_EFUSE_*` group; see `SPEC_FULL.md` §7.

use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FuseError {
    /// The e-fuse block itself reported an ECC error, or the platform
    /// otherwise failed to read it at all.
    Ecc = 0x10,
    BadAraVid = 0x11,
    BadAraPid = 0x12,
    /// The Internal Master Secret was burned but failed its Hamming-weight check.
    BadIms = 0x13,
}
