//! Error codes for the flash directory and image container engines.
//!
//! Numeric values are taken verbatim from
//! `original_source/common/include/error.h`'s `BRE_TFTF_*`/`BRE_FFFF_*`
//! group (0x20 and 0x40 respectively), so that a [`BootErrno`](bridgeboot_traits::BootErrno)
//! slot fed from this crate lines up with the error taxonomy in `SPEC_FULL.md` §7.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Errors from the image container (TFTF) engine. Group base `0x20`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TftfError {
    LoadHeader = 0x20,
    HeaderSize = 0x21,
    MemoryRange = 0x22,
    Sentinel = 0x23,
    NoTableEnd = 0x24,
    NonZeroPad = 0x25,
    LoadSignature = 0x26,
    VidPidMismatch = 0x27,
    CompressionUnsupported = 0x28,
    CompressionBad = 0x29,
    SectionAfterSignature = 0x2a,
    HeaderType = 0x2b,
    Collision = 0x2c,
    StartNotInCode = 0x2d,
    ImageCorrupted = 0x2e,
}

/// Errors from the flash directory (FFFF) engine. Group base `0x40`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FfffError {
    LoadHeader = 0x40,
    HeaderSize = 0x41,
    MemoryRange = 0x42,
    Sentinel = 0x43,
    NoTableEnd = 0x44,
    NonZeroPad = 0x45,
    BlockSize = 0x46,
    FlashCapacity = 0x47,
    ImageLength = 0x48,
    HeaderNotFound = 0x49,
    NoFirmware = 0x4a,
    EltReservedMemory = 0x4b,
    EltAlignment = 0x4c,
    EltCollision = 0x4d,
    EltDuplicate = 0x4e,
}
