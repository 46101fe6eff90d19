//! Error codes for the packet firmware-fetch protocol. Group base `0x80`.
//!
//! Numeric values and names follow `original_source/common/include/error.h`'s
//! `BRE_BOU_*` group (`BOU` = "boot over UniPro"), per `SPEC_FULL.md` §7.

use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FetchError {
    /// Failed to open or drive the bootstrap control channel.
    ControlCport = 0x80,
    /// The firmware channel never reached the connected state.
    Connected = 0x81,
    /// A receive poll exhausted its retry budget.
    Timeout = 0x82,
    /// The transport reported an error while receiving a frame.
    Recv = 0x83,
    /// The firmware channel never saw an `AP_READY` request in time.
    ApReadyTimeout = 0x84,
    /// The `FIRMWARE_SIZE` exchange failed or returned a malformed response.
    FirmwareSize = 0x85,
    /// The reported firmware size does not fit the caller's RAM window.
    TooLarge = 0x86,
    /// A `GET_FIRMWARE` exchange failed or returned a malformed response.
    GetFirmware = 0x87,
    /// The final `READY_TO_BOOT` exchange failed.
    Ready = 0x88,
}
