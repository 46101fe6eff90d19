//! The collaborator contract for everything the boot controller calls but does
//! not implement: chip bring-up, fuse register access, boot-status
//! advertisement, lockdown, and the final jump.
//!
//! Generalized from `ec-slimloader::Board` (`init`/`journal`/`check_and_boot`/
//! `abort`) in `ec-slimloader/src/lib.rs`, widened to cover the extra
//! external touchpoints `original_source/common/src/2ndstage_start.c`'s
//! `bootrom_main` makes (`chip_init`, `efuse_init`, `tsb_get_bootselector`,
//! `chip_advertise_boot_status`, `efuse_rig_for_untrusted`, `jump_to_image`).

use core::ops::Range;

use crate::boot_status::BootStatus;
use crate::comm_area::CommunicationArea;

/// The raw e-fuse values as read off the chip, before any validation.
///
/// Validation (Hamming-weight checks, endpoint-ID derivation) is pure data
/// transformation and lives in `bridgeboot-core`, not here: reading the
/// registers is the only genuinely chip-specific part.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FuseValues {
    pub ara_vid: u32,
    pub ara_pid: u32,
    pub serial_number: u64,
    /// The 35-byte Internal Master Secret. All-zero means "no secret burned".
    pub ims: [u8; 35],
}

/// Which path `bridgeboot-core`'s boot controller should attempt first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootSelector {
    Flash,
    Interconnect,
}

/// The chip/board-specific operations the boot controller sequences around.
#[allow(async_fn_in_trait)]
pub trait Platform {
    /// Error type for the handful of fallible chip operations below.
    type Error;

    /// One-time chip bring-up (clocks, pin muxing, ...). Called first, before anything else.
    fn chip_init(&mut self) -> Result<(), Self::Error>;

    /// Read the e-fuse block. An ECC error here is unrecoverable for this boot attempt.
    fn read_fuses(&mut self) -> Result<FuseValues, Self::Error>;

    /// Read the hardware boot-selector pin/register.
    fn read_boot_selector(&mut self) -> BootSelector;

    /// Read the UniPro `DME_DDBL1_MANUFACTURERID`/`DME_DDBL1_PRODUCTID` local attributes.
    ///
    /// Used to cross-check an image's `unipro_vid`/`unipro_pid` header fields
    /// before accepting it; see `original_source/common/src/tftf.c`'s
    /// `chip_unipro_attr_read` call in `load_tftf_header`.
    fn read_unipro_ids(&mut self) -> (u32, u32);

    /// Write the current [`BootStatus`] to the peer-visible mailbox register.
    fn advertise_boot_status(&mut self, status: BootStatus);

    /// Disable JTAG and master/code-signing-secret access before starting an
    /// image that did not present a valid signature.
    fn rig_for_untrusted(&mut self);

    /// Transfer control to `entry_point`. Does not return.
    fn jump(&mut self, entry_point: u32, comm_area: &CommunicationArea) -> !;

    /// Spin forever. Does not return. Called once all boot paths are exhausted.
    fn halt(&mut self) -> !;
}

/// Integrator-supplied parameters the boot controller and image engine need
/// but that are not operations on hardware.
pub trait PlatformConfig {
    /// RAM window section payloads are permitted to land in.
    fn load_range() -> Range<u32>;

    /// Whether an image with no signature sections is an acceptable
    /// (non-secure) boot outcome, or must be rejected outright.
    ///
    /// Defaults to `true`, matching `original_source`'s unconditional
    /// acceptance of `CRYPTO_STATE_INIT` images; see `DESIGN.md` Open
    /// Question 2.
    fn allow_unsigned_images() -> bool {
        true
    }

    /// Upper bound on receive-poll retries for a single fetch-protocol exchange.
    fn receive_poll_budget() -> u32 {
        512
    }
}
