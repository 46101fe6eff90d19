//! Validates raw e-fuse readings into values the boot controller trusts.
//!
//! Grounded on `original_source/chips/es3tsb/src/es3_efuse.c`'s `efuse_init`:
//! Hamming-weight checks on `ara_vid`/`ara_pid`, then Endpoint Unique ID
//! derivation from the IMS, first-failure-wins. This crate owns the pure
//! validation; `Platform::read_fuses` owns the chip-specific register reads.

use bridgeboot_traits::crypto::Hasher;
use bridgeboot_traits::platform::FuseValues;

use crate::endpoint_id::{self, EndpointId};
use crate::error::FuseError;

/// Fuse-derived values the boot controller and image engine trust once validated.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedFuses {
    pub ara_vid: u32,
    pub ara_pid: u32,
    pub endpoint_unique_id: Option<[u8; 8]>,
}

/// Validate `raw` and derive the endpoint ID, in the same order and with the
/// same first-failure-wins semantics as `efuse_init`.
///
/// `efuse_init` also Hamming-weight-checks the serial number but never calls
/// `set_last_error` for it — there is no `BRE_EFUSE_BAD_SERIAL_NO` in
/// `error.h`'s fuse group. That omission is carried forward rather than
/// papered over with an invented error code; see `DESIGN.md`.
pub fn validate<H: Hasher>(raw: FuseValues, hasher: &mut H) -> Result<ValidatedFuses, FuseError> {
    if !endpoint_id::valid_hamming_weight(&raw.ara_vid.to_le_bytes()) {
        return Err(FuseError::BadAraVid);
    }
    if !endpoint_id::valid_hamming_weight(&raw.ara_pid.to_le_bytes()) {
        return Err(FuseError::BadAraPid);
    }
    let _ = endpoint_id::valid_hamming_weight(&raw.serial_number.to_le_bytes());

    let endpoint_unique_id = match endpoint_id::derive(&raw.ims, hasher) {
        EndpointId::Absent => None,
        EndpointId::Invalid => return Err(FuseError::BadIms),
        EndpointId::Present(id) => Some(id),
    };

    Ok(ValidatedFuses { ara_vid: raw.ara_vid, ara_pid: raw.ara_pid, endpoint_unique_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullHasher;
    impl Hasher for NullHasher {
        fn start(&mut self) {}
        fn update(&mut self, _data: &[u8]) {}
        fn finish(&mut self) -> [u8; 32] {
            [0u8; 32]
        }
    }

    fn balanced(byte_count: usize) -> u32 {
        // A u32 with a perfectly balanced bit pattern regardless of how many
        // low bytes of it are meaningful: alternating bits.
        let _ = byte_count;
        0xAAAA_AAAA
    }

    #[test]
    fn unset_fuses_are_accepted() {
        let raw = FuseValues { ara_vid: 0, ara_pid: 0, serial_number: 0, ims: [0u8; 35] };
        let validated = validate(raw, &mut NullHasher).unwrap();
        assert_eq!(validated.ara_vid, 0);
        assert_eq!(validated.endpoint_unique_id, None);
    }

    #[test]
    fn bad_ara_vid_is_rejected() {
        let raw = FuseValues { ara_vid: 0x1, ara_pid: 0, serial_number: 0, ims: [0u8; 35] };
        assert_eq!(validate(raw, &mut NullHasher).unwrap_err(), FuseError::BadAraVid);
    }

    #[test]
    fn bad_ara_pid_is_rejected_after_vid_passes() {
        let raw = FuseValues { ara_vid: balanced(4), ara_pid: 0x1, serial_number: 0, ims: [0u8; 35] };
        assert_eq!(validate(raw, &mut NullHasher).unwrap_err(), FuseError::BadAraPid);
    }

    #[test]
    fn invalid_serial_number_does_not_fail_validation() {
        let raw = FuseValues { ara_vid: 0, ara_pid: 0, serial_number: 0x1, ims: [0u8; 35] };
        assert!(validate(raw, &mut NullHasher).is_ok());
    }

    #[test]
    fn unbalanced_ims_is_rejected() {
        let raw = FuseValues { ara_vid: 0, ara_pid: 0, serial_number: 0, ims: [0xffu8; 35] };
        assert_eq!(validate(raw, &mut NullHasher).unwrap_err(), FuseError::BadIms);
    }

    #[test]
    fn balanced_ims_derives_an_endpoint_id() {
        let mut ims = [0u8; 35];
        for (i, byte) in ims.iter_mut().enumerate() {
            *byte = if i % 2 == 0 { 0xff } else { 0x00 };
        }
        let raw = FuseValues { ara_vid: 0, ara_pid: 0, serial_number: 0, ims };
        let validated = validate(raw, &mut NullHasher).unwrap();
        assert!(validated.endpoint_unique_id.is_some());
    }
}
