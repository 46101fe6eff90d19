//! Endpoint Unique ID derivation from the Internal Master Secret (IMS).
//!
//! Grounded on `original_source/chips/es3tsb/src/es3_efuse.c`'s
//! `get_endpoint_id`/`valid_hamming_weight`/`count_ones`: `Y1 =
//! sha256(IMS[0:15] xor 0x3d-repeated)`, `Z0 = sha256(Y1 || 0x01-repeated-32)`,
//! `EP_UID = sha256(Z0)[0:8]`. The XOR and padding bytes are batched into
//! single `Hasher::update` calls here rather than fed one byte at a time as
//! the original does, per `DESIGN.md`'s Open Question resolution.

use bridgeboot_traits::crypto::Hasher;

pub const IMS_LEN: usize = 35;

/// Number of set bits across every byte of `buf`.
fn count_ones(buf: &[u8]) -> u32 {
    buf.iter().map(|b| b.count_ones()).sum()
}

/// A fuse field is valid iff it was never burned (all-zero) or burned with
/// exactly half its bits set. Mirrors `valid_hamming_weight`.
pub fn valid_hamming_weight(buf: &[u8]) -> bool {
    let count = count_ones(buf);
    count == 0 || count == (buf.len() as u32) * 8 / 2
}

/// The result of attempting to derive an endpoint ID from a raw IMS reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointId {
    /// The IMS was never burned (all-zero). Not an error.
    Absent,
    /// The IMS was burned but failed its Hamming-weight check.
    Invalid,
    Present([u8; 8]),
}

/// Derive the endpoint ID from a 35-byte IMS reading, or report why one
/// could not be derived. Mirrors `get_endpoint_id`'s `have_endpoint_id`/
/// `set_last_error(BRE_EFUSE_BAD_IMS)` split.
pub fn derive<H: Hasher>(ims: &[u8; IMS_LEN], hasher: &mut H) -> EndpointId {
    if ims.iter().all(|&b| b == 0) {
        return EndpointId::Absent;
    }
    if !valid_hamming_weight(ims) {
        return EndpointId::Invalid;
    }

    let mut xored = [0u8; 16];
    for (dst, &src) in xored.iter_mut().zip(ims[..16].iter()) {
        *dst = src ^ 0x3d;
    }
    hasher.start();
    hasher.update(&xored);
    let y1 = hasher.finish();

    hasher.start();
    hasher.update(&y1);
    hasher.update(&[0x01u8; 32]);
    let z0 = hasher.finish();

    hasher.start();
    hasher.update(&z0);
    let ep_uid = hasher.finish();

    let mut out = [0u8; 8];
    out.copy_from_slice(&ep_uid[..8]);
    EndpointId::Present(out)
}
