//! Incremental hashing and signature verification, supplied by the platform integrator.
//!
//! The core never constructs digest or signature material itself; it only
//! drives these two traits in the order the crypto state machine
//! (`bridgeboot-format::tftf::CryptoState`) dictates. Grounded on
//! `original_source/common/include/crypto.h`'s `hash_start`/`hash_update`/
//! `hash_final` and the `image_authenticate` signature-check call site in
//! `tftf.c`.

/// A SHA-256-shaped incremental digest.
pub trait Hasher {
    /// (Re)start a digest, discarding any state from a previous run.
    fn start(&mut self);

    /// Feed bytes into the running digest. May be called any number of times between `start` and `finish`.
    fn update(&mut self, data: &[u8]);

    /// Consume the running state and return the 32-byte digest.
    fn finish(&mut self) -> [u8; 32];
}

/// Signature verification against a set of built-in public keys.
///
/// `key_name` identifies which key the signature was produced with; it is
/// opaque to the core (copied verbatim out of the signature section's
/// `key_name` field) and is up to the implementation to resolve to an actual
/// key, e.g. by scanning a `PlatformConfig`-supplied key table.
pub trait Verifier {
    /// Implementation-specific verification failure (bad key name, primitive rejected the signature, I/O, ...).
    type Error;

    /// Consulted before `verify`; a revoked key's signature is treated as a
    /// verification failure without invoking the primitive.
    fn is_key_revoked(&self, key_name: &[u8; 96]) -> bool;

    /// Verify `signature` (of the given `signature_type`) against `hash`, using the key named `key_name`.
    fn verify(
        &mut self,
        hash: &[u8; 32],
        signature_type: u32,
        key_name: &[u8; 96],
        signature: &[u8; 256],
    ) -> Result<(), Self::Error>;
}
