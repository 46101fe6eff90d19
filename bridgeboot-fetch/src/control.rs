//! The bootstrap control dialogue: a handful of server-initiated requests
//! this crate only ever answers, generalized from `original_source`'s
//! Greybus Control-protocol exchange (`gbboot.c`'s `data_load_greybus_init`
//! polling `CONTROL_CPORT` for protocol version / probe / manifest / connect
//! before the firmware cport is even opened).
//!
//! Carried as a `SPEC_FULL.md` §4.F supplement: without a concrete shape for
//! it, "drive a lightweight control dialogue" in the distilled spec has
//! nothing to generalize from. An integrator implements [`ControlResponder`]
//! once per device; [`crate::storage::FetchStorage::init`] drives it.

pub const MAX_MANIFEST_SIZE: usize = 512;

/// Per-device answers to the bootstrap control dialogue.
///
/// Each method answers exactly one inbound request; [`crate::storage::FetchStorage::init`]
/// dispatches requests to these in the order the peer happens to send them
/// (mirroring the original's single `control_cport_handler` switch), not a
/// fixed sequence this trait enforces.
pub trait ControlResponder {
    /// Answer a `PROTOCOL_VERSION` request with this device's supported `(major, minor)`.
    fn protocol_version(&mut self) -> (u8, u8);

    /// Answer a readiness probe. No payload either direction.
    fn probe(&mut self);

    /// Answer a manifest-size request with the manifest blob's length.
    fn manifest_len(&mut self) -> u32;

    /// Fill `dst` (sized to the previously reported `manifest_len`) with the manifest blob.
    fn manifest(&mut self, dst: &mut [u8]);

    /// Answer the final `CONNECT` request. After this, the bootstrap
    /// dialogue is considered complete and `FetchStorage::init` moves on to
    /// the firmware channel's `AP_READY`/`FIRMWARE_SIZE` exchange.
    fn connect(&mut self);
}
