//! The reliable bidirectional datagram transport the fetch protocol runs over.
//!
//! Grounded on `original_source/common/include/chipapi.h`'s `chip_unipro_send`/
//! `chip_unipro_receive` (blocking send, polled receive dispatched to a
//! handler callback) — generalized here into a small trait so this crate has
//! no opinion on whether the transport is UniPro, a test double, or anything
//! else, matching `bridgeboot_traits::Storage`'s own separation from its backends.

/// One framed request/response transport. A single [`Channel`] instance
/// stands in for one "cport" in the original: the bootstrap dialogue and the
/// firmware-fetch operations each run over their own `Channel`.
#[allow(async_fn_in_trait)]
pub trait Channel {
    type Error;

    /// Send exactly `frame` (header followed by payload) as one datagram.
    async fn send(&mut self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Poll for one inbound datagram, copying it into `buf`.
    ///
    /// Returns the number of bytes written. `Ok(0)` means no datagram was
    /// available yet; callers retry up to their own budget. A datagram
    /// larger than `buf` is a transport-specific error, not silent truncation.
    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}
