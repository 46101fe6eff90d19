//! The byte-source abstraction the directory and image engines are generic over.
//!
//! Grounded on `ec-slimloader-state::flash::FlashJournal`'s pattern of an
//! engine generic over a single small storage trait, and on
//! `original_source/common/include/data_loading.h`'s `data_load_ops`
//! (`init`/`load`/`read`/`finish`), which this trait is a direct
//! generalization of.

/// A single operation on a [`Storage`] failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError<E> {
    /// The requested read or load ran past the end of the underlying medium.
    OutOfRange,
    /// `finish` was called a second time, or an operation was attempted after `finish`.
    AlreadyFinished,
    /// An operation was attempted before `init`.
    NotInitialized,
    /// The transport-specific error returned by the backing implementation.
    Other(E),
}

impl<E> From<E> for StorageError<E> {
    fn from(value: E) -> Self {
        StorageError::Other(value)
    }
}

/// Byte source the directory and image engines stream from.
///
/// Sequencing contract: exactly one `init`, then any mix of `read`/`load`
/// (the latter only if the implementation also provides [`RandomAccessStorage`]),
/// then exactly one `finish`. `load` is a pure streaming continuation from
/// wherever the previous `read`/`load` left off; implementations that support
/// backing up (flash) additionally provide [`RandomAccessStorage::read`] to
/// reposition.
#[allow(async_fn_in_trait)]
pub trait Storage {
    /// Transport-specific error type.
    type Error;

    /// Acquire the underlying resource. Must be called exactly once per boot attempt.
    async fn init(&mut self) -> Result<(), StorageError<Self::Error>>;

    /// Stream `dst.len()` bytes starting right after the previous `read`/`load`.
    ///
    /// If `hash` is `true` the bytes are also fed to whatever [`crate::Hasher`]
    /// this `Storage` was constructed with, before being handed back to the caller.
    async fn load(&mut self, dst: &mut [u8], hash: bool) -> Result<(), StorageError<Self::Error>>;

    /// Release resources. `valid` reports whether the overall load succeeded;
    /// `secure` reports whether the loaded image verified a signature.
    ///
    /// Must be idempotent against a second call: implementations return
    /// [`StorageError::AlreadyFinished`] rather than blocking or re-releasing.
    async fn finish(&mut self, valid: bool, secure: bool) -> Result<(), StorageError<Self::Error>>;
}

/// Extension for [`Storage`] implementations that can seek, such as flash.
///
/// The firmware-fetch protocol (`bridgeboot-fetch`) deliberately does NOT
/// implement this: a packet link has no address space to seek within, only
/// a running offset, so the FFFF locator (which needs `read`) can only be
/// generic over `RandomAccessStorage`, while the TFTF engine and boot
/// controller are generic over plain [`Storage`] and so work over either
/// transport. This split is enforced by the type system rather than by a
/// runtime "unsupported operation" error.
#[allow(async_fn_in_trait)]
pub trait RandomAccessStorage: Storage {
    /// Random-access read of `dst.len()` bytes starting at absolute `addr`.
    ///
    /// `dst.len() == 0` is defined as "reposition to `addr` for the next `load`,
    /// without performing I/O."
    async fn read(&mut self, dst: Option<&mut [u8]>, addr: u32) -> Result<(), StorageError<Self::Error>>;
}
