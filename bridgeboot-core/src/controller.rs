//! The boot controller: one attempt through flash, falling back to the
//! interconnect, per `original_source/common/src/2ndstage_start.c`'s
//! `bootrom_main`. Styled on `ec_slimloader::start`/`Board`
//! (`ec-slimloader/src/lib.rs`): a top-level `start` generic over a
//! `Platform` collaborator, synchronous apart from awaiting the `Storage`
//! calls it makes.

use core::ops::Range;

use bridgeboot_fetch::storage::Error as FetchStorageError;
use bridgeboot_fetch::{Channel, ControlResponder, FetchError, FetchStorage};
use bridgeboot_format::error::{FfffError, TftfError};
use bridgeboot_format::tftf::{ChipIdentity, LoadOutcome};
use bridgeboot_format::{ffff, tftf};
use bridgeboot_traits::boot_status::{BootStage, BootStatus, BootStatusCode};
use bridgeboot_traits::comm_area::CommunicationArea;
use bridgeboot_traits::crypto::{Hasher, Verifier};
use bridgeboot_traits::platform::{BootSelector, Platform, PlatformConfig};
use bridgeboot_traits::storage::{RandomAccessStorage, Storage, StorageError};
use defmt_or_log::warn;

use crate::error::FuseError;
use crate::fuse;

/// Which path produced a [`LoadOutcome`], needed to pick the right
/// [`BootStatusCode`] once a boot attempt succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BootPath {
    Flash,
    Interconnect { fallback: bool },
}

fn finished_code(path: BootPath, secure: bool) -> BootStatusCode {
    use BootStatusCode::*;
    match (path, secure) {
        (BootPath::Flash, true) => TrustedFlashBootFinished,
        (BootPath::Flash, false) => UntrustedFlashBootFinished,
        (BootPath::Interconnect { fallback: false }, true) => TrustedInterconnectBootFinished,
        (BootPath::Interconnect { fallback: false }, false) => UntrustedInterconnectBootFinished,
        (BootPath::Interconnect { fallback: true }, true) => FallbackTrustedInterconnectBootFinished,
        (BootPath::Interconnect { fallback: true }, false) => FallbackUntrustedInterconnectBootFinished,
    }
}

/// Record `code` in this core's stage-2 errno slot. First error per stage wins.
fn record(status: &mut BootStatus, code: impl Into<u8>) {
    status.errno_mut().set_if_empty(BootStage::Stage2, code.into());
}

fn ffff_errno<E>(err: ffff::Error<E>) -> u8 {
    match err {
        ffff::Error::Format(e) => e.into(),
        ffff::Error::Storage(_) => FfffError::LoadHeader.into(),
    }
}

fn tftf_errno<E, V>(err: tftf::Error<E, V>, other: impl FnOnce(E) -> u8) -> u8 {
    match err {
        tftf::Error::Format(e) => e.into(),
        tftf::Error::Storage(StorageError::Other(e)) => other(e),
        tftf::Error::Storage(_) => TftfError::LoadHeader.into(),
        tftf::Error::Verify(_) => TftfError::ImageCorrupted.into(),
    }
}

fn fetch_errno<E>(err: &StorageError<FetchStorageError<E>>) -> u8 {
    match err {
        StorageError::Other(FetchStorageError::Fetch(fe)) => (*fe).into(),
        _ => FetchError::Recv.into(),
    }
}

fn element_type_for_stage(stage: u8) -> u32 {
    if stage == 3 {
        ffff::ELEMENT_STAGE_3_FIRMWARE
    } else {
        ffff::ELEMENT_STAGE_2_FIRMWARE
    }
}

/// Locate and load `stage`'s firmware from the flash directory.
///
/// # Safety
/// See [`tftf::load_image`]: `load_range` must name memory this platform has
/// committed as writable for the duration of this boot attempt.
async fn try_flash_boot<FS, H, V>(
    flash: &mut FS,
    hasher: &mut H,
    verifier: &mut V,
    comm_area: &mut CommunicationArea,
    chip: ChipIdentity,
    load_range: Range<u32>,
    stage: u8,
    status: &mut BootStatus,
) -> Option<LoadOutcome>
where
    FS: RandomAccessStorage,
    H: Hasher,
    V: Verifier,
{
    if flash.init().await.is_err() {
        record(status, FfffError::LoadHeader);
        return None;
    }

    if let Err(e) = ffff::locate(flash, element_type_for_stage(stage)).await {
        record(status, ffff_errno(e));
        let _ = flash.finish(false, false).await;
        return None;
    }

    // Safety: upheld by this function's caller.
    let outcome = unsafe { tftf::load_image(flash, hasher, verifier, comm_area, load_range, chip).await };
    match outcome {
        Ok(outcome) => {
            let _ = flash.finish(true, outcome.secure).await;
            Some(outcome)
        }
        Err(e) => {
            record(status, tftf_errno(e, |_| FfffError::LoadHeader.into()));
            let _ = flash.finish(false, false).await;
            None
        }
    }
}

/// Drive the firmware-fetch protocol to completion and load `stage`'s
/// firmware over it.
///
/// # Safety
/// See [`try_flash_boot`].
#[allow(clippy::too_many_arguments)]
async fn try_interconnect_boot<H, V, FC, R>(
    hasher: &mut H,
    verifier: &mut V,
    comm_area: &mut CommunicationArea,
    chip: ChipIdentity,
    load_range: Range<u32>,
    control_channel: FC,
    firmware_channel: FC,
    responder: R,
    stage: u8,
    poll_budget: u32,
    status: &mut BootStatus,
) -> Option<LoadOutcome>
where
    H: Hasher,
    V: Verifier,
    FC: Channel,
    R: ControlResponder,
{
    let max_firmware_size = load_range.end.saturating_sub(load_range.start);
    let mut fetch = FetchStorage::new(control_channel, firmware_channel, responder, stage, max_firmware_size, poll_budget);

    if let Err(e) = fetch.init().await {
        record(status, fetch_errno(&e));
        return None;
    }

    // Safety: upheld by this function's caller.
    let outcome = unsafe { tftf::load_image(&mut fetch, hasher, verifier, comm_area, load_range, chip).await };
    match outcome {
        Ok(outcome) => {
            let _ = fetch.finish(true, outcome.secure).await;
            Some(outcome)
        }
        Err(e) => {
            record(status, tftf_errno(e, |fe| fetch_errno(&StorageError::Other(fe))));
            let _ = fetch.finish(false, false).await;
            None
        }
    }
}

/// Accept or reject a successful image load, publish the terminal status for
/// this attempt, and lock down the chip if the image was not trusted.
///
/// Returns `true` if the attempt is a committed success (the caller should
/// jump); `false` if `allow_unsigned` rejects an unsigned image, in which
/// case the caller falls through as if the load itself had failed.
fn finish<P: Platform>(
    platform: &mut P,
    status: &mut BootStatus,
    path: BootPath,
    outcome: LoadOutcome,
    allow_unsigned: bool,
) -> bool {
    if !outcome.secure && !allow_unsigned {
        record(status, TftfError::ImageCorrupted);
        return false;
    }
    if !outcome.secure {
        platform.rig_for_untrusted();
    }
    *status = status.with_code(finished_code(path, outcome.secure));
    platform.advertise_boot_status(*status);
    true
}

fn halt<P: Platform>(platform: &mut P, mut status: BootStatus) -> ! {
    status = status.with_code(BootStatusCode::Failed);
    platform.advertise_boot_status(status);
    warn!("boot controller: all paths exhausted, halting");
    platform.halt()
}

/// Run one boot attempt: chip init, fuse validation, flash path, interconnect
/// fallback, halt. Never returns.
///
/// `stage` selects which firmware stage to locate/request (passed through to
/// both the FFFF element-type lookup and the fetch protocol's
/// `FIRMWARE_SIZE` request); `control_channel`/`firmware_channel` are the two
/// transport endpoints the interconnect path needs if the flash path is
/// skipped or fails.
#[allow(clippy::too_many_arguments)]
pub async fn start<P, C, FS, H, V, FC, R>(
    mut platform: P,
    mut flash: FS,
    mut hasher: H,
    mut verifier: V,
    control_channel: FC,
    firmware_channel: FC,
    responder: R,
    stage: u8,
) -> !
where
    P: Platform,
    C: PlatformConfig,
    FS: RandomAccessStorage,
    H: Hasher,
    V: Verifier,
    FC: Channel,
    R: ControlResponder,
{
    let mut comm_area = CommunicationArea::new();
    let mut status = BootStatus::new(BootStatusCode::Operating);

    if platform.chip_init().is_err() {
        halt(&mut platform, status);
    }
    platform.advertise_boot_status(status);

    let fuses = match platform.read_fuses() {
        Ok(fuses) => fuses,
        Err(_) => {
            record(&mut status, FuseError::Ecc);
            halt(&mut platform, status);
        }
    };
    let validated = match fuse::validate(fuses, &mut hasher) {
        Ok(validated) => validated,
        Err(e) => {
            record(&mut status, e);
            halt(&mut platform, status);
        }
    };
    comm_area.set_endpoint_unique_id(validated.endpoint_unique_id.unwrap_or([0u8; 8]));

    let (unipro_vid, unipro_pid) = platform.read_unipro_ids();
    let chip = ChipIdentity { unipro_vid, unipro_pid, ara_vid: validated.ara_vid, ara_pid: validated.ara_pid };

    let load_range = C::load_range();
    let allow_unsigned = C::allow_unsigned_images();
    let poll_budget = C::receive_poll_budget();

    let mut fallback = false;

    if platform.read_boot_selector() == BootSelector::Flash {
        status = status.with_code(BootStatusCode::FlashBootStarted);
        platform.advertise_boot_status(status);

        if let Some(outcome) =
            try_flash_boot(&mut flash, &mut hasher, &mut verifier, &mut comm_area, chip, load_range.clone(), stage, &mut status).await
        {
            if finish(&mut platform, &mut status, BootPath::Flash, outcome, allow_unsigned) {
                platform.jump(outcome.entry_point, &comm_area);
            }
        }
        fallback = true;
    }

    status = status.with_code(if fallback { BootStatusCode::FallbackInterconnectBootStarted } else { BootStatusCode::InterconnectBootStarted });
    platform.advertise_boot_status(status);

    if let Some(outcome) = try_interconnect_boot(
        &mut hasher,
        &mut verifier,
        &mut comm_area,
        chip,
        load_range,
        control_channel,
        firmware_channel,
        responder,
        stage,
        poll_budget,
        &mut status,
    )
    .await
    {
        if finish(&mut platform, &mut status, BootPath::Interconnect { fallback }, outcome, allow_unsigned) {
            platform.jump(outcome.entry_point, &comm_area);
        }
    }

    halt(&mut platform, status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_first_error_per_stage() {
        let mut status = BootStatus::new(BootStatusCode::Operating);
        record(&mut status, FuseError::BadAraVid);
        record(&mut status, FuseError::BadIms);
        assert_eq!(status.errno().get(BootStage::Stage2), FuseError::BadAraVid as u8);
    }

    #[test]
    fn finished_code_picks_trust_and_path_variant() {
        assert_eq!(finished_code(BootPath::Flash, true), BootStatusCode::TrustedFlashBootFinished);
        assert_eq!(finished_code(BootPath::Flash, false), BootStatusCode::UntrustedFlashBootFinished);
        assert_eq!(
            finished_code(BootPath::Interconnect { fallback: true }, false),
            BootStatusCode::FallbackUntrustedInterconnectBootFinished
        );
        assert_eq!(
            finished_code(BootPath::Interconnect { fallback: false }, true),
            BootStatusCode::TrustedInterconnectBootFinished
        );
    }

    #[test]
    fn ffff_errno_maps_storage_failure_to_load_header() {
        let err: ffff::Error<()> = ffff::Error::Storage(StorageError::Other(()));
        assert_eq!(ffff_errno(err), FfffError::LoadHeader as u8);
    }

    #[test]
    fn ffff_errno_passes_through_format_errors() {
        let err: ffff::Error<()> = ffff::Error::Format(FfffError::EltCollision);
        assert_eq!(ffff_errno(err), FfffError::EltCollision as u8);
    }

    #[test]
    fn fetch_errno_extracts_nested_fetch_error() {
        let err: StorageError<FetchStorageError<()>> = StorageError::Other(FetchStorageError::Fetch(FetchError::TooLarge));
        assert_eq!(fetch_errno(&err), FetchError::TooLarge as u8);
    }

    struct NoopPlatform;

    impl Platform for NoopPlatform {
        type Error = ();
        fn chip_init(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
        fn read_fuses(&mut self) -> Result<bridgeboot_traits::platform::FuseValues, Self::Error> {
            Ok(bridgeboot_traits::platform::FuseValues { ara_vid: 0, ara_pid: 0, serial_number: 0, ims: [0u8; 35] })
        }
        fn read_boot_selector(&mut self) -> BootSelector {
            BootSelector::Flash
        }
        fn read_unipro_ids(&mut self) -> (u32, u32) {
            (0, 0)
        }
        fn advertise_boot_status(&mut self, _status: BootStatus) {}
        fn rig_for_untrusted(&mut self) {}
        fn jump(&mut self, _entry_point: u32, _comm_area: &CommunicationArea) -> ! {
            panic!("jump called in a halt test");
        }
        fn halt(&mut self) -> ! {
            loop {}
        }
    }

    #[test]
    fn finish_rejects_unsigned_image_when_disallowed() {
        let mut platform = NoopPlatform;
        let mut status = BootStatus::new(BootStatusCode::FlashBootStarted);
        let outcome = LoadOutcome { entry_point: 0x1000, secure: false };
        let accepted = finish(&mut platform, &mut status, BootPath::Flash, outcome, false);
        assert!(!accepted);
        assert_eq!(status.errno().get(BootStage::Stage2), TftfError::ImageCorrupted as u8);
    }

    #[test]
    fn finish_accepts_unsigned_image_when_allowed_and_locks_down() {
        let mut platform = NoopPlatform;
        let mut status = BootStatus::new(BootStatusCode::FlashBootStarted);
        let outcome = LoadOutcome { entry_point: 0x1000, secure: false };
        let accepted = finish(&mut platform, &mut status, BootPath::Flash, outcome, true);
        assert!(accepted);
        assert_eq!(status.code(), BootStatusCode::UntrustedFlashBootFinished);
    }
}
