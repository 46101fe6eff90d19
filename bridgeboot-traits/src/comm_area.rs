//! The fixed-size hand-off area written by the current stage and read by the next.
//!
//! Grounded on `original_source/common/include/bootrom.h`'s `communication_area`
//! struct and the `_communication_area` placement convention (a fixed region
//! at the top of stage RAM). Parsed with explicit offsets rather than a
//! `#[repr(C)]` cast, per `SPEC_FULL.md` §6: this is a cross-stage wire
//! format, not a same-compiler-same-target struct, so structural layout is
//! not something to rely on.

/// Total size of the communication area, in bytes.
pub const SIZE: usize = 1024;

/// Number of shared-function-pointer slots carried forward to the next stage.
pub const NUM_SHARED_FUNCTIONS: usize = 4;

const SHARED_FUNCTIONS_LEN: usize = NUM_SHARED_FUNCTIONS * 4;
const ENDPOINT_UID_LEN: usize = 8;
const FIRMWARE_IDENTITY_LEN: usize = 32;
const VALIDATION_KEY_NAME_LEN: usize = 96;
const FIRMWARE_DESCRIPTION_LEN: usize = 64;
const RESUME_DATA_LEN: usize = 12;

const FIXED_LEN: usize =
    SHARED_FUNCTIONS_LEN + ENDPOINT_UID_LEN + FIRMWARE_IDENTITY_LEN + VALIDATION_KEY_NAME_LEN + FIRMWARE_DESCRIPTION_LEN + RESUME_DATA_LEN;

const PADDING_LEN: usize = SIZE - FIXED_LEN;

const SHARED_FUNCTIONS_OFFSET: usize = PADDING_LEN;
const ENDPOINT_UID_OFFSET: usize = SHARED_FUNCTIONS_OFFSET + SHARED_FUNCTIONS_LEN;
const FIRMWARE_IDENTITY_OFFSET: usize = ENDPOINT_UID_OFFSET + ENDPOINT_UID_LEN;
const VALIDATION_KEY_NAME_OFFSET: usize = FIRMWARE_IDENTITY_OFFSET + FIRMWARE_IDENTITY_LEN;
const FIRMWARE_DESCRIPTION_OFFSET: usize = VALIDATION_KEY_NAME_OFFSET + VALIDATION_KEY_NAME_LEN;
const RESUME_DATA_OFFSET: usize = FIRMWARE_DESCRIPTION_OFFSET + FIRMWARE_DESCRIPTION_LEN;

/// The `resume_address` / `resume_address_complement` integrity pair.
///
/// A power-management resume path (out of this core's scope beyond this one
/// check) stashes its resume vector here; [`ResumeData::is_valid`] is the
/// single function this core exposes to let stage 2 sanity-check it before
/// trusting `resume_address`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResumeData {
    pub jtag_disabled: u32,
    pub resume_address: u32,
    pub resume_address_complement: u32,
}

impl ResumeData {
    pub fn is_valid(&self) -> bool {
        self.resume_address ^ self.resume_address_complement == 0xFFFF_FFFF
    }
}

/// The fixed-size region at the top of stage-2 RAM, passed stage-to-stage.
///
/// Leading bytes are zero-padding; the fixed fields live at the tail so a
/// stage that grows the region in a future revision can do so by shrinking
/// the padding without moving any existing field.
pub struct CommunicationArea([u8; SIZE]);

impl Default for CommunicationArea {
    fn default() -> Self {
        Self::new()
    }
}

impl CommunicationArea {
    pub const fn new() -> Self {
        Self([0u8; SIZE])
    }

    /// View an already-populated region (e.g. handed down from stage 1) without copying.
    pub fn from_bytes(bytes: [u8; SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIZE] {
        &self.0
    }

    pub fn shared_function(&self, index: usize) -> u32 {
        let offset = SHARED_FUNCTIONS_OFFSET + index * 4;
        read_u32(&self.0, offset)
    }

    pub fn set_shared_function(&mut self, index: usize, value: u32) {
        let offset = SHARED_FUNCTIONS_OFFSET + index * 4;
        write_u32(&mut self.0, offset, value);
    }

    pub fn endpoint_unique_id(&self) -> [u8; ENDPOINT_UID_LEN] {
        read_array(&self.0, ENDPOINT_UID_OFFSET)
    }

    pub fn set_endpoint_unique_id(&mut self, id: [u8; ENDPOINT_UID_LEN]) {
        write_array(&mut self.0, ENDPOINT_UID_OFFSET, &id);
    }

    pub fn stage_2_firmware_identity(&self) -> [u8; FIRMWARE_IDENTITY_LEN] {
        read_array(&self.0, FIRMWARE_IDENTITY_OFFSET)
    }

    pub fn set_stage_2_firmware_identity(&mut self, identity: [u8; FIRMWARE_IDENTITY_LEN]) {
        write_array(&mut self.0, FIRMWARE_IDENTITY_OFFSET, &identity);
    }

    pub fn stage_2_validation_key_name(&self) -> [u8; VALIDATION_KEY_NAME_LEN] {
        read_array(&self.0, VALIDATION_KEY_NAME_OFFSET)
    }

    pub fn set_stage_2_validation_key_name(&mut self, key_name: [u8; VALIDATION_KEY_NAME_LEN]) {
        write_array(&mut self.0, VALIDATION_KEY_NAME_OFFSET, &key_name);
    }

    pub fn stage_2_firmware_description(&self) -> [u8; FIRMWARE_DESCRIPTION_LEN] {
        read_array(&self.0, FIRMWARE_DESCRIPTION_OFFSET)
    }

    pub fn set_stage_2_firmware_description(&mut self, description: [u8; FIRMWARE_DESCRIPTION_LEN]) {
        write_array(&mut self.0, FIRMWARE_DESCRIPTION_OFFSET, &description);
    }

    pub fn resume_data(&self) -> ResumeData {
        ResumeData {
            jtag_disabled: read_u32(&self.0, RESUME_DATA_OFFSET),
            resume_address: read_u32(&self.0, RESUME_DATA_OFFSET + 4),
            resume_address_complement: read_u32(&self.0, RESUME_DATA_OFFSET + 8),
        }
    }

    pub fn set_resume_address(&mut self, jtag_disabled: u32, resume_address: u32) {
        write_u32(&mut self.0, RESUME_DATA_OFFSET, jtag_disabled);
        write_u32(&mut self.0, RESUME_DATA_OFFSET + 4, resume_address);
        write_u32(&mut self.0, RESUME_DATA_OFFSET + 8, !resume_address);
    }
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    // Safety: callers only ever pass offsets computed from the fixed layout
    // constants above, all of which sit within `SIZE`.
    u32::from_le_bytes(unsafe { buf[offset..offset + 4].try_into().unwrap_unchecked() })
}

fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

fn read_array<const N: usize>(buf: &[u8], offset: usize) -> [u8; N] {
    // Safety: see `read_u32`.
    unsafe { buf[offset..offset + N].try_into().unwrap_unchecked() }
}

fn write_array<const N: usize>(buf: &mut [u8], offset: usize, value: &[u8; N]) {
    buf[offset..offset + N].copy_from_slice(value);
}
