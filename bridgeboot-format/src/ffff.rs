//! The flash directory format (FFFF): a two-copy, generation-numbered table
//! of elements, and the locator that finds the newest valid copy and the
//! newest element of a requested type within it.
//!
//! Grounded on `original_source/common/include/ffff.h` (exact field layout)
//! and `common/src/ffff.c` (`load_ffff_header`/`locate_ffff_table`/
//! `locate_element`/`valid_ffff_header`/`valid_ffff_element`, whose control
//! flow this module's [`locate`] and [`Header::validate`] follow step for
//! step). Parsed with explicit offsets, matching `SPEC_FULL.md` §6.

use bridgeboot_traits::storage::{RandomAccessStorage, StorageError};
use defmt_or_log::debug;

use crate::error::FfffError;

/// Size of one directory header copy, in bytes.
///
/// The original's `ffff_header` is a fixed-size struct (not a variable-length
/// buffer keyed by `header_size`); this implementation follows that and
/// supports exactly one header size. A `header_size` field reporting anything
/// else is rejected as [`FfffError::HeaderSize`].
pub const HEADER_SIZE: usize = 512;

pub const ERASE_BLOCK_SIZE_MAX: u32 = 1024 * 512;
pub const SENTINEL: [u8; 16] = *b"FlashFormatForFW";
pub const MAX_ELEMENTS: usize = 19;

const ELEMENT_SIZE: usize = 20;
const PADDING_LEN: usize = 16;

const SENTINEL_OFFSET: usize = 0;
const BUILD_TIMESTAMP_OFFSET: usize = 16;
const IMAGE_NAME_OFFSET: usize = 32;
const FLASH_CAPACITY_OFFSET: usize = 80;
const ERASE_BLOCK_SIZE_OFFSET: usize = 84;
const HEADER_SIZE_OFFSET: usize = 88;
const FLASH_IMAGE_LENGTH_OFFSET: usize = 92;
const HEADER_GENERATION_OFFSET: usize = 96;
const ELEMENTS_OFFSET: usize = 100;
const PADDING_OFFSET: usize = ELEMENTS_OFFSET + MAX_ELEMENTS * ELEMENT_SIZE;
const TRAILING_SENTINEL_OFFSET: usize = PADDING_OFFSET + PADDING_LEN;

const _: () = assert!(TRAILING_SENTINEL_OFFSET + 16 == HEADER_SIZE);

/// Element type codes, per `original_source/common/include/ffff.h`.
pub const ELEMENT_END: u32 = 0;
pub const ELEMENT_STAGE_2_FIRMWARE: u32 = 1;
pub const ELEMENT_STAGE_3_FIRMWARE: u32 = 2;
pub const ELEMENT_IMS_CERT: u32 = 3;
pub const ELEMENT_CMS_CERT: u32 = 4;
pub const ELEMENT_DATA: u32 = 5;

/// One entry in the directory's element table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ElementDescriptor {
    pub element_type: u32,
    pub element_id: u32,
    pub element_generation: u32,
    pub element_location: u32,
    pub element_length: u32,
}

impl ElementDescriptor {
    fn parse(buf: &[u8]) -> Self {
        Self {
            element_type: read_u32(buf, 0),
            element_id: read_u32(buf, 4),
            element_generation: read_u32(buf, 8),
            element_location: read_u32(buf, 12),
            element_length: read_u32(buf, 16),
        }
    }

    fn is_end(&self) -> bool {
        self.element_type == ELEMENT_END
    }

    /// Inclusive end address of this element's span on storage.
    fn end(&self) -> u32 {
        self.element_location.wrapping_add(self.element_length).wrapping_sub(1)
    }
}

/// One 512-byte directory header, as read from storage.
pub struct Header([u8; HEADER_SIZE]);

impl Header {
    pub fn zeroed() -> Self {
        Self([0u8; HEADER_SIZE])
    }

    pub fn flash_capacity(&self) -> u32 {
        read_u32(&self.0, FLASH_CAPACITY_OFFSET)
    }

    pub fn erase_block_size(&self) -> u32 {
        read_u32(&self.0, ERASE_BLOCK_SIZE_OFFSET)
    }

    pub fn header_size(&self) -> u32 {
        read_u32(&self.0, HEADER_SIZE_OFFSET)
    }

    pub fn flash_image_length(&self) -> u32 {
        read_u32(&self.0, FLASH_IMAGE_LENGTH_OFFSET)
    }

    pub fn header_generation(&self) -> u32 {
        read_u32(&self.0, HEADER_GENERATION_OFFSET)
    }

    pub fn element(&self, index: usize) -> ElementDescriptor {
        let offset = ELEMENTS_OFFSET + index * ELEMENT_SIZE;
        ElementDescriptor::parse(&self.0[offset..offset + ELEMENT_SIZE])
    }

    fn has_leading_sentinel(&self) -> bool {
        self.0[SENTINEL_OFFSET..SENTINEL_OFFSET + 16] == SENTINEL
    }

    fn has_trailing_sentinel(&self) -> bool {
        self.0[TRAILING_SENTINEL_OFFSET..TRAILING_SENTINEL_OFFSET + 16] == SENTINEL
    }

    fn padding_is_zero(&self) -> bool {
        self.0[PADDING_OFFSET..PADDING_OFFSET + PADDING_LEN].iter().all(|b| *b == 0)
    }

    /// Minimum legal `element_location` for any element in this header: past both header copies.
    fn element_location_min(&self) -> u32 {
        2 * self.header_size().max(self.erase_block_size())
    }

    /// `element_location_min` placement for a potential second header copy.
    fn second_header_address(&self) -> u32 {
        self.header_size().max(self.erase_block_size())
    }

    /// Validate the leading sentinel and `header_size` only — enough to decide
    /// whether this is worth reading the rest of, mirroring
    /// `load_ffff_header`'s early-out before the full body is even considered.
    fn validate_prefix(&self) -> Result<(), FfffError> {
        if !self.has_leading_sentinel() {
            return Err(FfffError::Sentinel);
        }
        if self.header_size() as usize != HEADER_SIZE {
            return Err(FfffError::HeaderSize);
        }
        Ok(())
    }

    /// Full validation, mirroring `validate_ffff_header` + `valid_ffff_element`.
    fn validate(&self) -> Result<(), FfffError> {
        if !self.has_trailing_sentinel() {
            return Err(FfffError::Sentinel);
        }
        if self.erase_block_size() > ERASE_BLOCK_SIZE_MAX {
            return Err(FfffError::BlockSize);
        }
        if self.flash_capacity() < self.erase_block_size() * 2 {
            return Err(FfffError::FlashCapacity);
        }
        if self.flash_image_length() > self.flash_capacity() {
            return Err(FfffError::ImageLength);
        }
        if !self.padding_is_zero() {
            return Err(FfffError::NonZeroPad);
        }

        let location_min = self.element_location_min();
        let location_max = self.flash_image_length();
        let mut end_of_table = false;

        for i in 0..MAX_ELEMENTS {
            let element = self.element(i);
            if element.is_end() {
                end_of_table = true;
                break;
            }
            self.validate_element(&element, i, location_min, location_max)?;
        }

        if !end_of_table {
            return Err(FfffError::NoTableEnd);
        }
        Ok(())
    }

    fn validate_element(&self, element: &ElementDescriptor, index: usize, location_min: u32, location_max: u32) -> Result<(), FfffError> {
        if element.element_location < location_min || element.end() >= location_max {
            return Err(FfffError::EltReservedMemory);
        }
        if element.element_location % self.erase_block_size() != 0 {
            return Err(FfffError::EltAlignment);
        }

        for j in (index + 1)..MAX_ELEMENTS {
            let other = self.element(j);
            if other.is_end() {
                break;
            }
            if other.end() >= element.element_location && other.element_location <= element.end() {
                return Err(FfffError::EltCollision);
            }
            if other.element_type == element.element_type
                && other.element_id == element.element_id
                && other.element_generation == element.element_generation
            {
                return Err(FfffError::EltDuplicate);
            }
        }
        Ok(())
    }
}

async fn load_header<S: RandomAccessStorage>(storage: &mut S, addr: u32) -> Result<Header, Error<S::Error>> {
    let mut header = Header::zeroed();
    storage.read(Some(&mut header.0), addr).await.map_err(Error::Storage)?;
    header.validate_prefix()?;
    header.validate()?;
    Ok(header)
}

/// Locate the newest valid directory header on `storage`.
///
/// Mirrors `locate_ffff_table`: try offset 0 first; if it's invalid, probe
/// powers of two up to `2 * ERASE_BLOCK_SIZE_MAX` looking for a lone second
/// copy. If the first copy is valid, look for its designated second copy and
/// prefer whichever has the larger `header_generation`. A storage I/O error at
/// any step aborts immediately; a format fault at one candidate address is
/// recorded and the next candidate is tried, matching `set_last_error`'s
/// first-wins-per-attempt, reset-on-retry behavior in `error.c`.
async fn locate_table<S: RandomAccessStorage>(storage: &mut S) -> Result<Header, Error<S::Error>> {
    match load_header(storage, 0).await {
        Ok(header1) => {
            let second_addr = header1.second_header_address();
            match load_header(storage, second_addr).await {
                Ok(header2) => {
                    if header2.header_generation() > header1.header_generation() {
                        Ok(header2)
                    } else {
                        Ok(header1)
                    }
                }
                Err(Error::Storage(e)) => Err(Error::Storage(e)),
                Err(Error::Format(_)) => Ok(header1),
            }
        }
        Err(Error::Storage(e)) => Err(Error::Storage(e)),
        Err(Error::Format(first_err)) => {
            let mut last_err = first_err;
            let mut addr: u32 = HEADER_SIZE as u32;
            while addr < ERASE_BLOCK_SIZE_MAX * 2 {
                match load_header(storage, addr).await {
                    Ok(header) => return Ok(header),
                    Err(Error::Storage(e)) => return Err(Error::Storage(e)),
                    Err(Error::Format(e)) => last_err = e,
                }
                addr <<= 1;
            }
            Err(Error::Format(last_err))
        }
    }
}

/// Among entries with the given `element_type`, the one with the largest generation.
///
/// Mirrors `locate_element`.
fn find_newest_element(header: &Header, element_type: u32) -> Result<ElementDescriptor, FfffError> {
    let mut found: Option<ElementDescriptor> = None;
    for i in 0..MAX_ELEMENTS {
        let element = header.element(i);
        if element.is_end() {
            break;
        }
        if element.element_type == element_type {
            found = match found {
                Some(best) if best.element_generation >= element.element_generation => Some(best),
                _ => Some(element),
            };
        }
    }
    found.ok_or(FfffError::NoFirmware)
}

/// Combined storage/format error for directory operations.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    Format(FfffError),
    Storage(StorageError<E>),
}

impl<E> From<FfffError> for Error<E> {
    fn from(value: FfffError) -> Self {
        Error::Format(value)
    }
}

/// Locate the newest element of `element_type` in the newest valid directory
/// on `storage`, and reposition `storage` at that element's start.
///
/// Mirrors `locate_ffff_element_on_storage`. Returns the element's length.
pub async fn locate<S: RandomAccessStorage>(storage: &mut S, element_type: u32) -> Result<u32, Error<S::Error>> {
    let header = locate_table(storage).await?;
    let element = find_newest_element(&header, element_type)?;
    debug!(
        "ffff: located element type {:?} at {:?}, length {:?}",
        element.element_type, element.element_location, element.element_length
    );
    storage.read(None, element.element_location).await.map_err(Error::Storage)?;
    Ok(element.element_length)
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    // Safety: every caller passes an offset computed from the fixed layout
    // constants above, all within `HEADER_SIZE`.
    u32::from_le_bytes(unsafe { buf[offset..offset + 4].try_into().unwrap_unchecked() })
}
