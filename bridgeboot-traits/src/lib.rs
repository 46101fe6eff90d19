//! Interfaces and shared data model for the bridge-SoC secure boot core.
//!
//! This crate has no opinion on where bytes come from (flash or a packet
//! link), what the hash/signature primitives are, or what the surrounding
//! chip looks like — it only defines the seams the rest of the workspace
//! programs against: [`storage::Storage`], [`crypto::Hasher`]/[`crypto::Verifier`],
//! and [`platform::Platform`]/[`platform::PlatformConfig`], plus the small
//! pieces of wire-shaped state that cross those seams
//! ([`boot_status`], [`comm_area`]).
#![cfg_attr(not(feature = "_test"), no_std)]

pub mod boot_status;
pub mod comm_area;
pub mod crypto;
pub mod platform;
pub mod storage;

pub use boot_status::{BootErrno, BootStage, BootStatus, BootStatusCode};
pub use comm_area::CommunicationArea;
pub use crypto::{Hasher, Verifier};
pub use platform::{Platform, PlatformConfig};
pub use storage::{RandomAccessStorage, Storage};
