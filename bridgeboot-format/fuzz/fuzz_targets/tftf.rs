#![no_main]

extern crate libfuzzer_sys;
extern crate std;

use arbitrary::Arbitrary;
use bridgeboot_format::tftf::{self, ChipIdentity, Header};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: Input| fuzz(input));

#[derive(Arbitrary, Debug)]
struct Input {
    header_bytes: std::vec::Vec<u8>,
    load_base: u32,
    load_len: u32,
    unipro_vid: u32,
    unipro_pid: u32,
    ara_vid: u32,
    ara_pid: u32,
}

/// Any 512-byte header, valid or corrupt, must resolve to a validation
/// result without panicking — this is the parser's whole untrusted-input
/// surface short of `load_image`'s `unsafe` payload-streaming path.
fn fuzz(input: Input) {
    let mut header = Header::zeroed();
    let buf = header.as_bytes_mut();
    let n = input.header_bytes.len().min(buf.len());
    buf[..n].copy_from_slice(&input.header_bytes[..n]);

    let load_end = input.load_base.saturating_add(input.load_len);
    let chip = ChipIdentity {
        unipro_vid: input.unipro_vid,
        unipro_pid: input.unipro_pid,
        ara_vid: input.ara_vid,
        ara_pid: input.ara_pid,
    };
    let _ = tftf::fuzz_validate(&header, input.load_base..load_end, chip);
}
