#![no_main]

extern crate libfuzzer_sys;
extern crate std;

use arbitrary::Arbitrary;
use bridgeboot_format::ffff;
use bridgeboot_format::testutil::MemoryStorage;
use bridgeboot_traits::storage::Storage;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: Input| fuzz(input.data, input.element_type));

#[derive(Arbitrary, Debug)]
struct Input {
    data: std::vec::Vec<u8>,
    element_type: u32,
}

/// Any directory image, valid or corrupt, must resolve to a `locate()`
/// result without panicking.
fn fuzz(data: std::vec::Vec<u8>, element_type: u32) {
    let mut storage = MemoryStorage::new(data);
    embassy_futures::block_on(async {
        if storage.init().await.is_err() {
            return;
        }
        let _ = ffff::locate(&mut storage, element_type).await;
    });
}
