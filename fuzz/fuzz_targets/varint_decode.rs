#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = gosym::varint::read_uvarint(data);
    let _ = gosym::varint::read_varint(data);
});
