#![no_main]

use libfuzzer_sys::fuzz_target;
use restorer::{AlphabetTable, payload, substitution};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let base64_text = substitution::decode(&text, AlphabetTable::deployed().decode_map());
    let _ = payload::decode(&base64_text);
});
