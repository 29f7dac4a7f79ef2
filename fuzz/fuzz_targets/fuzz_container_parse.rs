#![no_main]

use libfuzzer_sys::fuzz_target;
use restorer::Container;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let parsed = Container::parse(text);
        if !parsed.has_sentinel {
            assert_eq!(parsed.payload, text);
        }
    }
});
