#![no_main]

use libfuzzer_sys::fuzz_target;
use sysperf::size::parse_size;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Must never panic; any value it accepts must re-parse to itself
        if let Ok(bytes) = parse_size(input) {
            assert_eq!(parse_size(&bytes.to_string()), Ok(bytes));
        }
    }
});
