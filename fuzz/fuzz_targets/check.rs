#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parse and type check arbitrary source - neither stage may panic
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = sift::check(s);
    }
});
