#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The link drops non-ASCII bytes before parsing; do the same here.
    let line: String = data
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| char::from(b))
        .collect();
    if let Some(frame) = sisaqui_core::parse_frame(&line) {
        let _ = sisaqui_core::util::comma_decimal(frame.grams);
    }
    // Raw UTF-8 must not panic either.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = sisaqui_core::parse_weight(s);
    }
});
