#![no_main]
use duckbridge::value::escape_json_string;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Every escaped literal must decode back to the input
    let literal = escape_json_string(text);
    let decoded: String = serde_json::from_str(&literal).expect("escaped literal is not valid JSON");
    assert_eq!(decoded, text);
});
