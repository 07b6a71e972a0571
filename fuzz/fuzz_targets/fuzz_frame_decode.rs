#![no_main]
use adr_core::{SerialFrame, decode, encode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = SerialFrame::try_from(data) else {
        return;
    };
    // Any frame that decodes must re-encode to the same bytes.
    if let Ok((word, address)) = decode(&frame) {
        let again = encode(word, address).expect("decoded parts are in range");
        assert_eq!(again.as_bytes(), frame.as_bytes());
    }
});
