#![no_main]
use evrace_trace::{decode::decode_log_bytes, encode::encode_log_to_vec};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Anything that decodes must re-encode to a stream that decodes identically.
    if let Ok(log) = decode_log_bytes(data) {
        let bytes = encode_log_to_vec(&log).expect("re-encode");
        let again = decode_log_bytes(&bytes).expect("re-decode");
        assert_eq!(again, log);
    }
});
