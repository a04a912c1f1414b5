//! Codec invariants on generated traces.
//!
//! - the encoder and decoder agree on every generated trace, and
//! - cutting a valid stream anywhere yields either a successful load (only at
//!   the optional-section boundaries) or a `Read` error, never a parse error
//!   and never a panic.

use evrace_core::{ErrorKind, Section};
use evrace_trace::{
    decode::decode_log_bytes,
    encode::encode_log_to_vec,
    generator::{generate_log, GenParams},
};
use proptest::prelude::*;

fn params(seed: u64, events: u32) -> GenParams {
    GenParams {
        events,
        vars: 5,
        seed,
        ..GenParams::default()
    }
}

/// A stream cut inside the first variable length prefix.
#[test]
fn truncated_variable_prefix_fails_to_load() {
    let log = generate_log(&params(1, 4)).unwrap();
    let bytes = encode_log_to_vec(&log).unwrap();
    // count word, then two bytes of the first length prefix.
    let err = decode_log_bytes(&bytes[..6]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Read);
    assert_eq!(err.section(), Some(Section::Variables));
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64, // good CI/runtime balance
        .. ProptestConfig::default()
    })]

    #[test]
    fn generated_traces_survive_the_codec(seed in any::<u64>(), events in 0u32..40) {
        let log = generate_log(&params(seed, events)).unwrap();
        let bytes = encode_log_to_vec(&log).unwrap();
        let back = decode_log_bytes(&bytes).unwrap();
        prop_assert_eq!(back, log);
    }

    #[test]
    fn truncation_is_read_error_or_boundary(seed in any::<u64>(), cut in 0.0f64..1.0) {
        let log = generate_log(&params(seed, 10)).unwrap();
        let bytes = encode_log_to_vec(&log).unwrap();
        let at = ((bytes.len() as f64) * cut) as usize;
        match decode_log_bytes(&bytes[..at]) {
            Ok(partial) => {
                // Only the optional tail may be missing.
                prop_assert_eq!(&partial.trace, &log.trace);
                prop_assert!(partial.values.is_none());
            }
            Err(e) => prop_assert_eq!(e.kind(), ErrorKind::Read),
        }
    }
}
