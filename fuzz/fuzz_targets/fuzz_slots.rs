#![no_main]

use larray::{Context, LargeArrayError, StringArray, DEFAULT_MAX_BYTES};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: Vec<String>| {
    if data.is_empty() {
        return;
    }
    let ctx = Context::new().with_max_managed_len(0);
    let mut array = StringArray::new_in(&ctx, data.len(), DEFAULT_MAX_BYTES).unwrap();
    for (i, s) in data.iter().enumerate() {
        match array.set(i, s.clone()) {
            Ok(()) => assert_eq!(&array.get(i).unwrap(), s),
            Err(LargeArrayError::InvalidArgument(_)) => assert!(s.len() > DEFAULT_MAX_BYTES),
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
});
