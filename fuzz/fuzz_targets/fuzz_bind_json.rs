#![no_main]
use duckbridge::BindingStore;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let mut store = BindingStore::with_len(2);
    let before = store.clone();
    match store.bind_json(text) {
        // Binding a list never shrinks the store
        Ok(count) => assert!(store.len() >= count.max(before.len())),
        // A rejected list leaves the store untouched
        Err(_) => assert_eq!(store, before),
    }
});
