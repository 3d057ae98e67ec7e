//! Fuzz target for page-tree attribute inheritance on untrusted PDFs.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 4 * 1024 * 1024 {
        return;
    }

    let _ = stripcut::pdf::fuzz_collect_pages(data);
});
