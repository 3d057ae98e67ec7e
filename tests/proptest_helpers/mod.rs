#![allow(dead_code)]

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

use stripcut::repack::SegmentInfo;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Blank-row flags built from alternating runs, so long bands actually occur.
pub fn arb_row_flags(max_runs: usize, max_run_len: usize) -> impl Strategy<Value = Vec<bool>> {
    (
        any::<bool>(),
        prop::collection::vec(1..=max_run_len, 0..=max_runs),
    )
        .prop_map(|(first_blank, runs)| {
            let mut flags = Vec::new();
            let mut blank = first_blank;
            for len in runs {
                flags.extend(std::iter::repeat(blank).take(len));
                blank = !blank;
            }
            flags
        })
}

pub fn arb_segments(max_len: usize) -> impl Strategy<Value = Vec<SegmentInfo>> {
    prop::collection::vec(
        (1u64..=400, 1u32..=2_000).prop_map(|(bytes, height)| SegmentInfo { bytes, height }),
        0..=max_len,
    )
}
