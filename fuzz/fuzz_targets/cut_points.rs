//! Fuzz target for cut selection.
//!
//! The first two bytes pick the band height and policy flags; every
//! remaining bit is one row's blank flag.

#![no_main]

use libfuzzer_sys::fuzz_target;
use stripcut::split::{find_cuts, segments_from_cuts, CutPolicy};

fuzz_target!(|data: &[u8]| {
    let [band, flags_byte, rows @ ..] = data else {
        return;
    };

    let flags: Vec<bool> = rows
        .iter()
        .flat_map(|byte| (0..8).map(move |bit| byte & (1 << bit) != 0))
        .collect();
    let policy = CutPolicy {
        min_band_height: u32::from(*band),
        interior_only: flags_byte & 1 != 0,
        min_tail_height: u32::from(flags_byte >> 4),
        min_strip_height: 0,
    };

    let cuts = find_cuts(&flags, &policy);
    let segments = segments_from_cuts(flags.len() as u32, &cuts);
    let total: u32 = segments.iter().map(|s| s.height()).sum();
    assert_eq!(total as usize, flags.len());
});
