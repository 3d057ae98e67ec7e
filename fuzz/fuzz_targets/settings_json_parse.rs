//! Fuzz target for settings file parsing.
//!
//! Feeds arbitrary bytes to the settings parser and checks that a parsed
//! record survives serialization.

#![no_main]

use libfuzzer_sys::fuzz_target;
use stripcut::settings::Settings;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    if let Ok(settings) = Settings::from_json_slice(data) {
        let _ = serde_json::to_string(&settings);
        let _ = settings.ai_config.masked_api_key();
    }
});
