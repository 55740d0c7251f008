//! Fuzz target: `DeskConfig::from_json`
//!
//! Any document either fails to parse or yields a configuration that
//! passes its own validation.
//!
//! cargo fuzz run fuzz_config_json

#![no_main]

use libfuzzer_sys::fuzz_target;

use freedesk::config::DeskConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(config) = DeskConfig::from_json(json) {
        assert!(config.validate().is_ok());
        assert_ne!(config.pins.lower, config.pins.raise);
    }
});
