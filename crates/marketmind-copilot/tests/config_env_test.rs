//! `MARKETMIND__*` environment overrides.
//!
//! Kept in its own test binary with a single test: the process environment is
//! shared, and the file-only tests in `config_test.rs` must not see these vars.

use marketmind_copilot::CopilotConfig;
use std::io::Write;
use std::time::Duration;

#[test]
fn environment_overrides_file_and_defaults() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(b"request_timeout_secs = 5\nlocale = \"en-GB\"\n")
        .unwrap();

    std::env::set_var("MARKETMIND__REQUEST_TIMEOUT_SECS", "9");
    std::env::set_var("MARKETMIND__VOICE_ENABLED", "true");
    let loaded = CopilotConfig::load_from(file.path());
    std::env::remove_var("MARKETMIND__REQUEST_TIMEOUT_SECS");
    std::env::remove_var("MARKETMIND__VOICE_ENABLED");

    let config = loaded.unwrap();
    assert_eq!(config.request_timeout(), Duration::from_secs(9));
    assert!(config.voice_enabled);
    // Keys without an override keep the file value.
    assert_eq!(config.locale, "en-GB");

    let config = CopilotConfig::load_from(file.path()).unwrap();
    assert_eq!(config.request_timeout(), Duration::from_secs(5));
    assert!(!config.voice_enabled);
}
