#![no_main]
use chrono::{FixedOffset, TimeZone};
use libfuzzer_sys::fuzz_target;
use sil_release_tasks::changelog::generate_debian_stanza;
use sil_release_tasks::config::DebianEntryOptions;

fuzz_target!(|data: &str| {
    let lines: Vec<String> = data.lines().map(str::to_string).collect();
    let options = DebianEntryOptions {
        package_name: "fuzz".into(),
        version: "1.0".into(),
        ..DebianEntryOptions::default()
    };
    if let Some(date) = FixedOffset::east_opt(0).and_then(|tz| tz.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).single()) {
        let stanza = generate_debian_stanza(&lines, &options, date);
        assert!(stanza.last().is_some_and(|line| line.is_empty()));
    }
});
