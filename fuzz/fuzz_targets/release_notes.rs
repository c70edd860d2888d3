#![no_main]
use libfuzzer_sys::fuzz_target;
use sil_release_tasks::changelog::ReleaseNotesExtractor;

fuzz_target!(|data: &str| {
    let lines: Vec<String> = data.lines().map(str::to_string).collect();
    // Neither mode should panic on arbitrary changelogs
    for filter_entries in [false, true] {
        if let Ok(extractor) = ReleaseNotesExtractor::new(r"#+ \[([^\]]+)\]", filter_entries, "Fuzz") {
            let _ = extractor.extract(&lines);
        }
    }
});
