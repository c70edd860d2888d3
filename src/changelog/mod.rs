//! Changelog-driven release artifacts.
//!
//! The input is a markdown changelog with `#` headings, either in the
//! [Keep a Changelog](https://keepachangelog.com/) layout (`## [Unreleased]`,
//! `## [1.2.3] - 2020-12-05`, `### Added`, ...) or the older layout with a
//! single `## VERSION DATE` heading per release.

pub mod debian;
pub mod html;
pub mod release_notes;
pub mod stamp;

use std::fs;
use std::path::Path;

use crate::error::{Result, TaskError};

pub use debian::{create_changelog_entry, debian_date, generate_debian_stanza};
pub use html::create_release_notes_html;
pub use release_notes::{extract_latest_section, set_release_notes_property, ReleaseNotesExtractor};
pub use stamp::{stamp_changelog_file, stamp_version_heading};

pub const UNRELEASED_HEADING: &str = "## [Unreleased]";

/// Read a changelog as lines, failing with `FileNotFound` when it is absent.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(TaskError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(fs::read_to_string(path)?
        .lines()
        .map(str::to_string)
        .collect())
}

/// Write `lines`, each terminated by a newline.
pub fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    let mut contents = String::new();
    for line in lines {
        contents.push_str(line);
        contents.push('\n');
    }
    fs::write(path, contents)?;
    Ok(())
}

/// The part of a Keep a Changelog file after its developer-oriented head,
/// i.e. after the `## [Unreleased]` heading and the blank line below it.
///
/// Returns `None` when there is no such heading.
pub fn strip_keep_a_changelog_head(lines: &[String]) -> Option<&[String]> {
    lines
        .windows(2)
        .position(|pair| pair[0] == UNRELEASED_HEADING && pair[1].is_empty())
        .map(|i| &lines[i + 2..])
}
