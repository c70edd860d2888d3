//! Release notes for the most recent release section of a changelog.
//!
//! A recursive descent over heading levels: each call handles the headings
//! one `#` deeper than its caller and hands back control when it meets a
//! heading at its parent's level. The cursor only ever moves forward.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::changelog::read_lines;
use crate::config::{defaults, ReleaseNotesOptions};
use crate::error::{Result, TaskError};

/// Link reference definitions such as `[1.0]: https://...` end a section.
static URL_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[^\]]+\]: (http|https|ftp|)://.+").expect("static url pattern is valid")
});

/// A list entry tagged with the package it applies to: `- [Package] text`.
static TAGGED_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"- \[([^\]]+)\]").expect("static tag pattern is valid")
});

/// Level of the top `# Change Log` heading; releases sit one level below.
const TOP_LEVEL: usize = 1;
const RELEASE_LEVEL: usize = 2;

#[derive(Debug, Clone)]
pub struct ReleaseNotesExtractor {
    version: Regex,
    filter_entries: bool,
    package_id: String,
}

impl ReleaseNotesExtractor {
    /// `version_regex` recognises release headings; its first group is the
    /// version reported in "Changes since version ...".
    pub fn new(version_regex: &str, filter_entries: bool, package_id: &str) -> Result<Self> {
        let version = Regex::new(version_regex).map_err(|source| TaskError::InvalidPattern {
            pattern: version_regex.to_string(),
            source,
        })?;
        Ok(Self {
            version,
            filter_entries,
            package_id: package_id.to_string(),
        })
    }

    pub fn from_options(options: &ReleaseNotesOptions) -> Result<Self> {
        Self::new(
            &options.version_regex,
            options.filter_entries,
            &options.package_id,
        )
    }

    /// Formatted notes for the latest release, or an empty string when the
    /// changelog has none.
    pub fn extract(&self, lines: &[String]) -> String {
        let mut parser = Parser {
            extractor: self,
            lines,
            index: 0,
        };
        parser.section(TOP_LEVEL, RELEASE_LEVEL)
    }

    fn own_tag(&self) -> String {
        format!("- [{}]", self.package_id)
    }
}

/// Notes for the latest release using the default version heading pattern.
pub fn extract_latest_section(lines: &[String], filter_entries: bool, package_id: &str) -> Result<String> {
    let extractor = ReleaseNotesExtractor::new(&defaults::version_regex(), filter_entries, package_id)?;
    Ok(extractor.extract(lines))
}

/// Read `options.changelog_file` and build the release notes text, with
/// `options.append_text` (plus a newline) added at the end.
pub fn set_release_notes_property(options: &ReleaseNotesOptions) -> Result<String> {
    let extractor = ReleaseNotesExtractor::from_options(options)?;
    let lines = read_lines(&options.changelog_file)?;

    let mut value = extractor.extract(&lines);
    if let Some(append) = options.append_text.as_deref().filter(|s| !s.is_empty()) {
        value.push_str(append);
        value.push('\n');
    }

    if value.is_empty() {
        return Err(release_not_found(&options.changelog_file));
    }
    tracing::debug!("Release notes from {}:\n{value}", options.changelog_file.display());
    Ok(value)
}

fn release_not_found(path: &Path) -> TaskError {
    TaskError::ReleaseNotesNotFound {
        path: path.to_path_buf(),
    }
}

struct Parser<'a> {
    extractor: &'a ReleaseNotesExtractor,
    lines: &'a [String],
    index: usize,
}

impl Parser<'_> {
    /// Collect the content below headings of `level`.
    ///
    /// Headings above `skip_until` produce no output (0 disables skipping);
    /// this is how the `# Change Log` title and the text around it are passed
    /// over until the first release heading is reached.
    fn section(&mut self, level: usize, mut skip_until: usize) -> String {
        let lines = self.lines;
        let mut out = String::new();
        let level_header = format!("{} ", "#".repeat(level));
        let parent_header = format!("{} ", "#".repeat(level - 1));

        while self.index < lines.len() {
            let line = &lines[self.index];
            if line.is_empty() {
                self.index += 1;
                continue;
            }

            if line.starts_with('#') {
                if line.starts_with(&parent_header) {
                    // Leave the heading for the caller.
                    return out;
                }

                if line.starts_with(&level_header) {
                    if level >= skip_until {
                        self.heading(line, &level_header, &mut out);
                        skip_until = 0;
                    }
                    self.index += 1;
                    let nested = self.section(level + 1, skip_until);
                    out.push_str(&nested);
                    continue;
                }

                // A heading at some other level ends the release.
                if level > skip_until {
                    self.index = lines.len();
                }
                self.index += 1;
                continue;
            }

            if self.extractor.filter_entries {
                self.filtered_entry(line, &mut out);
            } else if URL_REFERENCE.is_match(line) {
                self.index = lines.len();
                continue;
            } else if level > skip_until {
                out.push_str(line);
                out.push('\n');
            }
            self.index += 1;
        }

        out
    }

    fn heading(&mut self, line: &str, level_header: &str, out: &mut String) {
        if self.extractor.version.is_match(line) {
            if let Some(version) = self.previous_version(level_header) {
                out.push_str(&format!("Changes since version {version}\n\n"));
            }
            return;
        }

        let mut header = line[level_header.len()..].to_string();
        if !header.ends_with(':') {
            header.push(':');
        }
        if self.has_entries_below(self.index) {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&header);
            out.push('\n');
        }
    }

    /// Version of the release before the one at the cursor.
    ///
    /// A version heading directly after the current one (an empty
    /// `## [Unreleased]` followed by `## [1.5]`) is the release being
    /// described: the cursor moves onto it and the search goes on.
    fn previous_version(&mut self, level_header: &str) -> Option<String> {
        let lines = self.lines;
        let mut non_empty_lines = 0;

        for (i, line) in lines.iter().enumerate().skip(self.index + 1) {
            if line.is_empty() {
                continue;
            }
            non_empty_lines += 1;
            if !line.starts_with(level_header) {
                continue;
            }
            let Some(captures) = self.extractor.version.captures(line) else {
                continue;
            };
            if non_empty_lines <= 1 {
                self.index = i;
                continue;
            }
            return captures
                .get(1)
                .map(|m| m.as_str().to_string())
                .filter(|v| !v.is_empty());
        }

        None
    }

    /// Whether the category heading at `index` has anything to show once
    /// entries for other packages are filtered out.
    fn has_entries_below(&self, index: usize) -> bool {
        let filter = self.extractor.filter_entries;
        let own_tag = self.extractor.own_tag();

        for line in &self.lines[index + 1..] {
            if line.is_empty() || line.starts_with("  ") {
                continue;
            }
            if line.starts_with('-') && filter {
                if !TAGGED_ENTRY.is_match(line) || line.starts_with(&own_tag) {
                    return true;
                }
            } else if !self.extractor.version.is_match(line) {
                break;
            }
        }
        !filter
    }

    /// Emit an entry (and its continuation lines) if it applies to the package.
    fn filtered_entry(&mut self, line: &str, out: &mut String) {
        let lines = self.lines;
        let mut m = self.index;
        let own_tag = self.extractor.own_tag();

        if TAGGED_ENTRY.is_match(line) {
            if line.starts_with(&own_tag) {
                out.push_str(&line.replace(&format!(" [{}]", self.extractor.package_id), ""));
                out.push('\n');
                m += 1;
                while m < lines.len() && !lines[m].starts_with("- [") && !lines[m].is_empty() {
                    out.push_str(&lines[m]);
                    out.push('\n');
                    self.index = m;
                    m += 1;
                }
            } else {
                while m < lines.len() && !lines[m].starts_with("- [") && lines[m].is_empty() {
                    self.index = m;
                    m += 1;
                }
            }
        } else if line.starts_with('-') {
            // Untagged entries apply to every package. A closing `-->` of an
            // HTML comment is consumed without output.
            while m < lines.len() && !lines[m].starts_with("- [") && !lines[m].is_empty() {
                if !line.starts_with("-->") {
                    out.push_str(&lines[m]);
                    out.push('\n');
                }
                self.index = m;
                m += 1;
            }
        }
    }
}
