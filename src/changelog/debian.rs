//! Debian changelog stanzas from the latest markdown changelog entry.

use std::fs;

use chrono::{DateTime, FixedOffset};

use crate::changelog::{read_lines, strip_keep_a_changelog_head, write_lines};
use crate::config::{defaults, DebianEntryOptions};
use crate::error::Result;

/// RFC 2822 date as used in the trailer line, e.g.
/// `Thu, 15 Oct 2015 08:25:16 -0500`.
pub fn debian_date(date: &DateTime<FixedOffset>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S %z").to_string()
}

/// Lines of a new Debian changelog stanza for `options.version`, built from
/// the first release section of `markdown`.
///
/// The first line of the section is the release heading and is replaced by
/// the `package (version) distribution; urgency=...` line. In a Keep a
/// Changelog file each `### Category` becomes a first-level bullet with its
/// entries nested below it.
pub fn generate_debian_stanza(
    markdown: &[String],
    options: &DebianEntryOptions,
    date: DateTime<FixedOffset>,
) -> Vec<String> {
    let body: Vec<String> = match strip_keep_a_changelog_head(markdown) {
        Some(rest) => rest.iter().map(|line| flatten_category(line)).collect(),
        None => markdown.to_vec(),
    };

    let mut entry = vec![
        format!(
            "{} ({}) {}; urgency={}",
            options.package_name,
            options.version,
            or_default(&options.distribution, defaults::distribution),
            or_default(&options.urgency, defaults::urgency),
        ),
        String::new(),
    ];

    let mut lines = body.iter().skip(1).peekable();
    if lines.peek().is_some_and(|line| line.is_empty()) {
        lines.next();
    }
    for line in lines {
        if line.starts_with("##") {
            break;
        }
        if let Some(converted) = to_debian_line(line) {
            entry.push(converted);
        }
    }

    if entry.last().is_some_and(|line| !line.is_empty()) {
        entry.push(String::new());
    }
    entry.push(format!(
        " -- {}  {}",
        or_default(&options.maintainer, defaults::maintainer),
        debian_date(&date)
    ));
    entry.push(String::new());
    entry
}

/// Prepend a stanza for the latest release to `options.debian_changelog`.
///
/// The previous contents are kept in a `.old` file next to it.
pub fn create_changelog_entry(
    options: &DebianEntryOptions,
    date: DateTime<FixedOffset>,
) -> Result<()> {
    let markdown = read_lines(&options.changelog_file)?;
    let mut lines = generate_debian_stanza(&markdown, options, date);

    let debian = &options.debian_changelog;
    if debian.exists() {
        let old = debian.with_extension("old");
        if old.exists() {
            fs::remove_file(&old)?;
        }
        fs::rename(debian, &old)?;
        lines.extend(read_lines(&old)?);
    }

    write_lines(debian, &lines)?;
    tracing::info!(
        "Added {} {} to {}",
        options.package_name,
        options.version,
        debian.display()
    );
    Ok(())
}

fn or_default(value: &str, default: fn() -> String) -> String {
    if value.is_empty() {
        default()
    } else {
        value.to_string()
    }
}

/// `### Added` becomes `- Added`; its entries move one level in.
fn flatten_category(line: &str) -> String {
    if let Some(category) = line.strip_prefix("### ") {
        format!("- {category}")
    } else if line.starts_with('#') || line.trim().is_empty() {
        line.to_string()
    } else {
        format!("  {line}")
    }
}

fn to_debian_line(line: &str) -> Option<String> {
    if line.trim().is_empty() {
        return Some(String::new());
    }
    match line.chars().next() {
        // Unordered and ordered items are all the same to Debian.
        Some('*' | '-' | '+' | '0'..='9') => Some(format!("  *{}", &line[1..])),
        // Only two levels are kept; deeper items flatten to the second.
        Some(' ') => Some(format!("    *{}", strip_list_marker(line.trim()))),
        _ => None,
    }
}

fn strip_list_marker(item: &str) -> &str {
    let rest = match item.chars().next() {
        Some(c) if c.is_ascii_digit() => item.trim_start_matches(|c: char| c.is_ascii_digit()),
        Some(c) => &item[c.len_utf8()..],
        None => item,
    };
    rest.trim_start_matches('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn date() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2020, 12, 7, 9, 5, 3)
            .unwrap()
    }

    fn options() -> DebianEntryOptions {
        DebianEntryOptions {
            package_name: "myfavoriteapp".into(),
            version: "2.3.11".into(),
            distribution: "unstable".into(),
            maintainer: "Steve McConnel <stephen_mcconnel@example.com>".into(),
            ..DebianEntryOptions::default()
        }
    }

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_debian_date_is_rfc2822() {
        assert_eq!(debian_date(&date()), "Mon, 07 Dec 2020 09:05:03 -0500");
    }

    #[test]
    fn test_legacy_changelog_stanza() {
        let markdown = lines("## 2.3.10: 4/Sep/2014\n* with some random content\n* does some things");
        let stanza = generate_debian_stanza(&markdown, &options(), date());
        assert_eq!(
            stanza,
            [
                "myfavoriteapp (2.3.11) unstable; urgency=low",
                "",
                "  * with some random content",
                "  * does some things",
                "",
                " -- Steve McConnel <stephen_mcconnel@example.com>  Mon, 07 Dec 2020 09:05:03 -0500",
                "",
            ]
        );
    }

    #[test]
    fn test_keep_a_changelog_categories_become_bullets() {
        let markdown = lines(
            "# Change Log

All notable changes to this project will be documented in this file.

<!-- Available types of changes:
### Added
### Changed
-->

## [Unreleased]

## [2.3.11] - 2020-12-05

### Changed
- This to that.

### Fixed
- Unplanned bugs.

## [1.2.3] - 2020-12-01

### Added
- New features.",
        );
        let stanza = generate_debian_stanza(&markdown, &options(), date());
        let expected = "myfavoriteapp (2.3.11) unstable; urgency=low

  * Changed
    * This to that.

  * Fixed
    * Unplanned bugs.

 -- Steve McConnel <stephen_mcconnel@example.com>  Mon, 07 Dec 2020 09:05:03 -0500
";
        assert_eq!(stanza.join("\n"), expected);
    }

    #[test]
    fn test_all_list_item_kinds() {
        let markdown = lines(
            "## 3.0.97 Beta
- Update French UI Translation
+ When importing, Bloom no longer
  1. makes images transparent when importing.
  4. compresses images transparent when importing.
  9. saves copyright/license back to the original files
    * extra indented list
* Fix insertion of unwanted space
Plain paragraph text",
        );
        let stanza = generate_debian_stanza(&markdown, &options(), date());
        assert_eq!(stanza[2], "  * Update French UI Translation");
        assert_eq!(stanza[3], "  * When importing, Bloom no longer");
        assert_eq!(stanza[4], "    * makes images transparent when importing.");
        assert_eq!(stanza[5], "    * compresses images transparent when importing.");
        assert_eq!(stanza[6], "    * saves copyright/license back to the original files");
        assert_eq!(stanza[7], "    * extra indented list");
        assert_eq!(stanza[8], "  * Fix insertion of unwanted space");
        assert_eq!(stanza[9], "");
        assert!(stanza[10].starts_with(" -- "));
    }

    #[test]
    fn test_defaults_for_empty_options() {
        let options = DebianEntryOptions {
            package_name: "app".into(),
            version: "1.0".into(),
            distribution: String::new(),
            urgency: String::new(),
            maintainer: String::new(),
            ..DebianEntryOptions::default()
        };
        let stanza = generate_debian_stanza(&lines("## 1.0\n- x"), &options, date());
        assert_eq!(stanza[0], "app (1.0) UNRELEASED; urgency=low");
        assert!(stanza[4].starts_with(" -- Anonymous <anonymous@example.com>  "));
    }

    #[test]
    fn test_prepends_to_existing_debian_changelog() {
        let tmp = TempDir::new().unwrap();
        let markdown = tmp.path().join("CHANGELOG.md");
        let debian = tmp.path().join("changelog");
        fs::write(
            &markdown,
            "## 2.3.10: 4/Sep/2014\n* with some random content\n* does some things\n",
        )
        .unwrap();
        let previous = "myfavoriteapp (2.1.0~alpha1) unstable; urgency=low

  * Initial Release for Linux.

 -- Stephen McConnel <stephen_mcconnel@example.com>  Fri, 12 Jul 2013 14:57:59 -0500

";
        fs::write(&debian, previous).unwrap();

        let options = DebianEntryOptions {
            changelog_file: markdown,
            debian_changelog: debian.clone(),
            ..options()
        };
        create_changelog_entry(&options, date()).unwrap();

        let contents = fs::read_to_string(&debian).unwrap();
        let expected = format!(
            "myfavoriteapp (2.3.11) unstable; urgency=low

  * with some random content
  * does some things

 -- Steve McConnel <stephen_mcconnel@example.com>  Mon, 07 Dec 2020 09:05:03 -0500

{previous}"
        );
        assert_eq!(contents, expected);
        assert_eq!(fs::read_to_string(tmp.path().join("changelog.old")).unwrap(), previous);
    }

    #[test]
    fn test_creates_missing_debian_changelog() {
        let tmp = TempDir::new().unwrap();
        let markdown = tmp.path().join("CHANGELOG.md");
        fs::write(&markdown, "## 1.0\n- first\n").unwrap();
        let options = DebianEntryOptions {
            changelog_file: markdown,
            debian_changelog: tmp.path().join("changelog"),
            ..options()
        };
        create_changelog_entry(&options, date()).unwrap();
        let contents = fs::read_to_string(tmp.path().join("changelog")).unwrap();
        assert!(contents.starts_with("myfavoriteapp (2.3.11) unstable; urgency=low\n\n  * first\n"));
    }
}
