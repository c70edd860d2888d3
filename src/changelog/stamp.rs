//! Release stamping: turn the placeholder or `[Unreleased]` heading of a
//! changelog into a dated version heading.

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;

use crate::changelog::{read_lines, write_lines, UNRELEASED_HEADING};
use crate::config::StampOptions;
use crate::error::{Result, TaskError};

/// Add a heading for `version` released on `date`.
///
/// A Keep a Changelog file keeps its `## [Unreleased]` heading and gets
/// `## [version] - date` right below it. Otherwise the first line is assumed
/// to be a placeholder such as `## DEV_VERSION_NUMBER: DEV_RELEASE_DATE` and
/// is replaced by `## version date`.
pub fn stamp_version_heading(lines: &mut Vec<String>, version: &str, date: &str) {
    if let Some(i) = lines.iter().position(|line| line == UNRELEASED_HEADING) {
        lines.splice(i + 1..i + 1, [String::new(), format!("## [{version}] - {date}")]);
        return;
    }

    let heading = format!("## {version} {date}");
    match lines.first_mut() {
        Some(first) => *first = heading,
        None => lines.push(heading),
    }
}

/// Stamp `options.changelog_file` in place with `options.version` and
/// `today` formatted with `options.date_format` (a chrono strftime string).
pub fn stamp_changelog_file(options: &StampOptions, today: NaiveDate) -> Result<()> {
    let date = format_date(today, &options.date_format)?;
    let mut lines = read_lines(&options.changelog_file)?;
    stamp_version_heading(&mut lines, &options.version, &date);
    write_lines(&options.changelog_file, &lines)?;
    tracing::info!(
        "Stamped {} with {} {}",
        options.changelog_file.display(),
        options.version,
        date
    );
    Ok(())
}

fn format_date(date: NaiveDate, format: &str) -> Result<String> {
    let items: Vec<Item<'_>> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(TaskError::ConfigInvalid {
            message: format!("invalid date format '{format}'"),
        });
    }
    Ok(date.format_with_items(items.into_iter()).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 12, 5).unwrap()
    }

    #[test]
    fn test_replaces_placeholder_heading() {
        let mut input = lines(
            "## DEV_VERSION_NUMBER: DEV_RELEASE_DATE\n*with some random content\n*does some things",
        );
        stamp_version_heading(&mut input, "2.3.10", "05/Dec/2020");
        assert_eq!(
            input,
            ["## 2.3.10 05/Dec/2020", "*with some random content", "*does some things"]
        );
    }

    #[test]
    fn test_inserts_below_unreleased() {
        let mut input = lines("# Change Log\n\n## [Unreleased]\n\n### Added\n- x");
        stamp_version_heading(&mut input, "1.4.0", "2020-12-05");
        assert_eq!(
            input,
            [
                "# Change Log",
                "",
                "## [Unreleased]",
                "",
                "## [1.4.0] - 2020-12-05",
                "",
                "### Added",
                "- x",
            ]
        );
    }

    #[test]
    fn test_empty_changelog_gets_heading() {
        let mut input = Vec::new();
        stamp_version_heading(&mut input, "1.0", "2020-12-05");
        assert_eq!(input, ["## 1.0 2020-12-05"]);
    }

    #[test]
    fn test_stamp_file_with_custom_format() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("CHANGELOG.md");
        fs::write(&path, "## DEV_VERSION_NUMBER: DEV_RELEASE_DATE\n* content\n").unwrap();
        let options = StampOptions {
            changelog_file: path.clone(),
            version: "2.3.10".into(),
            date_format: "%d/%b/%Y".into(),
        };
        stamp_changelog_file(&options, day()).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "## 2.3.10 05/Dec/2020\n* content\n"
        );
    }

    #[test]
    fn test_invalid_date_format() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("CHANGELOG.md");
        fs::write(&path, "## [Unreleased]\n").unwrap();
        let options = StampOptions {
            changelog_file: path.clone(),
            version: "1.0".into(),
            date_format: "%Q".into(),
        };
        let err = stamp_changelog_file(&options, day()).unwrap_err();
        assert!(matches!(err, TaskError::ConfigInvalid { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "## [Unreleased]\n");
    }

    #[test]
    fn test_missing_changelog() {
        let tmp = TempDir::new().unwrap();
        let options = StampOptions {
            changelog_file: tmp.path().join("CHANGELOG.md"),
            version: "1.0".into(),
            ..StampOptions::default()
        };
        assert!(matches!(
            stamp_changelog_file(&options, day()).unwrap_err(),
            TaskError::FileNotFound { .. }
        ));
    }
}
