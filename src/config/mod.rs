pub mod defaults;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskError};

/// Options for one project's release tasks, usually loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TasksConfig {
    #[serde(default)]
    pub installer: Option<FragmentOptions>,
    #[serde(default)]
    pub release_notes: Option<ReleaseNotesOptions>,
    #[serde(default)]
    pub debian: Option<DebianEntryOptions>,
    #[serde(default)]
    pub stamp: Option<StampOptions>,
}

/// Inputs for generating a WiX fragment from a directory tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentOptions {
    pub root_directory: PathBuf,
    pub output_file_path: PathBuf,
    /// Where the `.wixproj` lives. `File/@Source` is made relative to this
    /// directory, or to the output file's directory when unset.
    pub installer_source_directory: Option<PathBuf>,
    /// Subfolders and files to leave out, absolute or relative to the root.
    pub exclude: Vec<PathBuf>,
    /// Allow normal non-administrators to write and delete the files.
    pub give_all_permissions: bool,
    pub match_pattern: String,
    /// Excludes a file when either its name or its full path matches.
    pub ignore_pattern: String,
    /// Only verify that every file already has a GUID; never writes output.
    pub check_only: bool,
    pub directory_reference_id: String,
    pub component_group_id: String,
}

impl Default for FragmentOptions {
    fn default() -> Self {
        Self {
            root_directory: PathBuf::new(),
            output_file_path: PathBuf::new(),
            installer_source_directory: None,
            exclude: Vec::new(),
            give_all_permissions: false,
            match_pattern: defaults::match_pattern(),
            ignore_pattern: defaults::ignore_pattern(),
            check_only: false,
            directory_reference_id: defaults::directory_reference_id(),
            component_group_id: defaults::component_group_id(),
        }
    }
}

/// Inputs for extracting the latest release section of a changelog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseNotesOptions {
    pub changelog_file: PathBuf,
    /// Matches version headings; group 1 captures the version.
    pub version_regex: String,
    /// Static text appended (followed by a newline) to the extracted notes.
    pub append_text: Option<String>,
    pub filter_entries: bool,
    pub package_id: String,
}

impl Default for ReleaseNotesOptions {
    fn default() -> Self {
        Self {
            changelog_file: PathBuf::new(),
            version_regex: defaults::version_regex(),
            append_text: None,
            filter_entries: false,
            package_id: String::new(),
        }
    }
}

/// Inputs for prepending a stanza to a Debian changelog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebianEntryOptions {
    pub changelog_file: PathBuf,
    pub debian_changelog: PathBuf,
    pub package_name: String,
    pub version: String,
    pub distribution: String,
    pub urgency: String,
    /// Name and e-mail, e.g. `Jane Doe <jane@example.com>`.
    pub maintainer: String,
}

impl Default for DebianEntryOptions {
    fn default() -> Self {
        Self {
            changelog_file: PathBuf::new(),
            debian_changelog: PathBuf::new(),
            package_name: String::new(),
            version: String::new(),
            distribution: defaults::distribution(),
            urgency: defaults::urgency(),
            maintainer: defaults::maintainer(),
        }
    }
}

/// Inputs for stamping a version heading into a changelog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StampOptions {
    pub changelog_file: PathBuf,
    pub version: String,
    /// chrono strftime format for the release date.
    pub date_format: String,
}

impl Default for StampOptions {
    fn default() -> Self {
        Self {
            changelog_file: PathBuf::new(),
            version: String::new(),
            date_format: defaults::date_format(),
        }
    }
}

impl TasksConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TaskError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| TaskError::ConfigInvalid {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_installer_section_with_defaults() {
        let config = TasksConfig::parse(
            r#"
[installer]
root_directory = "output/Release"
output_file_path = "installer/GeneratedFiles.wxs"
give_all_permissions = true
"#,
        )
        .unwrap();

        let installer = config.installer.unwrap();
        assert_eq!(installer.root_directory, PathBuf::from("output/Release"));
        assert!(installer.give_all_permissions);
        assert!(!installer.check_only);
        assert_eq!(installer.match_pattern, ".*");
        assert_eq!(installer.ignore_pattern, "IGNOREME");
        assert_eq!(installer.directory_reference_id, "TARGETDIR");
        assert!(config.release_notes.is_none());
    }

    #[test]
    fn test_parse_changelog_sections() {
        let config = TasksConfig::parse(
            r#"
[release_notes]
changelog_file = "CHANGELOG.md"
filter_entries = true
package_id = "SIL.Core"

[debian]
package_name = "myapp"
version = "1.2.3"

[stamp]
version = "1.2.3"
"#,
        )
        .unwrap();

        let notes = config.release_notes.unwrap();
        assert!(notes.filter_entries);
        assert_eq!(notes.package_id, "SIL.Core");
        assert_eq!(notes.version_regex, r"#+ \[([^\]]+)\]");

        let debian = config.debian.unwrap();
        assert_eq!(debian.distribution, "UNRELEASED");
        assert_eq!(debian.urgency, "low");
        assert_eq!(debian.maintainer, "Anonymous <anonymous@example.com>");

        assert_eq!(config.stamp.unwrap().date_format, "%Y-%m-%d");
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = TasksConfig::load(&tmp.path().join("tasks.toml")).unwrap_err();
        assert!(matches!(err, TaskError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TasksConfig::parse("[installer\nroot_directory = 3").unwrap_err();
        assert!(matches!(err, TaskError::ConfigInvalid { .. }));
    }
}
