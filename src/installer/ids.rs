//! Installer identifiers for directories and files.
//!
//! Ids must come out identical on every run for the same tree, otherwise the
//! GUIDs recorded against them in the sidecar files stop matching.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Longest file id handed to the installer toolchain.
pub const MAX_FILE_ID_LENGTH: usize = 50;

static UNSAFE_ID_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9._]").expect("static id pattern is valid")
});

/// Replace every character outside `[A-Za-z0-9._]` with `_`.
pub fn sanitize(id: &str) -> String {
    UNSAFE_ID_CHARS.replace_all(id, "_").into_owned()
}

/// Id of a directory nested under `parent_id`.
///
/// `name` is `None` for the root, which keeps the id it was given. An empty
/// name yields the parent's own id (used for the permission component).
pub fn safe_directory_id(parent_id: &str, name: Option<&str>) -> String {
    let mut id = parent_id.to_string();
    if let Some(name) = name {
        id.push('.');
        id.push_str(name);
        id = id.trim_end_matches('.').to_string();
    }
    sanitize(&id)
}

/// Id of a file before collision handling: `directory_id.file_name`, cut to
/// its trailing [`MAX_FILE_ID_LENGTH`] characters.
pub fn file_id(directory_id: &str, file_name: &str) -> String {
    let mut id = format!("{directory_id}.{file_name}");

    let len = id.chars().count();
    if len > MAX_FILE_ID_LENGTH {
        id = id.chars().skip(len - MAX_FILE_ID_LENGTH).collect();
    }
    if !id.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        id.insert(0, '_');
    }
    sanitize(&id)
}

/// Tracks ids handed out during one tree walk and appends a numeric suffix
/// when an id (compared case-insensitively) shows up again.
#[derive(Debug, Default)]
pub struct IdRegistry {
    suffixes: HashMap<String, u32>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disambiguate(&mut self, id: String) -> String {
        let key = id.to_lowercase();
        match self.suffixes.get_mut(&key) {
            Some(counter) => {
                *counter += 1;
                format!("{id}{counter}")
            }
            None => {
                self.suffixes.insert(key, 0);
                id
            }
        }
    }
}
