use std::path::{Component, Path, MAIN_SEPARATOR_STR};

/// Path of `to` relative to the directory `from`.
///
/// Segments are compared case-insensitively. Each segment of `from` past
/// the longest common prefix becomes a `..`, followed by the rest of `to`.
/// When the two paths share nothing, or are rooted differently, `to` is
/// returned unchanged.
pub fn relative_path_to(from: &Path, to: &Path) -> String {
    if from.has_root() && to.has_root() && !same_segment(&root_of(from), &root_of(to)) {
        return to.to_string_lossy().into_owned();
    }

    let from_segments: Vec<String> = segments(from);
    let to_segments: Vec<String> = segments(to);

    let common = from_segments
        .iter()
        .zip(&to_segments)
        .take_while(|(a, b)| same_segment(a, b))
        .count();
    if common == 0 {
        return to.to_string_lossy().into_owned();
    }

    let mut relative: Vec<&str> = Vec::new();
    for segment in &from_segments[common..] {
        if !segment.is_empty() {
            relative.push("..");
        }
    }
    relative.extend(to_segments[common..].iter().map(String::as_str));
    relative.join(MAIN_SEPARATOR_STR)
}

fn segments(path: &Path) -> Vec<String> {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect()
}

fn root_of(path: &Path) -> String {
    path.components()
        .take_while(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect()
}

fn same_segment(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
