pub fn version_regex() -> String {
    r"#+ \[([^\]]+)\]".to_string()
}

pub fn match_pattern() -> String {
    ".*".to_string()
}

pub fn ignore_pattern() -> String {
    "IGNOREME".to_string()
}

pub fn directory_reference_id() -> String {
    "TARGETDIR".to_string()
}

pub fn component_group_id() -> String {
    "ComponentGroup".to_string()
}

pub fn distribution() -> String {
    "UNRELEASED".to_string()
}

pub fn urgency() -> String {
    "low".to_string()
}

pub fn maintainer() -> String {
    "Anonymous <anonymous@example.com>".to_string()
}

pub fn date_format() -> String {
    "%Y-%m-%d".to_string()
}
