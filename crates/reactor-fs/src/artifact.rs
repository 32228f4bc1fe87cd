//! Extracted settings artifacts (`settings.<path>.js`)
//!
//! Function transforms are written inside a fixed template whose sentinel
//! lines delimit the editable body, so the body can be recovered exactly.

/// Opening sentinel line of a template section.
pub const SECTION_START: &str = "//==== START TRANSFORM CODE - DO NOT REMOVE ====";
/// Closing sentinel line of a template section.
pub const SECTION_END: &str = "//==== END TRANSFORM CODE ====";

const ARTIFACT_PREFIX: &str = "settings.";
const ARTIFACT_SUFFIX: &str = ".js";

/// File name of the artifact for a dotted property path.
///
/// Dots in the path stay literal: `a.b` becomes `settings.a.b.js`.
pub fn artifact_file_name(property_path: &str) -> String {
    format!("{ARTIFACT_PREFIX}{property_path}{ARTIFACT_SUFFIX}")
}

/// Property path encoded in an artifact file name, if it is one.
pub fn property_path_of(file_name: &str) -> Option<&str> {
    let path = file_name
        .strip_prefix(ARTIFACT_PREFIX)?
        .strip_suffix(ARTIFACT_SUFFIX)?;
    (!path.is_empty()).then_some(path)
}

/// Wrap `body` as `function(<parameters>) { <body> }` between sentinel lines.
pub fn wrap_function_body(parameters: &[String], body: &str) -> String {
    format!(
        "{SECTION_START}\nfunction({}) {{\n{SECTION_END}\n{body}\n{SECTION_START}\n}}\n{SECTION_END}",
        parameters.join(", ")
    )
}

/// Recover the editable body from a wrapped function artifact.
///
/// Returns `None` when `content` is not a wrapped function.
pub fn unwrap_function_body(content: &str) -> Option<&str> {
    let rest = content.strip_prefix(SECTION_START)?;
    let header_end = format!("\n{SECTION_END}\n");
    let body_start = rest.find(&header_end)? + header_end.len();
    let footer = format!("\n{SECTION_START}\n}}\n{SECTION_END}");
    let body_end = rest.rfind(&footer)?;
    if body_end < body_start {
        return None;
    }
    Some(&rest[body_start..body_end])
}
