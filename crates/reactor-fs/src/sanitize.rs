//! Human-readable alias names for resource directories

use regex::Regex;
use std::sync::LazyLock;

static ILLEGAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[/?<>\\:*|"]"#).unwrap());
static CONTROL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\x00-\x1f\x80-\x9f]").unwrap());
static RESERVED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\.+$").unwrap());
static WINDOWS_RESERVED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(con|prn|aux|nul|com[0-9]|lpt[0-9])(\..*)?$").unwrap()
});
static WINDOWS_TRAILING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[. ]+$").unwrap());

const REPLACEMENT: &str = "_";
const MAX_NAME_BYTES: usize = 255;

/// Make `name` safe to use as a single path component on every platform.
///
/// Illegal, control and reserved sequences are replaced with `_` and the
/// result is capped at 255 bytes.
pub fn sanitize_component(name: &str) -> String {
    let cleaned = ILLEGAL.replace_all(name, REPLACEMENT);
    let cleaned = CONTROL.replace_all(&cleaned, REPLACEMENT);
    let cleaned = RESERVED.replace_all(&cleaned, REPLACEMENT);
    let cleaned = WINDOWS_RESERVED.replace_all(&cleaned, REPLACEMENT);
    let cleaned = WINDOWS_TRAILING.replace_all(&cleaned, REPLACEMENT);
    truncate_bytes(&cleaned, MAX_NAME_BYTES).to_string()
}

/// Alias directory name for a resource called `name`.
///
/// The leading underscore keeps aliases apart from id-named directories.
/// Resources without a name get no alias.
pub fn alias_name(name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    Some(format!("_{}", sanitize_component(name)))
}

fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
