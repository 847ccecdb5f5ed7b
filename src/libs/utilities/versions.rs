// Lenient version parsing.
// Runtimes print versions like "Python 3.11.4" and release indexes carry
// PEP 440 style strings like "0.5" or "1.2.0rc1". `semver` is strict, so these
// helpers coerce such strings into `semver::Version` before comparing.

use semver::{Prerelease, Version};

/// Extracts the version number from a line such as "Python 3.11.4" or "v1.2".
/// Returns the text from the first digit up to the next whitespace.
pub fn extract_version_number(input: &str) -> Option<&str> {
    let start = input.find(|c: char| c.is_ascii_digit())?;
    let rest = &input[start..];
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Parses a version leniently: a leading `v` is dropped, missing minor/patch
/// components default to zero, and any trailing text after the numeric part
/// ("rc1", "-beta.2", "+local") becomes the pre-release tag.
///
/// Returns `None` when no leading numeric component exists.
pub fn parse_lenient(input: &str) -> Option<Version> {
    let trimmed = input.trim().trim_start_matches(['v', 'V']);
    if let Ok(v) = Version::parse(trimmed) {
        return Some(v);
    }

    let numeric_len = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (numeric, suffix) = trimmed.split_at(numeric_len);

    let mut parts = numeric
        .split('.')
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<u64>());
    let major = parts.next()?.ok()?;
    let minor = parts.next().transpose().ok()?.unwrap_or(0);
    let patch = parts.next().transpose().ok()?.unwrap_or(0);

    let mut version = Version::new(major, minor, patch);
    let suffix = suffix
        .split('+')
        .next()
        .unwrap_or("")
        .trim_start_matches(['-', '.', '_']);
    if !suffix.is_empty() {
        let tag: String = suffix
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' { c } else { '.' })
            .collect();
        version.pre = Prerelease::new(&tag).ok()?;
    }
    Some(version)
}

/// `true` when `found` is at least `required`. Both are parsed leniently;
/// an unparseable `found` never satisfies the requirement.
pub fn satisfies_minimum(found: &str, required: &str) -> bool {
    match (parse_lenient(found), parse_lenient(required)) {
        (Some(found), Some(required)) => found >= required,
        _ => false,
    }
}
