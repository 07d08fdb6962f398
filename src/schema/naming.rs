//! Parameter-name canonicalization.
//!
//! `--selected-plugin <name>` -> `selectedPlugin` -> `selected-plugin`.
//! The canonical form keys every schema and argument bag; the kebab form is
//! what the CLI understands.

/// Canonical parameter name for a `long` option string.
///
/// Strips leading dashes, truncates at the first space and folds every
/// `-x` (lowercase ASCII `x`) into `X`. Any other dash is kept as-is.
pub fn to_canonical(long: &str) -> String {
    let trimmed = long.trim_start_matches('-');
    let head = trimmed.split(' ').next().unwrap_or_default();

    let mut out = String::with_capacity(head.len());
    let mut chars = head.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '-'
            && let Some(&next) = chars.peek()
            && next.is_ascii_lowercase()
        {
            out.push(next.to_ascii_uppercase());
            chars.next();
            continue;
        }
        out.push(c);
    }
    out
}

/// Inverse of [`to_canonical`] (without the leading dashes): `jobQueue` -> `job-queue`.
pub fn to_kebab(name: &str) -> String {
    split_upper(name, '-')
}

/// `uiExtensions` -> `ui_extensions`, used for sub-command tool names.
pub fn to_snake(name: &str) -> String {
    split_upper(name, '_')
}

/// `apiExtension` -> `api extension`, for generated descriptions.
pub fn humanize(name: &str) -> String {
    split_upper(name, ' ')
}

/// The `--` long-flag form of a canonical name.
pub fn to_flag(name: &str) -> String {
    format!("--{}", to_kebab(name))
}

fn split_upper(name: &str, sep: char) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push(sep);
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
