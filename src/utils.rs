//! Utility functions for file naming

/// Longest file-name component produced by [`sanitize_file_name`], in characters
const MAX_COMPONENT_CHARS: usize = 120;

/// Fallback used when nothing printable survives sanitization
const FALLBACK_NAME: &str = "record";

/// Turn free text (a recipient name, a registry id) into a single safe
/// file-name component
///
/// Path separators, control characters and characters reserved on common
/// filesystems become `_`, runs of whitespace collapse to one `_`, and
/// leading/trailing dots and underscores are dropped so the result can never
/// be `.`, `..` or a hidden file.
///
/// # Examples
///
/// ```
/// use bulk_certs::utils::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("Asha  Rao"), "Asha_Rao");
/// assert_eq!(sanitize_file_name("../../etc/passwd"), "etc_passwd");
/// assert_eq!(sanitize_file_name("   "), "record");
/// ```
pub fn sanitize_file_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;

    for c in raw.chars() {
        let replace = c.is_whitespace()
            || c.is_control()
            || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|');

        if replace {
            pending_sep = true;
            continue;
        }

        if pending_sep && !out.is_empty() {
            out.push('_');
        }
        pending_sep = false;
        out.push(c);
    }

    let trimmed: String = out
        .trim_matches(|c| c == '.' || c == '_')
        .chars()
        .take(MAX_COMPONENT_CHARS)
        .collect();

    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed
    }
}
