//! Filesystem-safe name components.

/// True for characters that must not appear in a portable file name.
fn is_forbidden(c: char) -> bool {
    c.is_control() || c.is_whitespace() || matches!(c, '/' | '\\' | '<' | '>' | ':' | '"' | '|' | '?' | '*')
}

/// Sanitizes one path component.
///
/// - Replaces separators, control characters, whitespace and characters that
///   Windows filesystems reject with `_`
/// - Collapses consecutive underscores
/// - Trims leading/trailing dots and underscores (no hidden files, no `..`)
/// - Truncates to `max_bytes` on a char boundary
pub fn sanitize_component(name: &str, max_bytes: usize) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let c = if is_forbidden(c) { '_' } else { c };
        if c == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(c);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut take = trimmed.len().min(max_bytes);
    while take > 0 && !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].trim_end_matches(|c| c == '.' || c == '_').to_string()
}
