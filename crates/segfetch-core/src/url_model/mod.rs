//! Local naming for transfer outputs.
//!
//! Job names come from user-supplied lists, so they are sanitized before they
//! become file names. The same sanitized stem keys both the final artifact
//! (`<stem>.<extension>`) and its segment files (`<stem>.part<index>`).

mod sanitize;

pub use sanitize::sanitize_component;

/// Stem used when a name sanitizes to nothing.
const DEFAULT_STEM: &str = "download";

/// Leaves room for `.part<index>` and the extension within NAME_MAX.
const MAX_STEM_BYTES: usize = 200;

/// Sanitized file stem for a job name.
///
/// # Examples
///
/// - `file_stem("My Report 2024")` → `"My_Report_2024"`
/// - `file_stem("../..")` → `"download"`
pub fn file_stem(name: &str) -> String {
    let stem = sanitize_component(name, MAX_STEM_BYTES);
    if stem.is_empty() {
        DEFAULT_STEM.to_string()
    } else {
        stem
    }
}

/// Sanitized extension without leading dots; may be empty.
///
/// `part<digits>` is the segment-file suffix, so such an extension gets a
/// leading underscore: the artifact must never share a name with a segment.
pub fn file_extension(extension: &str) -> String {
    let ext = sanitize_component(extension.trim().trim_start_matches('.'), 32);
    if is_segment_suffix(&ext) {
        format!("_{}", ext)
    } else {
        ext
    }
}

fn is_segment_suffix(ext: &str) -> bool {
    ext.strip_prefix("part")
        .map(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// Final artifact file name: `<stem>.<extension>`, or just the stem when the
/// extension is empty.
pub fn target_file_name(name: &str, extension: &str) -> String {
    let stem = file_stem(name);
    let ext = file_extension(extension);
    if ext.is_empty() {
        stem
    } else {
        format!("{}.{}", stem, ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stems_replace_spaces() {
        assert_eq!(file_stem("My Report 2024"), "My_Report_2024");
        assert_eq!(file_stem("  padded name  "), "padded_name");
    }

    #[test]
    fn stems_fall_back_when_empty() {
        assert_eq!(file_stem(""), "download");
        assert_eq!(file_stem("../.."), "download");
        assert_eq!(file_stem("///"), "download");
    }

    #[test]
    fn target_names() {
        assert_eq!(target_file_name("Lecture 1", "mp4"), "Lecture_1.mp4");
        assert_eq!(target_file_name("Lecture 1", ".mp4"), "Lecture_1.mp4");
        assert_eq!(target_file_name("raw", ""), "raw");
        assert_eq!(target_file_name("a/b", "t/x"), "a_b.t_x");
    }

    #[test]
    fn segment_suffix_extensions_are_renamed() {
        assert_eq!(target_file_name("clip", "part0"), "clip._part0");
        assert_eq!(target_file_name("clip", ".part12"), "clip._part12");
        assert_eq!(target_file_name("clip", "part"), "clip.part");
        assert_eq!(target_file_name("clip", "parts"), "clip.parts");
    }
}
