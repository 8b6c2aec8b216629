//! Text editing helpers for the markdown body.
//!
//! Offsets are character offsets, matching how the editor tracks its caret.

use regex::Regex;
use std::sync::LazyLock;

use crate::actions::Range;

static EXTENSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\.[a-z0-9]+$").unwrap());
static SEPARATOR_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-_]+").unwrap());

/// Markdown image reference to `name`.
pub fn image_link(alt: &str, name: &str) -> String {
    format!("![{}]({})", alt, name)
}

/// Derive alt text from an original file name or URL.
///
/// `"https://x.com/my_cat-photo.png?w=1"` becomes `"my cat photo"`.
pub fn alt_from(name_or_url: &str) -> String {
    let base = name_or_url.rsplit('/').next().unwrap_or_default();
    let base = base.split('#').next().unwrap_or_default();
    let base = base.split('?').next().unwrap_or_default();
    let base = if base.is_empty() { "image" } else { base };
    let stem = EXTENSION.replace(base, "");
    SEPARATOR_RUN.replace_all(&stem, " ").into_owned()
}

/// Byte index of the `char_idx`th character, clamped to the end.
pub fn char_to_byte(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

fn clamp_range(text: &str, range: Range) -> Range {
    let len = text.chars().count();
    let range = range.normalize();
    Range::new(range.start.min(len), range.end.min(len))
}

/// Replace `range` with `insert`. Returns the caret offset after the insertion.
pub fn replace_range(text: &mut String, range: Range, insert: &str) -> usize {
    let range = clamp_range(text, range);
    let start = char_to_byte(text, range.start);
    let end = char_to_byte(text, range.end);
    text.replace_range(start..end, insert);
    range.start + insert.chars().count()
}

/// Remove every markdown image reference whose target is exactly `name`.
///
/// Repeats until nothing matches, since removing one reference can join its
/// neighbours into a new one.
pub fn strip_image_refs(text: &str, name: &str) -> String {
    let pattern = format!(r"!\[[^\]]*\]\({}\)", regex::escape(name));
    // An escaped literal always compiles; keep the text if it somehow doesn't.
    let Ok(re) = Regex::new(&pattern) else {
        return text.to_owned();
    };
    let mut text = text.to_owned();
    loop {
        let stripped = re.replace_all(&text, "").into_owned();
        if stripped == text {
            return text;
        }
        text = stripped;
    }
}

/// Surround `range` with `marker` on both sides. Returns the new selection.
pub fn wrap_range(text: &mut String, range: Range, marker: &str) -> Range {
    let range = clamp_range(text, range);
    let marker_len = marker.chars().count();
    // Insert end marker first so the start offset stays valid.
    let end_byte = char_to_byte(text, range.end);
    text.insert_str(end_byte, marker);
    let start_byte = char_to_byte(text, range.start);
    text.insert_str(start_byte, marker);
    Range::new(range.start + marker_len, range.end + marker_len)
}

/// Turn `range` into `[text](url)`. Returns the selection covering `url`.
pub fn make_link(text: &mut String, range: Range) -> Range {
    let range = clamp_range(text, range);
    let end_byte = char_to_byte(text, range.end);
    text.insert_str(end_byte, "](url)");
    let start_byte = char_to_byte(text, range.start);
    text.insert_str(start_byte, "[");
    // `[` + selected text + `](`
    let url_start = range.end + 3;
    Range::new(url_start, url_start + 3)
}

/// Character offset of the start of the line containing `offset`.
pub fn find_line_start(text: &str, offset: usize) -> usize {
    let mut line_start = 0;
    for (i, c) in text.chars().enumerate() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line_start = i + 1;
        }
    }
    line_start
}

/// Prefix the line containing `offset` with `prefix` unless it already has it.
///
/// Returns the caret shift applied.
pub fn prefix_line(text: &mut String, offset: usize, prefix: &str) -> usize {
    let line_start = find_line_start(text, offset);
    let byte = char_to_byte(text, line_start);
    if text[byte..].starts_with(prefix) {
        return 0;
    }
    text.insert_str(byte, prefix);
    prefix.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alt_text_derivation() {
        assert_eq!(alt_from("my_cat-photo.png"), "my cat photo");
        assert_eq!(alt_from("https://x.com/a/b/Sunset__Beach.JPG?w=1#top"), "Sunset Beach");
        assert_eq!(alt_from("https://x.com/"), "image");
        assert_eq!(alt_from("noext"), "noext");
    }

    #[test]
    fn replace_at_caret_and_selection() {
        let mut text = String::from("héllo world");
        let caret = replace_range(&mut text, Range::caret(5), "!");
        assert_eq!(text, "héllo! world");
        assert_eq!(caret, 6);

        let caret = replace_range(&mut text, Range::new(12, 7), "there");
        assert_eq!(text, "héllo! there");
        assert_eq!(caret, 12);

        let caret = replace_range(&mut text, Range::caret(999), "?");
        assert_eq!(text, "héllo! there?");
        assert_eq!(caret, 13);
    }

    #[test]
    fn strip_refs_only_matches_exact_target() {
        let body = "a ![x](cat.png) b ![y](cat.png) c ![z](catXpng) d [link](cat.png)";
        assert_eq!(
            strip_image_refs(body, "cat.png"),
            "a  b  c ![z](catXpng) d [link](cat.png)"
        );
        assert_eq!(strip_image_refs("none here", "cat.png"), "none here");
        assert_eq!(strip_image_refs("![a](![b](x.png)x.png)", "x.png"), "");
        assert!(!strip_image_refs("![a](![b](![c](x.png)x.png)x.png) end", "x.png").contains("](x.png)"));
    }

    #[test]
    fn wrap_and_link() {
        let mut text = String::from("make this bold");
        let sel = wrap_range(&mut text, Range::new(5, 9), "**");
        assert_eq!(text, "make **this** bold");
        assert_eq!(sel, Range::new(7, 11));

        let mut text = String::from("see docs");
        let sel = make_link(&mut text, Range::new(4, 8));
        assert_eq!(text, "see [docs](url)");
        let url: String = text.chars().skip(sel.start).take(sel.len()).collect();
        assert_eq!(url, "url");
    }

    #[test]
    fn heading_prefix() {
        let mut text = String::from("one\ntwo\nthree");
        assert_eq!(prefix_line(&mut text, 5, "## "), 3);
        assert_eq!(text, "one\n## two\nthree");
        assert_eq!(prefix_line(&mut text, 6, "## "), 0);
        assert_eq!(find_line_start(&text, 0), 0);
    }
}
