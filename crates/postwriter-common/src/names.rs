//! Filename and slug normalization.
//!
//! Every asset name passes through [`sanitize_filename`] before it is used as a
//! storage key, an archive entry or a commit path.

use regex::Regex;
use std::sync::LazyLock;

/// Maximum slug length used for archive file names.
pub const ARCHIVE_SLUG_LEN: usize = 32;

/// Slug used when a title normalizes to nothing.
pub const EMPTY_SLUG: &str = "untitled";

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static FILENAME_REJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9\-.]").unwrap());
static SLUG_REJECT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9-]+").unwrap());

/// Normalize an arbitrary file name or URL segment into a safe, lowercase file name.
///
/// Trims, turns whitespace runs into single dashes, drops anything outside
/// `[A-Za-z0-9-.]` and lower-cases the rest. Total over all inputs; an empty
/// input yields an empty output, so callers supply their own fallback first.
pub fn sanitize_filename(name: &str) -> String {
    let dashed = WHITESPACE_RUN.replace_all(name.trim(), "-");
    FILENAME_REJECT.replace_all(&dashed, "").to_lowercase()
}

/// Derive a URL-safe slug from a post title.
///
/// `max_len` truncates by characters after normalization, and a dash left
/// dangling by the cut is dropped. Archive names use [`ARCHIVE_SLUG_LEN`];
/// publish paths pass `None`.
pub fn post_slug(title: &str, max_len: Option<usize>) -> String {
    let lowered = title.trim().to_lowercase();
    let collapsed = SLUG_REJECT_RUN.replace_all(&lowered, "-");
    let slug = collapsed.trim_matches('-');
    let slug = if slug.is_empty() { EMPTY_SLUG } else { slug };
    match max_len {
        Some(max) => {
            let truncated: String = slug.chars().take(max).collect();
            truncated.trim_end_matches('-').to_owned()
        }
        None => slug.to_owned(),
    }
}

/// Last path segment of a URL with query and fragment removed.
///
/// Returns `fallback` when the URL has no usable segment.
pub fn file_name_from_url<'a>(url: &'a str, fallback: &'a str) -> &'a str {
    let without_fragment = url.split('#').next().unwrap_or_default();
    let without_query = without_fragment.split('?').next().unwrap_or_default();
    match without_query.trim_end().rsplit('/').next() {
        Some(segment) if !segment.is_empty() => segment,
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_basic() {
        assert_eq!(sanitize_filename("  My Cat Photo.PNG "), "my-cat-photo.png");
        assert_eq!(sanitize_filename("a\t\tb  c.jpg"), "a-b-c.jpg");
        assert_eq!(sanitize_filename("weird(1)!@#.gif"), "weird1.gif");
        assert_eq!(sanitize_filename("café.jpg"), "caf.jpg");
        assert_eq!(sanitize_filename(""), "");
        assert_eq!(sanitize_filename("   "), "");
    }

    #[test]
    fn sanitize_is_idempotent_and_restricted() {
        let inputs = [
            "Hello World.txt",
            "  --Mixed__Case  Name--.JPEG",
            "ünïcödé and spaces\n.png",
            "../../etc/passwd",
            "a . b . c",
            "",
        ];
        for input in inputs {
            let once = sanitize_filename(input);
            assert_eq!(sanitize_filename(&once), once, "input {input:?}");
            assert!(
                once.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.'),
                "output {once:?} has disallowed characters"
            );
        }
    }

    #[test]
    fn slug_from_title() {
        assert_eq!(post_slug("My First Post!", None), "my-first-post");
        assert_eq!(post_slug("  Rust & WebAssembly: a love story ", None), "rust-webassembly-a-love-story");
        assert_eq!(post_slug("already-slugged", None), "already-slugged");
        assert_eq!(post_slug("!!!", None), EMPTY_SLUG);
        assert_eq!(post_slug("", Some(ARCHIVE_SLUG_LEN)), EMPTY_SLUG);
        // The 32nd character is a dash.
        assert_eq!(
            post_slug("abcdefghijklmnopqrstuvwxyz12345 tail", Some(ARCHIVE_SLUG_LEN)),
            "abcdefghijklmnopqrstuvwxyz12345"
        );
    }

    #[test]
    fn archive_slug_truncates_publish_slug_does_not() {
        let title = "A Very Long Title That Keeps Going Well Past The Limit";
        let full = post_slug(title, None);
        let short = post_slug(title, Some(ARCHIVE_SLUG_LEN));
        assert!(full.chars().count() > ARCHIVE_SLUG_LEN);
        assert_eq!(short.chars().count(), ARCHIVE_SLUG_LEN);
        assert!(full.starts_with(&short));
    }

    #[test]
    fn url_file_names() {
        assert_eq!(
            file_name_from_url("https://example.com/img/Cat%20Pic.png?w=200#x", "image.jpg"),
            "Cat%20Pic.png"
        );
        assert_eq!(file_name_from_url("https://example.com/", "image.jpg"), "image.jpg");
        assert_eq!(
            file_name_from_url("https://example.com/?q=1", "featuredimage.jpg"),
            "featuredimage.jpg"
        );
    }
}
