//! Markdown preview rendering.
//!
//! Rendering is a pure function of the body text and an [`ImageResolver`].
//! Local image names are swapped for display URLs before the text reaches the
//! markdown parser, so the parser never sees a bare asset name.

use pulldown_cmark::{Event, Options, Parser, html};
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

/// A parenthesized link target with no nested parentheses.
static LINK_TARGET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^()\s]+)\)").unwrap());

/// Resolves image URLs in markdown to display URLs.
///
/// The preview asks for every parenthesized target in the body. Returning
/// `None` leaves the target unchanged.
pub trait ImageResolver {
    /// Resolve an image URL from markdown to an actual URL.
    ///
    /// Returns `Some(resolved_url)` if the image is found,
    /// `None` to use the original URL unchanged.
    fn resolve_image_url(&self, url: &str) -> Option<String>;
}

/// Unit type implementation - no image resolution.
impl ImageResolver for () {
    fn resolve_image_url(&self, _url: &str) -> Option<String> {
        None
    }
}

impl<T: ImageResolver> ImageResolver for &T {
    fn resolve_image_url(&self, url: &str) -> Option<String> {
        (*self).resolve_image_url(url)
    }
}

impl<T: ImageResolver> ImageResolver for Option<T> {
    fn resolve_image_url(&self, url: &str) -> Option<String> {
        self.as_ref().and_then(|r| r.resolve_image_url(url))
    }
}

/// Replace every `(<name>)` segment the resolver knows with `(<url>)`.
///
/// Purely textual: a parenthesized name outside an image reference is
/// rewritten too.
pub fn rewrite_image_targets<'a, R: ImageResolver>(body: &'a str, resolver: &R) -> Cow<'a, str> {
    LINK_TARGET.replace_all(body, |caps: &Captures<'_>| match resolver.resolve_image_url(&caps[1]) {
        Some(url) => format!("({})", url),
        None => caps[0].to_owned(),
    })
}

fn gfm_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Render GitHub-flavored markdown to HTML, treating single newlines as breaks.
pub fn render_markdown(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, gfm_options()).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Full preview HTML: the featured block (when present) followed by the body.
pub fn render_preview<R: ImageResolver>(
    body: &str,
    resolver: &R,
    featured_src: Option<&str>,
) -> String {
    let rewritten = rewrite_image_targets(body, resolver);
    let html = render_markdown(&rewritten);
    match featured_src {
        Some(src) => format!(
            "<div class=\"preview-featured\"><img src=\"{}\" alt=\"Featured Image\"></div>\n{}",
            escape_attr(src),
            html
        ),
        None => html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetStore, BinaryAsset};
    use std::collections::HashMap;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn names(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    impl ImageResolver for HashMap<String, String> {
        fn resolve_image_url(&self, url: &str) -> Option<String> {
            self.get(url).cloned()
        }
    }

    #[test]
    fn preview_images_resolve_registry_names() {
        let mut assets = AssetStore::new();
        assets.add_inline(BinaryAsset::from_file("cat.png", PNG.to_vec()), "cat");
        assets.set_featured(BinaryAsset::from_file("hero.png", PNG.to_vec()));

        let images = assets.preview_images();
        let cat = images.resolve_image_url("cat.png").unwrap();
        assert!(cat.starts_with("data:image/png;base64,"));
        assert_eq!(images.resolve_image_url("dog.png"), None);
        assert_eq!(images.resolve_image_url("hero.png"), None);

        let html = render_preview("![cat](cat.png)", &images, images.featured_src());
        assert!(html.starts_with("<div class=\"preview-featured\"><img src=\"data:image/png;base64,"));
        assert!(html.contains(&format!("<img src=\"{cat}\" alt=\"cat\" />")));
        assert!(!html.contains("(cat.png)"));
    }

    #[test]
    fn resolver_wrappers_delegate() {
        let resolver = names(&[("cat.png", "data:x")]);
        assert_eq!(
            (&resolver).resolve_image_url("cat.png").as_deref(),
            Some("data:x")
        );
        assert!(Some(&resolver).resolve_image_url("cat.png").is_some());
        assert_eq!(None::<&HashMap<String, String>>.resolve_image_url("cat.png"), None);
        assert_eq!(().resolve_image_url("cat.png"), None);
    }

    #[test]
    fn rewrite_is_textual() {
        let resolver = names(&[("cat.png", "blob:1")]);
        let body = "![a](cat.png) and (cat.png) but not (dog.png) or [x](cat.png.bak)";
        assert_eq!(
            rewrite_image_targets(body, &resolver),
            "![a](blob:1) and (blob:1) but not (dog.png) or [x](cat.png.bak)"
        );
        assert!(matches!(
            rewrite_image_targets("nothing here", &resolver),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn inline_image_uses_display_url() {
        let resolver = names(&[("cat.png", "data:image/png;base64,AAAA")]);
        let html = render_preview("![alt](cat.png)", &resolver, None);
        assert_eq!(
            html,
            "<p><img src=\"data:image/png;base64,AAAA\" alt=\"alt\" /></p>\n"
        );
        assert!(!html.contains("src=\"cat.png\""));
    }

    #[test]
    fn newlines_become_breaks() {
        insta::assert_snapshot!(render_markdown("one\ntwo"), @r"
        <p>one<br />
        two</p>
        ");
    }

    #[test]
    fn gfm_extensions_enabled() {
        let html = render_markdown("~~gone~~\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n- [x] done");
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains("<table>"));
        assert!(html.contains("type=\"checkbox\""));
    }

    #[test]
    fn featured_block_comes_first_and_is_escaped() {
        let html = render_preview("body", &(), Some("https://x.com/a.png?a=1&b=\"2\""));
        assert_eq!(
            html,
            "<div class=\"preview-featured\"><img src=\"https://x.com/a.png?a=1&amp;b=&quot;2&quot;\" alt=\"Featured Image\"></div>\n<p>body</p>\n"
        );
    }

    #[test]
    fn rendering_is_idempotent() {
        let resolver = names(&[("a.png", "data:x")]);
        let body = "# T\n\n![a](a.png)\ntext";
        assert_eq!(
            render_preview(body, &resolver, Some("f")),
            render_preview(body, &resolver, Some("f"))
        );
    }
}
