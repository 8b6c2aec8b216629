//! Zip export of a post.
//!
//! Entries follow [`PostBundle`]: `postinfo.json`, `content.md`, the
//! featured image, the inline images in list order, then `index.html` when a
//! scaffold page is available.

use postwriter_common::{ARCHIVE_SLUG_LEN, post_slug};
use postwriter_editor_core::{AssetRegistry, Draft};
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::bundle::PostBundle;
use crate::error::ArchiveError;

/// A finished archive ready to be written out.
#[derive(Debug, Clone)]
pub struct Archive {
    /// `<slug>.zip`, slug truncated to [`ARCHIVE_SLUG_LEN`].
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Archive file name for a post title.
pub fn archive_file_name(title: &str) -> String {
    format!("{}.zip", post_slug(title, Some(ARCHIVE_SLUG_LEN)))
}

struct ArchiveBuilder {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl ArchiveBuilder {
    fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated),
        }
    }

    fn add(&mut self, entry: &str, contents: &[u8]) -> Result<(), ArchiveError> {
        self.zip
            .start_file(entry, self.options)
            .map_err(|source| ArchiveError::Zip {
                entry: entry.to_owned(),
                source,
            })?;
        self.zip
            .write_all(contents)
            .map_err(|source| ArchiveError::Io {
                entry: entry.to_owned(),
                source,
            })
    }

    fn finish(self) -> Result<Vec<u8>, ArchiveError> {
        let cursor = self.zip.finish().map_err(|source| ArchiveError::Zip {
            entry: "central directory".to_owned(),
            source,
        })?;
        Ok(cursor.into_inner())
    }
}

/// Build the export archive. Performs no I/O; the scaffold page is passed in
/// already loaded, or `None` to leave it out.
pub fn export_archive(
    draft: &Draft,
    registry: &AssetRegistry,
    scaffold: Option<&str>,
) -> Result<Archive, ArchiveError> {
    let bundle = PostBundle::build(draft, registry, scaffold).map_err(ArchiveError::Manifest)?;

    let mut builder = ArchiveBuilder::new();
    for file in &bundle {
        builder.add(&file.path, file.bytes())?;
    }

    let archive = Archive {
        file_name: archive_file_name(&draft.title),
        bytes: builder.finish()?,
    };
    tracing::info!(
        file = %archive.file_name,
        size = archive.bytes.len(),
        entries = bundle.len(),
        "archive built"
    );
    Ok(archive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use postwriter_editor_core::BinaryAsset;
    use std::io::Read;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn entries(archive: &Archive) -> Vec<String> {
        let zip = zip::ZipArchive::new(Cursor::new(archive.bytes.clone())).unwrap();
        zip.file_names().map(str::to_owned).collect()
    }

    fn draft(title: &str) -> Draft {
        let mut draft = Draft::new("Oct 19, 2026");
        draft.title = title.to_owned();
        draft.markdown_body = "# Hello\n\n![a](a.png)".to_owned();
        draft
    }

    #[test]
    fn slug_truncation() {
        assert_eq!(archive_file_name("My First Post!"), "my-first-post.zip");
        let long = "An extremely long title that keeps going and going";
        let name = archive_file_name(long);
        assert_eq!(name.trim_end_matches(".zip").chars().count(), ARCHIVE_SLUG_LEN);
        assert_eq!(name, "an-extremely-long-title-that-kee.zip");
        assert_eq!(archive_file_name("!!!"), "untitled.zip");
    }

    #[test]
    fn entries_in_fixed_order() {
        let registry = AssetRegistry {
            featured: Some(BinaryAsset::from_file("Hero.png", PNG.to_vec())),
            inline: vec![
                BinaryAsset::from_file("b.png", PNG.to_vec()),
                BinaryAsset::from_file("a.png", PNG.to_vec()),
            ],
        };
        let archive =
            export_archive(&draft("My First Post!"), &registry, Some("<html></html>")).unwrap();
        assert_eq!(archive.file_name, "my-first-post.zip");
        assert_eq!(
            entries(&archive),
            vec![
                "postinfo.json",
                "content.md",
                "hero.png",
                "b.png",
                "a.png",
                "index.html"
            ]
        );
    }

    #[test]
    fn shared_featured_and_inline_name_exports_once() {
        let registry = AssetRegistry {
            featured: Some(BinaryAsset::from_file("hero.png", PNG.to_vec())),
            inline: vec![BinaryAsset::from_file("hero.png", PNG.to_vec())],
        };
        let archive = export_archive(&draft("Hero"), &registry, Some("<html></html>")).unwrap();
        assert_eq!(
            entries(&archive),
            vec!["postinfo.json", "content.md", "hero.png", "index.html"]
        );
    }

    #[test]
    fn scaffold_is_optional_and_content_is_verbatim() {
        let archive = export_archive(&draft("t"), &AssetRegistry::default(), None).unwrap();
        assert_eq!(entries(&archive), vec!["postinfo.json", "content.md"]);

        let mut zip = zip::ZipArchive::new(Cursor::new(archive.bytes)).unwrap();
        let mut body = String::new();
        zip.by_name("content.md")
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert_eq!(body, "# Hello\n\n![a](a.png)");

        let mut info = String::new();
        zip.by_name("postinfo.json")
            .unwrap()
            .read_to_string(&mut info)
            .unwrap();
        assert!(info.contains("\n    \"featuredImage\": \"\","));
    }
}
