//! The file set of one post, shared by the zip export and the publish tree.
//!
//! Paths are unique. The fixed files (`postinfo.json`, `content.md`,
//! `index.html`) always keep their names; after them the featured image wins
//! over an inline image of the same name, and an earlier inline image over a
//! later one. Losing images are left out with a warning.

use postwriter_editor_core::{AssetRegistry, BinaryAsset, Draft, PublishManifest};

use crate::scaffold::SCAFFOLD_ENTRY;

const RESERVED: [&str; 3] = [
    PublishManifest::FILE_NAME,
    PublishManifest::CONTENT_FILE,
    SCAFFOLD_ENTRY,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContents {
    Text(String),
    Image(BinaryAsset),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostFile {
    /// Path relative to the post directory.
    pub path: String,
    pub contents: FileContents,
}

impl PostFile {
    pub fn bytes(&self) -> &[u8] {
        match &self.contents {
            FileContents::Text(text) => text.as_bytes(),
            FileContents::Image(asset) => asset.bytes(),
        }
    }
}

/// Ordered, path-unique files of a post: `postinfo.json`, `content.md`, the
/// featured image, inline images in list order, then `index.html` when a
/// scaffold page is given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostBundle {
    files: Vec<PostFile>,
}

impl PostBundle {
    pub fn build(
        draft: &Draft,
        registry: &AssetRegistry,
        scaffold: Option<&str>,
    ) -> Result<Self, serde_json::Error> {
        let manifest = PublishManifest::build(draft, registry.featured.as_ref()).to_pretty_json()?;

        let mut bundle = Self::default();
        bundle.push(PublishManifest::FILE_NAME, FileContents::Text(manifest));
        bundle.push(
            PublishManifest::CONTENT_FILE,
            FileContents::Text(draft.markdown_body.clone()),
        );
        for asset in registry.featured.iter().chain(&registry.inline) {
            bundle.add_image(asset);
        }
        if let Some(page) = scaffold {
            bundle.push(SCAFFOLD_ENTRY, FileContents::Text(page.to_owned()));
        }
        Ok(bundle)
    }

    fn push(&mut self, path: &str, contents: FileContents) {
        self.files.push(PostFile {
            path: path.to_owned(),
            contents,
        });
    }

    fn add_image(&mut self, asset: &BinaryAsset) {
        let name = asset.name();
        if RESERVED.contains(&name) || self.contains(name) {
            tracing::warn!(name, "image name already used in the post, leaving it out");
            return;
        }
        self.push(name, FileContents::Image(asset.clone()));
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.iter().any(|f| f.path == path)
    }

    pub fn files(&self) -> &[PostFile] {
        &self.files
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.path.as_str())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<'a> IntoIterator for &'a PostBundle {
    type Item = &'a PostFile;
    type IntoIter = std::slice::Iter<'a, PostFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}
