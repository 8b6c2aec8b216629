//! The `postinfo.json` metadata document.

use serde::{Deserialize, Serialize};

use crate::assets::BinaryAsset;
use crate::draft::Draft;

/// Metadata snapshot bundled with every export and publish.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublishManifest {
    pub title: String,
    pub youtube_link: String,
    /// `./<name>` of the featured image, or empty.
    pub featured_image: String,
    pub date: String,
    pub content: String,
    pub profile: String,
}

impl PublishManifest {
    pub const FILE_NAME: &'static str = "postinfo.json";
    pub const CONTENT_FILE: &'static str = "content.md";

    pub fn build(draft: &Draft, featured: Option<&BinaryAsset>) -> Self {
        Self {
            title: draft.title.clone(),
            youtube_link: draft.youtube_link.clone(),
            featured_image: featured
                .map(|asset| format!("./{}", asset.name()))
                .unwrap_or_default(),
            date: draft.date.clone(),
            content: Self::CONTENT_FILE.to_owned(),
            profile: draft.profile.clone(),
        }
    }

    /// Serialize with four-space indentation.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}
