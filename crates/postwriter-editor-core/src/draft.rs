//! The editable text state of a post and its durable cache.
//!
//! Binary assets are not part of the draft record; they are mirrored
//! separately by [`crate::assets`].

use postwriter_common::StoreError;
use postwriter_common::store::{DRAFT_KEY, DurableStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EditorError;

/// Today's date in the display format used for new drafts, e.g. `Oct 19, 2026`.
pub fn today() -> String {
    chrono::Local::now().format("%b %-d, %Y").to_string()
}

/// The user-editable text fields of one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub youtube_link: String,
    pub date: String,
    pub profile: String,
    pub markdown_body: String,
    /// Remote URL the featured image was fetched from, if any.
    pub featured_image_source_url: String,
}

impl Draft {
    /// An empty draft dated `date`.
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            title: String::new(),
            youtube_link: String::new(),
            date: date.into(),
            profile: String::new(),
            markdown_body: String::new(),
            featured_image_source_url: String::new(),
        }
    }

    pub fn field(&self, field: DraftField) -> &str {
        match field {
            DraftField::Title => &self.title,
            DraftField::YoutubeLink => &self.youtube_link,
            DraftField::Date => &self.date,
            DraftField::Profile => &self.profile,
            DraftField::MarkdownBody => &self.markdown_body,
            DraftField::FeaturedImageUrl => &self.featured_image_source_url,
        }
    }

    pub fn field_mut(&mut self, field: DraftField) -> &mut String {
        match field {
            DraftField::Title => &mut self.title,
            DraftField::YoutubeLink => &mut self.youtube_link,
            DraftField::Date => &mut self.date,
            DraftField::Profile => &mut self.profile,
            DraftField::MarkdownBody => &mut self.markdown_body,
            DraftField::FeaturedImageUrl => &mut self.featured_image_source_url,
        }
    }

    /// Overlay a cached record onto this draft.
    ///
    /// Every field is taken from the record except an empty date, which keeps
    /// the live value.
    fn overlay(&mut self, record: DraftRecord) {
        self.title = record.title;
        self.youtube_link = record.youtube_link;
        self.featured_image_source_url = record.featured_image_url;
        if !record.date.is_empty() {
            self.date = record.date;
        }
        self.profile = record.profile;
        self.markdown_body = record.markdown_content;
    }
}

impl Default for Draft {
    fn default() -> Self {
        Self::new(today())
    }
}

/// Names a single text field of a [`Draft`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DraftField {
    Title,
    YoutubeLink,
    Date,
    Profile,
    MarkdownBody,
    FeaturedImageUrl,
}

impl DraftField {
    pub const ALL: [DraftField; 6] = [
        DraftField::Title,
        DraftField::YoutubeLink,
        DraftField::Date,
        DraftField::Profile,
        DraftField::MarkdownBody,
        DraftField::FeaturedImageUrl,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DraftField::Title => "title",
            DraftField::YoutubeLink => "youtube",
            DraftField::Date => "date",
            DraftField::Profile => "profile",
            DraftField::MarkdownBody => "body",
            DraftField::FeaturedImageUrl => "featured-url",
        }
    }

    /// Whether edits to this field change the preview.
    pub fn affects_preview(self) -> bool {
        matches!(self, DraftField::MarkdownBody)
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DraftField {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(DraftField::Title),
            "youtube" | "youtube-link" | "youtubeLink" => Ok(DraftField::YoutubeLink),
            "date" => Ok(DraftField::Date),
            "profile" => Ok(DraftField::Profile),
            "body" | "content" | "markdown" => Ok(DraftField::MarkdownBody),
            "featured-url" | "featuredImageURL" => Ok(DraftField::FeaturedImageUrl),
            other => Err(EditorError::UnknownField(other.to_owned())),
        }
    }
}

/// On-disk shape of the draft record.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
struct DraftRecord {
    title: String,
    youtube_link: String,
    #[serde(rename = "featuredImageURL")]
    featured_image_url: String,
    date: String,
    profile: String,
    markdown_content: String,
}

impl From<&Draft> for DraftRecord {
    fn from(draft: &Draft) -> Self {
        Self {
            title: draft.title.clone(),
            youtube_link: draft.youtube_link.clone(),
            featured_image_url: draft.featured_image_source_url.clone(),
            date: draft.date.clone(),
            profile: draft.profile.clone(),
            markdown_content: draft.markdown_body.clone(),
        }
    }
}

/// Persists the draft text fields under a single durable key.
pub struct DraftCache;

impl DraftCache {
    pub fn save<S: DurableStore + ?Sized>(store: &mut S, draft: &Draft) -> Result<(), StoreError> {
        let record = serde_json::to_string(&DraftRecord::from(draft))?;
        store.set(DRAFT_KEY, &record)
    }

    /// Overlay the cached record, if any, onto `draft`.
    ///
    /// Returns whether a record was applied. An unreadable record is logged and
    /// ignored, leaving `draft` untouched.
    pub fn restore<S: DurableStore + ?Sized>(
        store: &S,
        draft: &mut Draft,
    ) -> Result<bool, StoreError> {
        let Some(raw) = store.get(DRAFT_KEY)? else {
            return Ok(false);
        };
        match serde_json::from_str::<DraftRecord>(&raw) {
            Ok(record) => {
                draft.overlay(record);
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable draft cache");
                Ok(false)
            }
        }
    }

    pub fn clear<S: DurableStore + ?Sized>(store: &mut S) -> Result<(), StoreError> {
        store.remove(DRAFT_KEY)
    }
}
