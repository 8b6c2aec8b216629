//! Editor actions.
//!
//! Each user interaction with the post form maps to one `EditorAction`. The
//! actions are applied by [`crate::execute::EditorState::apply`], which never
//! touches storage directly.

use smol_str::SmolStr;
use std::fmt;
use std::str::FromStr;

use crate::assets::BinaryAsset;
use crate::draft::DraftField;

/// A range in the body, measured in character offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn caret(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn is_caret(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Normalize range so start <= end.
    pub fn normalize(self) -> Self {
        if self.start <= self.end {
            self
        } else {
            Self {
                start: self.end,
                end: self.start,
            }
        }
    }
}

impl From<std::ops::Range<usize>> for Range {
    fn from(r: std::ops::Range<usize>) -> Self {
        Self::new(r.start, r.end)
    }
}

/// Toolbar formatting tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    Bold,
    Italic,
    Code,
    Link,
    Heading,
}

impl FormatKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FormatKind::Bold => "bold",
            FormatKind::Italic => "italic",
            FormatKind::Code => "code",
            FormatKind::Link => "link",
            FormatKind::Heading => "heading",
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bold" => Ok(FormatKind::Bold),
            "italic" => Ok(FormatKind::Italic),
            "code" => Ok(FormatKind::Code),
            "link" => Ok(FormatKind::Link),
            "heading" | "h2" => Ok(FormatKind::Heading),
            other => Err(format!("unknown format: {other}")),
        }
    }
}

/// All editing operations on a post.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    /// Replace one text field wholesale.
    SetField { field: DraftField, value: String },

    /// Move the caret or selection inside the body.
    SetSelection(Range),

    /// Insert an inline image link at the current selection.
    InsertInlineImage {
        asset: BinaryAsset,
        /// Alt text for the inserted link.
        alt: String,
    },

    /// Remove an inline image and every body reference to it.
    RemoveInlineImage { name: SmolStr },

    /// Replace the featured image. `source_url` is recorded on the draft for
    /// URL-sourced images.
    SetFeatured {
        asset: BinaryAsset,
        source_url: Option<String>,
    },

    ClearFeatured,

    /// Drop every asset, reset the draft and wipe durable storage.
    ClearAll,

    /// Apply a formatting tool to a body range.
    Format { kind: FormatKind, range: Range },
}

impl EditorAction {
    /// Whether this action can change the body text.
    pub fn touches_body(&self) -> bool {
        match self {
            EditorAction::SetField { field, .. } => field.affects_preview(),
            EditorAction::SetSelection(_) => false,
            _ => true,
        }
    }
}
