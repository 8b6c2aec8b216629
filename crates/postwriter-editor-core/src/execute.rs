//! Action execution for the editor state.
//!
//! [`EditorState::apply`] is the single place actions change the draft and
//! the asset registry. It performs no I/O: everything that must reach durable
//! storage or the preview is returned as an [`Effect`] for the controller to
//! carry out.

use smol_str::SmolStr;

use crate::actions::{EditorAction, FormatKind, Range};
use crate::assets::AssetStore;
use crate::draft::{Draft, DraftField};
use crate::text_helpers::{make_link, prefix_line, replace_range, strip_image_refs, wrap_range};

/// Follow-up work produced by a state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write the draft text fields to the cache.
    SaveDraft,
    /// Mirror the current featured image.
    PersistFeatured,
    ForgetFeatured,
    /// Mirror the named inline image.
    PersistInline(SmolStr),
    ForgetInline(SmolStr),
    /// Remove every durable key: draft cache and all images.
    ClearDurable,
    /// Re-render after the debounce delay.
    ScheduleRender,
    /// Re-render immediately, superseding any pending render.
    RenderNow,
}

/// Effects of one applied action, in the order they must run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    pub effects: Vec<Effect>,
}

impl Transition {
    fn none() -> Self {
        Self::default()
    }

    fn of(effects: impl IntoIterator<Item = Effect>) -> Self {
        Self {
            effects: effects.into_iter().collect(),
        }
    }

    pub fn contains(&self, effect: &Effect) -> bool {
        self.effects.contains(effect)
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

/// Everything the editor session holds in memory.
#[derive(Debug, Default)]
pub struct EditorState {
    pub draft: Draft,
    pub assets: AssetStore,
    /// Caret or selection within the body, in characters.
    pub selection: Range,
}

impl EditorState {
    pub fn new(draft: Draft) -> Self {
        let end = draft.markdown_body.chars().count();
        Self {
            draft,
            assets: AssetStore::new(),
            selection: Range::caret(end),
        }
    }

    fn body_len(&self) -> usize {
        self.draft.markdown_body.chars().count()
    }

    fn clamp_selection(&mut self) {
        let len = self.body_len();
        let sel = self.selection.normalize();
        self.selection = Range::new(sel.start.min(len), sel.end.min(len));
    }

    /// Apply one action and return the effects it requires.
    pub fn apply(&mut self, action: EditorAction) -> Transition {
        match action {
            EditorAction::SetField { field, value } => self.set_field(field, value),
            EditorAction::SetSelection(range) => {
                self.selection = range;
                self.clamp_selection();
                Transition::none()
            }
            EditorAction::InsertInlineImage { asset, alt } => {
                let name = SmolStr::new(asset.name());
                let link = self.assets.add_inline(asset, &alt);
                let caret = replace_range(&mut self.draft.markdown_body, self.selection, &link);
                self.selection = Range::caret(caret);
                Transition::of([
                    Effect::PersistInline(name),
                    Effect::SaveDraft,
                    Effect::RenderNow,
                ])
            }
            EditorAction::RemoveInlineImage { name } => {
                if self.assets.remove_inline(&name).is_none() {
                    tracing::debug!(%name, "removing image that is not in the registry");
                }
                self.draft.markdown_body = strip_image_refs(&self.draft.markdown_body, &name);
                self.clamp_selection();
                Transition::of([
                    Effect::ForgetInline(name),
                    Effect::SaveDraft,
                    Effect::RenderNow,
                ])
            }
            EditorAction::SetFeatured { asset, source_url } => {
                self.assets.set_featured(asset);
                self.draft.featured_image_source_url = source_url.unwrap_or_default();
                Transition::of([Effect::PersistFeatured, Effect::SaveDraft, Effect::RenderNow])
            }
            EditorAction::ClearFeatured => {
                self.assets.clear_featured();
                self.draft.featured_image_source_url.clear();
                Transition::of([Effect::ForgetFeatured, Effect::SaveDraft, Effect::RenderNow])
            }
            EditorAction::ClearAll => {
                self.assets.clear_all();
                self.draft = Draft::default();
                self.selection = Range::caret(0);
                Transition::of([Effect::ClearDurable, Effect::RenderNow])
            }
            EditorAction::Format { kind, range } => self.format(kind, range),
        }
    }

    fn set_field(&mut self, field: DraftField, value: String) -> Transition {
        let slot = self.draft.field_mut(field);
        if *slot == value {
            return Transition::none();
        }
        *slot = value;
        if field == DraftField::MarkdownBody {
            self.clamp_selection();
        }
        if field.affects_preview() {
            Transition::of([Effect::SaveDraft, Effect::ScheduleRender])
        } else {
            Transition::of([Effect::SaveDraft])
        }
    }

    fn format(&mut self, kind: FormatKind, range: Range) -> Transition {
        let body = &mut self.draft.markdown_body;
        self.selection = match kind {
            FormatKind::Bold => wrap_range(body, range, "**"),
            FormatKind::Italic => wrap_range(body, range, "*"),
            FormatKind::Code => wrap_range(body, range, "`"),
            FormatKind::Link => make_link(body, range),
            FormatKind::Heading => {
                let range = range.normalize();
                let shift = prefix_line(body, range.start, "## ");
                Range::new(range.start + shift, range.end + shift)
            }
        };
        self.clamp_selection();
        Transition::of([Effect::SaveDraft, Effect::ScheduleRender])
    }
}
