//! The editor controller.
//!
//! `Editor` owns the in-memory [`EditorState`] and the durable store, and is
//! the only thing that runs [`Effect`]s. Front ends feed it actions and a
//! clock reading; it answers with warnings and whether the preview needs a
//! render.

use miette::Diagnostic;
use postwriter_common::config::DEBOUNCE_MAX_MS;
use postwriter_common::store::DurableStore;
use smol_str::SmolStr;
use web_time::{Duration, Instant};

use crate::actions::{EditorAction, Range};
use crate::assets::{
    self, AssetRegistry, AssetStore, Persistence, PersistencePolicy, forget_all, forget_featured,
    forget_inline, persist_featured, persist_inline,
};
use crate::debounce::Debouncer;
use crate::draft::{Draft, DraftCache};
use crate::error::EditorError;
use crate::execute::{Effect, EditorState};
use crate::manifest::PublishManifest;
use crate::render;

/// Non-fatal problems surfaced to the user after an action.
#[derive(thiserror::Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum EditorWarning {
    #[error("{name} is {size} bytes, over the {limit} byte limit; it is kept for this session only")]
    #[diagnostic(
        code(postwriter::editor::asset_too_large),
        severity(Warning),
        help("raise `max_asset_bytes` in the config to keep larger images across reloads")
    )]
    AssetTooLarge {
        name: SmolStr,
        size: usize,
        limit: usize,
    },

    #[error("could not keep {name} across reloads: {reason}")]
    #[diagnostic(code(postwriter::editor::asset_not_stored), severity(Warning))]
    AssetNotStored { name: SmolStr, reason: String },

    #[error("draft could not be saved: {reason}")]
    #[diagnostic(code(postwriter::editor::draft_not_saved), severity(Warning))]
    DraftNotSaved { reason: String },
}

impl EditorWarning {
    fn from_persistence(outcome: Persistence) -> Option<Self> {
        match outcome {
            Persistence::Stored => None,
            Persistence::SkippedTooLarge { name, size, limit } => {
                Some(EditorWarning::AssetTooLarge { name, size, limit })
            }
            Persistence::Failed { name, reason } => {
                Some(EditorWarning::AssetNotStored { name, reason })
            }
        }
    }
}

/// What the front end should do about the preview after a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderRequest {
    /// Nothing visible changed.
    None,
    /// Render immediately.
    Now,
    /// A render is pending until this deadline; call [`Editor::poll_render`].
    Scheduled(Instant),
}

/// Result of dispatching one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub warnings: Vec<EditorWarning>,
    pub render: RenderRequest,
}

pub struct Editor<S: DurableStore> {
    state: EditorState,
    store: S,
    policy: PersistencePolicy,
    debouncer: Debouncer,
    publishing: bool,
}

impl<S: DurableStore> Editor<S> {
    /// A fresh editor over `store`. Call [`Editor::restore`] to load a saved draft.
    pub fn new(store: S) -> Self {
        Self {
            state: EditorState::new(Draft::default()),
            store,
            policy: PersistencePolicy::default(),
            debouncer: Debouncer::new(Duration::from_millis(DEBOUNCE_MAX_MS)),
            publishing: false,
        }
    }

    pub fn with_policy(mut self, policy: PersistencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debouncer = Debouncer::new(delay);
        self
    }

    /// Build and restore in one step.
    pub fn open(store: S, policy: PersistencePolicy, debounce: Duration) -> Result<Self, EditorError> {
        let mut editor = Self::new(store).with_policy(policy).with_debounce(debounce);
        editor.restore()?;
        Ok(editor)
    }

    /// Load the cached draft, then the mirrored images.
    ///
    /// The draft goes first so the first render sees both. Returns whether a
    /// cached draft was found.
    pub fn restore(&mut self) -> Result<bool, EditorError> {
        let restored = DraftCache::restore(&self.store, &mut self.state.draft)?;
        let registry = assets::restore_registry(&self.store);
        self.state.assets = AssetStore::from_registry(registry);
        self.state.selection = Range::caret(self.state.draft.markdown_body.chars().count());
        tracing::debug!(
            restored,
            inline = self.state.assets.inline().len(),
            "editor state restored"
        );
        Ok(restored)
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn draft(&self) -> &Draft {
        &self.state.draft
    }

    pub fn assets(&self) -> &AssetStore {
        &self.state.assets
    }

    pub fn registry(&self) -> &AssetRegistry {
        self.state.assets.registry()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> PersistencePolicy {
        self.policy
    }

    /// Apply an action and run its effects.
    pub fn dispatch(&mut self, action: EditorAction, now: Instant) -> Dispatched {
        let transition = self.state.apply(action);
        let mut warnings = Vec::new();
        let mut render = RenderRequest::None;

        for effect in transition.effects {
            match effect {
                Effect::SaveDraft => {
                    if let Err(e) = DraftCache::save(&mut self.store, &self.state.draft) {
                        tracing::warn!(error = %e, "failed to save draft");
                        warnings.push(EditorWarning::DraftNotSaved {
                            reason: e.to_string(),
                        });
                    }
                }
                Effect::PersistFeatured => {
                    if let Some(asset) = self.state.assets.featured() {
                        let outcome = persist_featured(&mut self.store, asset, self.policy);
                        warnings.extend(EditorWarning::from_persistence(outcome));
                    }
                }
                Effect::ForgetFeatured => forget_featured(&mut self.store),
                Effect::PersistInline(name) => {
                    if let Some(asset) = self.state.assets.registry().inline_named(&name) {
                        let outcome = persist_inline(&mut self.store, asset, self.policy);
                        warnings.extend(EditorWarning::from_persistence(outcome));
                    }
                }
                Effect::ForgetInline(name) => forget_inline(&mut self.store, &name),
                Effect::ClearDurable => {
                    forget_all(&mut self.store);
                    if let Err(e) = DraftCache::clear(&mut self.store) {
                        tracing::warn!(error = %e, "failed to clear draft cache");
                    }
                }
                Effect::ScheduleRender => {
                    if render != RenderRequest::Now {
                        render = RenderRequest::Scheduled(self.debouncer.schedule(now));
                    }
                }
                Effect::RenderNow => {
                    self.debouncer.cancel();
                    render = RenderRequest::Now;
                }
            }
        }

        Dispatched { warnings, render }
    }

    /// Render the preview from current state.
    pub fn render_preview(&mut self) -> String {
        let images = self.state.assets.preview_images();
        render::render_preview(
            &self.state.draft.markdown_body,
            &images,
            images.featured_src(),
        )
    }

    /// Render if the debounce deadline has passed.
    pub fn poll_render(&mut self, now: Instant) -> Option<String> {
        if self.debouncer.fire_if_due(now) {
            Some(self.render_preview())
        } else {
            None
        }
    }

    pub fn render_deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    pub fn manifest(&self) -> PublishManifest {
        PublishManifest::build(&self.state.draft, self.state.assets.featured())
    }

    pub fn is_publishing(&self) -> bool {
        self.publishing
    }

    /// Mark a publish as started. Fails if one is already running.
    pub fn begin_publish(&mut self) -> Result<(), EditorError> {
        if self.publishing {
            return Err(EditorError::PublishInFlight);
        }
        self.publishing = true;
        Ok(())
    }

    /// Mark the running publish as finished.
    ///
    /// Only a successful publish clears the draft cache; a failed one leaves
    /// all local state as it was.
    pub fn finish_publish(&mut self, succeeded: bool) -> Result<(), EditorError> {
        if !self.publishing {
            return Err(EditorError::NoPublishInFlight);
        }
        self.publishing = false;
        if succeeded {
            DraftCache::clear(&mut self.store)?;
            tracing::info!("draft cache cleared after publish");
        }
        Ok(())
    }

    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::BinaryAsset;
    use crate::draft::DraftField;
    use postwriter_common::MemoryStore;
    use postwriter_common::store::{DRAFT_KEY, FEATURED_DATA_KEY, inline_key};

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn png(name: &str) -> BinaryAsset {
        BinaryAsset::from_file(name, PNG.to_vec())
    }

    fn editor() -> Editor<MemoryStore> {
        Editor::new(MemoryStore::new()).with_debounce(Duration::from_millis(100))
    }

    fn set(field: DraftField, value: &str) -> EditorAction {
        EditorAction::SetField {
            field,
            value: value.into(),
        }
    }

    #[test]
    fn body_edits_render_after_debounce() {
        let mut ed = editor();
        let t0 = Instant::now();
        let d = ed.dispatch(set(DraftField::MarkdownBody, "# A"), t0);
        assert_eq!(d.render, RenderRequest::Scheduled(t0 + Duration::from_millis(100)));
        ed.dispatch(set(DraftField::MarkdownBody, "# AB"), t0 + Duration::from_millis(50));

        assert!(ed.poll_render(t0 + Duration::from_millis(120)).is_none());
        let html = ed.poll_render(t0 + Duration::from_millis(150)).unwrap();
        assert_eq!(html, "<h1>AB</h1>\n");
        assert!(ed.poll_render(t0 + Duration::from_millis(400)).is_none());
    }

    #[test]
    fn inline_image_renders_with_handle() {
        let mut ed = editor();
        let d = ed.dispatch(
            EditorAction::InsertInlineImage {
                asset: png("cat.png"),
                alt: "alt".into(),
            },
            Instant::now(),
        );
        assert_eq!(d.render, RenderRequest::Now);
        assert!(d.warnings.is_empty());
        assert_eq!(ed.draft().markdown_body, "![alt](cat.png)");

        let html = ed.render_preview();
        assert!(html.contains("<img src=\"data:image/png;base64,"));
        assert!(!html.contains("src=\"cat.png\""));
        assert_eq!(html, ed.render_preview());
    }

    #[test]
    fn oversized_featured_stays_in_session_only() {
        let mut ed = editor().with_policy(PersistencePolicy::new(4));
        let d = ed.dispatch(
            EditorAction::SetFeatured {
                asset: png("hero.png"),
                source_url: None,
            },
            Instant::now(),
        );
        assert!(matches!(
            d.warnings.as_slice(),
            [EditorWarning::AssetTooLarge { limit: 4, .. }]
        ));
        assert!(ed.assets().featured().is_some());
        assert!(ed.store().get(FEATURED_DATA_KEY).unwrap().is_none());
        assert!(ed.render_preview().starts_with("<div class=\"preview-featured\">"));
    }

    #[test]
    fn restore_reloads_draft_and_images() {
        let mut ed = editor();
        let now = Instant::now();
        ed.dispatch(set(DraftField::Title, "Saved"), now);
        ed.dispatch(
            EditorAction::InsertInlineImage {
                asset: png("a.png"),
                alt: "a".into(),
            },
            now,
        );
        let store = ed.into_store();

        let reopened = Editor::open(
            store,
            PersistencePolicy::default(),
            Duration::from_millis(100),
        )
        .unwrap();
        assert_eq!(reopened.draft().title, "Saved");
        assert_eq!(reopened.draft().markdown_body, "![a](a.png)");
        assert_eq!(reopened.assets().inline().len(), 1);
        assert_eq!(reopened.state().selection, Range::caret(11));
    }

    #[test]
    fn remove_image_forgets_durable_key() {
        let mut ed = editor();
        let now = Instant::now();
        ed.dispatch(
            EditorAction::InsertInlineImage {
                asset: png("x.png"),
                alt: "x".into(),
            },
            now,
        );
        assert!(ed.store().get(&inline_key("x.png")).unwrap().is_some());
        ed.dispatch(EditorAction::RemoveInlineImage { name: "x.png".into() }, now);
        assert!(ed.store().get(&inline_key("x.png")).unwrap().is_none());
        assert!(!ed.draft().markdown_body.contains("](x.png)"));
    }

    #[test]
    fn clear_all_wipes_store() {
        let mut ed = editor();
        let now = Instant::now();
        ed.dispatch(set(DraftField::Title, "t"), now);
        ed.dispatch(
            EditorAction::SetFeatured {
                asset: png("f.png"),
                source_url: None,
            },
            now,
        );
        ed.dispatch(EditorAction::ClearAll, now);
        assert!(ed.store().is_empty());
    }

    #[test]
    fn publish_guard_and_cache_clearing() {
        let mut ed = editor();
        ed.dispatch(set(DraftField::Title, "t"), Instant::now());

        assert!(matches!(
            ed.finish_publish(true),
            Err(EditorError::NoPublishInFlight)
        ));
        ed.begin_publish().unwrap();
        assert!(matches!(ed.begin_publish(), Err(EditorError::PublishInFlight)));

        ed.finish_publish(false).unwrap();
        assert!(ed.store().get(DRAFT_KEY).unwrap().is_some());

        ed.begin_publish().unwrap();
        ed.finish_publish(true).unwrap();
        assert!(ed.store().get(DRAFT_KEY).unwrap().is_none());
        assert_eq!(ed.draft().title, "t");
    }

    #[test]
    fn manifest_reflects_featured() {
        let mut ed = editor();
        ed.dispatch(
            EditorAction::SetFeatured {
                asset: png("Hero Shot.png"),
                source_url: None,
            },
            Instant::now(),
        );
        assert_eq!(ed.manifest().featured_image, "./hero-shot.png");
    }
}
