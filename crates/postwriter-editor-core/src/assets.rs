//! Featured and inline images for the current draft.
//!
//! `AssetStore` holds the session copy of every image and hands out display
//! handles for the preview. The durable mirror is written separately through
//! the `persist_*`/`forget_*` functions so the store itself stays free of I/O.
//!
//! Inline image names are unique: adding an image under a name that is already
//! present replaces that entry's bytes in place.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use mime_sniffer::MimeTypeSniffer;
use postwriter_common::config::DEFAULT_MAX_ASSET_BYTES;
use postwriter_common::sanitize_filename;
use postwriter_common::store::{
    DurableStore, FEATURED_DATA_KEY, FEATURED_NAME_KEY, INLINE_KEY_PREFIX, inline_key,
};
use smol_str::SmolStr;
use std::collections::HashMap;

use crate::error::AssetError;
use crate::render::ImageResolver;

/// Name used for a local file that sanitizes to nothing.
pub const FALLBACK_IMAGE_NAME: &str = "image.jpg";
/// Name used for a featured image URL with no usable path segment.
pub const FALLBACK_FEATURED_NAME: &str = "featuredimage.jpg";

const OCTET_STREAM: &str = "application/octet-stream";

/// Where an asset's bytes came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOrigin {
    LocalFile,
    /// Fetched from this URL.
    RemoteUrl(String),
}

/// A named image payload.
///
/// The name is always the output of [`sanitize_filename`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryAsset {
    name: SmolStr,
    bytes: Bytes,
    mime_type: SmolStr,
    origin: AssetOrigin,
}

impl BinaryAsset {
    /// Build an asset, sanitizing `name` and falling back to `fallback_name`
    /// when the sanitized name is empty. Empty payloads are accepted.
    pub fn new(
        name: &str,
        fallback_name: &str,
        bytes: impl Into<Bytes>,
        mime_type: Option<&str>,
        origin: AssetOrigin,
    ) -> Self {
        let mut sanitized = sanitize_filename(name);
        if sanitized.is_empty() {
            sanitized = sanitize_filename(fallback_name);
        }
        let bytes = bytes.into();
        let mime_type = match mime_type.map(str::trim).filter(|m| !m.is_empty()) {
            Some(m) => SmolStr::new(m),
            None => SmolStr::new(bytes.as_ref().sniff_mime_type().unwrap_or(OCTET_STREAM)),
        };
        Self {
            name: SmolStr::new(sanitized),
            bytes,
            mime_type,
            origin,
        }
    }

    /// An asset picked from a local file. The MIME type is sniffed from the bytes.
    pub fn from_file(file_name: &str, bytes: impl Into<Bytes>) -> Self {
        Self::new(
            file_name,
            FALLBACK_IMAGE_NAME,
            bytes,
            None,
            AssetOrigin::LocalFile,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn origin(&self) -> &AssetOrigin {
        &self.origin
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// `data:{mime};base64,{payload}`
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, BASE64.encode(&self.bytes))
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    /// Rebuild an asset from a stored data URL.
    pub fn from_data_url(name: &str, data_url: &str, key: &str) -> Result<Self, AssetError> {
        let invalid = || AssetError::InvalidDataUrl {
            key: key.to_owned(),
        };
        let rest = data_url.strip_prefix("data:").ok_or_else(invalid)?;
        let (meta, payload) = rest.split_once(',').ok_or_else(invalid)?;
        let mime = meta.strip_suffix(";base64").ok_or_else(invalid)?;
        let bytes = BASE64.decode(payload.trim()).map_err(|_| invalid())?;
        Ok(Self::new(
            name,
            FALLBACK_IMAGE_NAME,
            bytes,
            Some(mime),
            AssetOrigin::LocalFile,
        ))
    }
}

/// Size ceiling for mirroring assets into durable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistencePolicy {
    pub max_asset_bytes: usize,
}

impl Default for PersistencePolicy {
    fn default() -> Self {
        Self {
            max_asset_bytes: DEFAULT_MAX_ASSET_BYTES,
        }
    }
}

impl PersistencePolicy {
    pub fn new(max_asset_bytes: usize) -> Self {
        Self { max_asset_bytes }
    }

    pub fn allows(&self, asset: &BinaryAsset) -> bool {
        asset.len() <= self.max_asset_bytes
    }
}

/// Outcome of mirroring one asset into durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    Stored,
    /// Larger than the policy ceiling; kept for this session only.
    SkippedTooLarge {
        name: SmolStr,
        size: usize,
        limit: usize,
    },
    /// The store refused the write (quota or I/O); kept for this session only.
    Failed { name: SmolStr, reason: String },
}

/// A session-scoped URL the preview can use as an image source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayHandle {
    id: u64,
    url: String,
}

impl DisplayHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Identifies which slot a display handle belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum HandleKey {
    Featured,
    Inline(SmolStr),
}

/// The live collection of images for a draft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetRegistry {
    pub featured: Option<BinaryAsset>,
    pub inline: Vec<BinaryAsset>,
}

impl AssetRegistry {
    pub fn inline_named(&self, name: &str) -> Option<&BinaryAsset> {
        self.inline.iter().find(|a| a.name() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.featured.is_none() && self.inline.is_empty()
    }
}

/// Image sources resolved for one preview render.
#[derive(Debug, Clone, Default)]
pub struct PreviewImages {
    inline: HashMap<SmolStr, String>,
    featured: Option<String>,
}

impl PreviewImages {
    /// Image source for the featured block, if a featured asset is set.
    pub fn featured_src(&self) -> Option<&str> {
        self.featured.as_deref()
    }
}

impl ImageResolver for PreviewImages {
    fn resolve_image_url(&self, url: &str) -> Option<String> {
        self.inline.get(url).cloned()
    }
}

/// Session registry plus the display handles minted for it.
#[derive(Debug, Default)]
pub struct AssetStore {
    registry: AssetRegistry,
    handles: HashMap<HandleKey, DisplayHandle>,
    next_handle: u64,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_registry(registry: AssetRegistry) -> Self {
        Self {
            registry,
            ..Self::default()
        }
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn featured(&self) -> Option<&BinaryAsset> {
        self.registry.featured.as_ref()
    }

    pub fn inline(&self) -> &[BinaryAsset] {
        &self.registry.inline
    }

    /// Replace the featured image, releasing the previous display handle.
    pub fn set_featured(&mut self, asset: BinaryAsset) -> Option<BinaryAsset> {
        self.release(&HandleKey::Featured);
        self.registry.featured.replace(asset)
    }

    /// Add an inline image and return the markdown fragment that references it.
    ///
    /// An existing image with the same name is replaced in place and its
    /// display handle released.
    pub fn add_inline(&mut self, asset: BinaryAsset, alt: &str) -> String {
        let link = crate::text_helpers::image_link(alt, asset.name());
        let key = HandleKey::Inline(asset.name.clone());
        self.release(&key);
        match self
            .registry
            .inline
            .iter_mut()
            .find(|a| a.name == asset.name)
        {
            Some(existing) => {
                tracing::debug!(name = %asset.name, "replacing inline image with same name");
                *existing = asset;
            }
            None => self.registry.inline.push(asset),
        }
        link
    }

    /// Remove an inline image. The caller strips body references.
    pub fn remove_inline(&mut self, name: &str) -> Option<BinaryAsset> {
        self.release(&HandleKey::Inline(SmolStr::new(name)));
        let idx = self.registry.inline.iter().position(|a| a.name() == name)?;
        Some(self.registry.inline.remove(idx))
    }

    pub fn clear_featured(&mut self) -> Option<BinaryAsset> {
        self.release(&HandleKey::Featured);
        self.registry.featured.take()
    }

    /// Drop every asset and every display handle.
    pub fn clear_all(&mut self) {
        self.handles.clear();
        self.registry = AssetRegistry::default();
    }

    /// Display URL for the featured image.
    ///
    /// Local files get a cached handle; URL-sourced images use their remote URL.
    pub fn featured_display_url(&mut self) -> Option<String> {
        let asset = self.registry.featured.as_ref()?;
        if let AssetOrigin::RemoteUrl(url) = asset.origin() {
            return Some(url.clone());
        }
        if let Some(handle) = self.handles.get(&HandleKey::Featured) {
            return Some(handle.url.clone());
        }
        let url = asset.to_data_url();
        Some(self.mint(HandleKey::Featured, url).url.clone())
    }

    /// Display handle for an inline image, minted on first use.
    pub fn display_url_for(&mut self, name: &str) -> Option<DisplayHandle> {
        let key = HandleKey::Inline(SmolStr::new(name));
        if let Some(handle) = self.handles.get(&key) {
            return Some(handle.clone());
        }
        let url = self.registry.inline_named(name)?.to_data_url();
        Some(self.mint(key, url).clone())
    }

    /// Resolve every image source needed for a preview render.
    pub fn preview_images(&mut self) -> PreviewImages {
        let names: Vec<SmolStr> = self.registry.inline.iter().map(|a| a.name.clone()).collect();
        let inline = names
            .into_iter()
            .filter_map(|name| {
                let handle = self.display_url_for(&name)?;
                Some((name, handle.url))
            })
            .collect();
        PreviewImages {
            inline,
            featured: self.featured_display_url(),
        }
    }

    /// Number of display handles currently alive.
    pub fn live_handles(&self) -> usize {
        self.handles.len()
    }

    fn mint(&mut self, key: HandleKey, url: String) -> &DisplayHandle {
        self.handles.entry(key).or_insert_with(|| {
            self.next_handle += 1;
            DisplayHandle {
                id: self.next_handle,
                url,
            }
        })
    }

    fn release(&mut self, key: &HandleKey) {
        if let Some(handle) = self.handles.remove(key) {
            tracing::trace!(id = handle.id, "released display handle");
        }
    }
}

fn write_guarded<S: DurableStore + ?Sized>(
    store: &mut S,
    asset: &BinaryAsset,
    policy: PersistencePolicy,
    writes: impl FnOnce(&mut S, String) -> Result<(), postwriter_common::StoreError>,
    forget: impl FnOnce(&mut S),
) -> Persistence {
    if !policy.allows(asset) {
        forget(&mut *store);
        tracing::warn!(
            name = %asset.name,
            size = asset.len(),
            limit = policy.max_asset_bytes,
            "image too large to keep across reloads"
        );
        return Persistence::SkippedTooLarge {
            name: asset.name.clone(),
            size: asset.len(),
            limit: policy.max_asset_bytes,
        };
    }
    match writes(&mut *store, asset.to_data_url()) {
        Ok(()) => Persistence::Stored,
        Err(e) => {
            forget(&mut *store);
            tracing::warn!(name = %asset.name, error = %e, "failed to mirror image");
            Persistence::Failed {
                name: asset.name.clone(),
                reason: e.to_string(),
            }
        }
    }
}

/// Mirror the featured image into durable storage.
///
/// When the image cannot be stored any stale copy is removed.
pub fn persist_featured<S: DurableStore + ?Sized>(
    store: &mut S,
    asset: &BinaryAsset,
    policy: PersistencePolicy,
) -> Persistence {
    write_guarded(
        store,
        asset,
        policy,
        |store, data_url| {
            store.set(FEATURED_DATA_KEY, &data_url)?;
            store.set(FEATURED_NAME_KEY, asset.name())
        },
        |store| forget_featured(store),
    )
}

/// Mirror one inline image under its per-name key.
pub fn persist_inline<S: DurableStore + ?Sized>(
    store: &mut S,
    asset: &BinaryAsset,
    policy: PersistencePolicy,
) -> Persistence {
    write_guarded(
        store,
        asset,
        policy,
        |store, data_url| store.set(&inline_key(asset.name()), &data_url),
        |store| forget_inline(store, asset.name()),
    )
}

pub fn forget_featured<S: DurableStore + ?Sized>(store: &mut S) {
    for key in [FEATURED_DATA_KEY, FEATURED_NAME_KEY] {
        if let Err(e) = store.remove(key) {
            tracing::warn!(key = %key, error = %e, "failed to remove stored image");
        }
    }
}

pub fn forget_inline<S: DurableStore + ?Sized>(store: &mut S, name: &str) {
    let key = inline_key(name);
    if let Err(e) = store.remove(&key) {
        tracing::warn!(key = %key, error = %e, "failed to remove stored image");
    }
}

/// Remove every mirrored image.
pub fn forget_all<S: DurableStore + ?Sized>(store: &mut S) {
    forget_featured(store);
    for key in store.keys_with_prefix(INLINE_KEY_PREFIX) {
        if let Err(e) = store.remove(&key) {
            tracing::warn!(key = %key, error = %e, "failed to remove stored image");
        }
    }
}

/// Rebuild the registry from durable storage.
///
/// Entries that fail to decode are skipped with a warning.
pub fn restore_registry<S: DurableStore + ?Sized>(store: &S) -> AssetRegistry {
    let mut registry = AssetRegistry::default();

    let featured_data = store.get(FEATURED_DATA_KEY).ok().flatten();
    let featured_name = store.get(FEATURED_NAME_KEY).ok().flatten();
    if let Some(data_url) = featured_data {
        let name = featured_name.unwrap_or_else(|| FALLBACK_FEATURED_NAME.to_owned());
        match BinaryAsset::from_data_url(&name, &data_url, FEATURED_DATA_KEY) {
            Ok(asset) => registry.featured = Some(asset),
            Err(e) => tracing::warn!(error = %e, "skipping stored featured image"),
        }
    }

    for key in store.keys_with_prefix(INLINE_KEY_PREFIX) {
        let Some(name) = key.strip_prefix(INLINE_KEY_PREFIX) else {
            continue;
        };
        let Ok(Some(data_url)) = store.get(&key) else {
            continue;
        };
        match BinaryAsset::from_data_url(name, &data_url, &key) {
            Ok(asset) => registry.inline.push(asset),
            Err(e) => tracing::warn!(error = %e, "skipping stored inline image"),
        }
    }

    tracing::debug!(
        featured = registry.featured.is_some(),
        inline = registry.inline.len(),
        "restored image mirror"
    );
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use postwriter_common::MemoryStore;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn png(name: &str) -> BinaryAsset {
        BinaryAsset::from_file(name, PNG.to_vec())
    }

    #[test]
    fn asset_names_are_sanitized() {
        let asset = png("My Cat.PNG");
        assert_eq!(asset.name(), "my-cat.png");
        assert_eq!(asset.mime_type(), "image/png");

        let fallback = BinaryAsset::from_file("???", PNG.to_vec());
        assert_eq!(fallback.name(), FALLBACK_IMAGE_NAME);
    }

    #[test]
    fn empty_bytes_are_accepted() {
        let empty = BinaryAsset::from_file("a.png", Vec::new());
        assert!(empty.is_empty());
        assert_eq!(empty.name(), "a.png");
        assert!(empty.to_data_url().ends_with(";base64,"));
    }

    #[test]
    fn data_url_round_trip() {
        let asset = png("cat.png");
        let restored =
            BinaryAsset::from_data_url("cat.png", &asset.to_data_url(), "k").unwrap();
        assert_eq!(restored, asset);
        assert!(BinaryAsset::from_data_url("x", "not a data url", "k").is_err());
        assert!(BinaryAsset::from_data_url("x", "data:image/png,raw", "k").is_err());
    }

    #[test]
    fn add_inline_returns_link_and_replaces_same_name() {
        let mut store = AssetStore::new();
        let link = store.add_inline(png("cat.png"), "cat");
        assert_eq!(link, "![cat](cat.png)");

        let first = store.display_url_for("cat.png").unwrap();
        let replacement = BinaryAsset::new(
            "cat.png",
            FALLBACK_IMAGE_NAME,
            b"GIF89a-other".to_vec(),
            None,
            AssetOrigin::LocalFile,
        );
        store.add_inline(replacement, "cat");

        assert_eq!(store.inline().len(), 1);
        assert_eq!(store.inline()[0].mime_type(), "image/gif");
        let second = store.display_url_for("cat.png").unwrap();
        assert_ne!(first.id(), second.id());
        assert_ne!(first.url(), second.url());
    }

    #[test]
    fn display_handles_are_cached_until_released() {
        let mut store = AssetStore::new();
        store.add_inline(png("a.png"), "a");
        let h1 = store.display_url_for("a.png").unwrap();
        let h2 = store.display_url_for("a.png").unwrap();
        assert_eq!(h1, h2);
        assert_eq!(store.live_handles(), 1);
        assert!(store.display_url_for("missing.png").is_none());

        store.remove_inline("a.png");
        assert_eq!(store.live_handles(), 0);
        assert!(store.inline().is_empty());
    }

    #[test]
    fn featured_display_url_depends_on_origin() {
        let mut store = AssetStore::new();
        store.set_featured(png("hero.png"));
        let local = store.featured_display_url().unwrap();
        assert!(local.starts_with("data:image/png;base64,"));

        let remote = BinaryAsset::new(
            "hero.png",
            FALLBACK_FEATURED_NAME,
            PNG.to_vec(),
            Some("image/png"),
            AssetOrigin::RemoteUrl("https://example.com/hero.png".into()),
        );
        store.set_featured(remote);
        assert_eq!(
            store.featured_display_url().as_deref(),
            Some("https://example.com/hero.png")
        );
        assert_eq!(store.live_handles(), 0);
    }

    #[test]
    fn persistence_respects_policy() {
        let mut durable = MemoryStore::new();
        let policy = PersistencePolicy::new(8);
        let asset = png("big.png");

        // A stale copy from an earlier session is removed.
        durable.set(&inline_key("big.png"), "data:old").unwrap();
        let outcome = persist_inline(&mut durable, &asset, policy);
        assert_eq!(
            outcome,
            Persistence::SkippedTooLarge {
                name: "big.png".into(),
                size: PNG.len(),
                limit: 8,
            }
        );
        assert!(durable.get(&inline_key("big.png")).unwrap().is_none());

        let outcome = persist_featured(&mut durable, &asset, PersistencePolicy::default());
        assert_eq!(outcome, Persistence::Stored);
        assert_eq!(
            durable.get(FEATURED_NAME_KEY).unwrap().as_deref(),
            Some("big.png")
        );
    }

    #[test]
    fn failed_write_is_reported_not_raised() {
        let mut durable = MemoryStore::with_quota(32);
        let outcome = persist_inline(&mut durable, &png("a.png"), PersistencePolicy::default());
        assert!(matches!(outcome, Persistence::Failed { .. }));
        assert!(durable.is_empty());
    }

    #[test]
    fn restore_rebuilds_registry_in_order() {
        let mut durable = MemoryStore::new();
        let policy = PersistencePolicy::default();
        persist_featured(&mut durable, &png("hero.png"), policy);
        persist_inline(&mut durable, &png("b.png"), policy);
        persist_inline(&mut durable, &png("a.png"), policy);
        durable.set(&inline_key("broken.png"), "garbage").unwrap();

        let registry = restore_registry(&durable);
        assert_eq!(registry.featured.as_ref().unwrap().name(), "hero.png");
        let names: Vec<_> = registry.inline.iter().map(BinaryAsset::name).collect();
        assert_eq!(names, vec!["b.png", "a.png"]);

        forget_all(&mut durable);
        assert!(durable.is_empty());
    }
}
