//! Component registry: the single source of truth mapping string ids to
//! renderable definitions.
//!
//! Entries are either eager (the renderable already exists) or deferred (a
//! loader produces it on demand). Registration never runs a loader;
//! resolution happens only when something asks for it - a factory slot, an
//! explicit preload, or [`RegistryEntry::resolve`]. Deferred resolution is
//! memoized per entry, and concurrent resolutions share the in-flight load.
//!
//! The registry is generic over the renderable type `R`: it only needs to
//! know "can be asked to resolve", not what the frontend does with the
//! result.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use futures_util::future::BoxFuture;
use tokio::sync::OnceCell;

/// Zero-argument capability producing the renderable, eventually.
pub type LoaderFn<R> = Arc<dyn Fn() -> BoxFuture<'static, Result<R>> + Send + Sync>;

/// Producer for a replacement renderable shown when an entry fails.
pub type FallbackFn<R> = Arc<dyn Fn() -> R + Send + Sync>;

/// Wraps a plain async closure into a [`LoaderFn`].
pub fn loader<R, F, Fut>(f: F) -> LoaderFn<R>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

/// How an entry's renderable comes into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Materialized at registration time.
    Eager,
    /// Materialized on first demand through the loader.
    Deferred,
}

/// Styling wrapper hint carried in metadata and applied by the display layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Plain,
    /// Titled card/frame around the content.
    Card,
}

/// Placeholder shape shown while a deferred entry resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Skeleton {
    /// Text-shaped rows.
    #[default]
    Paragraph,
    /// Short rows with a leading marker.
    List,
    /// Monospace block with a gutter.
    Code,
    /// Boxed outline.
    Card,
}

/// Descriptive data attached to an entry.
///
/// `error_fallback` and `loading_placeholder` are per-entry overrides for
/// the factory's failure and pending presentations; both are optional.
pub struct ComponentMetadata<R> {
    pub label: String,
    pub icon: String,
    pub category: Option<String>,
    pub description: String,
    pub surface: Option<Surface>,
    pub error_fallback: Option<FallbackFn<R>>,
    pub loading_placeholder: Option<Skeleton>,
}

impl<R> ComponentMetadata<R> {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            icon: String::new(),
            category: None,
            description: String::new(),
            surface: None,
            error_fallback: None,
            loading_placeholder: None,
        }
    }

    #[must_use]
    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn surface(mut self, surface: Surface) -> Self {
        self.surface = Some(surface);
        self
    }

    #[must_use]
    pub fn error_fallback(mut self, fallback: FallbackFn<R>) -> Self {
        self.error_fallback = Some(fallback);
        self
    }

    #[must_use]
    pub fn loading_placeholder(mut self, skeleton: Skeleton) -> Self {
        self.loading_placeholder = Some(skeleton);
        self
    }
}

impl<R> Clone for ComponentMetadata<R> {
    fn clone(&self) -> Self {
        Self {
            label: self.label.clone(),
            icon: self.icon.clone(),
            category: self.category.clone(),
            description: self.description.clone(),
            surface: self.surface,
            error_fallback: self.error_fallback.clone(),
            loading_placeholder: self.loading_placeholder,
        }
    }
}

impl<R> fmt::Debug for ComponentMetadata<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentMetadata")
            .field("label", &self.label)
            .field("icon", &self.icon)
            .field("category", &self.category)
            .field("surface", &self.surface)
            .field("has_error_fallback", &self.error_fallback.is_some())
            .field("loading_placeholder", &self.loading_placeholder)
            .finish()
    }
}

enum ComponentSource<R> {
    Eager(Arc<R>),
    Deferred {
        loader: LoaderFn<R>,
        cell: OnceCell<Arc<R>>,
    },
}

/// One registered renderable definition.
pub struct RegistryEntry<R> {
    id: String,
    metadata: ComponentMetadata<R>,
    source: ComponentSource<R>,
}

impl<R> RegistryEntry<R> {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn metadata(&self) -> &ComponentMetadata<R> {
        &self.metadata
    }

    pub fn kind(&self) -> EntryKind {
        match self.source {
            ComponentSource::Eager(_) => EntryKind::Eager,
            ComponentSource::Deferred { .. } => EntryKind::Deferred,
        }
    }

    pub fn is_deferred(&self) -> bool {
        self.kind() == EntryKind::Deferred
    }

    /// Peeks the cached renderable without triggering resolution.
    pub fn resolved(&self) -> Option<Arc<R>> {
        match &self.source {
            ComponentSource::Eager(content) => Some(Arc::clone(content)),
            ComponentSource::Deferred { cell, .. } => cell.get().cloned(),
        }
    }
}

impl<R: Send + Sync + 'static> RegistryEntry<R> {
    /// Resolves the renderable.
    ///
    /// Eager entries resolve immediately. Deferred entries run the loader on
    /// first demand; repeated and concurrent calls share one resolution, and
    /// a failed attempt leaves the cache empty so a later call retries.
    pub async fn resolve(&self) -> Result<Arc<R>> {
        match &self.source {
            ComponentSource::Eager(content) => Ok(Arc::clone(content)),
            ComponentSource::Deferred { loader, cell } => {
                let loader = Arc::clone(loader);
                cell.get_or_try_init(|| async move { loader().await.map(Arc::new) })
                    .await
                    .cloned()
            }
        }
    }
}

impl<R> fmt::Debug for RegistryEntry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("resolved", &self.resolved().is_some())
            .finish()
    }
}

struct RegistryInner<R> {
    entries: HashMap<String, Arc<RegistryEntry<R>>>,
    categories: BTreeMap<String, BTreeSet<String>>,
}

impl<R> Default for RegistryInner<R> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            categories: BTreeMap::new(),
        }
    }
}

/// Lookup table from ids to renderable definitions, with a category index.
///
/// Shared as `Arc<ComponentRegistry<R>>`; all methods take `&self`.
pub struct ComponentRegistry<R> {
    inner: RwLock<RegistryInner<R>>,
}

impl<R> Default for ComponentRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> ComponentRegistry<R> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryInner<R>> {
        self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner<R>> {
        self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Stores an eager entry. A duplicate id overwrites the previous entry
    /// (last write wins) with a warning.
    pub fn register_eager(&self, id: impl Into<String>, component: R, metadata: ComponentMetadata<R>) {
        self.insert(RegistryEntry {
            id: id.into(),
            metadata,
            source: ComponentSource::Eager(Arc::new(component)),
        });
    }

    /// Stores a deferred entry wrapping `loader`. The loader is NOT invoked
    /// here; resolution happens only on demand.
    pub fn register_deferred(
        &self,
        id: impl Into<String>,
        loader: LoaderFn<R>,
        metadata: ComponentMetadata<R>,
    ) {
        self.insert(RegistryEntry {
            id: id.into(),
            metadata,
            source: ComponentSource::Deferred {
                loader,
                cell: OnceCell::new(),
            },
        });
    }

    fn insert(&self, entry: RegistryEntry<R>) {
        let mut inner = self.write();
        let id = entry.id.clone();

        if let Some(previous) = inner.entries.remove(&id) {
            tracing::warn!(id = %id, "overwriting already-registered component");
            Self::remove_from_category(&mut inner, &previous);
        }

        if let Some(category) = entry.metadata.category.clone() {
            inner.categories.entry(category).or_default().insert(id.clone());
        }
        inner.entries.insert(id, Arc::new(entry));
    }

    fn remove_from_category(inner: &mut RegistryInner<R>, entry: &RegistryEntry<R>) {
        if let Some(category) = &entry.metadata.category
            && let Some(ids) = inner.categories.get_mut(category)
        {
            ids.remove(&entry.id);
            if ids.is_empty() {
                inner.categories.remove(category);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<RegistryEntry<R>>> {
        self.read().entries.get(id).cloned()
    }

    pub fn has(&self, id: &str) -> bool {
        self.read().entries.contains_key(id)
    }

    pub fn get_metadata(&self, id: &str) -> Option<ComponentMetadata<R>> {
        self.read().entries.get(id).map(|e| e.metadata.clone())
    }

    /// Entries of a category, in id order (stable absent mutation).
    pub fn get_by_category(&self, category: &str) -> Vec<Arc<RegistryEntry<R>>> {
        let inner = self.read();
        let Some(ids) = inner.categories.get(category) else {
            return Vec::new();
        };
        ids.iter()
            .filter_map(|id| inner.entries.get(id).cloned())
            .collect()
    }

    /// Removes an entry and cleans it from its category set.
    /// Returns false if the id was unknown.
    pub fn unregister(&self, id: &str) -> bool {
        let mut inner = self.write();
        let Some(entry) = inner.entries.remove(id) else {
            return false;
        };
        Self::remove_from_category(&mut inner, &entry);
        true
    }

    /// Removes every entry currently indexed under `category`.
    /// Returns how many were removed.
    pub fn unregister_category(&self, category: &str) -> usize {
        let mut inner = self.write();
        let Some(ids) = inner.categories.remove(category) else {
            return 0;
        };
        for id in &ids {
            inner.entries.remove(id);
        }
        ids.len()
    }

    pub fn list_categories(&self) -> Vec<String> {
        self.read().categories.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }
}

impl<R> fmt::Debug for ComponentRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.read();
        f.debug_struct("ComponentRegistry")
            .field("entries", &inner.entries.len())
            .field("categories", &inner.categories.len())
            .finish()
    }
}
