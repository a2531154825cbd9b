//! Component factory: turns a registry id into a display slot, applying
//! cross-cutting concerns uniformly.
//!
//! A slot is an explicit async state machine the display layer matches on:
//! `Missing | Loading | Ready | Failed`. Deferred resolution runs on a
//! spawned task and the slot transitions are observed through a
//! `tokio::sync::watch` channel, so a pending load never blocks unrelated
//! UI. Failure is a state, not an exception: an unknown id, a loader error,
//! or a render error all degrade to a labeled view with a reset action.
//!
//! `create` never returns an error. Creating a slot for an unresolved
//! deferred entry must happen inside a tokio runtime (the resolution task is
//! spawned); settled slots (unknown ids, eager or preloaded entries) have no
//! such requirement.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::json;

use crate::bus::EventBus;
use crate::registry::{
    ComponentRegistry, FallbackFn, RegistryEntry, Skeleton, Surface,
};

/// Published when `create` is asked for an id the registry does not know.
pub const EVENT_COMPONENT_MISSING: &str = "component:missing";
/// Published when a deferred entry finishes resolving for a slot.
pub const EVENT_COMPONENT_READY: &str = "component:ready";
/// Published when a loader fails (slot resolution or preload).
pub const EVENT_COMPONENT_LOAD_FAILED: &str = "component:load_failed";

/// What went wrong while materializing a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotError {
    pub id: String,
    pub message: String,
}

impl fmt::Display for SlotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to load '{}': {}", self.id, self.message)
    }
}

impl std::error::Error for SlotError {}

/// Display state of a slot.
pub enum SlotState<R> {
    /// The requested id is not in the registry. Recoverable and
    /// user-visible, never an error.
    Missing,
    /// Resolution is pending; show the skeleton.
    Loading { skeleton: Skeleton },
    /// Content is available.
    Ready {
        content: Arc<R>,
        surface: Option<Surface>,
    },
    /// Resolution failed. `fallback` is the replacement renderable when
    /// error isolation supplied one; otherwise the display layer shows its
    /// generic titled failure view.
    Failed {
        error: SlotError,
        fallback: Option<Arc<R>>,
    },
}

impl<R> SlotState<R> {
    pub fn is_loading(&self) -> bool {
        matches!(self, SlotState::Loading { .. })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SlotState::Ready { .. })
    }
}

impl<R> Clone for SlotState<R> {
    fn clone(&self) -> Self {
        match self {
            SlotState::Missing => SlotState::Missing,
            SlotState::Loading { skeleton } => SlotState::Loading { skeleton: *skeleton },
            SlotState::Ready { content, surface } => SlotState::Ready {
                content: Arc::clone(content),
                surface: *surface,
            },
            SlotState::Failed { error, fallback } => SlotState::Failed {
                error: error.clone(),
                fallback: fallback.clone(),
            },
        }
    }
}

impl<R> fmt::Debug for SlotState<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotState::Missing => write!(f, "Missing"),
            SlotState::Loading { skeleton } => write!(f, "Loading({skeleton:?})"),
            SlotState::Ready { surface, .. } => write!(f, "Ready(surface: {surface:?})"),
            SlotState::Failed { error, fallback } => {
                write!(f, "Failed({error}, fallback: {})", fallback.is_some())
            }
        }
    }
}

/// Call-time options for [`ComponentFactory::create`].
pub struct CreateOptions<R> {
    /// Catch resolution/render failures and degrade to a fallback view
    /// with a reset action. On by default.
    pub with_error_isolation: bool,
    /// Force the suspensive placeholder path even for eager entries.
    pub with_placeholder: bool,
    /// Force a titled card frame regardless of metadata.
    pub wrap_in_frame: bool,
    /// Overrides the entry's `error_fallback`.
    pub error_fallback: Option<FallbackFn<R>>,
    /// Overrides the entry's `loading_placeholder`.
    pub loading_placeholder: Option<Skeleton>,
}

impl<R> Default for CreateOptions<R> {
    fn default() -> Self {
        Self {
            with_error_isolation: true,
            with_placeholder: false,
            wrap_in_frame: false,
            error_fallback: None,
            loading_placeholder: None,
        }
    }
}

impl<R> Clone for CreateOptions<R> {
    fn clone(&self) -> Self {
        Self {
            with_error_isolation: self.with_error_isolation,
            with_placeholder: self.with_placeholder,
            wrap_in_frame: self.wrap_in_frame,
            error_fallback: self.error_fallback.clone(),
            loading_placeholder: self.loading_placeholder,
        }
    }
}

struct SlotDriver<R> {
    entry: Arc<RegistryEntry<R>>,
    bus: Arc<EventBus>,
    skeleton: Skeleton,
    surface: Option<Surface>,
    fallback: Option<FallbackFn<R>>,
}

/// Handle to one materialized slot.
///
/// Cheap to move; the display layer reads [`ComponentSlot::state`] each
/// frame or awaits transitions via [`ComponentSlot::subscribe`].
pub struct ComponentSlot<R> {
    id: String,
    tx: tokio::sync::watch::Sender<SlotState<R>>,
    driver: Option<Arc<SlotDriver<R>>>,
}

impl<R> ComponentSlot<R> {
    fn settled(id: &str, state: SlotState<R>) -> Self {
        let (tx, _rx) = tokio::sync::watch::channel(state);
        Self {
            id: id.to_string(),
            tx,
            driver: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current state snapshot.
    pub fn state(&self) -> SlotState<R> {
        self.tx.borrow().clone()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<SlotState<R>> {
        self.tx.subscribe()
    }
}

impl<R: Send + Sync + 'static> ComponentSlot<R> {
    fn pending(id: &str, driver: SlotDriver<R>) -> Self {
        let (tx, _rx) = tokio::sync::watch::channel(SlotState::Loading {
            skeleton: driver.skeleton,
        });
        Self {
            id: id.to_string(),
            tx,
            driver: Some(Arc::new(driver)),
        }
    }

    /// Re-attempts resolution from a clean state (the reset action of the
    /// error boundary). A no-op for settled slots - there is nothing to
    /// re-resolve for a missing id or an already-materialized entry.
    pub fn reset(&self) {
        let Some(driver) = &self.driver else {
            return;
        };
        let _ = self.tx.send(SlotState::Loading {
            skeleton: driver.skeleton,
        });
        self.spawn_resolution();
    }

    fn spawn_resolution(&self) {
        let Some(driver) = &self.driver else {
            return;
        };
        let driver = Arc::clone(driver);
        let tx = self.tx.clone();
        let id = self.id.clone();
        tokio::spawn(async move {
            match driver.entry.resolve().await {
                Ok(content) => {
                    driver.bus.publish(EVENT_COMPONENT_READY, &json!({ "id": id }));
                    let _ = tx.send(SlotState::Ready {
                        content,
                        surface: driver.surface,
                    });
                }
                Err(err) => {
                    let error = SlotError {
                        id: id.clone(),
                        message: format!("{err:#}"),
                    };
                    tracing::warn!(id = %id, "component resolution failed: {}", error.message);
                    driver.bus.publish(
                        EVENT_COMPONENT_LOAD_FAILED,
                        &json!({ "id": id, "error": error.message }),
                    );
                    let fallback = driver.fallback.as_ref().map(|produce| Arc::new(produce()));
                    let _ = tx.send(SlotState::Failed { error, fallback });
                }
            }
        });
    }
}

impl<R> fmt::Debug for ComponentSlot<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentSlot")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

/// Materializes registry ids into slots.
pub struct ComponentFactory<R> {
    registry: Arc<ComponentRegistry<R>>,
    bus: Arc<EventBus>,
    category_skeletons: HashMap<String, Skeleton>,
}

impl<R: Send + Sync + 'static> ComponentFactory<R> {
    pub fn new(registry: Arc<ComponentRegistry<R>>, bus: Arc<EventBus>) -> Self {
        Self {
            registry,
            bus,
            category_skeletons: HashMap::new(),
        }
    }

    /// Sets the default skeleton shown for pending entries of a category
    /// (used when neither options nor metadata name one).
    #[must_use]
    pub fn with_category_skeleton(mut self, category: impl Into<String>, skeleton: Skeleton) -> Self {
        self.category_skeletons.insert(category.into(), skeleton);
        self
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry<R>> {
        &self.registry
    }

    fn default_skeleton(&self, category: Option<&str>) -> Skeleton {
        category
            .and_then(|c| self.category_skeletons.get(c).copied())
            .unwrap_or_default()
    }

    /// Materializes `id` into a slot. Never fails: unknown ids yield a
    /// `Missing` slot, loader failures a `Failed` one.
    pub fn create(&self, id: &str, options: &CreateOptions<R>) -> ComponentSlot<R> {
        let Some(entry) = self.registry.get(id) else {
            self.bus.publish(EVENT_COMPONENT_MISSING, &json!({ "id": id }));
            return ComponentSlot::settled(id, SlotState::Missing);
        };

        let meta = entry.metadata();
        let surface = if options.wrap_in_frame {
            Some(Surface::Card)
        } else {
            meta.surface
        };

        // Already materialized (eager, or deferred and preloaded): no
        // pending period, the slot settles immediately.
        if let Some(content) = entry.resolved() {
            return ComponentSlot::settled(id, SlotState::Ready { content, surface });
        }

        let skeleton = options
            .loading_placeholder
            .or(meta.loading_placeholder)
            .unwrap_or_else(|| self.default_skeleton(meta.category.as_deref()));
        let fallback = if options.with_error_isolation {
            options
                .error_fallback
                .clone()
                .or_else(|| meta.error_fallback.clone())
        } else {
            None
        };

        let slot = ComponentSlot::pending(
            id,
            SlotDriver {
                entry,
                bus: Arc::clone(&self.bus),
                skeleton,
                surface,
                fallback,
            },
        );
        slot.spawn_resolution();
        slot
    }

    /// Triggers a deferred entry's resolution without creating a slot, so a
    /// later `create` settles immediately from cache. Failures are caught
    /// and logged, never returned.
    pub async fn preload(&self, id: &str) {
        let Some(entry) = self.registry.get(id) else {
            tracing::debug!(id, "preload requested for unknown id");
            return;
        };
        if !entry.is_deferred() {
            return;
        }
        if let Err(err) = entry.resolve().await {
            tracing::warn!(id, "preload failed: {err:#}");
            self.bus.publish(
                EVENT_COMPONENT_LOAD_FAILED,
                &json!({ "id": id, "error": err.to_string() }),
            );
        }
    }

    /// Preloads every deferred entry of a category concurrently. Individual
    /// failures are independent - one rejecting loader cancels nothing.
    pub async fn preload_category(&self, category: &str) {
        let jobs: Vec<_> = self
            .registry
            .get_by_category(category)
            .into_iter()
            .filter(|entry| entry.is_deferred())
            .map(|entry| {
                let id = entry.id().to_string();
                async move { self.preload(&id).await }
            })
            .collect();
        futures_util::future::join_all(jobs).await;
    }
}

impl<R> fmt::Debug for ComponentFactory<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentFactory")
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::bus::SubscribeOptions;
    use crate::registry::{ComponentMetadata, loader};

    fn test_factory() -> (Arc<ComponentRegistry<String>>, Arc<EventBus>, ComponentFactory<String>) {
        let registry = Arc::new(ComponentRegistry::new());
        let bus = EventBus::new();
        let factory = ComponentFactory::new(Arc::clone(&registry), Arc::clone(&bus));
        (registry, bus, factory)
    }

    /// Waits until the slot leaves the Loading state.
    async fn wait_settled(slot: &ComponentSlot<String>) -> SlotState<String> {
        let mut rx = slot.subscribe();
        loop {
            let state = rx.borrow_and_update().clone();
            if !state.is_loading() {
                return state;
            }
            rx.changed().await.expect("slot sender dropped");
        }
    }

    /// Unknown ids yield Missing, never an error, and announce themselves
    /// on the bus.
    #[tokio::test]
    async fn test_create_unknown_id_is_missing() {
        let (_registry, bus, factory) = test_factory();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_cb = Arc::clone(&seen);
        bus.subscribe(
            EVENT_COMPONENT_MISSING,
            Arc::new(move |payload| {
                seen_cb.lock().unwrap().push(payload["id"].clone());
                Ok(())
            }),
            SubscribeOptions::default(),
        );

        let slot = factory.create("ghost", &CreateOptions::default());
        assert!(matches!(slot.state(), SlotState::Missing));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    /// Eager entries settle to Ready synchronously, carrying the metadata
    /// surface hint.
    #[tokio::test]
    async fn test_create_eager_is_ready_immediately() {
        let (registry, _bus, factory) = test_factory();
        registry.register_eager(
            "about-me",
            "hello".to_string(),
            ComponentMetadata::new("About Me").surface(Surface::Card),
        );

        let slot = factory.create("about-me", &CreateOptions::default());
        match slot.state() {
            SlotState::Ready { content, surface } => {
                assert_eq!(*content, "hello");
                assert_eq!(surface, Some(Surface::Card));
            }
            other => panic!("expected Ready, got {other:?}"),
        }
    }

    /// wrap_in_frame forces a card surface regardless of metadata.
    #[tokio::test]
    async fn test_wrap_in_frame_overrides_surface() {
        let (registry, _bus, factory) = test_factory();
        registry.register_eager("plain", "x".to_string(), ComponentMetadata::new("Plain"));

        let options = CreateOptions {
            wrap_in_frame: true,
            ..CreateOptions::default()
        };
        let slot = factory.create("plain", &options);
        match slot.state() {
            SlotState::Ready { surface, .. } => assert_eq!(surface, Some(Surface::Card)),
            other => panic!("expected Ready, got {other:?}"),
        }
    }

    /// A deferred entry starts Loading with the right skeleton
    /// (options > metadata > per-category default) and transitions to Ready.
    #[tokio::test]
    async fn test_deferred_loads_through_placeholder() {
        let (registry, _bus, factory) = test_factory();
        let factory = factory.with_category_skeleton("leftbrain", Skeleton::Code);
        registry.register_deferred(
            "dsa-notes",
            loader(|| async { Ok("content".to_string()) }),
            ComponentMetadata::new("Notes").category("leftbrain"),
        );

        let slot = factory.create("dsa-notes", &CreateOptions::default());
        if let SlotState::Loading { skeleton } = slot.state() {
            assert_eq!(skeleton, Skeleton::Code);
        }

        match wait_settled(&slot).await {
            SlotState::Ready { content, .. } => assert_eq!(*content, "content"),
            other => panic!("expected Ready, got {other:?}"),
        }
    }

    /// An explicit loading placeholder in the options wins over everything.
    #[tokio::test]
    async fn test_options_placeholder_wins() {
        let (registry, _bus, factory) = test_factory();
        registry.register_deferred(
            "x",
            loader(|| async {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                Ok("done".to_string())
            }),
            ComponentMetadata::new("X").loading_placeholder(Skeleton::List),
        );

        let options = CreateOptions {
            loading_placeholder: Some(Skeleton::Card),
            ..CreateOptions::default()
        };
        let slot = factory.create("x", &options);
        match slot.state() {
            SlotState::Loading { skeleton } => assert_eq!(skeleton, Skeleton::Card),
            other => panic!("expected Loading, got {other:?}"),
        }
    }

    /// A rejecting loader yields a Failed state (not an error), logs, and
    /// publishes on the bus. The options fallback wins over metadata.
    #[tokio::test]
    async fn test_failing_loader_yields_failed_state() {
        let (registry, bus, factory) = test_factory();
        let failures = Arc::new(Mutex::new(Vec::new()));

        let failures_cb = Arc::clone(&failures);
        bus.subscribe(
            EVENT_COMPONENT_LOAD_FAILED,
            Arc::new(move |payload| {
                failures_cb.lock().unwrap().push(payload["id"].clone());
                Ok(())
            }),
            SubscribeOptions::default(),
        );

        registry.register_deferred(
            "broken",
            loader(|| async { anyhow::bail!("disk on fire") }),
            ComponentMetadata::new("Broken")
                .error_fallback(Arc::new(|| "metadata fallback".to_string())),
        );

        let options = CreateOptions {
            error_fallback: Some(Arc::new(|| "options fallback".to_string())),
            ..CreateOptions::default()
        };
        let slot = factory.create("broken", &options);
        match wait_settled(&slot).await {
            SlotState::Failed { error, fallback } => {
                assert!(error.message.contains("disk on fire"));
                assert_eq!(*fallback.unwrap(), "options fallback");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(failures.lock().unwrap().len(), 1);
    }

    /// The metadata fallback applies when the options supply none.
    #[tokio::test]
    async fn test_metadata_fallback_applies() {
        let (registry, _bus, factory) = test_factory();
        registry.register_deferred(
            "broken",
            loader(|| async { anyhow::bail!("nope") }),
            ComponentMetadata::new("Broken")
                .error_fallback(Arc::new(|| "metadata fallback".to_string())),
        );

        let slot = factory.create("broken", &CreateOptions::default());
        match wait_settled(&slot).await {
            SlotState::Failed { fallback, .. } => {
                assert_eq!(*fallback.unwrap(), "metadata fallback");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    /// With error isolation disabled, the slot still fails closed but
    /// carries no fallback content.
    #[tokio::test]
    async fn test_isolation_disabled_drops_fallback() {
        let (registry, _bus, factory) = test_factory();
        registry.register_deferred(
            "broken",
            loader(|| async { anyhow::bail!("nope") }),
            ComponentMetadata::new("Broken")
                .error_fallback(Arc::new(|| "unused".to_string())),
        );

        let options = CreateOptions {
            with_error_isolation: false,
            ..CreateOptions::default()
        };
        let slot = factory.create("broken", &options);
        match wait_settled(&slot).await {
            SlotState::Failed { fallback, .. } => assert!(fallback.is_none()),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    /// Preloading first means create never shows the pending state.
    #[tokio::test]
    async fn test_preload_warms_create() {
        let (registry, _bus, factory) = test_factory();
        registry.register_deferred(
            "warm",
            loader(|| async { Ok("warmed".to_string()) }),
            ComponentMetadata::new("Warm"),
        );

        factory.preload("warm").await;

        let slot = factory.create("warm", &CreateOptions::default());
        match slot.state() {
            SlotState::Ready { content, .. } => assert_eq!(*content, "warmed"),
            other => panic!("expected Ready without a pending state, got {other:?}"),
        }
    }

    /// Preload of unknown or eager ids is a quiet no-op.
    #[tokio::test]
    async fn test_preload_noop_cases() {
        let (registry, _bus, factory) = test_factory();
        registry.register_eager("eager", "x".to_string(), ComponentMetadata::new("Eager"));

        factory.preload("ghost").await;
        factory.preload("eager").await;
    }

    /// Category preload: one rejecting loader does not cancel the others,
    /// and the call itself settles without error.
    #[tokio::test]
    async fn test_preload_category_tolerates_failures() {
        let (registry, _bus, factory) = test_factory();
        let meta = |label: &str| ComponentMetadata::new(label).category("tools");
        registry.register_deferred("a", loader(|| async { Ok("A".to_string()) }), meta("A"));
        registry.register_deferred(
            "b",
            loader(|| async { anyhow::bail!("b is broken") }),
            meta("B"),
        );
        registry.register_deferred("c", loader(|| async { Ok("C".to_string()) }), meta("C"));

        factory.preload_category("tools").await;

        let a = factory.create("a", &CreateOptions::default());
        let c = factory.create("c", &CreateOptions::default());
        assert!(a.state().is_ready(), "a resolves to normal content");
        assert!(c.state().is_ready(), "c resolves to normal content");

        let b = factory.create("b", &CreateOptions::default());
        match wait_settled(&b).await {
            SlotState::Failed { error, .. } => assert!(error.message.contains("b is broken")),
            other => panic!("expected Failed for b, got {other:?}"),
        }
    }

    /// reset() re-attempts resolution from a clean state.
    #[tokio::test]
    async fn test_reset_retries_failed_slot() {
        let (registry, _bus, factory) = test_factory();
        let attempts = Arc::new(AtomicUsize::new(0));

        let attempts_cb = Arc::clone(&attempts);
        registry.register_deferred(
            "flaky",
            loader(move || {
                let attempts = Arc::clone(&attempts_cb);
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        anyhow::bail!("first attempt fails")
                    }
                    Ok("recovered".to_string())
                }
            }),
            ComponentMetadata::new("Flaky"),
        );

        let slot = factory.create("flaky", &CreateOptions::default());
        assert!(matches!(wait_settled(&slot).await, SlotState::Failed { .. }));

        slot.reset();
        match wait_settled(&slot).await {
            SlotState::Ready { content, .. } => assert_eq!(*content, "recovered"),
            other => panic!("expected Ready after reset, got {other:?}"),
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
