//! Application state composition.
//!
//! `AppState` holds everything the reducer mutates and the renderer reads:
//! the navigation controller, the slot currently on display, scroll and
//! animation counters, and handles to the shared services (bus, registry,
//! factory, store). The services are constructed once by the application
//! root and injected here; the reducer never performs I/O through them -
//! that is the runtime's job, driven by effects.

use std::sync::Arc;

use folio_content::Page;
use folio_core::bus::EventBus;
use folio_core::config::Config;
use folio_core::factory::{ComponentFactory, ComponentSlot};
use folio_core::nav::NavController;
use folio_core::registry::ComponentRegistry;
use folio_core::storage::StateStore;

use crate::statusline::StatusLineAccumulator;

/// Everything the reducer mutates and the renderer reads.
pub struct AppState {
    /// Flag indicating the app should quit.
    pub should_quit: bool,
    /// Navigation/tab controller (category, selection, panel, theme).
    pub nav: NavController,
    /// Tab order.
    pub categories: Vec<String>,
    /// Slot currently on display. None only before bootstrap completes.
    pub slot: Option<ComponentSlot<Page>>,
    /// Content pane scroll offset (display rows).
    pub content_scroll: u16,
    /// Category currently being preloaded, for the status line.
    pub preloading: Option<String>,
    /// Spinner animation frame counter.
    pub spinner_frame: usize,
    /// Frame-time accumulator for the status line.
    pub status_line: StatusLineAccumulator,
    /// Loaded configuration.
    pub config: Config,

    // Shared services (injected, reducer-visible for lookups only).
    pub bus: Arc<EventBus>,
    pub registry: Arc<ComponentRegistry<Page>>,
    pub factory: Arc<ComponentFactory<Page>>,
    pub store: Arc<StateStore>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        nav: NavController,
        categories: Vec<String>,
        bus: Arc<EventBus>,
        registry: Arc<ComponentRegistry<Page>>,
        factory: Arc<ComponentFactory<Page>>,
        store: Arc<StateStore>,
    ) -> Self {
        Self {
            should_quit: false,
            nav,
            categories,
            slot: None,
            content_scroll: 0,
            preloading: None,
            spinner_frame: 0,
            status_line: StatusLineAccumulator::new(),
            config,
            bus,
            registry,
            factory,
            store,
        }
    }

    /// Entry ids of the active category, in display order.
    pub fn active_entries(&self) -> Vec<String> {
        self.registry
            .get_by_category(self.nav.active_category())
            .iter()
            .map(|entry| entry.id().to_string())
            .collect()
    }

    /// Whether the displayed slot is still resolving.
    pub fn slot_loading(&self) -> bool {
        self.slot.as_ref().is_some_and(|slot| slot.state().is_loading())
    }
}
