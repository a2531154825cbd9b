//! Full-screen terminal frontend for Folio.

pub mod effects;
pub mod events;
pub mod markdown;
pub mod render;
pub mod runtime;
pub mod state;
pub mod statusline;
pub mod terminal;
pub mod text;
pub mod theme;
pub mod update;

use std::io::{IsTerminal, stderr};
use std::sync::Arc;

use anyhow::Result;
use folio_content::{CATEGORIES, category_skeletons, install, nav_defaults};
use folio_core::bus::EventBus;
use folio_core::config::Config;
use folio_core::factory::ComponentFactory;
use folio_core::nav::NavController;
use folio_core::registry::ComponentRegistry;
use folio_core::storage::StateStore;
pub use runtime::TuiRuntime;

use crate::state::AppState;

/// Assembles the shared services and runs the interactive browser.
///
/// The bus, registry, factory, and store are constructed here - once per
/// process - and injected into the application state; nothing else holds
/// globals.
pub async fn run_browser(config: &Config) -> Result<()> {
    // The browser requires a terminal to render into.
    if !stderr().is_terminal() {
        anyhow::bail!(
            "The browser requires a terminal.\n\
             Use `folio catalog list` for non-interactive output."
        );
    }

    let bus = EventBus::new();
    let registry = Arc::new(ComponentRegistry::new());
    install(&registry);

    let mut factory = ComponentFactory::new(Arc::clone(&registry), Arc::clone(&bus));
    for (category, skeleton) in category_skeletons() {
        factory = factory.with_category_skeleton(category, skeleton);
    }
    let factory = Arc::new(factory);

    let store = Arc::new(StateStore::open_default());
    let nav = NavController::hydrate(&store, nav_defaults(config), Arc::clone(&bus));

    let state = AppState::new(
        config.clone(),
        nav,
        CATEGORIES.map(String::from).to_vec(),
        bus,
        registry,
        factory,
        store,
    );

    let mut runtime = TuiRuntime::new(state)?;
    runtime.bootstrap();
    runtime.run()
}
