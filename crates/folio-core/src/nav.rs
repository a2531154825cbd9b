//! Navigation/tab controller.
//!
//! Holds the current category and selected item, remembers the last
//! selection per category, and owns the persisted UI booleans (nav panel
//! visibility, dark mode). All transitions are synchronous and immediately
//! observable; persistence is the caller's job - the UI runtime writes
//! [`NavController::snapshot`] to the state store best-effort after each
//! change, off the update path.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::bus::EventBus;
use crate::storage::StateStore;

/// Published whenever category or selection changes.
/// Payload: `{"category": .., "item": ..}`.
pub const EVENT_NAV_CHANGED: &str = "nav:changed";
/// Published whenever the dark/light preference flips.
/// Payload: `{"dark": bool}`.
pub const EVENT_THEME_CHANGED: &str = "theme:changed";

/// State-store key the navigation state lives under.
pub const NAV_STATE_KEY: &str = "nav_state";

/// The persisted navigation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavState {
    pub active_category: String,
    pub selected_item_id: String,
    #[serde(default)]
    pub last_selected_by_category: HashMap<String, String>,
    pub nav_panel_visible: bool,
    pub dark_mode: bool,
}

/// Built-in defaults used when nothing is persisted (and as the fallback
/// selection for categories never visited before).
#[derive(Debug, Clone)]
pub struct NavDefaults {
    pub initial_category: String,
    pub default_item_by_category: HashMap<String, String>,
    pub nav_panel_visible: bool,
    pub dark_mode: bool,
}

impl NavDefaults {
    pub fn default_item_for(&self, category: &str) -> Option<&str> {
        self.default_item_by_category.get(category).map(String::as_str)
    }

    fn initial_state(&self) -> NavState {
        NavState {
            active_category: self.initial_category.clone(),
            selected_item_id: self
                .default_item_for(&self.initial_category)
                .unwrap_or_default()
                .to_string(),
            last_selected_by_category: HashMap::new(),
            nav_panel_visible: self.nav_panel_visible,
            dark_mode: self.dark_mode,
        }
    }
}

/// The tab controller state machine.
pub struct NavController {
    state: NavState,
    defaults: NavDefaults,
    bus: Arc<EventBus>,
}

impl NavController {
    /// Builds the controller from persisted state, falling back to the
    /// built-in defaults when nothing usable is stored.
    pub fn hydrate(store: &StateStore, defaults: NavDefaults, bus: Arc<EventBus>) -> Self {
        let state = store
            .get(NAV_STATE_KEY)
            .and_then(|value| match serde_json::from_value::<NavState>(value) {
                Ok(state) => Some(state),
                Err(err) => {
                    tracing::warn!("persisted nav state unreadable, using defaults: {err}");
                    None
                }
            })
            .unwrap_or_else(|| defaults.initial_state());

        Self { state, defaults, bus }
    }

    /// Builds the controller from defaults only (fresh session).
    pub fn with_defaults(defaults: NavDefaults, bus: Arc<EventBus>) -> Self {
        Self {
            state: defaults.initial_state(),
            defaults,
            bus,
        }
    }

    pub fn state(&self) -> &NavState {
        &self.state
    }

    pub fn active_category(&self) -> &str {
        &self.state.active_category
    }

    pub fn selected_item_id(&self) -> &str {
        &self.state.selected_item_id
    }

    pub fn nav_panel_visible(&self) -> bool {
        self.state.nav_panel_visible
    }

    pub fn dark_mode(&self) -> bool {
        self.state.dark_mode
    }

    /// Clone of the current state, for fire-and-forget persistence.
    pub fn snapshot(&self) -> NavState {
        self.state.clone()
    }

    /// Switches tabs. Selection is restored from the last visit to that
    /// category, else the built-in per-category default.
    pub fn change_category(&mut self, category: &str) {
        self.state.active_category = category.to_string();
        self.state.selected_item_id = self
            .state
            .last_selected_by_category
            .get(category)
            .cloned()
            .or_else(|| self.defaults.default_item_for(category).map(str::to_string))
            .unwrap_or_default();
        self.publish_nav_changed();
    }

    /// Selects an item within the active category and records it as that
    /// category's last selection.
    pub fn select_item(&mut self, item_id: &str) {
        self.state.selected_item_id = item_id.to_string();
        self.state
            .last_selected_by_category
            .insert(self.state.active_category.clone(), item_id.to_string());
        self.publish_nav_changed();
    }

    /// Returns the new visibility.
    pub fn toggle_nav_panel(&mut self) -> bool {
        self.state.nav_panel_visible = !self.state.nav_panel_visible;
        self.state.nav_panel_visible
    }

    /// Returns the new dark-mode flag.
    pub fn toggle_dark_mode(&mut self) -> bool {
        let dark = !self.state.dark_mode;
        self.set_dark_mode(dark);
        dark
    }

    pub fn set_dark_mode(&mut self, dark: bool) {
        if self.state.dark_mode == dark {
            return;
        }
        self.state.dark_mode = dark;
        self.bus.publish(EVENT_THEME_CHANGED, &json!({ "dark": dark }));
    }

    /// Writes the current state to the store. Errors are swallowed and
    /// logged by the store; navigation never depends on persistence.
    pub fn persist(&self, store: &StateStore) {
        match serde_json::to_value(&self.state) {
            Ok(value) => store.set(NAV_STATE_KEY, value),
            Err(err) => tracing::warn!("nav state not serializable: {err}"),
        }
    }

    fn publish_nav_changed(&self) {
        self.bus.publish(
            EVENT_NAV_CHANGED,
            &json!({
                "category": self.state.active_category,
                "item": self.state.selected_item_id,
            }),
        );
    }
}

impl std::fmt::Debug for NavController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NavController").field("state", &self.state).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::bus::SubscribeOptions;

    fn defaults() -> NavDefaults {
        NavDefaults {
            initial_category: "about".to_string(),
            default_item_by_category: HashMap::from([
                ("about".to_string(), "about-me".to_string()),
                ("leftbrain".to_string(), "dsa-big-o".to_string()),
                ("rightbrain".to_string(), "essays".to_string()),
            ]),
            nav_panel_visible: true,
            dark_mode: true,
        }
    }

    /// Switching back to a category restores its last selection.
    #[test]
    fn test_category_switch_restores_last_selection() {
        let bus = EventBus::new();
        let mut nav = NavController::with_defaults(defaults(), bus);

        nav.change_category("rightbrain");
        nav.select_item("music");
        nav.change_category("leftbrain");
        assert_eq!(nav.selected_item_id(), "dsa-big-o");

        nav.change_category("rightbrain");
        assert_eq!(nav.selected_item_id(), "music");
    }

    /// A never-visited category falls back to its built-in default; a
    /// category without a default falls back to no selection.
    #[test]
    fn test_unvisited_category_uses_default() {
        let bus = EventBus::new();
        let mut nav = NavController::with_defaults(defaults(), bus);

        nav.change_category("leftbrain");
        assert_eq!(nav.selected_item_id(), "dsa-big-o");

        nav.change_category("mystery");
        assert_eq!(nav.selected_item_id(), "");
    }

    /// Hydration round-trips through the store.
    #[test]
    fn test_hydrate_roundtrip() {
        let bus = EventBus::new();
        let store = StateStore::in_memory();

        let mut nav = NavController::hydrate(&store, defaults(), Arc::clone(&bus));
        nav.change_category("rightbrain");
        nav.select_item("music");
        nav.toggle_dark_mode();
        nav.persist(&store);

        let restored = NavController::hydrate(&store, defaults(), bus);
        assert_eq!(restored.active_category(), "rightbrain");
        assert_eq!(restored.selected_item_id(), "music");
        assert!(!restored.dark_mode());
    }

    /// Corrupt persisted state degrades to defaults instead of failing.
    #[test]
    fn test_hydrate_corrupt_state_uses_defaults() {
        let bus = EventBus::new();
        let store = StateStore::in_memory();
        store.set(NAV_STATE_KEY, serde_json::json!({"not": "nav state"}));

        let nav = NavController::hydrate(&store, defaults(), bus);
        assert_eq!(nav.active_category(), "about");
        assert_eq!(nav.selected_item_id(), "about-me");
    }

    /// Dark-mode changes are announced on the bus; redundant sets are not.
    #[test]
    fn test_theme_change_published() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen_cb = Arc::clone(&seen);
        bus.subscribe(
            EVENT_THEME_CHANGED,
            Arc::new(move |payload| {
                seen_cb.lock().unwrap().push(payload["dark"].clone());
                Ok(())
            }),
            SubscribeOptions::default(),
        );

        let mut nav = NavController::with_defaults(defaults(), Arc::clone(&bus));
        nav.set_dark_mode(true); // already dark, no event
        nav.toggle_dark_mode(); // -> light
        nav.toggle_dark_mode(); // -> dark

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], false);
        assert_eq!(seen[1], true);
    }

    /// Selection changes are announced on the bus.
    #[test]
    fn test_nav_change_published() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(0usize));

        let seen_cb = Arc::clone(&seen);
        bus.subscribe(
            EVENT_NAV_CHANGED,
            Arc::new(move |_| {
                *seen_cb.lock().unwrap() += 1;
                Ok(())
            }),
            SubscribeOptions::default(),
        );

        let mut nav = NavController::with_defaults(defaults(), Arc::clone(&bus));
        nav.change_category("leftbrain");
        nav.select_item("dsa-graphs");
        assert_eq!(*seen.lock().unwrap(), 2);
    }

    /// Panel toggling flips and reports the new value.
    #[test]
    fn test_toggle_nav_panel() {
        let bus = EventBus::new();
        let mut nav = NavController::with_defaults(defaults(), bus);
        assert!(nav.nav_panel_visible());
        assert!(!nav.toggle_nav_panel());
        assert!(nav.toggle_nav_panel());
    }
}
