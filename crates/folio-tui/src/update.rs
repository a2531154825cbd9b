//! TUI reducer (update function).
//!
//! All state mutations happen here. The runtime calls `update(app, event)`
//! and executes the returned effects. This is the single source of truth
//! for how events modify state.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::AppState;

/// Rows scrolled per PageUp/PageDown.
const SCROLL_PAGE: u16 = 10;

/// The main reducer function.
///
/// Takes the current state and an event, mutates state, and returns effects
/// for the runtime to execute.
pub fn update(app: &mut AppState, event: UiEvent) -> Vec<UiEffect> {
    match event {
        UiEvent::Tick => {
            app.spinner_frame = app.spinner_frame.wrapping_add(1);
            vec![]
        }
        UiEvent::Terminal(term_event) => handle_terminal_event(app, term_event),
        UiEvent::SlotOpened { slot } => {
            app.slot = Some(slot);
            app.content_scroll = 0;
            vec![]
        }
        // State lives in the slot itself; the next render picks it up.
        UiEvent::SlotChanged => vec![],
        UiEvent::PreloadFinished { category } => {
            if app.preloading.as_deref() == Some(category.as_str()) {
                app.preloading = None;
            }
            vec![]
        }
    }
}

fn handle_terminal_event(app: &mut AppState, event: Event) -> Vec<UiEffect> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key(app, key),
        _ => vec![],
    }
}

fn handle_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return vec![UiEffect::Quit];
    }

    match key.code {
        KeyCode::Char('q') => vec![UiEffect::Quit],

        KeyCode::Tab | KeyCode::Right => switch_category(app, 1),
        KeyCode::BackTab | KeyCode::Left => switch_category(app, -1),

        KeyCode::Down | KeyCode::Char('j') => move_selection(app, 1),
        KeyCode::Up | KeyCode::Char('k') => move_selection(app, -1),

        KeyCode::Char('n') => {
            app.nav.toggle_nav_panel();
            vec![persist(app)]
        }
        KeyCode::Char('t') => {
            app.nav.toggle_dark_mode();
            vec![persist(app)]
        }
        KeyCode::Char('r') => vec![UiEffect::ResetSlot],
        KeyCode::Char('p') => {
            let category = app.nav.active_category().to_string();
            app.preloading = Some(category.clone());
            vec![UiEffect::PreloadCategory { category }]
        }

        KeyCode::PageDown => {
            app.content_scroll = app.content_scroll.saturating_add(SCROLL_PAGE);
            vec![]
        }
        KeyCode::PageUp => {
            app.content_scroll = app.content_scroll.saturating_sub(SCROLL_PAGE);
            vec![]
        }
        KeyCode::Home => {
            app.content_scroll = 0;
            vec![]
        }

        _ => vec![],
    }
}

/// Cycles the active category by `step` tabs (wrapping) and opens the
/// restored selection for it.
fn switch_category(app: &mut AppState, step: isize) -> Vec<UiEffect> {
    let Some(next) = cycle_category(&app.categories, app.nav.active_category(), step) else {
        return vec![];
    };
    app.nav.change_category(&next);

    let mut effects = vec![
        UiEffect::OpenSlot {
            id: app.nav.selected_item_id().to_string(),
        },
        persist(app),
    ];
    if app.config.preload_active_category {
        app.preloading = Some(next.clone());
        effects.push(UiEffect::PreloadCategory { category: next });
    }
    effects
}

/// Moves the selection inside the active category (clamped, no wrap).
fn move_selection(app: &mut AppState, step: isize) -> Vec<UiEffect> {
    let entries = app.active_entries();
    if entries.is_empty() {
        return vec![];
    }

    let current = app.nav.selected_item_id();
    let index = entries.iter().position(|id| id == current).unwrap_or(0) as isize;
    let next = (index + step).clamp(0, entries.len() as isize - 1) as usize;
    if entries[next] == current {
        return vec![];
    }

    app.nav.select_item(&entries[next]);
    vec![
        UiEffect::OpenSlot {
            id: entries[next].clone(),
        },
        persist(app),
    ]
}

fn cycle_category(categories: &[String], current: &str, step: isize) -> Option<String> {
    if categories.is_empty() {
        return None;
    }
    let index = categories.iter().position(|c| c == current).unwrap_or(0) as isize;
    let len = categories.len() as isize;
    let next = (index + step).rem_euclid(len) as usize;
    Some(categories[next].clone())
}

fn persist(app: &AppState) -> UiEffect {
    UiEffect::PersistNav {
        snapshot: app.nav.snapshot(),
    }
}
