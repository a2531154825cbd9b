//! TUI runtime - owns terminal, runs event loop, executes effects.
//!
//! This is the "Elm runtime" boundary: all side effects happen here.
//! The reducer stays pure and produces effects; this module executes them.
//!
//! ## Inbox Pattern
//!
//! Async results arrive through one unbounded channel:
//! - the slot watcher forwards `SlotChanged` whenever the displayed slot
//!   transitions (loading -> ready/failed),
//! - preload tasks report `PreloadFinished`,
//! - `OpenSlot` hands the freshly created slot back as `SlotOpened`.
//!
//! The runtime drains the inbox each iteration, feeds everything through the
//! reducer, and renders on tick cadence with a dirty flag.

mod inbox;

use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use folio_core::factory::CreateOptions;
use folio_core::nav::NavState;
use inbox::{UiEventReceiver, UiEventSender};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::AppState;
use crate::{render, terminal, update};

/// Target frame rate while something is animating (~60fps).
pub const FRAME_DURATION: Duration = Duration::from_millis(16);

/// Poll duration when idle. Longer timeout reduces CPU usage when nothing
/// is happening.
pub const IDLE_POLL_DURATION: Duration = Duration::from_millis(100);

/// Full-screen TUI runtime.
///
/// Owns the terminal and state. Runs the event loop and executes effects.
/// Terminal state is restored on normal exit and on panic.
pub struct TuiRuntime {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    pub state: AppState,
    /// Inbox sender - async tasks send events here.
    inbox_tx: UiEventSender,
    /// Inbox receiver - the runtime drains this each iteration.
    inbox_rx: UiEventReceiver,
    last_tick: Instant,
    last_render: Instant,
    last_terminal_event: Instant,
    /// Cancels the watcher of the previously displayed slot. Cancelling
    /// stops observation only - an in-flight load keeps warming the cache.
    slot_watch_cancel: Option<CancellationToken>,
}

impl TuiRuntime {
    /// Creates the runtime: installs the panic hook and takes over the
    /// terminal.
    pub fn new(state: AppState) -> Result<Self> {
        terminal::install_panic_hook();
        let terminal = terminal::setup_terminal().context("Failed to setup terminal")?;
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        let now = Instant::now();
        Ok(Self {
            terminal,
            state,
            inbox_tx,
            inbox_rx,
            last_tick: now,
            last_render: now,
            last_terminal_event: now,
            slot_watch_cancel: None,
        })
    }

    /// Opens the hydrated selection and optionally warms its category.
    pub fn bootstrap(&mut self) {
        let mut effects = vec![UiEffect::OpenSlot {
            id: self.state.nav.selected_item_id().to_string(),
        }];
        if self.state.config.preload_active_category {
            let category = self.state.nav.active_category().to_string();
            self.state.preloading = Some(category.clone());
            effects.push(UiEffect::PreloadCategory { category });
        }
        self.execute_effects(effects);
    }

    /// Runs the main event loop, restoring the terminal afterwards.
    pub fn run(&mut self) -> Result<()> {
        let result = self.event_loop();
        if let Err(err) = terminal::restore_terminal() {
            tracing::warn!("terminal restore failed: {err:#}");
        }
        result
    }

    fn event_loop(&mut self) -> Result<()> {
        let mut dirty = true; // Start dirty to ensure initial render

        while !self.state.should_quit {
            let mut events = self.collect_events()?;

            for event in events.drain(..) {
                if matches!(&event, UiEvent::Terminal(_)) {
                    self.last_terminal_event = Instant::now();
                }

                // Only Tick triggers render - this caps frame rate at tick
                // cadence; other events update state and batch to next Tick.
                let marks_dirty = matches!(&event, UiEvent::Tick);

                let effects = update::update(&mut self.state, event);
                if marks_dirty {
                    dirty = true;
                }
                self.execute_effects(effects);
            }

            if dirty {
                let frame_ms = self.last_render.elapsed().as_millis() as u16;
                self.last_render = Instant::now();

                self.terminal.draw(|frame| render::render(&self.state, frame))?;

                dirty = false;
                self.state.status_line.on_frame(frame_ms);
            }
        }

        Ok(())
    }

    // ========================================================================
    // Event Collection
    // ========================================================================

    /// Collects events from the inbox and the terminal, emitting Tick on
    /// cadence. Polls fast while something animates, slow when idle.
    fn collect_events(&mut self) -> Result<Vec<UiEvent>> {
        let mut events = Vec::new();

        let recent_terminal_activity = self.last_terminal_event.elapsed() < IDLE_POLL_DURATION;
        let needs_fast_poll = self.state.slot_loading()
            || self.state.preloading.is_some()
            || recent_terminal_activity;
        let tick_interval = if needs_fast_poll {
            FRAME_DURATION
        } else {
            IDLE_POLL_DURATION
        };

        // Drain inbox - all async results arrive here.
        while let Ok(event) = self.inbox_rx.try_recv() {
            events.push(event);
        }

        // Poll terminal events:
        // - with pending events, non-blocking (don't delay processing)
        // - otherwise block until the next tick is due
        let time_until_tick = tick_interval.saturating_sub(self.last_tick.elapsed());
        let poll_duration = if events.is_empty() {
            time_until_tick
        } else {
            Duration::ZERO
        };

        if event::poll(poll_duration)? {
            events.push(UiEvent::Terminal(event::read()?));
            // Drain any remaining buffered events (non-blocking)
            while event::poll(Duration::ZERO)? {
                events.push(UiEvent::Terminal(event::read()?));
            }
        }

        if self.last_tick.elapsed() >= tick_interval {
            events.push(UiEvent::Tick);
            self.last_tick = Instant::now();
        }

        Ok(events)
    }

    // ========================================================================
    // Effect Dispatch
    // ========================================================================

    fn execute_effects(&mut self, effects: Vec<UiEffect>) {
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    fn execute_effect(&mut self, effect: UiEffect) {
        match effect {
            UiEffect::Quit => {
                self.state.should_quit = true;
            }

            UiEffect::OpenSlot { id } => self.open_slot(&id),

            UiEffect::ResetSlot => {
                if let Some(slot) = &self.state.slot {
                    slot.reset();
                }
            }

            UiEffect::PreloadCategory { category } => {
                let factory = Arc::clone(&self.state.factory);
                let tx = self.inbox_tx.clone();
                tokio::spawn(async move {
                    factory.preload_category(&category).await;
                    let _ = tx.send(UiEvent::PreloadFinished { category });
                });
            }

            UiEffect::PersistNav { snapshot } => self.persist_nav(snapshot),
        }
    }

    /// Creates the slot, starts a watcher forwarding its transitions into
    /// the inbox, and hands the slot to the reducer via `SlotOpened`.
    fn open_slot(&mut self, id: &str) {
        if let Some(cancel) = self.slot_watch_cancel.take() {
            cancel.cancel();
        }

        let slot = self.state.factory.create(id, &CreateOptions::default());

        let mut rx = slot.subscribe();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let tx = self.inbox_tx.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() || tx.send(UiEvent::SlotChanged).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        self.slot_watch_cancel = Some(cancel);

        let _ = self.inbox_tx.send(UiEvent::SlotOpened { slot });
    }

    /// Fire-and-forget nav persistence; never blocks the transition that
    /// produced it. Write failures are logged by the store and swallowed.
    fn persist_nav(&self, snapshot: NavState) {
        let store = Arc::clone(&self.state.store);
        tokio::task::spawn_blocking(move || match serde_json::to_value(&snapshot) {
            Ok(value) => store.set(folio_core::nav::NAV_STATE_KEY, value),
            Err(err) => tracing::warn!("nav state not serializable: {err}"),
        });
    }
}
