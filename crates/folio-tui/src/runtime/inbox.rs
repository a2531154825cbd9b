//! Inbox channel types.
//!
//! Async work (slot watchers, preloads) sends its results here; the runtime
//! drains the inbox every loop iteration. One channel for everything keeps
//! event collection simple.

use tokio::sync::mpsc;

use crate::events::UiEvent;

pub type UiEventSender = mpsc::UnboundedSender<UiEvent>;
pub type UiEventReceiver = mpsc::UnboundedReceiver<UiEvent>;
