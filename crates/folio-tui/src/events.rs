//! Events consumed by the reducer.

use folio_content::Page;
use folio_core::factory::ComponentSlot;

/// One unit of input for `update()`. Terminal input, timer ticks, and async
/// results from the runtime's inbox all arrive as `UiEvent`s.
#[derive(Debug)]
pub enum UiEvent {
    /// Animation/render cadence tick.
    Tick,
    /// Raw terminal input.
    Terminal(crossterm::event::Event),
    /// The runtime materialized a slot for the current selection.
    SlotOpened { slot: ComponentSlot<Page> },
    /// The displayed slot changed state (loading -> ready/failed).
    SlotChanged,
    /// A category preload finished (successes and failures alike).
    PreloadFinished { category: String },
}
