//! UI effect types.
//!
//! Effects are commands returned by the reducer that the runtime executes.
//! They represent I/O and task spawning only; the reducer itself never
//! touches the terminal, the disk, or the tokio runtime.

use folio_core::nav::NavState;

/// Effects returned by the reducer for the runtime to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEffect {
    /// Quit the application.
    Quit,

    /// Materialize a slot for `id` and start watching its transitions.
    OpenSlot { id: String },

    /// Re-attempt resolution of the displayed slot from a clean state.
    ResetSlot,

    /// Warm every deferred entry of a category.
    PreloadCategory { category: String },

    /// Persist the navigation state, best-effort, off the update path.
    PersistNav { snapshot: NavState },
}
