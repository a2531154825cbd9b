//! The Folio page catalogue.
//!
//! Defines [`Page`] - the renderable unit the rest of the application is
//! generic over - and installs the built-in entries into a component
//! registry. Text-heavy pages ship as embedded markdown; generated pages
//! (the tool references) and disk-backed pages (the journal) materialize
//! through deferred loaders.

pub mod catalog;
pub mod page;

pub use catalog::{CATEGORIES, category_skeletons, install, nav_defaults};
pub use page::{Page, PageKind};
