//! Core infrastructure for Folio.
//!
//! This crate is frontend-agnostic: it knows nothing about terminals or
//! widgets. It provides the pieces the application is assembled from:
//!
//! - [`bus`] - process-wide publish/subscribe hub
//! - [`registry`] - id -> renderable definition lookup with category index
//! - [`factory`] - turns registry ids into observable display slots
//! - [`nav`] - navigation/tab controller state machine
//! - [`storage`] - pluggable key/value persistence with expiry
//! - [`config`] - config.toml loading and field-preserving saves
//!
//! The registry and factory are generic over the renderable type `R`; the
//! frontend decides what a "renderable" is. All shared services are plain
//! structs handed around as `Arc`s by the application root - there are no
//! module-level singletons, which keeps everything resettable in tests.

pub mod bus;
pub mod config;
pub mod factory;
pub mod nav;
pub mod registry;
pub mod storage;
