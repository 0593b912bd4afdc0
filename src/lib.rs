//! Curator, a terminal admin console for a media gallery and its
//! hierarchical category catalog.
//!
//! The store owns all catalog data; this client navigates it one level at a
//! time, mutates it through create/insert/delete, and always refetches
//! instead of patching local state. [`catalog::Navigator`] keeps the
//! breadcrumb trail honest when responses arrive late or out of order,
//! [`app::App`] wires navigation and mutations to status notices, and
//! [`shell`] exposes the whole thing as a line-oriented prompt.

pub mod api;
pub mod app;
pub mod catalog;
pub mod config;
pub mod shell;
pub mod util;
