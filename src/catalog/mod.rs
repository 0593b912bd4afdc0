//! Category catalog core.
//!
//! The catalog lives server-side; this module is the client's moving parts
//! over it: [`Navigator`] keeps the breadcrumb trail and the displayed
//! frontier consistent under overlapping fetches, [`mutator`] performs the
//! three structural edits, and [`walk_subtree`] renders bounded subtrees.

pub mod mutator;
mod navigator;
mod walker;

pub use mutator::MutateError;
pub use navigator::{FetchTicket, NavError, Navigator};
pub use walker::{walk_subtree, TreeRow, DEFAULT_TREE_DEPTH};
