//! HTTP client for the category store and gallery service.
//!
//! This module owns everything that crosses the wire:
//!
//! - **Client**: request plumbing with bearer auth, timeouts, a streaming
//!   body-size guard, and read-only retry
//! - **Categories**: the five category store operations (roots, children,
//!   create, insert, delete)
//! - **Gallery**: filtered page fetch, entry registration, and image upload
//!
//! # Architecture
//!
//! The module is organized into four submodules:
//!
//! - [`types`] wire/domain types shared by the rest of the crate
//! - `client` the transport layer (`ApiClient`)
//! - `categories` typed category endpoints as `ApiClient` methods
//! - `gallery` typed gallery endpoints as `ApiClient` methods
//!
//! Callers hold one `ApiClient` and reach every endpoint through it; nothing
//! outside this module builds a URL or touches a response body.

mod categories;
mod client;
mod gallery;
pub mod types;

pub use categories::{InsertCategory, NewCategory};
pub use client::{ApiClient, ApiError, MAX_RESPONSE_SIZE};
pub use gallery::{NewGalleryEntry, KNOWN_RATIOS, MAX_UPLOAD_SIZE};
pub use types::{
    Category, CategoryDraft, CategoryId, CropRect, GalleryFilter, GalleryImage, GalleryKind,
    GalleryPage, GalleryStatus,
};
