//! Utility functions for common operations.
//!
//! This module provides reusable utilities for:
//!
//! - **Text processing**: Unicode-aware string width calculation, truncation,
//!   and padding for table output
//! - **Terminal safety**: stripping control sequences from server-supplied
//!   strings before they reach the terminal
//!
//! # Examples
//!
//! ```
//! use curator::util::{display_width, strip_control_chars, truncate_to_width};
//!
//! // Calculate display width for column alignment
//! let width = display_width("Shoes 鞋類"); // Returns 10 (6 + 2*2)
//!
//! // Truncate to fit a table column
//! let truncated = truncate_to_width("A very long category name", 15);
//!
//! // Sanitize a store-supplied name before printing
//! let clean = strip_control_chars("Sneakers\x1b[31m!");
//! ```

mod text;

pub use text::{display_width, pad_to_width, strip_control_chars, truncate_to_width};
