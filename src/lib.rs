//! Ithomiini Maps - specimen filtering, derived views and map colors
//!
//! The pipeline is filter → derive → color, recomputed synchronously on
//! every change:
//! - [`filter`]: does a record pass the current [`filter::FilterState`]?
//! - [`view`]: visible records, counts and value lists in one pass
//! - [`color`]: stable colors and legend entries for a "color by" field
//!
//! [`records`] loads and validates the input document, [`query`] maps filter
//! state to and from URL query strings and [`export`] writes visible records
//! for external renderers.

pub mod color;
pub mod config;
pub mod export;
pub mod filter;
pub mod logging;
pub mod query;
pub mod records;
pub mod view;
