//! Leave-one-out templates and nearest-template distances.
//!
//! - [`template_selectors`] builds one pool mask per (trial, category)
//! - [`TemplateEngine`] summarizes pools into templates, with optional
//!   equal-size sub-sampling and a bounded selection cache
//! - [`compute_distances_to_all_templates`] fills the trial-by-category
//!   distance matrix

mod cache;
mod engine;
mod selectors;
mod strategy;

pub use cache::{CacheStats, SelectionCache, DEFAULT_CACHE_MAX_CELLS};
pub use engine::{compute_distances_to_all_templates, TemplateEngine};
pub use selectors::{template_selectors, Selector, SelectorTensor};
pub use strategy::{pairwise_distances, DistanceMetric, Summarizer, TemplateStrategy};
