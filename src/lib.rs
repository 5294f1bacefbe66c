//! RSS Digest - a one-shot feed-to-HTML generator
//!
//! This crate fetches a configured set of RSS/Atom feeds, merges their entries
//! by recency and renders them into a single static HTML page.

pub mod config;
pub mod fetcher;
pub mod item;
pub mod normalize;
pub mod pipeline;
pub mod recency;
pub mod render;
pub mod timestamp;
