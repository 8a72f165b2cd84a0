//! Markdown to HTML rendering with two interchangeable pipelines.
//!
//! Both pipelines pull code literals out before any formatting runs, rewrite callout
//! lines, hand the rest to a [`BlockTransformer`](application::render::BlockTransformer)
//! and put the literals back as escaped code markup.

pub mod application;
pub mod config;
pub mod infra;
