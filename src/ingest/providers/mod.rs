// src/ingest/providers/mod.rs
pub mod json_file;
pub mod news_feed;

pub use json_file::{JsonFileSource, StaticSource};
pub use news_feed::NewsFeedProvider;
