//! Parsing realistic Ruby sources.

pub mod tests_ruby_sources;
