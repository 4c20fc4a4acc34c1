//! Text rendering of ancestry trees.

mod format;
mod options;
mod tree;

pub use format::format_locations;
pub use options::{LocationFilter, TreeOptions};
pub use tree::render;
