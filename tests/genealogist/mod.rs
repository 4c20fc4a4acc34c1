//! End-to-end tests: index sources, build location maps, render trees.

pub mod tests_location_map;
pub mod tests_to_tree;
