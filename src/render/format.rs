//! Location annotations.

use std::fmt::Write;

use super::options::LocationFilter;
use crate::base::SourceLocation;

/// ` (location: a.rb:1, b.rb:7)` for `target`, or an empty string when there
/// is nothing to show or the filter hides it.
pub fn format_locations(locations: &[SourceLocation], filter: &LocationFilter, target: &str) -> String {
    if locations.is_empty() || !filter.permits(target) {
        return String::new();
    }
    let mut out = String::from(" (location: ");
    for (i, location) in locations.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{location}");
    }
    out.push(')');
    out
}
