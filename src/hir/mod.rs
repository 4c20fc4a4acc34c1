//! Location engine: declaration scanning and method attribution.
//!
//! ```text
//! Reflection::methods_of(class)      ← methods and reported file:line
//!     │
//!     ▼
//! scan_file(file)                    ← declarations per file, in parallel
//!     │
//!     ▼
//! LocationMapBuilder::build(class)   ← innermost declaration per method
//! ```

mod location_map;
mod scan;
mod types;

pub use location_map::{LocationMap, LocationMapBuilder};
pub use scan::{ScanError, scan, scan_file};
pub use types::{Declaration, MethodEntry, TypeEntry};
