//! Parser error handling module
//!
//! - Categorized error codes for filtering and documentation
//! - Hints for common mistakes
//! - Related span tracking (e.g. "class opened here" for a missing `end`)

mod codes;
mod error;

pub use codes::ErrorCode;
pub use error::{RelatedInfo, Severity, SyntaxError, SyntaxErrorBuilder};
