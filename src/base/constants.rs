//! Domain constants shared across layers.

/// Separator between segments of a qualified type name (`Outer::Inner`)
pub const NAMESPACE_SEPARATOR: &str = "::";

/// Extension of Ruby source files
pub const RUBY_EXT: &str = "rb";

/// The class every user class ultimately inherits from
pub const ROOT_CLASS: &str = "Object";

/// Superclass of [`ROOT_CLASS`]; the top of every class chain
pub const BASIC_OBJECT: &str = "BasicObject";

/// The module mixed into [`ROOT_CLASS`], present in every ancestor list
pub const ROOT_MODULE: &str = "Kernel";

/// Join name segments with [`NAMESPACE_SEPARATOR`]
pub fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    let mut joined = String::new();
    for segment in segments {
        if !joined.is_empty() {
            joined.push_str(NAMESPACE_SEPARATOR);
        }
        joined.push_str(segment.as_ref());
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_segments() {
        assert_eq!(join_segments(&["Outer", "Inner"]), "Outer::Inner");
        assert_eq!(join_segments(&["Top"]), "Top");
        assert_eq!(join_segments::<&str>(&[]), "");
    }
}
