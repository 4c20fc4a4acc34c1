//! Rendering options.

use regex::Regex;

/// Which entities get a `(location: ...)` annotation
#[derive(Debug, Clone, Default)]
pub enum LocationFilter {
    #[default]
    Always,
    Never,
    /// Only entities whose name matches; methods are judged by their owner's name
    Matching(Regex),
}

impl LocationFilter {
    pub fn permits(&self, name: &str) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Matching(pattern) => pattern.is_match(name),
        }
    }
}

impl From<bool> for LocationFilter {
    fn from(show: bool) -> Self {
        if show { Self::Always } else { Self::Never }
    }
}

impl From<Regex> for LocationFilter {
    fn from(pattern: Regex) -> Self {
        Self::Matching(pattern)
    }
}

/// Options for [`render`](super::render)
#[derive(Debug, Clone)]
pub struct TreeOptions {
    pub show_methods: bool,
    pub show_locations: LocationFilter,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            show_methods: true,
            show_locations: LocationFilter::Always,
        }
    }
}

impl TreeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_methods(mut self, show: bool) -> Self {
        self.show_methods = show;
        self
    }

    pub fn with_locations(mut self, filter: impl Into<LocationFilter>) -> Self {
        self.show_locations = filter.into();
        self
    }
}
