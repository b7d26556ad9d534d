use std::fmt;

/// Rendered search predicate, e.g. `stars:16 created:<=2014`.
///
/// Filters are opaque: two filters are the same only when their rendered
/// strings are identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Filter(String);

impl Filter {
    pub fn new(predicate: impl Into<String>) -> Self {
        Self(predicate.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full search string sent to the API, restricted to public repositories.
    pub fn search_string(&self) -> String {
        format!("is:public {}", self.0)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
