use http::request::Parts;

/// Selects the requests a filter chain or an ignore rule applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestMatcher {
    /// Every request.
    Any,
    /// Exactly this path.
    Exact(String),
    /// This path and everything below it, on segment boundaries.
    Prefix(String),
}

impl RequestMatcher {
    /// Match a path and everything below it.
    pub fn prefix(path: impl Into<String>) -> Self {
        RequestMatcher::Prefix(path.into())
    }

    /// Match exactly one path.
    pub fn exact(path: impl Into<String>) -> Self {
        RequestMatcher::Exact(path.into())
    }

    /// Whether the request is selected.
    pub fn matches(&self, parts: &Parts) -> bool {
        self.matches_path(parts.uri.path())
    }

    /// Whether a bare path is selected.
    pub fn matches_path(&self, path: &str) -> bool {
        match self {
            RequestMatcher::Any => true,
            RequestMatcher::Exact(expected) => path == expected,
            RequestMatcher::Prefix(prefix) => {
                let prefix = prefix.trim_end_matches('/');
                match path.strip_prefix(prefix) {
                    Some(rest) => rest.is_empty() || rest.starts_with('/'),
                    None => false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_respects_segment_boundaries() {
        let api = RequestMatcher::prefix("/api");
        assert!(api.matches_path("/api"));
        assert!(api.matches_path("/api/users"));
        assert!(!api.matches_path("/apix"));
        assert!(!api.matches_path("/"));
    }

    #[test]
    fn root_prefix_matches_everything() {
        let root = RequestMatcher::prefix("/");
        assert!(root.matches_path("/"));
        assert!(root.matches_path("/anything"));
    }

    #[test]
    fn exact_matches_one_path() {
        let login = RequestMatcher::exact("/login");
        assert!(login.matches_path("/login"));
        assert!(!login.matches_path("/login/again"));
    }
}
