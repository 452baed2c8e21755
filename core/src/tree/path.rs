//! Slash-path parsing and validation for the resource tree.
//!
//! Paths are `/`-separated; absolute paths start with `/`. Client-facing
//! operations accept paths with or without a leading slash (both resolve
//! relative to the client namespace), so splitting trims outer slashes
//! before validating each segment.

/// Maximum number of segments in any path.
pub const MAX_PATH_DEPTH: usize = 32;

/// Maximum byte length of a single path segment.
pub const MAX_SEGMENT_LEN: usize = 64;

/// True if the path names the tree from the root.
pub fn is_absolute(path: &str) -> bool {
    path.starts_with('/')
}

/// Check one path segment: non-empty, no separator, no dot-navigation,
/// bounded length.
pub fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment.len() <= MAX_SEGMENT_LEN
        && segment != "."
        && segment != ".."
        && !segment.contains('/')
}

/// Split a path into validated segments.
///
/// Outer slashes are trimmed, so `"a/b"`, `"/a/b"` and `"a/b/"` all split
/// to `["a", "b"]`; the empty path splits to no segments (it names the base
/// entry itself). Returns `None` on any malformed segment or when the depth
/// cap is exceeded; lookups treat that as not-found.
pub fn split(path: &str) -> Option<Vec<&str>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Some(Vec::new());
    }
    let segments: Vec<&str> = trimmed.split('/').collect();
    if segments.len() > MAX_PATH_DEPTH {
        return None;
    }
    if segments.iter().any(|s| !is_valid_segment(s)) {
        return None;
    }
    Some(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_plain_path() {
        assert_eq!(split("sensor/temp").unwrap(), vec!["sensor", "temp"]);
    }

    #[test]
    fn split_trims_outer_slashes() {
        assert_eq!(split("/sensor/temp").unwrap(), vec!["sensor", "temp"]);
        assert_eq!(split("sensor/temp/").unwrap(), vec!["sensor", "temp"]);
    }

    #[test]
    fn empty_path_names_base() {
        assert_eq!(split("").unwrap(), Vec::<&str>::new());
        assert_eq!(split("/").unwrap(), Vec::<&str>::new());
    }

    #[test]
    fn empty_interior_segment_is_malformed() {
        assert!(split("a//b").is_none());
    }

    #[test]
    fn dot_navigation_is_malformed() {
        assert!(split("a/./b").is_none());
        assert!(split("a/../b").is_none());
    }

    #[test]
    fn depth_cap_enforced() {
        let deep = vec!["x"; MAX_PATH_DEPTH].join("/");
        assert!(split(&deep).is_some());
        let too_deep = vec!["x"; MAX_PATH_DEPTH + 1].join("/");
        assert!(split(&too_deep).is_none());
    }

    #[test]
    fn segment_length_cap_enforced() {
        let ok = "s".repeat(MAX_SEGMENT_LEN);
        assert!(split(&ok).is_some());
        let long = "s".repeat(MAX_SEGMENT_LEN + 1);
        assert!(split(&long).is_none());
    }

    #[test]
    fn absolute_detection() {
        assert!(is_absolute("/obs/x"));
        assert!(!is_absolute("obs/x"));
    }
}
