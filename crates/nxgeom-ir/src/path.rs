//! Path handling for `depends_on` references.
//!
//! Paths are `/`-separated and absolute once resolved. A reference is one of:
//! the terminal sentinel `.` (or an empty string), an absolute path, or a path
//! relative to the group that contains the referencing field.

/// Terminal `depends_on` sentinel.
pub const TERMINAL: &str = ".";

/// Whether a `depends_on` reference ends the chain.
pub fn is_terminal(reference: &str) -> bool {
    let r = reference.trim();
    r.is_empty() || r == TERMINAL
}

/// Collapse repeated separators and `.`/`..` segments into an absolute path.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Parent group of an absolute path (`/` for top-level nodes).
pub fn parent(path: &str) -> String {
    let norm = normalize(path);
    match norm.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => norm[..i].to_string(),
    }
}

/// Resolve `reference` against the group `container`.
///
/// Returns `None` for the terminal sentinel.
pub fn resolve_reference(container: &str, reference: &str) -> Option<String> {
    let r = reference.trim();
    if is_terminal(r) {
        return None;
    }
    if r.starts_with('/') {
        Some(normalize(r))
    } else {
        Some(normalize(&format!("{}/{}", container, r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_forms() {
        assert!(is_terminal("."));
        assert!(is_terminal(""));
        assert!(is_terminal(" . "));
        assert!(!is_terminal("/entry/sample"));
    }

    #[test]
    fn normalize_segments() {
        assert_eq!(normalize("entry//sample/./x"), "/entry/sample/x");
        assert_eq!(normalize("/entry/sample/../beam"), "/entry/beam");
        assert_eq!(normalize("/"), "/");
    }

    #[test]
    fn parent_of_path() {
        assert_eq!(parent("/entry/sample/transformations/phi"), "/entry/sample/transformations");
        assert_eq!(parent("/entry"), "/");
    }

    #[test]
    fn resolve_relative_and_absolute() {
        let c = "/entry/sample/transformations";
        assert_eq!(resolve_reference(c, "chi").as_deref(), Some("/entry/sample/transformations/chi"));
        assert_eq!(resolve_reference(c, "../../beam").as_deref(), Some("/entry/beam"));
        assert_eq!(resolve_reference(c, "/entry/x").as_deref(), Some("/entry/x"));
        assert_eq!(resolve_reference(c, "."), None);
    }
}
