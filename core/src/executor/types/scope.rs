//! Scope claims are file paths; a trailing `/` claims a directory subtree.

use std::collections::BTreeSet;

/// Trims whitespace, a leading `./` and duplicate separators.
pub fn normalize_path(raw: &str) -> String {
    let mut path = raw.trim().replace('\\', "/");
    while let Some(rest) = path.strip_prefix("./") {
        path = rest.to_string();
    }
    while path.contains("//") {
        path = path.replace("//", "/");
    }
    path
}

/// True if `claim` covers `path`: an exact match, or `claim` is a directory prefix.
pub fn claim_covers(claim: &str, path: &str) -> bool {
    claim == path || (claim.ends_with('/') && path.starts_with(claim))
}

pub fn paths_overlap(a: &str, b: &str) -> bool {
    claim_covers(a, b) || claim_covers(b, a)
}

/// Entries of `a` that overlap anything in `b`.
pub fn scope_overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Vec<String> {
    a.iter()
        .filter(|pa| b.iter().any(|pb| paths_overlap(pa, pb)))
        .cloned()
        .collect()
}

/// True if `path` lies inside some entry of `parent`.
pub fn scope_contains(parent: &BTreeSet<String>, path: &str) -> bool {
    parent.iter().any(|claim| claim_covers(claim, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_paths_overlap() {
        assert!(paths_overlap("src/a.rs", "src/a.rs"));
        assert!(!paths_overlap("src/a.rs", "src/b.rs"));
    }

    #[test]
    fn directory_claim_covers_children() {
        assert!(paths_overlap("src/", "src/deep/a.rs"));
        assert!(paths_overlap("src/deep/a.rs", "src/"));
        assert!(!paths_overlap("src/", "srcx/a.rs"));
        assert!(!paths_overlap("src", "src/a.rs"));
    }

    #[test]
    fn overlap_reports_entries_from_left_side() {
        let a = set(&["assets/", "main.py"]);
        let b = set(&["assets/img.png", "util.py"]);
        assert_eq!(scope_overlap(&a, &b), vec!["assets/".to_string()]);
    }

    #[test]
    fn containment_uses_directory_claims() {
        let parent = set(&["game/", "main.py"]);
        assert!(scope_contains(&parent, "game/player.py"));
        assert!(scope_contains(&parent, "main.py"));
        assert!(!scope_contains(&parent, "README.md"));
    }

    #[test]
    fn normalize_strips_dot_prefix_and_doubled_separators() {
        assert_eq!(normalize_path(" ./a//b.rs "), "a/b.rs");
        assert_eq!(normalize_path("dir\\file.txt"), "dir/file.txt");
    }
}
