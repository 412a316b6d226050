//! Deterministic renaming of duplicated row identifiers.

use itertools::Itertools;
use std::collections::{HashMap, HashSet};

/// Rename duplicated identifiers by appending a per-value ordinal.
///
/// `["A", "B", "A"]` becomes `["A_1", "B", "A_2"]`. Values occurring once
/// pass through unchanged and positions are preserved. Matching is exact
/// and case-sensitive.
///
/// An ordinal whose name already occurs in `ids` is skipped, so
/// `["A", "A", "A_1"]` becomes `["A_2", "A_3", "A_1"]` and the output never
/// holds a repeated value.
pub fn resolve_duplicates<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    let counts = ids.iter().map(|s| s.as_ref()).counts();
    let mut taken: HashSet<String> = ids.iter().map(|s| s.as_ref().to_string()).collect();
    let mut next: HashMap<&str, usize> = HashMap::new();

    ids.iter()
        .map(|id| {
            let id = id.as_ref();
            if counts.get(id).copied().unwrap_or(0) <= 1 {
                return id.to_string();
            }
            let k = next.entry(id).or_insert(0);
            loop {
                *k += 1;
                let candidate = format!("{}_{}", id, k);
                if taken.insert(candidate.clone()) {
                    return candidate;
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinal_suffixes() {
        let ids = ["A", "B", "A", "C", "A"];
        assert_eq!(
            resolve_duplicates(&ids),
            vec!["A_1", "B", "A_2", "C", "A_3"]
        );
    }

    #[test]
    fn test_unique_list_unchanged() {
        let ids = vec!["P1".to_string(), "P2".to_string(), "p1".to_string()];
        assert_eq!(resolve_duplicates(&ids), ids);
        assert_eq!(resolve_duplicates(&resolve_duplicates(&ids)), ids);
    }

    #[test]
    fn test_independent_counters() {
        let ids = ["X", "Y", "Y", "X"];
        assert_eq!(resolve_duplicates(&ids), vec!["X_1", "Y_1", "Y_2", "X_2"]);
    }

    #[test]
    fn test_existing_suffix_is_skipped() {
        let ids = ["A", "A", "A_1"];
        assert_eq!(resolve_duplicates(&ids), vec!["A_2", "A_3", "A_1"]);

        let ids = ["A", "A_1", "A", "A_1"];
        let out = resolve_duplicates(&ids);
        assert_eq!(out, vec!["A_2", "A_1_1", "A_3", "A_1_2"]);
        assert!(out.iter().all_unique());
    }

    #[test]
    fn test_empty() {
        let ids: [&str; 0] = [];
        assert!(resolve_duplicates(&ids).is_empty());
    }
}
