use std::collections::BTreeSet;

use super::SourcePairs;

/// Every distinct question over all rows of all sources, sorted lexicographically.
pub fn collect_questions(sources: &[SourcePairs]) -> Vec<String> {
    let set: BTreeSet<&str> = sources
        .iter()
        .flat_map(|s| s.rows.iter())
        .flat_map(|pairs| pairs.questions())
        .collect();
    set.into_iter().map(str::to_string).collect()
}
