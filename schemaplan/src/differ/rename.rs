//! Rename detection between removed and added fields.
//!
//! A removed/added pair is only ever a rename candidate when type and
//! nullability match exactly; candidates are then ranked by name similarity
//! and claimed greedily. An exact tie is surfaced as an error, never guessed.

use std::cmp::Ordering;

use crate::errors::DiffError;
use crate::schema::Field;

/// Minimum normalized name similarity for a removed/added pair to count as a
/// rename. The score is `1 - levenshtein / max_len`, so 0.4 keeps
/// `nm -> name` (0.5) and rejects pairs sharing little more than a prefix
/// character.
pub const RENAME_SIMILARITY_THRESHOLD: f64 = 0.4;

struct Candidate {
    removed_i: usize,
    added_i: usize,
    dist: usize,
    max_len: usize,
    proximity: usize,
}

impl Candidate {
    fn matched(&self) -> usize {
        self.max_len - self.dist
    }
}

/// Similarity ordering without going through floats: a/b vs c/d compared by
/// cross-multiplication, then shorter edit distance, then declaration-order
/// proximity.
fn rank(a: &Candidate, b: &Candidate) -> Ordering {
    (b.matched() * a.max_len)
        .cmp(&(a.matched() * b.max_len))
        .then(a.dist.cmp(&b.dist))
        .then(a.proximity.cmp(&b.proximity))
        .then(a.removed_i.cmp(&b.removed_i))
        .then(a.added_i.cmp(&b.added_i))
}

fn tied(a: &Candidate, b: &Candidate) -> bool {
    a.matched() * b.max_len == b.matched() * a.max_len
        && a.dist == b.dist
        && a.proximity == b.proximity
}

/// Pair up removed and added fields that look like renames.
///
/// `removed` and `added` carry each field with its declaration position in
/// its own snapshot. Returns index pairs into the two slices.
pub(crate) fn detect_renames(
    removed: &[(usize, &Field)],
    added: &[(usize, &Field)],
) -> Result<Vec<(usize, usize)>, DiffError> {
    let mut candidates = Vec::new();
    for (removed_i, (from_pos, old)) in removed.iter().enumerate() {
        for (added_i, (to_pos, new)) in added.iter().enumerate() {
            if old.ty != new.ty || old.nullable != new.nullable {
                continue;
            }
            let dist = levenshtein(&old.name, &new.name);
            let max_len = old.name.chars().count().max(new.name.chars().count());
            if max_len == 0 {
                continue;
            }
            let score = 1.0 - dist as f64 / max_len as f64;
            if score > RENAME_SIMILARITY_THRESHOLD {
                candidates.push(Candidate {
                    removed_i,
                    added_i,
                    dist,
                    max_len,
                    proximity: from_pos.abs_diff(*to_pos),
                });
            }
        }
    }

    candidates.sort_by(rank);

    let mut claimed_removed = vec![false; removed.len()];
    let mut claimed_added = vec![false; added.len()];
    let mut pairs = Vec::new();

    for (i, candidate) in candidates.iter().enumerate() {
        if claimed_removed[candidate.removed_i] || claimed_added[candidate.added_i] {
            continue;
        }
        // A still-claimable candidate that conflicts with this one and ranks
        // identically leaves the pairing undecidable.
        let mut rivals: Vec<String> = candidates[i + 1..]
            .iter()
            .filter(|&other| {
                tied(candidate, other)
                    && !claimed_removed[other.removed_i]
                    && !claimed_added[other.added_i]
                    && (other.removed_i == candidate.removed_i || other.added_i == candidate.added_i)
            })
            .map(|other| added[other.added_i].1.name.clone())
            .collect();
        if !rivals.is_empty() {
            let mut candidates_out = vec![added[candidate.added_i].1.name.clone()];
            candidates_out.append(&mut rivals);
            candidates_out.sort();
            candidates_out.dedup();
            return Err(DiffError::AmbiguousRename {
                removed: removed[candidate.removed_i].1.name.clone(),
                candidates: candidates_out,
            });
        }
        claimed_removed[candidate.removed_i] = true;
        claimed_added[candidate.added_i] = true;
        pairs.push((candidate.removed_i, candidate.added_i));
    }

    Ok(pairs)
}

/// Classic two-row Levenshtein over chars.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("nm", "name"), 2);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn test_pairs_matching_types_only() {
        let old = Field::new("nm", FieldType::String);
        let new_str = Field::new("name", FieldType::String);
        let new_int = Field::new("name", FieldType::Integer);

        let pairs = detect_renames(&[(0, &old)], &[(0, &new_str)]).unwrap();
        assert_eq!(pairs, vec![(0, 0)]);

        let pairs = detect_renames(&[(0, &old)], &[(0, &new_int)]).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_nullability_must_match() {
        let old = Field::new("nm", FieldType::String);
        let new = Field::new("name", FieldType::String).nullable();
        let pairs = detect_renames(&[(0, &old)], &[(0, &new)]).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_similarity_at_threshold_is_not_a_rename() {
        // 1 - 3/5 = 0.4 exactly: not strictly above the threshold.
        let old = Field::new("ed", FieldType::String);
        let new = Field::new("email", FieldType::String);
        let pairs = detect_renames(&[(0, &old)], &[(0, &new)]).unwrap();
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_proximity_breaks_score_ties() {
        let old = Field::new("aa", FieldType::String);
        let near = Field::new("ab", FieldType::String);
        let far = Field::new("ac", FieldType::String);
        // Equal similarity and distance; the candidate at the nearer
        // declaration position wins.
        let pairs = detect_renames(&[(1, &old)], &[(1, &near), (3, &far)]).unwrap();
        assert_eq!(pairs, vec![(0, 0)]);
    }

    #[test]
    fn test_exact_tie_is_ambiguous() {
        let old = Field::new("aa", FieldType::String);
        let left = Field::new("ab", FieldType::String);
        let right = Field::new("ac", FieldType::String);
        let err = detect_renames(&[(1, &old)], &[(0, &left), (2, &right)]).unwrap_err();
        match err {
            DiffError::AmbiguousRename { removed, candidates } => {
                assert_eq!(removed, "aa");
                assert_eq!(candidates, vec!["ab".to_string(), "ac".to_string()]);
            }
            other => panic!("expected AmbiguousRename, got {other:?}"),
        }
    }
}
