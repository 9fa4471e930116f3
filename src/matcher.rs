//! Row matching between the old (A) and new (B) record sets

use crate::error::{Result, SheetdiffError};
use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Separator between key parts in a composite key
pub const KEY_SEPARATOR: &str = "|";

/// Non-fatal findings from a matching pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchWarnings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_keys_a: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_keys_b: Option<usize>,
}

impl MatchWarnings {
    fn from_counts(duplicates_a: usize, duplicates_b: usize) -> Self {
        Self {
            duplicate_keys_a: (duplicates_a > 0).then_some(duplicates_a),
            duplicate_keys_b: (duplicates_b > 0).then_some(duplicates_b),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.duplicate_keys_a.is_none() && self.duplicate_keys_b.is_none()
    }
}

/// Pairs of `(index_a, index_b)` plus the unmatched indices of each side
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    pub pairs: Vec<(usize, usize)>,
    pub only_a: Vec<usize>,
    pub only_b: Vec<usize>,
    pub warnings: MatchWarnings,
}

/// Build the composite key of a record.
///
/// Each key field contributes its normalized value, trimmed and lower-cased;
/// absent fields contribute an empty part.
pub fn make_key(record: &Record, key_fields: &[String]) -> String {
    key_fields
        .iter()
        .map(|field| {
            record
                .get(field)
                .map(|value| value.normalized().trim().to_lowercase())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(KEY_SEPARATOR)
}

/// Map composite key → index of its first occurrence
pub fn build_key_index(records: &[Record], key_fields: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        index.entry(make_key(record, key_fields)).or_insert(i);
    }
    index
}

fn duplicate_count(keys: &[String]) -> usize {
    let distinct: HashSet<&str> = keys.iter().map(String::as_str).collect();
    keys.len() - distinct.len()
}

fn report_duplicates(keys_a: &[String], keys_b: &[String]) -> MatchWarnings {
    let warnings = MatchWarnings::from_counts(duplicate_count(keys_a), duplicate_count(keys_b));
    if let Some(count) = warnings.duplicate_keys_a {
        log::warn!("{} duplicate key(s) in file A; only first occurrences are matched", count);
    }
    if let Some(count) = warnings.duplicate_keys_b {
        log::warn!("{} duplicate key(s) in file B; only first occurrences are matched", count);
    }
    warnings
}

/// Exact composite-key matching.
///
/// Only the first occurrence of a key on either side takes part; later
/// duplicates end up in `only_a` / `only_b` and are counted in the warnings.
pub fn exact_match(records_a: &[Record], records_b: &[Record], key_fields: &[String]) -> MatchOutcome {
    let keys_a: Vec<String> = records_a.iter().map(|r| make_key(r, key_fields)).collect();
    let keys_b: Vec<String> = records_b.iter().map(|r| make_key(r, key_fields)).collect();

    let mut index_b: HashMap<&str, usize> = HashMap::new();
    for (j, key) in keys_b.iter().enumerate() {
        index_b.entry(key.as_str()).or_insert(j);
    }

    let mut pairs = Vec::new();
    let mut only_a = Vec::new();
    let mut matched_b = vec![false; records_b.len()];
    let mut seen_a: HashSet<&str> = HashSet::new();

    for (i, key) in keys_a.iter().enumerate() {
        let first_occurrence = seen_a.insert(key.as_str());
        match index_b.get(key.as_str()) {
            Some(&j) if first_occurrence => {
                pairs.push((i, j));
                matched_b[j] = true;
            }
            _ => only_a.push(i),
        }
    }

    let only_b: Vec<usize> = (0..records_b.len()).filter(|&j| !matched_b[j]).collect();
    let warnings = report_duplicates(&keys_a, &keys_b);

    log::debug!(
        "Exact match: {} pairs, {} only in A, {} only in B",
        pairs.len(),
        only_a.len(),
        only_b.len()
    );

    MatchOutcome {
        pairs,
        only_a,
        only_b,
        warnings,
    }
}

/// Fuzzy matching with the default row ceiling
pub fn fuzzy_match(
    records_a: &[Record],
    records_b: &[Record],
    key_fields: &[String],
    threshold: f64,
) -> Result<MatchOutcome> {
    fuzzy_match_with_limit(
        records_a,
        records_b,
        key_fields,
        threshold,
        crate::DEFAULT_FUZZY_ROW_LIMIT,
    )
}

/// Greedy fuzzy matching.
///
/// Each A record, in order, first claims an unused B record with an identical
/// key; otherwise it claims the unused B record with the highest similarity
/// strictly above `threshold`, the lowest B index winning ties. Claims are
/// never revisited, so the outcome depends on A's order.
pub fn fuzzy_match_with_limit(
    records_a: &[Record],
    records_b: &[Record],
    key_fields: &[String],
    threshold: f64,
    row_limit: usize,
) -> Result<MatchOutcome> {
    for (side, rows) in [('A', records_a.len()), ('B', records_b.len())] {
        if rows > row_limit {
            return Err(SheetdiffError::MatchSizeExceeded {
                side,
                rows,
                limit: row_limit,
            });
        }
    }

    let keys_a: Vec<String> = records_a.iter().map(|r| make_key(r, key_fields)).collect();
    let keys_b: Vec<String> = records_b.iter().map(|r| make_key(r, key_fields)).collect();

    let mut positions_b: HashMap<&str, Vec<usize>> = HashMap::new();
    for (j, key) in keys_b.iter().enumerate() {
        positions_b.entry(key.as_str()).or_default().push(j);
    }

    let mut pairs = Vec::new();
    let mut matched_a = vec![false; records_a.len()];
    let mut used_b = vec![false; records_b.len()];

    for (i, key_a) in keys_a.iter().enumerate() {
        let exact = positions_b
            .get(key_a.as_str())
            .and_then(|candidates| candidates.iter().copied().find(|&j| !used_b[j]));

        let chosen = exact.or_else(|| {
            let mut best: Option<usize> = None;
            let mut best_score = threshold;
            for (j, key_b) in keys_b.iter().enumerate() {
                if used_b[j] {
                    continue;
                }
                let score = similarity_ratio(key_a, key_b);
                if score > best_score {
                    best_score = score;
                    best = Some(j);
                }
            }
            best
        });

        if let Some(j) = chosen {
            used_b[j] = true;
            matched_a[i] = true;
            pairs.push((i, j));
        }
    }

    let only_a: Vec<usize> = (0..records_a.len()).filter(|&i| !matched_a[i]).collect();
    let only_b: Vec<usize> = (0..records_b.len()).filter(|&j| !used_b[j]).collect();
    let warnings = report_duplicates(&keys_a, &keys_b);

    log::debug!(
        "Fuzzy match (threshold {}): {} pairs, {} only in A, {} only in B",
        threshold,
        pairs.len(),
        only_a.len(),
        only_b.len()
    );

    Ok(MatchOutcome {
        pairs,
        only_a,
        only_b,
        warnings,
    })
}

/// Sequence similarity `2·M / T` in `[0, 1]`.
///
/// `M` counts characters in the matching blocks found by repeatedly taking
/// the longest common substring and recursing on both sides of it; `T` is
/// the combined length. Two empty strings are identical.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / total as f64
}

fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common substring of `a[alo..ahi]` and `b[blo..bhi]`.
/// Ties go to the block that starts earliest in `a`, then in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let width = bhi - blo;
    let mut prev = vec![0usize; width + 1];
    let mut curr = vec![0usize; width + 1];
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);

    for i in alo..ahi {
        for j in blo..bhi {
            let k = j - blo + 1;
            if a[i] == b[j] {
                curr[k] = prev[k - 1] + 1;
                if curr[k] > best_size {
                    best_size = curr[k];
                    best_i = i + 1 - best_size;
                    best_j = j + 1 - best_size;
                }
            } else {
                curr[k] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_size)
}
