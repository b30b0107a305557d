//! Cross-sectional relative price strength ranking.
//!
//! Ranks every instrument's latest lookback change against the universe and
//! maps rank r of n valid observations to r/n * 100, so scores lie in
//! (0, 100]. Ties receive the average of the tied ranks. NaN changes are
//! excluded from both the output and the denominator.

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Percentile-rank the given `(code, change)` pairs.
///
/// Codes whose change is NaN get no entry. The result does not depend on
/// the order of the input pairs.
pub fn compute_rps(changes: &[(String, f64)]) -> BTreeMap<String, f64> {
    let mut valid: Vec<(&str, f64)> = changes
        .iter()
        .filter(|(_, change)| !change.is_nan())
        .map(|(code, change)| (code.as_str(), *change))
        .collect();

    valid.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(b.0))
    });

    let n = valid.len() as f64;
    let mut scores = BTreeMap::new();
    let mut i = 0;
    while i < valid.len() {
        let mut j = i;
        while j + 1 < valid.len() && valid[j + 1].1 == valid[i].1 {
            j += 1;
        }
        // 1-indexed ascending ranks; tied values share the average rank.
        let rank = (i + j + 2) as f64 / 2.0;
        let score = rank / n * 100.0;
        for (code, _) in &valid[i..=j] {
            scores.insert((*code).to_string(), score);
        }
        i = j + 1;
    }

    scores
}
