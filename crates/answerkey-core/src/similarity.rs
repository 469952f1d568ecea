//! Text normalization and cosine similarity over term frequencies.

use std::collections::HashMap;

/// Split text into lowercase alphanumeric tokens.
///
/// Any run of non-alphanumeric characters is a separator; empty tokens are
/// dropped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Count occurrences of each token in `text`.
pub fn term_frequencies(text: &str) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    for token in tokenize(text) {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

/// Cosine similarity between the term-frequency vectors of `a` and `b`.
///
/// Symmetric and bounded in `[0, 1]`. Returns 0.0 when either side has no
/// tokens, including when both are empty.
pub fn similarity(a: &str, b: &str) -> f64 {
    let freq_a = term_frequencies(a);
    let freq_b = term_frequencies(b);
    if freq_a.is_empty() || freq_b.is_empty() {
        return 0.0;
    }

    // Iterate the smaller map; terms absent from either side contribute nothing.
    let (small, large) = if freq_a.len() <= freq_b.len() {
        (&freq_a, &freq_b)
    } else {
        (&freq_b, &freq_a)
    };
    let dot: u128 = small
        .iter()
        .filter_map(|(term, &count)| {
            large
                .get(term)
                .map(|&other| u128::from(count) * u128::from(other))
        })
        .sum();

    let norm_sq = |freq: &HashMap<String, u64>| -> u128 {
        freq.values().map(|&c| u128::from(c) * u128::from(c)).sum()
    };
    // Single sqrt over the product keeps identical vectors at exactly 1.0.
    // The product is taken in f64; long answers overflow any integer type.
    let denominator = (norm_sq(&freq_a) as f64 * norm_sq(&freq_b) as f64).sqrt();

    (dot as f64 / denominator).clamp(0.0, 1.0)
}
