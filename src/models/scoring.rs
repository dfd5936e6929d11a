//! Post-processing of raw model scores: softmax and top-k ranking

/// Normalize raw scores into a probability distribution.
///
/// The maximum is subtracted before exponentiation so large logits do not
/// overflow. An empty input yields an empty output. Infinite scores share all
/// of the probability mass.
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if max == f32::INFINITY {
        let infinite = scores.iter().filter(|&&s| s == f32::INFINITY).count();
        let share = 1.0 / infinite as f32;
        return scores
            .iter()
            .map(|&s| if s == f32::INFINITY { share } else { 0.0 })
            .collect();
    }
    if !max.is_finite() {
        return uniform_or_empty(scores.len());
    }

    let exps: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    if sum > 0.0 && sum.is_finite() {
        exps.into_iter().map(|e| e / sum).collect()
    } else {
        uniform_or_empty(scores.len())
    }
}

fn uniform_or_empty(len: usize) -> Vec<f32> {
    if len == 0 {
        Vec::new()
    } else {
        vec![1.0 / len as f32; len]
    }
}

/// Indices of the `k` highest probabilities, highest first.
///
/// Equal probabilities keep their original index order, as a stable
/// descending sort would.
pub fn top_k_indices(probabilities: &[f32], k: usize) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..probabilities.len()).collect();
    indices.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]));
    indices.truncate(k);
    indices
}

/// Index of the single highest probability
pub fn argmax(probabilities: &[f32]) -> Option<usize> {
    top_k_indices(probabilities, 1).first().copied()
}
