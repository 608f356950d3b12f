//! Maximal Marginal Relevance selection.
//!
//! Nearest-neighbour search over overlapping chunk windows tends to return
//! several near-identical passages. MMR picks candidates greedily, scoring
//! each one as
//!
//! ```text
//! score(i) = λ · cos(query, cᵢ) − (1 − λ) · max_{s ∈ selected} cos(cᵢ, c_s)
//! ```
//!
//! where the redundancy term is 0 while nothing is selected yet.

use crate::similarity::cosine_similarity;

/// Default relevance/diversity trade-off.
pub const DEFAULT_MMR_LAMBDA: f32 = 0.5;

/// Select up to `k` candidate indices by Maximal Marginal Relevance.
///
/// Returns indices into `candidates` in selection order. The result never
/// contains duplicates and never exceeds `min(k, candidates.len())` entries.
/// Ties go to the lowest index; NaN scores rank below every finite score.
/// `lambda` is clamped to `[0, 1]`.
///
/// # Example
///
/// ```rust
/// use clinic_rag::mmr_select;
///
/// let query = [0.8, 0.6];
/// let candidates: Vec<Vec<f32>> = vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![0.6, 0.8]];
/// let picked = mmr_select(&query, &candidates, 3, 0.5);
/// assert_eq!(picked, vec![2, 0, 1]);
/// ```
pub fn mmr_select<V: AsRef<[f32]>>(
    query: &[f32],
    candidates: &[V],
    k: usize,
    lambda: f32,
) -> Vec<usize> {
    let lambda = if lambda.is_nan() { DEFAULT_MMR_LAMBDA } else { lambda.clamp(0.0, 1.0) };
    let n = candidates.len();
    let limit = k.min(n);

    let relevance: Vec<f32> =
        candidates.iter().map(|c| cosine_similarity(query, c.as_ref())).collect();
    let mut max_sim_to_selected = vec![f32::NEG_INFINITY; n];
    let mut in_pool = vec![true; n];
    let mut selected = Vec::with_capacity(limit);

    while selected.len() < limit {
        let mut best: Option<(usize, f32)> = None;
        for i in (0..n).filter(|&i| in_pool[i]) {
            let redundancy = if selected.is_empty() { 0.0 } else { max_sim_to_selected[i] };
            let mut score = lambda * relevance[i] - (1.0 - lambda) * redundancy;
            if score.is_nan() {
                score = f32::NEG_INFINITY;
            }
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((i, score)),
            }
        }

        let Some((chosen, _)) = best else { break };
        in_pool[chosen] = false;
        selected.push(chosen);

        let chosen_vec = candidates[chosen].as_ref();
        for j in (0..n).filter(|&j| in_pool[j]) {
            let sim = cosine_similarity(candidates[j].as_ref(), chosen_vec);
            if sim > max_sim_to_selected[j] {
                max_sim_to_selected[j] = sim;
            }
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lambda_one_is_pure_relevance() {
        let query = [1.0, 0.0];
        let candidates: Vec<Vec<f32>> = vec![vec![0.0, 1.0], vec![1.0, 0.1], vec![1.0, 0.0]];
        assert_eq!(mmr_select(&query, &candidates, 3, 1.0), vec![2, 1, 0]);
    }

    #[test]
    fn near_duplicates_are_pushed_down() {
        let query = [0.9, 0.436, 0.0];
        let candidates: Vec<Vec<f32>> = vec![
            vec![1.0, 0.0, 0.0],
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
        ];
        let picked = mmr_select(&query, &candidates, 2, 0.5);
        assert_eq!(picked, vec![0, 2]);
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let query = [1.0, 0.0];
        let candidates: Vec<Vec<f32>> = vec![vec![0.0, 1.0], vec![0.0, 1.0]];
        assert_eq!(mmr_select(&query, &candidates, 1, 0.5), vec![0]);
    }

    #[test]
    fn empty_and_zero_k() {
        let none: Vec<Vec<f32>> = Vec::new();
        assert!(mmr_select(&[1.0], &none, 4, 0.5).is_empty());
        assert!(mmr_select(&[1.0], &[vec![1.0f32]], 0, 0.5).is_empty());
    }

    #[test]
    fn nan_candidates_do_not_win() {
        let query = [1.0, 0.0];
        let candidates: Vec<Vec<f32>> = vec![vec![f32::NAN, 0.0], vec![1.0, 0.0]];
        assert_eq!(mmr_select(&query, &candidates, 2, 0.5), vec![1, 0]);
    }
}
