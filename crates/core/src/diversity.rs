use crate::models::ScoredCandidate;
use crate::text::{jaccard, tokenize_simple, TokenSet};
use tracing::debug;

pub const MMR_LAMBDA: f64 = 0.7;
pub const MMR_MIN_CANDIDATES: usize = 10;

#[derive(Debug, Clone, Copy)]
struct MmrPick {
    pool_pos: usize,
    mmr_score: f64,
}

impl MmrPick {
    fn better_than(self, other: &Self) -> bool {
        self.mmr_score > other.mmr_score
    }
}

pub fn diversify(candidates: Vec<ScoredCandidate>, max_results: usize) -> Vec<ScoredCandidate> {
    if candidates.len() <= MMR_MIN_CANDIDATES {
        return candidates;
    }

    let k = candidates.len().min(max_results);
    debug!(
        k,
        lambda = MMR_LAMBDA,
        input = candidates.len(),
        "applying mmr"
    );
    select_mmr(candidates, k, MMR_LAMBDA)
}

/// Greedy Maximal Marginal Relevance selection.
///
/// Each step moves the pool member with the strictly highest
/// `lambda * relevance - (1 - lambda) * max_jaccard(selected)` into the result;
/// the earliest pool member wins ties.
pub fn select_mmr(candidates: Vec<ScoredCandidate>, k: usize, lambda: f64) -> Vec<ScoredCandidate> {
    if k == 0 || candidates.is_empty() {
        return Vec::new();
    }

    let mut pool: Vec<(ScoredCandidate, TokenSet)> = candidates
        .into_iter()
        .map(|candidate| {
            let tokens = tokenize_simple(&candidate.candidate.content);
            (candidate, tokens)
        })
        .collect();
    let mut selected: Vec<(ScoredCandidate, TokenSet)> = Vec::with_capacity(k.min(pool.len()));

    while selected.len() < k && !pool.is_empty() {
        let mut best: Option<MmrPick> = None;

        for (pool_pos, (candidate, tokens)) in pool.iter().enumerate() {
            let redundancy = selected
                .iter()
                .map(|(_, chosen)| jaccard(tokens, chosen))
                .fold(0.0_f64, f64::max);
            let pick = MmrPick {
                pool_pos,
                mmr_score: lambda * candidate.match_score - (1.0 - lambda) * redundancy,
            };

            if best.map_or(true, |current| pick.better_than(&current)) {
                best = Some(pick);
            }
        }

        let Some(best) = best else { break };
        selected.push(pool.remove(best.pool_pos));
    }

    let token_sets = selected.iter().map(|(_, tokens)| tokens).collect::<Vec<_>>();
    debug!(
        selected = selected.len(),
        avg_redundancy = average_pairwise_redundancy(&token_sets),
        "mmr completed"
    );

    selected.into_iter().map(|(candidate, _)| candidate).collect()
}

pub fn average_pairwise_redundancy(token_sets: &[&TokenSet]) -> f64 {
    let mut total = 0.0;
    let mut pairs = 0usize;
    for (i, left) in token_sets.iter().enumerate() {
        for right in &token_sets[i + 1..] {
            total += jaccard(left, right);
            pairs += 1;
        }
    }
    if pairs == 0 {
        0.0
    } else {
        total / pairs as f64
    }
}
