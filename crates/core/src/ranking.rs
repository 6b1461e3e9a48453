use crate::models::ScoredCandidate;
use std::cmp::Ordering;

pub fn compare_candidates(left: &ScoredCandidate, right: &ScoredCandidate) -> Ordering {
    right
        .matched_patterns
        .cmp(&left.matched_patterns)
        .then_with(|| right.match_score.total_cmp(&left.match_score))
        .then_with(|| left.candidate.chunk_index.cmp(&right.candidate.chunk_index))
}

pub fn rank_candidates(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(compare_candidates);
}
