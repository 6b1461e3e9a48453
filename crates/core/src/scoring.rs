use crate::models::{Candidate, ScoredCandidate};

const POSITION_BONUS_WEIGHT: f64 = 0.1;

pub fn calculate_match_score(content: &str, patterns: &[String]) -> (f64, usize) {
    if content.is_empty() || patterns.is_empty() {
        return (0.0, 0);
    }

    let lowered = content.to_lowercase();
    let mut matched = 0usize;
    let mut earliest = content.len();

    for pattern in patterns {
        let needle = pattern.to_lowercase();
        if let Some(position) = lowered.find(&needle) {
            matched += 1;
            earliest = earliest.min(position);
        }
    }

    let base_score = matched as f64 / patterns.len() as f64;
    let position_bonus = if earliest < content.len() {
        (1.0 - earliest as f64 / content.len() as f64) * POSITION_BONUS_WEIGHT
    } else {
        0.0
    };

    ((base_score + position_bonus).min(1.0), matched)
}

pub fn score_candidates(candidates: Vec<Candidate>, patterns: &[String]) -> Vec<ScoredCandidate> {
    candidates
        .into_iter()
        .map(|candidate| {
            let (match_score, matched_patterns) =
                calculate_match_score(&candidate.content, patterns);
            ScoredCandidate {
                candidate,
                match_score,
                matched_patterns,
            }
        })
        .collect()
}
