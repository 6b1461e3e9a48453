use crate::models::Candidate;
use crate::text::content_signature;
use std::collections::HashSet;

fn identity_keys(candidate: &Candidate) -> Vec<String> {
    let mut keys = vec![candidate.chunk_id.clone()];
    if let Some(parent) = candidate.parent_chunk_id.as_deref().filter(|id| !id.is_empty()) {
        keys.push(format!("parent:{parent}"));
    }
    if !candidate.knowledge_id.is_empty() {
        keys.push(format!(
            "kb:{}#{}",
            candidate.knowledge_id, candidate.chunk_index
        ));
    }
    keys
}

/// Keeps the first occurrence in input order. A candidate is a duplicate when
/// it shares a chunk id, a parent chunk id or a `(document, position)` pair
/// with an earlier survivor, or when its content signature was already seen.
/// Signature rejects do not register their keys.
pub fn deduplicate_candidates(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen_keys = HashSet::new();
    let mut seen_signatures = HashSet::new();
    let mut unique = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let keys = identity_keys(&candidate);
        if keys.iter().any(|key| seen_keys.contains(key)) {
            continue;
        }

        let signature = content_signature(&candidate.content);
        if !signature.is_empty() && !seen_signatures.insert(signature) {
            continue;
        }

        seen_keys.extend(keys);
        unique.push(candidate);
    }

    let mut seen_ids = HashSet::new();
    unique.retain(|candidate| seen_ids.insert(candidate.chunk_id.clone()));
    unique
}
