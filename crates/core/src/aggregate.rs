use crate::models::{DocumentAggregate, ScoredCandidate};
use crate::text::count_occurrences;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

pub const MAX_DOCUMENT_GROUPS: usize = 20;
const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, Default)]
pub struct AggregationOutcome {
    pub documents: Vec<DocumentAggregate>,
    pub total_documents: usize,
}

pub fn count_pattern_occurrences(content: &str, patterns: &[String]) -> HashMap<String, usize> {
    let mut counts = HashMap::with_capacity(patterns.len());
    if content.is_empty() {
        return counts;
    }

    let lowered = content.to_lowercase();
    for pattern in patterns {
        if pattern.trim().is_empty() {
            continue;
        }
        counts.insert(
            pattern.clone(),
            count_occurrences(&lowered, &pattern.to_lowercase()),
        );
    }
    counts
}

fn compare_documents(left: &DocumentAggregate, right: &DocumentAggregate) -> Ordering {
    right
        .distinct_patterns
        .cmp(&left.distinct_patterns)
        .then_with(|| right.total_pattern_hits.cmp(&left.total_pattern_hits))
        .then_with(|| right.chunk_hit_count.cmp(&left.chunk_hit_count))
        .then_with(|| left.knowledge_title.cmp(&right.knowledge_title))
}

pub fn aggregate_by_document(ranked: &[ScoredCandidate], patterns: &[String]) -> AggregationOutcome {
    if ranked.is_empty() {
        return AggregationOutcome::default();
    }

    let pattern_keys = patterns
        .iter()
        .filter(|pattern| !pattern.trim().is_empty())
        .cloned()
        .collect::<Vec<_>>();

    let mut groups: Vec<DocumentAggregate> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for scored in ranked {
        let chunk = &scored.candidate;
        let group_key = if chunk.knowledge_id.is_empty() {
            format!("chunk-{}", chunk.chunk_id)
        } else {
            chunk.knowledge_id.clone()
        };

        let position = *positions.entry(group_key.clone()).or_insert_with(|| {
            let title = if chunk.knowledge_title.trim().is_empty() {
                UNTITLED.to_string()
            } else {
                chunk.knowledge_title.clone()
            };
            groups.push(DocumentAggregate {
                knowledge_id: group_key,
                knowledge_base_id: chunk.knowledge_base_id.clone(),
                knowledge_title: title,
                chunk_hit_count: 0,
                total_chunk_count: chunk.total_chunk_count,
                pattern_counts: pattern_keys
                    .iter()
                    .map(|pattern| (pattern.clone(), 0))
                    .collect::<BTreeMap<_, _>>(),
                total_pattern_hits: 0,
                distinct_patterns: 0,
            });
            groups.len() - 1
        });

        let entry = &mut groups[position];
        entry.chunk_hit_count += 1;

        let occurrences = count_pattern_occurrences(&chunk.content, &pattern_keys);
        for pattern in &pattern_keys {
            let count = occurrences.get(pattern).copied().unwrap_or(0);
            if count == 0 {
                continue;
            }
            *entry.pattern_counts.entry(pattern.clone()).or_insert(0) += count;
            entry.total_pattern_hits += count;
        }
    }

    for entry in &mut groups {
        entry.distinct_patterns = entry
            .pattern_counts
            .values()
            .filter(|count| **count > 0)
            .count();
    }

    groups.sort_by(compare_documents);
    let total_documents = groups.len();
    groups.truncate(MAX_DOCUMENT_GROUPS);

    AggregationOutcome {
        documents: groups,
        total_documents,
    }
}
