use crate::models::DocumentAggregate;

pub fn render_report(
    documents: &[DocumentAggregate],
    raw_match_count: u64,
    patterns: &[String],
    count_only: bool,
) -> String {
    let mut output = String::new();

    if count_only {
        output.push_str(&format!("{raw_match_count}\n"));
        return output;
    }

    if let [pattern] = patterns {
        output.push_str(&format!("Pattern: '{pattern}' (case-insensitive)\n"));
    } else {
        output.push_str(&format!(
            "Patterns ({}): [{}] (case-insensitive, OR logic)\n",
            patterns.len(),
            patterns.join(" ")
        ));
    }
    output.push_str(&format!("Matches: {} knowledge item(s)\n\n", documents.len()));

    if documents.is_empty() {
        output.push_str("No matches found.\n");
        return output;
    }

    for (index, document) in documents.iter().enumerate() {
        let pattern_hits = patterns
            .iter()
            .map(|pattern| {
                let count = document.pattern_counts.get(pattern).copied().unwrap_or(0);
                format!("{pattern}={count}")
            })
            .collect::<Vec<_>>()
            .join(", ");

        output.push_str(&format!(
            "{}) knowledge_id={} | title={} | chunk_hits={} | chunk_total={} | pattern_hits=[{}]\n",
            index + 1,
            document.knowledge_id,
            document.knowledge_title,
            document.chunk_hit_count,
            document.total_chunk_count,
            pattern_hits,
        ));
    }

    output
}
