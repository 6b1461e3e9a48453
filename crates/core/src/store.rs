use crate::models::{Candidate, ChunkRecord, ScopeFilter};

#[derive(Debug, Clone, Copy)]
pub struct CandidateQuery<'a> {
    pub tenant_id: u64,
    pub scope: &'a ScopeFilter,
    pub patterns: &'a [String],
}

impl<'a> CandidateQuery<'a> {
    pub fn new(tenant_id: u64, scope: &'a ScopeFilter, patterns: &'a [String]) -> Self {
        Self {
            tenant_id,
            scope,
            patterns,
        }
    }

    pub fn matches_content(&self, content: &str) -> bool {
        let lowered = content.to_lowercase();
        self.patterns
            .iter()
            .any(|pattern| !pattern.is_empty() && lowered.contains(&pattern.to_lowercase()))
    }

    pub fn admits(&self, record: &ChunkRecord) -> bool {
        record.tenant_id == self.tenant_id
            && record.is_searchable()
            && self.scope.admits(&record.knowledge_id, &record.knowledge_base_id)
    }
}

impl ChunkRecord {
    pub fn into_candidate(self, total_chunk_count: usize) -> Candidate {
        Candidate {
            chunk_id: self.id,
            knowledge_id: self.knowledge_id,
            knowledge_base_id: self.knowledge_base_id,
            parent_chunk_id: self.parent_chunk_id.filter(|id| !id.is_empty()),
            content: self.content,
            chunk_index: self.chunk_index,
            knowledge_title: self.knowledge_title,
            total_chunk_count,
        }
    }
}
