use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_MAX_RESULTS: usize = 50;
pub const MAX_RESULTS_LIMIT: usize = 200;
pub const DISPLAY_TYPE: &str = "grep_results";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct InvocationScope {
    pub tenant_id: u64,
    pub allowed_knowledge_base_ids: Vec<String>,
    pub knowledge_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct ScopeFilter {
    pub knowledge_base_ids: Vec<String>,
    pub knowledge_ids: Vec<String>,
}

impl ScopeFilter {
    pub fn admits(&self, knowledge_id: &str, knowledge_base_id: &str) -> bool {
        if !self.knowledge_ids.is_empty() {
            self.knowledge_ids.iter().any(|id| id == knowledge_id)
        } else if !self.knowledge_base_ids.is_empty() {
            self.knowledge_base_ids.iter().any(|id| id == knowledge_base_id)
        } else {
            true
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchRequest {
    pub patterns: Vec<String>,
    pub scope: ScopeFilter,
    pub max_results: usize,
    pub count_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkRecord {
    pub id: String,
    pub tenant_id: u64,
    pub knowledge_id: String,
    pub knowledge_base_id: String,
    #[serde(default)]
    pub parent_chunk_id: Option<String>,
    pub content: String,
    pub chunk_index: u64,
    #[serde(default)]
    pub knowledge_title: String,
    #[serde(default = "enabled_by_default")]
    pub is_enabled: bool,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub knowledge_deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

fn enabled_by_default() -> bool {
    true
}

impl ChunkRecord {
    pub fn is_searchable(&self) -> bool {
        self.is_enabled && self.deleted_at.is_none() && self.knowledge_deleted_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub chunk_id: String,
    pub knowledge_id: String,
    pub knowledge_base_id: String,
    pub parent_chunk_id: Option<String>,
    pub content: String,
    pub chunk_index: u64,
    pub knowledge_title: String,
    pub total_chunk_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CandidateBatch {
    pub candidates: Vec<Candidate>,
    pub total_matches: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub match_score: f64,
    pub matched_patterns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentAggregate {
    pub knowledge_id: String,
    pub knowledge_base_id: String,
    pub knowledge_title: String,
    pub chunk_hit_count: usize,
    pub total_chunk_count: usize,
    pub pattern_counts: BTreeMap<String, usize>,
    pub total_pattern_hits: usize,
    pub distinct_patterns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GrepData {
    pub patterns: Vec<String>,
    pub knowledge_results: Vec<DocumentAggregate>,
    pub result_count: usize,
    pub total_matches: usize,
    pub knowledge_base_ids: Vec<String>,
    pub max_results: usize,
    pub display_type: String,
}

#[derive(Debug, Clone)]
pub struct GrepOutcome {
    pub output: String,
    pub data: GrepData,
    pub raw_match_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<GrepData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(outcome: GrepOutcome) -> Self {
        Self {
            success: true,
            output: outcome.output,
            data: Some(outcome.data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            data: None,
            error: Some(error.into()),
        }
    }
}
