use crate::aggregate::aggregate_by_document;
use crate::dedup::deduplicate_candidates;
use crate::diversity::diversify;
use crate::error::GrepError;
use crate::format::render_report;
use crate::ranking::rank_candidates;
use crate::scoring::score_candidates;
use crate::store::CandidateQuery;
use crate::traits::{CandidateSource, Tool};
use crate::{GrepData, GrepOutcome, InvocationScope, SearchRequest, ToolResult, DISPLAY_TYPE};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub const TOOL_NAME: &str = "grep_chunks";

const DESCRIPTION: &str = "Unix-style literal text matching over knowledge base chunks. \
Accepts one or more short keywords (1-3 words each: proper nouns, domain terms, version numbers) \
and returns documents whose enabled chunks contain any of them (case-insensitive, OR logic). \
This is exact keyword lookup, not semantic search; long phrases sharply reduce recall.";

pub struct GrepChunksTool<S>
where
    S: CandidateSource,
{
    source: S,
    scope: InvocationScope,
}

impl<S> GrepChunksTool<S>
where
    S: CandidateSource + Send + Sync,
{
    pub fn new(source: S, scope: InvocationScope) -> Self {
        Self { source, scope }
    }

    pub fn scope(&self) -> &InvocationScope {
        &self.scope
    }

    pub async fn search(
        &self,
        request: &SearchRequest,
        cancel: &CancellationToken,
    ) -> Result<GrepOutcome, GrepError> {
        info!(
            patterns = ?request.patterns,
            max_results = request.max_results,
            knowledge_ids = ?request.scope.knowledge_ids,
            "grep_chunks started"
        );

        if cancel.is_cancelled() {
            return Err(GrepError::Cancelled);
        }

        let query = CandidateQuery::new(self.scope.tenant_id, &request.scope, &request.patterns);
        let batch = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GrepError::Cancelled),
            result = self.source.find_candidates(&query) => result?,
        };
        let raw_match_count = batch.total_matches;
        info!(found = batch.candidates.len(), total_matches = raw_match_count, "candidates fetched");

        let fetched = batch.candidates.len();
        let unique = deduplicate_candidates(batch.candidates);
        info!(kept = unique.len(), fetched, "deduplicated candidates");

        let scored = score_candidates(unique, &request.patterns);
        let mut selected = diversify(scored, request.max_results);
        debug!(selected = selected.len(), "diversification done");

        rank_candidates(&mut selected);

        let aggregation = aggregate_by_document(&selected, &request.patterns);
        info!(
            documents = aggregation.documents.len(),
            total_documents = aggregation.total_documents,
            "aggregated results"
        );

        let output = render_report(
            &aggregation.documents,
            raw_match_count,
            &request.patterns,
            request.count_only,
        );

        Ok(GrepOutcome {
            output,
            data: GrepData {
                patterns: request.patterns.clone(),
                result_count: aggregation.documents.len(),
                knowledge_results: aggregation.documents,
                total_matches: aggregation.total_documents,
                knowledge_base_ids: request.scope.knowledge_base_ids.clone(),
                max_results: request.max_results,
                display_type: DISPLAY_TYPE.to_string(),
            },
            raw_match_count,
        })
    }
}

#[async_trait]
impl<S> Tool for GrepChunksTool<S>
where
    S: CandidateSource + Send + Sync,
{
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "array",
                    "description": "REQUIRED: literal text patterns, matched case-insensitively; results match any of them (OR logic).",
                    "items": { "type": "string" },
                    "minItems": 1
                },
                "knowledge_base_ids": {
                    "type": "array",
                    "description": "Filter by knowledge base IDs. If empty, searches all allowed knowledge bases.",
                    "items": { "type": "string" }
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of matching chunks to keep (default: 50, max: 200)",
                    "default": 50,
                    "minimum": 1,
                    "maximum": 200
                }
            },
            "required": ["pattern"]
        })
    }

    async fn execute(&self, args: &Value, cancel: &CancellationToken) -> ToolResult {
        let request = match SearchRequest::from_args(args, &self.scope) {
            Ok(request) => request,
            Err(err) => {
                error!(error = %err, "missing or invalid pattern parameter");
                return ToolResult::failure(err.to_string());
            }
        };

        match self.search(&request, cancel).await {
            Ok(outcome) => ToolResult::success(outcome),
            Err(err) => {
                error!(error = %err, kind = ?err.kind(), "grep_chunks failed");
                ToolResult::failure(format!("Search failed: {err}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, SourceError};
    use crate::models::{Candidate, CandidateBatch};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeCandidateSource {
        candidates: Vec<Candidate>,
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl CandidateSource for FakeCandidateSource {
        async fn find_candidates(
            &self,
            query: &CandidateQuery<'_>,
        ) -> Result<CandidateBatch, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SourceError::Request("connection refused".to_string()));
            }
            let candidates = self
                .candidates
                .iter()
                .filter(|c| query.matches_content(&c.content))
                .cloned()
                .collect::<Vec<_>>();
            Ok(CandidateBatch {
                total_matches: candidates.len() as u64,
                candidates,
            })
        }
    }

    struct PendingCandidateSource;

    #[async_trait]
    impl CandidateSource for PendingCandidateSource {
        async fn find_candidates(
            &self,
            _query: &CandidateQuery<'_>,
        ) -> Result<CandidateBatch, SourceError> {
            std::future::pending::<()>().await;
            Ok(CandidateBatch::default())
        }
    }

    fn chunk(id: &str, knowledge_id: &str, index: u64, content: &str) -> Candidate {
        Candidate {
            chunk_id: id.to_string(),
            knowledge_id: knowledge_id.to_string(),
            knowledge_base_id: "kb-1".to_string(),
            parent_chunk_id: None,
            content: content.to_string(),
            chunk_index: index,
            knowledge_title: "Network runbook".to_string(),
            total_chunk_count: 3,
        }
    }

    fn scope() -> InvocationScope {
        InvocationScope {
            tenant_id: 1,
            allowed_knowledge_base_ids: vec!["kb-1".to_string()],
            knowledge_ids: Vec::new(),
        }
    }

    #[tokio::test]
    async fn timeout_retry_scenario_aggregates_one_document() {
        let source = FakeCandidateSource {
            candidates: vec![
                chunk("A", "doc-1", 0, "Connection timeout while dialing"),
                chunk("B", "doc-1", 1, "After a timeout the client will retry"),
                chunk("C", "doc-1", 2, "Unrelated closing remarks"),
            ],
            ..Default::default()
        };
        let tool = GrepChunksTool::new(source, scope());
        let request = SearchRequest::new(["timeout", "retry"], Vec::new(), None, tool.scope()).unwrap();

        let outcome = tool.search(&request, &CancellationToken::new()).await.unwrap();
        assert_eq!(outcome.raw_match_count, 2);

        let data = &outcome.data;
        assert_eq!(data.result_count, 1);
        assert_eq!(data.total_matches, 1);
        assert_eq!(data.display_type, "grep_results");
        assert_eq!(data.knowledge_base_ids, vec!["kb-1"]);

        let doc = &data.knowledge_results[0];
        assert_eq!(doc.chunk_hit_count, 2);
        assert_eq!(doc.pattern_counts["timeout"], 2);
        assert_eq!(doc.pattern_counts["retry"], 1);
        assert_eq!(doc.distinct_patterns, 2);
        assert!(outcome.output.contains("pattern_hits=[timeout=2, retry=1]"));
    }

    #[test]
    fn chunk_matching_more_patterns_ranks_first() {
        let patterns = vec!["timeout".to_string(), "retry".to_string()];
        let mut scored = score_candidates(
            vec![
                chunk("A", "doc-1", 0, "Connection timeout while dialing"),
                chunk("B", "doc-1", 1, "After a timeout the client will retry"),
            ],
            &patterns,
        );
        rank_candidates(&mut scored);
        assert_eq!(scored[0].candidate.chunk_id, "B");
        assert_eq!(scored[0].matched_patterns, 2);
        assert_eq!(scored[1].matched_patterns, 1);
    }

    #[tokio::test]
    async fn empty_pattern_fails_without_querying_the_source() {
        let tool = GrepChunksTool::new(FakeCandidateSource::default(), scope());
        let result = tool
            .execute(&json!({"pattern": "   "}), &CancellationToken::new())
            .await;

        assert!(!result.success);
        assert!(result.data.is_none());
        assert!(result.error.unwrap().contains("pattern parameter is required"));
        assert_eq!(tool.source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn identical_chunks_collapse_before_diversification() {
        let source = FakeCandidateSource {
            candidates: (0..15)
                .map(|i| chunk(&format!("c{i}"), &format!("doc-{i}"), i, "X appears here"))
                .collect(),
            ..Default::default()
        };
        let tool = GrepChunksTool::new(source, scope());
        let result = tool
            .execute(&json!({"pattern": ["X"], "max_results": 5}), &CancellationToken::new())
            .await;

        let data = result.data.expect("success carries data");
        assert_eq!(data.max_results, 5);
        assert_eq!(data.result_count, 1);
        assert_eq!(data.knowledge_results[0].knowledge_id, "doc-0");
        assert_eq!(data.knowledge_results[0].chunk_hit_count, 1);
    }

    #[tokio::test]
    async fn source_failure_is_a_dependency_error() {
        let source = FakeCandidateSource {
            fail: true,
            ..Default::default()
        };
        let tool = GrepChunksTool::new(source, scope());
        let request = SearchRequest::new(["x"], Vec::new(), None, tool.scope()).unwrap();

        let err = tool.search(&request, &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Dependency);

        let result = tool.execute(&json!({"pattern": ["x"]}), &CancellationToken::new()).await;
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Search failed: candidate query failed: connection refused")
        );
    }

    #[tokio::test]
    async fn no_candidates_is_a_successful_empty_result() {
        let tool = GrepChunksTool::new(FakeCandidateSource::default(), scope());
        let result = tool.execute(&json!({"pattern": ["absent"]}), &CancellationToken::new()).await;

        assert!(result.success);
        assert!(result.output.ends_with("No matches found.\n"));
        let data = result.data.unwrap();
        assert!(data.knowledge_results.is_empty());
        assert_eq!(data.total_matches, 0);
    }

    #[tokio::test]
    async fn cancelled_token_skips_the_source() {
        let tool = GrepChunksTool::new(FakeCandidateSource::default(), scope());
        let request = SearchRequest::new(["x"], Vec::new(), None, tool.scope()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = tool.search(&request, &cancel).await.unwrap_err();
        assert!(matches!(err, GrepError::Cancelled));
        assert_eq!(tool.source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_pending_query() {
        let tool = GrepChunksTool::new(PendingCandidateSource, scope());
        let request = SearchRequest::new(["x"], Vec::new(), None, tool.scope()).unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move { trigger.cancel() });

        let err = tool.search(&request, &cancel).await.unwrap_err();
        assert!(matches!(err, GrepError::Cancelled));
    }

    #[tokio::test]
    async fn repeated_runs_are_identical() {
        let source = FakeCandidateSource {
            candidates: (0..30)
                .map(|i| {
                    chunk(
                        &format!("c{i}"),
                        &format!("doc-{}", i % 7),
                        i,
                        &format!("alpha section {i} beta notes {}", i % 4),
                    )
                })
                .collect(),
            ..Default::default()
        };
        let tool = GrepChunksTool::new(source, scope());
        let args = json!({"pattern": ["alpha", "notes 1"], "max_results": 12});

        let first = tool.execute(&args, &CancellationToken::new()).await;
        let second = tool.execute(&args, &CancellationToken::new()).await;
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn schema_requires_pattern() {
        let tool = GrepChunksTool::new(FakeCandidateSource::default(), scope());
        assert_eq!(tool.name(), "grep_chunks");
        assert_eq!(tool.parameters()["required"], json!(["pattern"]));
    }
}
