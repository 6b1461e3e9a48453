pub mod aggregate;
pub mod dedup;
pub mod diversity;
pub mod error;
pub mod format;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod ranking;
pub mod scoring;
pub mod store;
pub mod stores;
pub mod text;
pub mod traits;

pub use aggregate::{aggregate_by_document, AggregationOutcome, MAX_DOCUMENT_GROUPS};
pub use dedup::deduplicate_candidates;
pub use diversity::{diversify, select_mmr, MMR_LAMBDA, MMR_MIN_CANDIDATES};
pub use error::{ErrorKind, GrepError, SourceError};
pub use format::render_report;
pub use models::{
    Candidate, CandidateBatch, ChunkRecord, DocumentAggregate, GrepData, GrepOutcome,
    InvocationScope, ScopeFilter, ScoredCandidate, SearchRequest, ToolResult, DEFAULT_MAX_RESULTS,
    DISPLAY_TYPE, MAX_RESULTS_LIMIT,
};
pub use orchestrator::{GrepChunksTool, TOOL_NAME};
pub use ranking::rank_candidates;
pub use scoring::{calculate_match_score, score_candidates};
pub use store::CandidateQuery;
pub use stores::{MemoryChunkStore, OpenSearchChunkStore};
pub use traits::{CandidateSource, Tool};
