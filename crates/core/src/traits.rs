use crate::error::SourceError;
use crate::models::{CandidateBatch, ToolResult};
use crate::store::CandidateQuery;
use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait CandidateSource {
    async fn find_candidates(&self, query: &CandidateQuery<'_>)
        -> Result<CandidateBatch, SourceError>;
}

#[async_trait]
impl<T> CandidateSource for &T
where
    T: CandidateSource + Sync + ?Sized,
{
    async fn find_candidates(
        &self,
        query: &CandidateQuery<'_>,
    ) -> Result<CandidateBatch, SourceError> {
        (**self).find_candidates(query).await
    }
}

#[async_trait]
pub trait Tool {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> Value;

    async fn execute(&self, args: &Value, cancel: &CancellationToken) -> ToolResult;
}
