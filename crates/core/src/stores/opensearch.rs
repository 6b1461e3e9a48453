use crate::error::SourceError;
use crate::models::{CandidateBatch, ChunkRecord};
use crate::store::CandidateQuery;
use crate::traits::CandidateSource;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

const BACKEND: &str = "opensearch";
const PAGE_SIZE: usize = 1_000;

pub struct OpenSearchChunkStore {
    client: Arc<Client>,
    endpoint: String,
    index_name: String,
}

impl OpenSearchChunkStore {
    pub fn new(endpoint: impl Into<String>, index_name: impl Into<String>) -> Self {
        Self {
            client: Arc::new(Client::new()),
            endpoint: endpoint.into(),
            index_name: index_name.into(),
        }
    }

    fn url(&self, path: &str) -> Result<Url, SourceError> {
        let mut base = self.endpoint.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        Ok(Url::parse(&base)?.join(path)?)
    }

    pub async fn ensure_index(&self) -> Result<(), SourceError> {
        let response = self.client.head(self.url(&self.index_name)?).send().await?;

        if response.status() == StatusCode::OK {
            return Ok(());
        }

        if !response.status().is_client_error() {
            return Err(SourceError::BackendResponse {
                backend: BACKEND.to_string(),
                details: response.status().to_string(),
            });
        }

        let response = self
            .client
            .put(self.url(&self.index_name)?)
            .json(&index_mapping())
            .send()
            .await?;

        if response.status().is_server_error() || response.status().is_client_error() {
            return Err(SourceError::Request(format!(
                "open-search index setup failed with {}",
                response.status()
            )));
        }

        Ok(())
    }

    pub async fn index_chunks(&self, records: &[ChunkRecord]) -> Result<(), SourceError> {
        let mut operations = Vec::with_capacity(records.len() * 2);

        for record in records {
            operations.push(json!({
                "index": {
                    "_index": self.index_name,
                    "_id": record.id,
                }
            }));
            operations.push(serde_json::to_value(record)?);
        }

        if operations.is_empty() {
            return Ok(());
        }

        let payload: String = operations
            .into_iter()
            .map(|value| serde_json::to_string(&value))
            .collect::<Result<Vec<_>, serde_json::Error>>()?
            .join("\n")
            + "\n";

        let mut url = self.url("_bulk")?;
        url.set_query(Some("refresh=wait_for"));
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/x-ndjson")
            .body(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::BackendResponse {
                backend: BACKEND.to_string(),
                details: response.status().to_string(),
            });
        }

        let body: Value = response.json().await?;
        if body.get("errors").and_then(Value::as_bool).unwrap_or(false) {
            return Err(SourceError::BackendResponse {
                backend: BACKEND.to_string(),
                details: "bulk request reported item errors".to_string(),
            });
        }
        Ok(())
    }

    async fn post_search(&self, body: &Value) -> Result<Value, SourceError> {
        let response = self
            .client
            .post(self.url(&format!("{}/_search", self.index_name))?)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::BackendResponse {
                backend: BACKEND.to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl CandidateSource for OpenSearchChunkStore {
    async fn find_candidates(
        &self,
        query: &CandidateQuery<'_>,
    ) -> Result<CandidateBatch, SourceError> {
        let mut records = Vec::new();
        let mut total_matches = 0;
        let mut cursor: Option<Value> = None;
        let mut pages = 0usize;

        loop {
            let response = self
                .post_search(&build_candidate_query(query, cursor.as_ref()))
                .await?;
            if pages == 0 {
                total_matches = response
                    .pointer("/hits/total/value")
                    .and_then(Value::as_u64)
                    .unwrap_or_default();
            }
            pages += 1;

            let page = parse_hits(&response)?;
            let page_len = page.len();
            records.extend(page);

            cursor = last_sort_values(&response);
            if page_len < PAGE_SIZE || cursor.is_none() {
                break;
            }
        }
        debug!(pages, fetched = records.len(), total_matches, "fetched candidate pages");

        if (records.len() as u64) < total_matches {
            warn!(
                fetched = records.len(),
                total_matches,
                "candidate pages ended before the reported match count"
            );
        }

        let fetched = records.len();
        records.retain(|record| query.matches_content(&record.content));
        if records.len() != fetched {
            warn!(
                fetched,
                kept = records.len(),
                "dropped hits that failed the substring check"
            );
        }

        let knowledge_ids = records
            .iter()
            .map(|record| record.knowledge_id.clone())
            .filter(|id| !id.is_empty())
            .collect::<BTreeSet<_>>();

        let totals = if knowledge_ids.is_empty() {
            HashMap::new()
        } else {
            let counts = self
                .post_search(&build_document_count_query(query.tenant_id, &knowledge_ids))
                .await?;
            parse_document_counts(&counts)
        };
        debug!(documents = totals.len(), "fetched document chunk totals");

        let candidates = records
            .into_iter()
            .map(|record| {
                let total = totals.get(&record.knowledge_id).copied().unwrap_or(1);
                record.into_candidate(total)
            })
            .collect();

        Ok(CandidateBatch {
            candidates,
            total_matches,
        })
    }
}

fn index_mapping() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 0
        },
        "mappings": {
            "properties": {
                "id": {"type": "keyword"},
                "tenant_id": {"type": "long"},
                "knowledge_id": {"type": "keyword"},
                "knowledge_base_id": {"type": "keyword"},
                "parent_chunk_id": {"type": "keyword"},
                "content": {
                    "type": "text",
                    "fields": {
                        "substring": {"type": "wildcard"}
                    }
                },
                "chunk_index": {"type": "long"},
                "knowledge_title": {"type": "keyword"},
                "is_enabled": {"type": "boolean"},
                "deleted_at": {"type": "date"},
                "knowledge_deleted_at": {"type": "date"},
                "created_at": {"type": "date"}
            }
        }
    })
}

pub fn escape_wildcard(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len() + 2);
    for ch in pattern.chars() {
        if matches!(ch, '\\' | '*' | '?') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn visibility_filters(tenant_id: u64) -> (Vec<Value>, Vec<Value>) {
    let filter = vec![
        json!({"term": {"tenant_id": tenant_id}}),
        json!({"term": {"is_enabled": true}}),
    ];
    let must_not = vec![
        json!({"exists": {"field": "deleted_at"}}),
        json!({"exists": {"field": "knowledge_deleted_at"}}),
    ];
    (filter, must_not)
}

pub fn build_candidate_query(query: &CandidateQuery<'_>, search_after: Option<&Value>) -> Value {
    let (mut filter, must_not) = visibility_filters(query.tenant_id);

    if !query.scope.knowledge_ids.is_empty() {
        filter.push(json!({"terms": {"knowledge_id": query.scope.knowledge_ids}}));
    } else if !query.scope.knowledge_base_ids.is_empty() {
        filter.push(json!({"terms": {"knowledge_base_id": query.scope.knowledge_base_ids}}));
    }

    let should = query
        .patterns
        .iter()
        .map(|pattern| {
            json!({
                "wildcard": {
                    "content.substring": {
                        "value": format!("*{}*", escape_wildcard(pattern)),
                        "case_insensitive": true
                    }
                }
            })
        })
        .collect::<Vec<_>>();

    let mut body = json!({
        "size": PAGE_SIZE,
        "track_total_hits": true,
        "sort": [
            {"created_at": {"order": "desc"}},
            {"id": {"order": "asc"}}
        ],
        "query": {
            "bool": {
                "filter": filter,
                "must_not": must_not,
                "should": should,
                "minimum_should_match": 1
            }
        }
    });

    if let Some(after) = search_after {
        body["search_after"] = after.clone();
    }
    body
}

fn build_document_count_query(tenant_id: u64, knowledge_ids: &BTreeSet<String>) -> Value {
    let (mut filter, must_not) = visibility_filters(tenant_id);
    filter.push(json!({"terms": {"knowledge_id": knowledge_ids}}));

    json!({
        "size": 0,
        "query": {
            "bool": {
                "filter": filter,
                "must_not": must_not
            }
        },
        "aggs": {
            "by_document": {
                "terms": {
                    "field": "knowledge_id",
                    "size": knowledge_ids.len()
                }
            }
        }
    })
}

fn parse_hits(response: &Value) -> Result<Vec<ChunkRecord>, SourceError> {
    let hits = response
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut records = Vec::with_capacity(hits.len());
    for raw in hits {
        let Some(source) = raw.get("_source").cloned() else {
            return Err(SourceError::BackendResponse {
                backend: BACKEND.to_string(),
                details: "hit without _source".to_string(),
            });
        };
        records.push(serde_json::from_value::<ChunkRecord>(source)?);
    }
    Ok(records)
}

fn last_sort_values(response: &Value) -> Option<Value> {
    response
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .and_then(|hits| hits.last())
        .and_then(|hit| hit.get("sort"))
        .cloned()
}

fn parse_document_counts(response: &Value) -> HashMap<String, usize> {
    response
        .pointer("/aggregations/by_document/buckets")
        .and_then(Value::as_array)
        .map(|buckets| {
            buckets
                .iter()
                .filter_map(|bucket| {
                    let key = bucket.get("key")?.as_str()?.to_string();
                    let count = bucket.get("doc_count")?.as_u64()? as usize;
                    Some((key, count))
                })
                .collect()
        })
        .unwrap_or_default()
}
