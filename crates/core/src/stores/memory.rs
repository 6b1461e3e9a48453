use crate::error::SourceError;
use crate::models::{CandidateBatch, ChunkRecord};
use crate::store::CandidateQuery;
use crate::traits::CandidateSource;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, Default)]
pub struct MemoryChunkStore {
    records: Vec<ChunkRecord>,
}

impl MemoryChunkStore {
    pub fn new(records: Vec<ChunkRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ChunkRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn insert(&mut self, record: ChunkRecord) {
        self.records.push(record);
    }

    pub fn load_from_path(path: &Path) -> Result<Self, SourceError> {
        let files = if path.is_dir() {
            discover_corpus_files(path)
        } else {
            vec![path.to_path_buf()]
        };

        if files.is_empty() {
            return Err(SourceError::Request(format!(
                "no .json or .jsonl chunk files found in {}",
                path.display()
            )));
        }

        let mut records = Vec::new();
        for file in files {
            let loaded = read_records(&file)?;
            debug!(path = %file.display(), records = loaded.len(), "loaded chunk file");
            records.extend(loaded);
        }
        Ok(Self::new(records))
    }
}

pub fn discover_corpus_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_corpus = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json") || ext.eq_ignore_ascii_case("jsonl"));

        if is_corpus {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

fn read_records(path: &Path) -> Result<Vec<ChunkRecord>, SourceError> {
    let raw = fs::read_to_string(path)?;
    let is_lines = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl"));

    if !is_lines {
        return Ok(serde_json::from_str(&raw)?);
    }

    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<ChunkRecord>(line).map_err(SourceError::from))
        .collect()
}

#[async_trait]
impl CandidateSource for MemoryChunkStore {
    async fn find_candidates(
        &self,
        query: &CandidateQuery<'_>,
    ) -> Result<CandidateBatch, SourceError> {
        let mut document_totals: HashMap<&str, usize> = HashMap::new();
        for record in self
            .records
            .iter()
            .filter(|record| record.tenant_id == query.tenant_id && record.is_searchable())
        {
            *document_totals.entry(record.knowledge_id.as_str()).or_insert(0) += 1;
        }

        let mut matches = self
            .records
            .iter()
            .filter(|record| query.admits(record) && query.matches_content(&record.content))
            .collect::<Vec<_>>();
        matches.sort_by(|left, right| right.created_at.cmp(&left.created_at));

        let candidates = matches
            .into_iter()
            .map(|record| {
                let total = document_totals
                    .get(record.knowledge_id.as_str())
                    .copied()
                    .unwrap_or(1);
                record.clone().into_candidate(total)
            })
            .collect::<Vec<_>>();

        Ok(CandidateBatch {
            total_matches: candidates.len() as u64,
            candidates,
        })
    }
}
