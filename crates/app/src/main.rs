use chrono::Utc;
use chunk_grep_core::{
    CandidateSource, GrepChunksTool, InvocationScope, MemoryChunkStore, OpenSearchChunkStore,
    Tool, ToolResult,
};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "chunk-grep", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// OpenSearch base URL
    #[arg(long, env = "CHUNK_GREP_OPENSEARCH_URL", default_value = "http://localhost:9200")]
    opensearch_url: String,

    /// OpenSearch index name
    #[arg(long, env = "CHUNK_GREP_OPENSEARCH_INDEX", default_value = "kb_chunks")]
    opensearch_index: String,

    /// Tenant whose chunks are visible to searches.
    #[arg(long, env = "CHUNK_GREP_TENANT_ID", default_value = "1")]
    tenant_id: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Load chunk records from JSON / JSON-lines files and index them into OpenSearch.
    Index {
        /// File or folder holding chunk records.
        #[arg(long)]
        corpus: PathBuf,
    },
    /// Run the grep_chunks tool and print its report.
    Grep {
        /// Literal pattern; repeat for OR matching.
        #[arg(long = "pattern", required = true)]
        patterns: Vec<String>,
        /// Knowledge base filter supplied by the caller.
        #[arg(long = "kb")]
        knowledge_base_ids: Vec<String>,
        /// Default knowledge bases used when no --kb is given.
        #[arg(long = "allowed-kb")]
        allowed_knowledge_base_ids: Vec<String>,
        /// Restrict to these documents; overrides knowledge base filters.
        #[arg(long = "doc")]
        knowledge_ids: Vec<String>,
        /// Maximum number of chunks kept after diversification.
        #[arg(long, default_value = "50")]
        max_results: i64,
        /// Print only the raw match count.
        #[arg(long, default_value_t = false)]
        count_only: bool,
        /// Search an in-memory corpus instead of OpenSearch.
        #[arg(long)]
        corpus: Option<PathBuf>,
        /// Print the full tool result as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "chunk-grep boot"
    );

    match cli.command {
        Command::Index { corpus } => {
            let store = MemoryChunkStore::load_from_path(&corpus)?;
            if store.is_empty() {
                warn!(path = %corpus.display(), "corpus holds no chunk records");
            }
            info!(path = %corpus.display(), chunk_count = store.len(), "indexing chunks");

            let opensearch = OpenSearchChunkStore::new(&cli.opensearch_url, &cli.opensearch_index);
            opensearch.ensure_index().await?;
            opensearch.index_chunks(store.records()).await?;

            println!(
                "{} chunks indexed at {}",
                store.len(),
                Utc::now().to_rfc3339()
            );
        }
        Command::Grep {
            patterns,
            knowledge_base_ids,
            allowed_knowledge_base_ids,
            knowledge_ids,
            max_results,
            count_only,
            corpus,
            json,
        } => {
            let scope = InvocationScope {
                tenant_id: cli.tenant_id,
                allowed_knowledge_base_ids,
                knowledge_ids,
            };
            let args = json!({
                "pattern": patterns,
                "knowledge_base_ids": knowledge_base_ids,
                "max_results": max_results,
                "count_only": count_only,
            });

            let result = match corpus {
                Some(path) => {
                    let store = MemoryChunkStore::load_from_path(&path)?;
                    run_tool(store, scope, &args).await
                }
                None => {
                    let store = OpenSearchChunkStore::new(&cli.opensearch_url, &cli.opensearch_index);
                    run_tool(store, scope, &args).await
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", result.output);
            }

            if let Some(error) = result.error {
                anyhow::bail!(error);
            }
        }
    }

    Ok(())
}

async fn run_tool<S>(source: S, scope: InvocationScope, args: &serde_json::Value) -> ToolResult
where
    S: CandidateSource + Send + Sync,
{
    let tool = GrepChunksTool::new(source, scope);
    let cancel = CancellationToken::new();

    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling search");
            on_interrupt.cancel();
        }
    });

    let result = tool.execute(args, &cancel).await;
    watcher.abort();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn corpus_errors_keep_their_source_chain() {
        let missing = Path::new("/nonexistent/chunks.json");
        let error: anyhow::Error = MemoryChunkStore::load_from_path(missing).unwrap_err().into();

        assert_eq!(error.chain().count(), 2);
        assert!(error.root_cause().downcast_ref::<std::io::Error>().is_some());
    }
}
