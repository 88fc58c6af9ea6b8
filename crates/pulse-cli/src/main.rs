use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use pulse_core::{AppConfig, PostStore, RawPost};
use pulse_engine::{InsightEngine, PipelineConfig, TeiClient, TransformPipeline};

#[derive(Debug, Parser)]
#[command(name = "pulse")]
#[command(about = "Marketing-insight engine command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one incremental transform batch and print the report.
    Pipeline,
    /// Search processed posts by semantic similarity.
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        #[arg(long, default_value_t = 0.0)]
        engagement_threshold: f32,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        min_similarity: f32,
    },
    /// Classify search results into high-value content and content gaps.
    Insights {
        query: String,
        #[arg(long, default_value_t = 10)]
        top_k: usize,
        #[arg(long, default_value_t = 0.25, allow_hyphen_values = true)]
        similarity_threshold: f32,
    },
    /// Upsert raw posts from a JSON array file.
    Ingest {
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = pulse_core::load_app_config()?;

    let pool_config = pulse_db::PoolConfig::from_app_config(&config);
    let pool = pulse_db::connect_pool(&config.database_url, pool_config).await?;
    pulse_db::run_migrations(&pool).await?;
    let store: Arc<dyn PostStore> = Arc::new(pulse_db::PgStore::new(pool));

    match cli.command {
        Commands::Pipeline => run_pipeline(store, &config).await,
        Commands::Search {
            query,
            top_k,
            engagement_threshold,
            min_similarity,
        } => {
            run_search(
                store,
                &config,
                &query,
                top_k,
                engagement_threshold,
                min_similarity,
            )
            .await
        }
        Commands::Insights {
            query,
            top_k,
            similarity_threshold,
        } => run_insights(store, &config, &query, top_k, similarity_threshold).await,
        Commands::Ingest { file } => run_ingest(store, &file).await,
    }
}

fn build_embedder(config: &AppConfig) -> anyhow::Result<Arc<TeiClient>> {
    Ok(Arc::new(TeiClient::new(
        &config.tei_url,
        config.embed_timeout_secs,
        config.embed_batch_size,
    )?))
}

async fn run_pipeline(store: Arc<dyn PostStore>, config: &AppConfig) -> anyhow::Result<()> {
    let embedder = build_embedder(config)?;
    let pipeline = TransformPipeline::new(store, embedder, PipelineConfig::from(config));
    let report = pipeline.run().await?;

    println!("fetched:            {}", report.fetched);
    println!("duplicates dropped: {}", report.duplicates_dropped);
    println!("processed:          {}", report.processed);
    match report.watermark {
        Some(ts) => println!("watermark:          {ts}"),
        None => println!("watermark:          (unchanged)"),
    }
    for error in &report.validation_errors {
        println!("validation error:   {error}");
    }
    Ok(())
}

async fn run_search(
    store: Arc<dyn PostStore>,
    config: &AppConfig,
    query: &str,
    top_k: usize,
    engagement_threshold: f32,
    min_similarity: f32,
) -> anyhow::Result<()> {
    let engine = InsightEngine::new(store, build_embedder(config)?);
    let results = engine
        .search(query, top_k, engagement_threshold, min_similarity)
        .await?;

    if results.is_empty() {
        println!("no matching posts");
        return Ok(());
    }
    for result in results {
        println!(
            "{:.4}  [{}]  eng={:.1}  {}  {}",
            result.similarity,
            result.source_type,
            result.engagement_score,
            result.post_id,
            result.cleaned_text
        );
    }
    Ok(())
}

async fn run_insights(
    store: Arc<dyn PostStore>,
    config: &AppConfig,
    query: &str,
    top_k: usize,
    similarity_threshold: f32,
) -> anyhow::Result<()> {
    let engine = InsightEngine::new(store.clone(), build_embedder(config)?);
    let bundle = engine
        .get_insights(query, top_k, similarity_threshold)
        .await?;

    if let Err(e) = store.archive_insights(query, &bundle).await {
        tracing::warn!(error = %e, "failed to archive insight bundle");
    }

    println!("{}", serde_json::to_string_pretty(&bundle)?);
    Ok(())
}

async fn run_ingest(store: Arc<dyn PostStore>, file: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let posts: Vec<RawPost> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array of posts", file.display()))?;

    store.upsert_raw(&posts).await?;
    println!("ingested {} raw post(s)", posts.len());
    Ok(())
}
