//! Postgres + pgvector implementation of [`PostStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::PgPool;
use uuid::Uuid;

use pulse_core::{InsightBundle, PostStore, ProcessedPost, RawPost, SimilarityResult, StoreError};

/// Postgres-backed post store. Nearest-neighbour queries use the pgvector
/// cosine distance operator; batch commits run in a single transaction.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_sqlx(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut => StoreError::Timeout,
        other => StoreError::Unavailable(other.to_string()),
    }
}

#[derive(sqlx::FromRow)]
struct RawPostRow {
    id: String,
    content: String,
    likes: i64,
    shares: i64,
    comments: i64,
    source_type: String,
    created_at: DateTime<Utc>,
    platform: String,
    author: String,
}

impl TryFrom<RawPostRow> for RawPost {
    type Error = StoreError;

    fn try_from(row: RawPostRow) -> Result<Self, Self::Error> {
        let source_type = row
            .source_type
            .parse()
            .map_err(StoreError::Unavailable)?;
        Ok(RawPost {
            id: row.id,
            text: row.content,
            likes: row.likes,
            shares: row.shares,
            comments: row.comments,
            source_type,
            created_at: row.created_at,
            platform: row.platform,
            author: row.author,
        })
    }
}

#[derive(sqlx::FromRow)]
struct NearestRow {
    id: String,
    cleaned_text: String,
    engagement_score: f32,
    embedding: Vector,
    source_type: String,
    created_at: DateTime<Utc>,
    similarity: f64,
}

#[async_trait]
impl PostStore for PgStore {
    async fn upsert_raw(&self, posts: &[RawPost]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        for post in posts {
            sqlx::query(
                "INSERT INTO raw_posts \
                   (id, content, likes, shares, comments, source_type, created_at, platform, author) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
                 ON CONFLICT (id) DO NOTHING",
            )
            .bind(&post.id)
            .bind(&post.text)
            .bind(post.likes)
            .bind(post.shares)
            .bind(post.comments)
            .bind(post.source_type.as_str())
            .bind(post.created_at)
            .bind(&post.platform)
            .bind(&post.author)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        }
        tx.commit().await.map_err(map_sqlx)
    }

    async fn fetch_raw_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawPost>, StoreError> {
        let rows: Vec<RawPostRow> = sqlx::query_as(
            "SELECT id, content, likes, shares, comments, source_type, created_at, platform, author \
             FROM raw_posts \
             WHERE $1::timestamptz IS NULL OR created_at > $1 \
             ORDER BY created_at DESC",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter().map(RawPost::try_from).collect()
    }

    async fn query_nearest(
        &self,
        embedding: &[f32],
        min_engagement: f32,
        k: usize,
    ) -> Result<Vec<(ProcessedPost, f32)>, StoreError> {
        let query_vec = Vector::from(embedding.to_vec());
        let limit = i64::try_from(k).unwrap_or(i64::MAX);

        let rows: Vec<NearestRow> = sqlx::query_as(
            "SELECT id, cleaned_text, engagement_score, embedding, source_type, created_at, \
                    1 - (embedding <=> $1) AS similarity \
             FROM processed_posts \
             WHERE engagement_score >= $2 \
             ORDER BY embedding <=> $1 \
             LIMIT $3",
        )
        .bind(&query_vec)
        .bind(min_engagement)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        rows.into_iter()
            .map(|row| {
                let source_type = row
                    .source_type
                    .parse()
                    .map_err(StoreError::Unavailable)?;
                #[allow(clippy::cast_possible_truncation)]
                let similarity = row.similarity as f32;
                Ok((
                    ProcessedPost {
                        id: row.id,
                        cleaned_text: row.cleaned_text,
                        engagement_score: row.engagement_score,
                        embedding: row.embedding.to_vec(),
                        source_type,
                        created_at: row.created_at,
                    },
                    similarity,
                ))
            })
            .collect()
    }

    async fn get_watermark(&self, pipeline: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        sqlx::query_scalar(
            "SELECT last_successful_position FROM pipeline_watermarks WHERE pipeline_name = $1",
        )
        .bind(pipeline)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)
    }

    async fn commit_batch(
        &self,
        pipeline: &str,
        expected: Option<DateTime<Utc>>,
        new_watermark: DateTime<Utc>,
        posts: &[ProcessedPost],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        for post in posts {
            sqlx::query(
                "INSERT INTO processed_posts \
                   (id, cleaned_text, engagement_score, embedding, source_type, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6) \
                 ON CONFLICT (id) DO UPDATE SET \
                   cleaned_text = EXCLUDED.cleaned_text, \
                   engagement_score = EXCLUDED.engagement_score, \
                   embedding = EXCLUDED.embedding, \
                   source_type = EXCLUDED.source_type, \
                   created_at = EXCLUDED.created_at, \
                   processed_at = NOW()",
            )
            .bind(&post.id)
            .bind(&post.cleaned_text)
            .bind(post.engagement_score)
            .bind(Vector::from(post.embedding.clone()))
            .bind(post.source_type.as_str())
            .bind(post.created_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;
        }

        // Compare-and-swap: advance only if the stored position still equals
        // the value this run loaded. Zero rows touched means another run won.
        let advanced = sqlx::query(
            "INSERT INTO pipeline_watermarks (pipeline_name, last_successful_position) \
             VALUES ($1, $2) \
             ON CONFLICT (pipeline_name) DO UPDATE SET \
               last_successful_position = EXCLUDED.last_successful_position, \
               updated_at = NOW() \
             WHERE pipeline_watermarks.last_successful_position IS NOT DISTINCT FROM $3",
        )
        .bind(pipeline)
        .bind(new_watermark)
        .bind(expected)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx)?;

        if advanced.rows_affected() == 0 {
            tx.rollback().await.map_err(map_sqlx)?;
            return Err(StoreError::WatermarkConflict(pipeline.to_string()));
        }

        tx.commit().await.map_err(map_sqlx)
    }

    async fn archive_insights(
        &self,
        query: &str,
        bundle: &InsightBundle,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;

        let tagged = bundle
            .high_value_content
            .iter()
            .map(|r| (r, "high_value"))
            .chain(bundle.content_gaps.iter().map(|r| (r, "content_gap")));

        for (result, insight_type) in tagged {
            archive_row(&mut tx, query, result, insight_type).await?;
        }

        tx.commit().await.map_err(map_sqlx)
    }
}

async fn archive_row(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    query: &str,
    result: &SimilarityResult,
    insight_type: &str,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO insight_archive \
           (id, query_text, post_id, similarity, engagement_score, cleaned_text, source_type, insight_type) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(Uuid::new_v4())
    .bind(query)
    .bind(&result.post_id)
    .bind(result.similarity)
    .bind(result.engagement_score)
    .bind(&result.cleaned_text)
    .bind(result.source_type.as_str())
    .bind(insight_type)
    .execute(&mut **tx)
    .await
    .map_err(map_sqlx)?;
    Ok(())
}
