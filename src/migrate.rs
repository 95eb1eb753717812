use anyhow::Result;
use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Content items: the natural key (platform, native_id) is the sole
    // dedup/upsert key across the store.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS content_items (
            id TEXT PRIMARY KEY,
            platform TEXT NOT NULL,
            native_id TEXT NOT NULL,
            author TEXT NOT NULL,
            title TEXT,
            content TEXT NOT NULL,
            url TEXT NOT NULL,
            thumbnail TEXT,
            metrics_json TEXT NOT NULL DEFAULT '{}',
            momentum REAL NOT NULL DEFAULT 0,
            published_at INTEGER NOT NULL,
            ingested_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            embedding BLOB,
            UNIQUE(platform, native_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Trend queries: write-once search session records
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS trend_queries (
            id TEXT PRIMARY KEY,
            keyword TEXT NOT NULL,
            platforms_json TEXT NOT NULL,
            timeframe TEXT NOT NULL,
            lang TEXT,
            region TEXT,
            requester TEXT,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Audit link between a query and the content it surfaced
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS trend_query_items (
            query_id TEXT NOT NULL,
            content_id TEXT NOT NULL,
            PRIMARY KEY (query_id, content_id),
            FOREIGN KEY (query_id) REFERENCES trend_queries(id),
            FOREIGN KEY (content_id) REFERENCES content_items(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_content_items_momentum ON content_items(momentum DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_content_items_published_at ON content_items(published_at DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_trend_queries_created_at ON trend_queries(created_at DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_trend_queries_keyword ON trend_queries(keyword)")
        .execute(pool)
        .await?;

    Ok(())
}
