use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Row, SqliteExecutor, SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;

use super::types::{is_lock_error, IndexError, SearchLink};
use crate::parsers::parse_url;
use crate::util::norm_words;

// ============================================================================
// Query Limits
// ============================================================================

const MAX_QUERY_LENGTH: usize = 256;

/// Upper bound for `top_n`
const MAX_RESULTS: usize = 500;

// ============================================================================
// UrlIndex
// ============================================================================

/// Full-text index over link text, backed by an FTS5 external content table.
///
/// Text is stored normalized with [`norm_words`], so searches are accent and
/// punctuation insensitive.
#[derive(Clone)]
pub struct UrlIndex {
    pool: SqlitePool,
}

impl UrlIndex {
    /// Open (or create) the index at `path` and run migrations.
    ///
    /// `":memory:"` gives a private in-memory index.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Locked` if another process holds the file.
    pub async fn open(path: &str) -> Result<Self, IndexError> {
        let url = format!("sqlite:{}?mode=rwc", path);
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(IndexError::from_sqlx)?
            .pragma("busy_timeout", "5000");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(IndexError::from_sqlx)?;

        let index = Self { pool };
        index.migrate().await.map_err(|e| {
            if is_lock_error(&e.to_string()) {
                IndexError::Locked
            } else {
                IndexError::Migration(e.to_string())
            }
        })?;
        tracing::debug!(path = %path, "URL index opened");
        Ok(index)
    }

    /// Create the content table, its FTS5 index and the sync triggers.
    ///
    /// Every statement is idempotent and runs in one transaction.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS content (
                id INTEGER PRIMARY KEY,
                url TEXT NOT NULL UNIQUE,
                text TEXT,
                domain TEXT
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_content_domain ON content(domain)")
            .execute(&mut *tx)
            .await?;

        // Only `text` is tokenized; url and domain ride along for reads.
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE IF NOT EXISTS search_ix USING fts5(
                url UNINDEXED,
                text,
                domain UNINDEXED,
                tokenize = "ascii",
                content = content,
                content_rowid = id
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS content_ai AFTER INSERT ON content BEGIN
                INSERT INTO search_ix(rowid, url, text, domain)
                VALUES (new.id, new.url, new.text, new.domain);
            END
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS content_ad AFTER DELETE ON content BEGIN
                INSERT INTO search_ix(search_ix, rowid, url, text, domain)
                VALUES ('delete', old.id, old.url, old.text, old.domain);
            END
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            CREATE TRIGGER IF NOT EXISTS content_au AFTER UPDATE ON content BEGIN
                INSERT INTO search_ix(search_ix, rowid, url, text, domain)
                VALUES ('delete', old.id, old.url, old.text, old.domain);
                INSERT INTO search_ix(rowid, url, text, domain)
                VALUES (new.id, new.url, new.text, new.domain);
            END
        "#,
        )
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Index a batch of links in one transaction. Returns how many were written.
    pub async fn build(&self, links: &[SearchLink]) -> Result<usize, IndexError> {
        let mut tx = self.pool.begin().await.map_err(IndexError::from_sqlx)?;
        for link in links {
            upsert(&mut *tx, link).await?;
        }
        tx.commit().await?;

        tracing::info!(links = links.len(), "URL index built");
        Ok(links.len())
    }

    /// Index one link. A URL already present gets its text replaced.
    pub async fn add(&self, link: &SearchLink) -> Result<(), IndexError> {
        upsert(&self.pool, link)
            .await
            .map_err(IndexError::from_sqlx)?;
        Ok(())
    }

    /// Remove a URL. Returns whether it was indexed.
    pub async fn remove(&self, url: &str) -> Result<bool, IndexError> {
        let result = sqlx::query("DELETE FROM content WHERE url = ?")
            .bind(url.trim())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Best `top_n` matches for `text`, optionally limited to one domain.
    ///
    /// Every word of the normalized query must be present. A query with no
    /// letters matches nothing.
    pub async fn search(
        &self,
        text: &str,
        domain: Option<&str>,
        top_n: usize,
    ) -> Result<Vec<SearchLink>, IndexError> {
        if text.chars().count() > MAX_QUERY_LENGTH {
            return Err(IndexError::InvalidQuery(format!(
                "query exceeds {MAX_QUERY_LENGTH} characters"
            )));
        }
        let words = norm_words(text);
        if words.is_empty() || top_n == 0 {
            return Ok(Vec::new());
        }
        // Quoted so words such as `NOT` or `OR` are never read as operators.
        let fts_query = words
            .split(' ')
            .map(|w| format!("\"{w}\""))
            .collect::<Vec<_>>()
            .join(" ");
        let limit = top_n.min(MAX_RESULTS) as i64;

        let rows = match domain {
            Some(domain) => {
                sqlx::query(
                    r#"
                    SELECT c.url, c.text
                    FROM search_ix
                    JOIN content c ON c.id = search_ix.rowid
                    WHERE search_ix MATCH ? AND c.domain = ?
                    ORDER BY rank
                    LIMIT ?
                "#,
                )
                .bind(&fts_query)
                .bind(domain)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT c.url, c.text
                    FROM search_ix
                    JOIN content c ON c.id = search_ix.rowid
                    WHERE search_ix MATCH ?
                    ORDER BY rank
                    LIMIT ?
                "#,
                )
                .bind(&fts_query)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        let links = rows
            .iter()
            .filter_map(|row| {
                let url: String = row.get("url");
                let text: Option<String> = row.get("text");
                match parse_url(&url) {
                    Ok(url) => Some(SearchLink {
                        text: text.unwrap_or_default(),
                        url,
                    }),
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "Skipping unparsable indexed URL");
                        None
                    }
                }
            })
            .collect();
        Ok(links)
    }

    /// Repopulate the FTS index from the content table. Returns the row count.
    pub async fn rebuild(&self) -> Result<usize, IndexError> {
        sqlx::query("INSERT INTO search_ix(search_ix) VALUES('rebuild')")
            .execute(&self.pool)
            .await?;
        self.len().await
    }

    /// Number of indexed URLs.
    pub async fn len(&self) -> Result<usize, IndexError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM content")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 as usize)
    }

    pub async fn is_empty(&self) -> Result<bool, IndexError> {
        Ok(self.len().await? == 0)
    }
}

async fn upsert<'e, E>(executor: E, link: &SearchLink) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO content (url, text, domain) VALUES (?, ?, ?)
        ON CONFLICT(url) DO UPDATE SET text = excluded.text, domain = excluded.domain
    "#,
    )
    .bind(link.url.fullurl.as_str())
    .bind(norm_words(&link.text))
    .bind(link.url.domain_base.as_str())
    .execute(executor)
    .await?;
    Ok(())
}
