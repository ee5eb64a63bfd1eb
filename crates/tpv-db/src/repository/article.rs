//! # Article Repository
//!
//! Catalog rows and the stock decrement performed when a ticket is recorded.

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tpv_core::{Article, Money};

/// Subtracts `amount` units from an article's stock.
///
/// Stock is allowed to go negative. Returns `NotFound` for an unknown code.
pub(crate) async fn decrement_stock<'e, E>(executor: E, code: &str, amount: i64) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(code = %code, amount, "Decrementing stock");

    let result = sqlx::query("UPDATE articles SET stock = stock - ?1 WHERE code = ?2")
        .bind(amount)
        .bind(code)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Article", code));
    }

    Ok(())
}

/// Repository for article database operations.
#[derive(Debug, Clone)]
pub struct ArticleRepository {
    pool: SqlitePool,
}

impl ArticleRepository {
    /// Creates a new ArticleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ArticleRepository { pool }
    }

    /// Inserts a new article.
    pub async fn insert(&self, article: &Article) -> DbResult<()> {
        debug!(code = %article.code, "Inserting article");

        sqlx::query(
            r#"
            INSERT INTO articles (code, description, retail_price, stock)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&article.code)
        .bind(&article.description)
        .bind(article.retail_price)
        .bind(article.stock)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: article.code.clone(),
            },
            other => other,
        })?;

        Ok(())
    }

    /// Gets an article by code.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Article>> {
        let article = sqlx::query_as::<_, Article>(
            "SELECT code, description, retail_price, stock FROM articles WHERE code = ?1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(article)
    }

    /// Updates the retail price. Existing tickets keep their snapshot.
    pub async fn update_price(&self, code: &str, retail_price: Money) -> DbResult<()> {
        let result = sqlx::query("UPDATE articles SET retail_price = ?1 WHERE code = ?2")
            .bind(retail_price)
            .bind(code)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Article", code));
        }

        Ok(())
    }

    /// Number of articles in the catalog.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn water() -> Article {
        Article::new("8400000000017", "Water 1L", Money::from_cents(120), 2).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = setup().await;
        db.articles().insert(&water()).await.unwrap();

        let stored = db.articles().get_by_code("8400000000017").await.unwrap();
        assert_eq!(stored, Some(water()));
        assert_eq!(db.articles().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_code() {
        let db = setup().await;
        db.articles().insert(&water()).await.unwrap();

        let err = db.articles().insert(&water()).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::UniqueViolation { ref value, .. } if value == "8400000000017"
        ));
    }

    #[tokio::test]
    async fn test_stock_may_go_negative() {
        let db = setup().await;
        db.articles().insert(&water()).await.unwrap();

        decrement_stock(db.pool(), "8400000000017", 5).await.unwrap();
        let stored = db.articles().get_by_code("8400000000017").await.unwrap().unwrap();
        assert_eq!(stored.stock, -3);

        let err = decrement_stock(db.pool(), "missing", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_price() {
        let db = setup().await;
        db.articles().insert(&water()).await.unwrap();
        db.articles()
            .update_price("8400000000017", Money::from_cents(150))
            .await
            .unwrap();
        let stored = db.articles().get_by_code("8400000000017").await.unwrap().unwrap();
        assert_eq!(stored.retail_price, Money::from_cents(150));
    }
}
