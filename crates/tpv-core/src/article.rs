//! # Articles
//!
//! Catalog entry sold through tickets. Only the fields the ledger side needs
//! are modelled: code, description, price and stock.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::validate_article_code;

/// A sellable article.
///
/// `stock` may go negative: sales are recorded even when the shelf count is
/// wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Article {
    pub code: String,
    pub description: String,
    pub retail_price: Money,
    pub stock: i64,
}

impl Article {
    pub fn new(
        code: &str,
        description: &str,
        retail_price: Money,
        stock: i64,
    ) -> CoreResult<Article> {
        validate_article_code(code)?;
        if retail_price.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "retail price".to_string(),
            }
            .into());
        }
        Ok(Article {
            code: code.trim().to_string(),
            description: description.trim().to_string(),
            retail_price,
            stock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_and_validates() {
        let article = Article::new(" 8400000000017 ", " Water ", Money::from_cents(120), 10).unwrap();
        assert_eq!(article.code, "8400000000017");
        assert_eq!(article.description, "Water");

        assert!(Article::new("", "x", Money::zero(), 0).is_err());
        assert!(Article::new("1", "x", Money::from_cents(-1), 0).is_err());
    }
}
