//! # Ticket Repository
//!
//! Recorded tickets. Shopping lines are stored as a JSON array in
//! `lines_json`; each line keeps the description and price it was sold at.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use tpv_core::{Money, SaleTender, ShoppingLine, Ticket, TicketNumber};

#[derive(Debug, FromRow)]
struct TicketRow {
    id: String,
    ticket_date: NaiveDate,
    seq: i64,
    creation_date: DateTime<Utc>,
    lines_json: String,
    cash: Money,
    card: Money,
    voucher: Money,
    total: Money,
    user_mobile: Option<String>,
    note: Option<String>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = DbError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        let corrupt = |message: String| DbError::Corrupt {
            entity: "Ticket".to_string(),
            message,
        };
        let lines: Vec<ShoppingLine> =
            serde_json::from_str(&row.lines_json).map_err(|e| corrupt(e.to_string()))?;
        let seq = u32::try_from(row.seq).map_err(|e| corrupt(e.to_string()))?;

        Ok(Ticket {
            id: row.id,
            ticket_date: row.ticket_date,
            seq,
            creation_date: row.creation_date,
            lines,
            tender: SaleTender::new(row.cash, row.card, row.voucher),
            total: row.total,
            user_mobile: row.user_mobile,
            note: row.note,
        })
    }
}

/// Highest ticket number issued so far.
pub(crate) async fn last_number<'e, E>(executor: E) -> DbResult<Option<TicketNumber>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let last: Option<(NaiveDate, i64)> = sqlx::query_as(
        r#"
        SELECT ticket_date, seq
        FROM tickets
        ORDER BY ticket_date DESC, seq DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(executor)
    .await?;

    last.map(|(date, seq)| {
        u32::try_from(seq)
            .map(|seq| TicketNumber { date, seq })
            .map_err(|e| DbError::Corrupt {
                entity: "Ticket".to_string(),
                message: e.to_string(),
            })
    })
    .transpose()
}

/// Inserts a numbered ticket.
pub(crate) async fn insert<'e, E>(executor: E, ticket: &Ticket) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %ticket.id, total = %ticket.total, "Inserting ticket");

    let lines_json =
        serde_json::to_string(&ticket.lines).map_err(|e| DbError::Internal(e.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO tickets (
            id, ticket_date, seq, creation_date, lines_json,
            cash, card, voucher, total, user_mobile, note
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5,
            ?6, ?7, ?8, ?9, ?10, ?11
        )
        "#,
    )
    .bind(&ticket.id)
    .bind(ticket.ticket_date)
    .bind(i64::from(ticket.seq))
    .bind(ticket.creation_date)
    .bind(lines_json)
    .bind(ticket.tender.cash)
    .bind(ticket.tender.card)
    .bind(ticket.tender.voucher)
    .bind(ticket.total)
    .bind(&ticket.user_mobile)
    .bind(&ticket.note)
    .execute(executor)
    .await?;

    Ok(())
}

/// Repository for ticket reads.
///
/// Tickets are written only by [`TicketRecorder`](crate::recorder::TicketRecorder).
#[derive(Debug, Clone)]
pub struct TicketRepository {
    pool: SqlitePool,
}

impl TicketRepository {
    /// Creates a new TicketRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TicketRepository { pool }
    }

    /// Gets a ticket by reference (e.g. `201901123`).
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT
                id, ticket_date, seq, creation_date, lines_json,
                cash, card, voucher, total, user_mobile, note
            FROM tickets
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Ticket::try_from).transpose()
    }

    /// Tickets of one day in numbering order.
    pub async fn list_for_day(&self, date: NaiveDate) -> DbResult<Vec<Ticket>> {
        let rows = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT
                id, ticket_date, seq, creation_date, lines_json,
                cash, card, voucher, total, user_mobile, note
            FROM tickets
            WHERE ticket_date = ?1
            ORDER BY seq ASC
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Ticket::try_from).collect()
    }

    /// Highest ticket number issued so far.
    pub async fn last_number(&self) -> DbResult<Option<TicketNumber>> {
        last_number(&self.pool).await
    }

    /// Total number of tickets.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tickets")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use tpv_core::{NewTicket, ShoppingState};

    fn new_ticket() -> NewTicket {
        NewTicket {
            lines: vec![ShoppingLine {
                code: "1".to_string(),
                description: "various".to_string(),
                retail_price: Money::from_cents(1618),
                amount: 3,
                discount_bps: 5000,
                state: ShoppingState::Committed,
            }],
            tender: SaleTender::new(Money::from_cents(2427), Money::zero(), Money::zero()),
            user_mobile: Some("666666000".to_string()),
            note: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(db.tickets().last_number().await.unwrap(), None);

        let date = NaiveDate::from_ymd_opt(2019, 1, 12).unwrap();
        let number = TicketNumber { date, seq: 1 };
        let ticket = new_ticket().into_ticket(number, Utc::now()).unwrap();
        insert(db.pool(), &ticket).await.unwrap();

        let stored = db.tickets().get_by_id("201901121").await.unwrap().unwrap();
        assert_eq!(stored.lines, ticket.lines);
        assert_eq!(stored.total, Money::from_cents(2427));
        assert_eq!(stored.tender, ticket.tender);
        assert_eq!(stored.user_mobile.as_deref(), Some("666666000"));

        assert_eq!(db.tickets().last_number().await.unwrap(), Some(number));
        assert_eq!(db.tickets().list_for_day(date).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_number_is_unique_per_day() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let date = NaiveDate::from_ymd_opt(2019, 1, 12).unwrap();

        let number = TicketNumber { date, seq: 1 };
        let first = new_ticket().into_ticket(number, Utc::now()).unwrap();
        insert(db.pool(), &first).await.unwrap();

        let mut clash = new_ticket().into_ticket(number, Utc::now()).unwrap();
        clash.id = "other".to_string();
        let err = insert(db.pool(), &clash).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
