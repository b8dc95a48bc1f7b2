use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use cotiza_core::domain::catalog::ItemId;
use cotiza_core::domain::partner::PartnerId;
use cotiza_core::domain::quote::{
    LineItemId, Quote, QuoteId, QuoteLineItem, QuoteStatus, QuoteWithItems,
};

use super::{QuoteRepository, RepositoryError};
use crate::DbPool;

pub struct SqlQuoteRepository {
    pool: DbPool,
}

impl SqlQuoteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_uuid(column: &str, value: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(value)
        .map_err(|e| RepositoryError::Decode(format!("{column} `{value}`: {e}")))
}

fn parse_decimal(column: &str, value: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(value)
        .map_err(|e| RepositoryError::Decode(format!("{column} `{value}`: {e}")))
}

fn decode_quote(row: &SqliteRow) -> Result<Quote, RepositoryError> {
    let id: String = row.try_get("id")?;
    let partner_id: String = row.try_get("partner_id")?;
    let subtotal: String = row.try_get("subtotal")?;
    let tax: String = row.try_get("tax")?;
    let total: String = row.try_get("total")?;
    let status: String = row.try_get("status")?;

    Ok(Quote {
        id: QuoteId(parse_uuid("quote.id", &id)?),
        code: row.try_get("code")?,
        partner_id: PartnerId(parse_uuid("quote.partner_id", &partner_id)?),
        client_name: row.try_get("client_name")?,
        client_email: row.try_get("client_email")?,
        client_phone: row.try_get("client_phone")?,
        event_date: row.try_get::<Option<NaiveDate>, _>("event_date")?,
        venue: row.try_get("venue")?,
        subtotal: parse_decimal("quote.subtotal", &subtotal)?,
        tax: parse_decimal("quote.tax", &tax)?,
        total: parse_decimal("quote.total", &total)?,
        status: QuoteStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown quote.status `{status}`")))?,
        terms: row.try_get("terms")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn decode_line_item(row: &SqliteRow) -> Result<QuoteLineItem, RepositoryError> {
    let id: String = row.try_get("id")?;
    let quote_id: String = row.try_get("quote_id")?;
    let item_id: String = row.try_get("item_id")?;
    let base_price: String = row.try_get("base_price")?;
    let margin: i64 = row.try_get("margin")?;
    let margin_amount: String = row.try_get("margin_amount")?;
    let total_price: String = row.try_get("total_price")?;

    Ok(QuoteLineItem {
        id: LineItemId(parse_uuid("quote_line_item.id", &id)?),
        quote_id: QuoteId(parse_uuid("quote_line_item.quote_id", &quote_id)?),
        item_id: ItemId(parse_uuid("quote_line_item.item_id", &item_id)?),
        item_name: row.try_get("item_name")?,
        item_description: row.try_get("item_description")?,
        base_price: parse_decimal("quote_line_item.base_price", &base_price)?,
        margin: margin as u8,
        margin_amount: parse_decimal("quote_line_item.margin_amount", &margin_amount)?,
        total_price: parse_decimal("quote_line_item.total_price", &total_price)?,
    })
}

#[async_trait::async_trait]
impl QuoteRepository for SqlQuoteRepository {
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<QuoteWithItems>, RepositoryError> {
        let Some(row) = sqlx::query("SELECT * FROM quote WHERE id = ?1")
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        let quote = decode_quote(&row)?;

        let item_rows =
            sqlx::query("SELECT * FROM quote_line_item WHERE quote_id = ?1 ORDER BY rowid")
                .bind(id.0.to_string())
                .fetch_all(&self.pool)
                .await?;
        let items =
            item_rows.iter().map(decode_line_item).collect::<Result<Vec<_>, _>>()?;

        Ok(Some(QuoteWithItems { quote, items }))
    }

    async fn list(&self) -> Result<Vec<Quote>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM quote ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_quote).collect()
    }

    async fn create_with_items(&self, aggregate: QuoteWithItems) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO quote (id, code, partner_id, client_name, client_email, client_phone, event_date, venue, subtotal, tax, total, status, terms, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(aggregate.quote.id.0.to_string())
        .bind(&aggregate.quote.code)
        .bind(aggregate.quote.partner_id.0.to_string())
        .bind(&aggregate.quote.client_name)
        .bind(&aggregate.quote.client_email)
        .bind(&aggregate.quote.client_phone)
        .bind(aggregate.quote.event_date)
        .bind(&aggregate.quote.venue)
        .bind(aggregate.quote.subtotal.to_string())
        .bind(aggregate.quote.tax.to_string())
        .bind(aggregate.quote.total.to_string())
        .bind(aggregate.quote.status.as_str())
        .bind(&aggregate.quote.terms)
        .bind(aggregate.quote.created_at)
        .execute(&mut *tx)
        .await
        .map_err(RepositoryError::classify)?;

        for item in &aggregate.items {
            sqlx::query(
                "INSERT INTO quote_line_item (id, quote_id, item_id, item_name, item_description, base_price, margin, margin_amount, total_price)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .bind(item.id.0.to_string())
            .bind(item.quote_id.0.to_string())
            .bind(item.item_id.0.to_string())
            .bind(&item.item_name)
            .bind(&item.item_description)
            .bind(item.base_price.to_string())
            .bind(i64::from(item.margin))
            .bind(item.margin_amount.to_string())
            .bind(item.total_price.to_string())
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::classify)?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update_status(
        &self,
        id: &QuoteId,
        expected: QuoteStatus,
        next: QuoteStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE quote SET status = ?1 WHERE id = ?2 AND status = ?3")
            .bind(next.as_str())
            .bind(id.0.to_string())
            .bind(expected.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_draft(&self, id: &QuoteId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM quote WHERE id = ?1 AND status = ?2")
            .bind(id.0.to_string())
            .bind(QuoteStatus::Draft.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn code_exists(&self, code: &str) -> Result<bool, RepositoryError> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM quote WHERE code = ?1)")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists == 1)
    }

    async fn expire_sent_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("UPDATE quote SET status = ?1 WHERE status = ?2 AND created_at < ?3")
                .bind(QuoteStatus::Expired.as_str())
                .bind(QuoteStatus::Sent.as_str())
                .bind(cutoff)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn item_reference_count(&self, item_id: &ItemId) -> Result<u64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM quote_line_item WHERE item_id = ?1")
                .bind(item_id.0.to_string())
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }
}
