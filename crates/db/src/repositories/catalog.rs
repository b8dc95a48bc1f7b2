use std::str::FromStr;

use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use cotiza_core::domain::catalog::{
    Ambience, CatalogItem, ItemCategory, ItemId, MarginRange, QualityTier,
};

use super::{CatalogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_item(row: &SqliteRow) -> Result<CatalogItem, RepositoryError> {
    let id: String = row.try_get("id")?;
    let category: String = row.try_get("category")?;
    let tier: String = row.try_get("tier")?;
    let ambience: String = row.try_get("ambience")?;
    let base_price: String = row.try_get("base_price")?;
    let min_margin: i64 = row.try_get("min_margin")?;
    let max_margin: i64 = row.try_get("max_margin")?;

    Ok(CatalogItem {
        id: ItemId(
            Uuid::parse_str(&id)
                .map_err(|e| RepositoryError::Decode(format!("catalog_item.id `{id}`: {e}")))?,
        ),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        category: ItemCategory::parse(&category).ok_or_else(|| {
            RepositoryError::Decode(format!("unknown catalog_item.category `{category}`"))
        })?,
        tier: QualityTier::parse(&tier)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown catalog_item.tier `{tier}`")))?,
        ambience: Ambience::parse(&ambience).ok_or_else(|| {
            RepositoryError::Decode(format!("unknown catalog_item.ambience `{ambience}`"))
        })?,
        base_price: Decimal::from_str(&base_price).map_err(|e| {
            RepositoryError::Decode(format!("catalog_item.base_price `{base_price}`: {e}"))
        })?,
        margins: MarginRange::new(min_margin as u8, max_margin as u8)
            .map_err(|e| RepositoryError::Decode(format!("catalog_item margins: {e}")))?,
        active: row.try_get::<bool, _>("active")?,
    })
}

#[async_trait::async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn find_by_id(&self, id: &ItemId) -> Result<Option<CatalogItem>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM catalog_item WHERE id = ?1")
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_item).transpose()
    }

    async fn list(&self) -> Result<Vec<CatalogItem>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM catalog_item ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_item).collect()
    }

    async fn save(&self, item: CatalogItem) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO catalog_item (id, name, description, category, tier, ambience, base_price, min_margin, max_margin, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
               name = excluded.name,
               description = excluded.description,
               category = excluded.category,
               tier = excluded.tier,
               ambience = excluded.ambience,
               base_price = excluded.base_price,
               min_margin = excluded.min_margin,
               max_margin = excluded.max_margin,
               active = excluded.active",
        )
        .bind(item.id.0.to_string())
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.category.as_str())
        .bind(item.tier.as_str())
        .bind(item.ambience.as_str())
        .bind(item.base_price.to_string())
        .bind(i64::from(item.margins.min))
        .bind(i64::from(item.margins.max))
        .bind(item.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, id: &ItemId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM catalog_item WHERE id = ?1")
            .bind(id.0.to_string())
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::classify)?;
        Ok(result.rows_affected() == 1)
    }
}
