use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use cotiza_core::domain::partner::{Partner, PartnerId};

use super::{PartnerRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPartnerRepository {
    pool: DbPool,
}

impl SqlPartnerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode_partner(row: &SqliteRow) -> Result<Partner, RepositoryError> {
    let id: String = row.try_get("id")?;
    Ok(Partner {
        id: PartnerId(
            Uuid::parse_str(&id)
                .map_err(|e| RepositoryError::Decode(format!("partner.id `{id}`: {e}")))?,
        ),
        name: row.try_get("name")?,
        company: row.try_get("company")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        active: row.try_get("active")?,
    })
}

#[async_trait::async_trait]
impl PartnerRepository for SqlPartnerRepository {
    async fn find_by_id(&self, id: &PartnerId) -> Result<Option<Partner>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM partner WHERE id = ?1")
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(decode_partner).transpose()
    }

    async fn save(&self, partner: Partner) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO partner (id, name, company, email, phone, active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
               name = excluded.name,
               company = excluded.company,
               email = excluded.email,
               phone = excluded.phone,
               active = excluded.active",
        )
        .bind(partner.id.0.to_string())
        .bind(&partner.name)
        .bind(&partner.company)
        .bind(&partner.email)
        .bind(&partner.phone)
        .bind(partner.active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
