use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use cotiza_core::domain::catalog::{CatalogItem, ItemId};
use cotiza_core::domain::partner::{Partner, PartnerId};
use cotiza_core::domain::quote::{Quote, QuoteId, QuoteStatus, QuoteWithItems};

pub mod catalog;
pub mod memory;
pub mod partner;
pub mod quote;

pub use catalog::SqlCatalogRepository;
pub use memory::{InMemoryCatalogRepository, InMemoryPartnerRepository, InMemoryQuoteRepository};
pub use partner::SqlPartnerRepository;
pub use quote::SqlQuoteRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
}

impl RepositoryError {
    /// Splits unique-constraint failures out of the generic database error
    /// so callers can retry quote codes instead of surfacing a 500.
    pub(crate) fn classify(error: sqlx::Error) -> Self {
        match error.as_database_error() {
            Some(db) if db.is_unique_violation() => Self::UniqueViolation(db.message().to_string()),
            _ => Self::Database(error),
        }
    }
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_by_id(&self, id: &ItemId) -> Result<Option<CatalogItem>, RepositoryError>;
    async fn list(&self) -> Result<Vec<CatalogItem>, RepositoryError>;
    /// Insert-or-replace keyed by id.
    async fn save(&self, item: CatalogItem) -> Result<(), RepositoryError>;
    /// Returns false when no such item existed.
    async fn delete(&self, id: &ItemId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait PartnerRepository: Send + Sync {
    async fn find_by_id(&self, id: &PartnerId) -> Result<Option<Partner>, RepositoryError>;
    async fn save(&self, partner: Partner) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<QuoteWithItems>, RepositoryError>;

    async fn list(&self) -> Result<Vec<Quote>, RepositoryError>;

    /// Persists the quote and its line items as one atomic unit; a code
    /// collision surfaces as `UniqueViolation` and no rows are written.
    async fn create_with_items(&self, aggregate: QuoteWithItems) -> Result<(), RepositoryError>;

    /// Compare-and-set status update. Returns false when the stored status
    /// no longer matches `expected` (lost race) or the quote is gone.
    async fn update_status(
        &self,
        id: &QuoteId,
        expected: QuoteStatus,
        next: QuoteStatus,
    ) -> Result<bool, RepositoryError>;

    /// Deletes the quote only while still in draft, cascading to its line
    /// items. Returns false when no draft row matched.
    async fn delete_draft(&self, id: &QuoteId) -> Result<bool, RepositoryError>;

    async fn code_exists(&self, code: &str) -> Result<bool, RepositoryError>;

    /// Persisted expiry sweep: `sent -> expired` for quotes created before
    /// the cutoff. Idempotent; returns the number of quotes demoted.
    async fn expire_sent_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError>;

    /// How many line items across all quotes reference this catalog item.
    async fn item_reference_count(&self, item_id: &ItemId) -> Result<u64, RepositoryError>;
}
