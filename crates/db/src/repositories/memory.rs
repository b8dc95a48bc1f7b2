use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use cotiza_core::domain::catalog::{CatalogItem, ItemId};
use cotiza_core::domain::partner::{Partner, PartnerId};
use cotiza_core::domain::quote::{Quote, QuoteId, QuoteStatus, QuoteWithItems};

use super::{CatalogRepository, PartnerRepository, QuoteRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryCatalogRepository {
    items: RwLock<HashMap<ItemId, CatalogItem>>,
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn find_by_id(&self, id: &ItemId) -> Result<Option<CatalogItem>, RepositoryError> {
        let items = self.items.read().await;
        Ok(items.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<CatalogItem>, RepositoryError> {
        let items = self.items.read().await;
        let mut all = items.values().cloned().collect::<Vec<_>>();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn save(&self, item: CatalogItem) -> Result<(), RepositoryError> {
        let mut items = self.items.write().await;
        items.insert(item.id, item);
        Ok(())
    }

    async fn delete(&self, id: &ItemId) -> Result<bool, RepositoryError> {
        let mut items = self.items.write().await;
        Ok(items.remove(id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryPartnerRepository {
    partners: RwLock<HashMap<PartnerId, Partner>>,
}

#[async_trait::async_trait]
impl PartnerRepository for InMemoryPartnerRepository {
    async fn find_by_id(&self, id: &PartnerId) -> Result<Option<Partner>, RepositoryError> {
        let partners = self.partners.read().await;
        Ok(partners.get(id).cloned())
    }

    async fn save(&self, partner: Partner) -> Result<(), RepositoryError> {
        let mut partners = self.partners.write().await;
        partners.insert(partner.id, partner);
        Ok(())
    }
}

/// Stores each aggregate whole; every mutation takes the single write lock,
/// which is what stands in for the SQL transaction here.
#[derive(Default)]
pub struct InMemoryQuoteRepository {
    quotes: RwLock<HashMap<QuoteId, QuoteWithItems>>,
}

#[async_trait::async_trait]
impl QuoteRepository for InMemoryQuoteRepository {
    async fn find_by_id(&self, id: &QuoteId) -> Result<Option<QuoteWithItems>, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Quote>, RepositoryError> {
        let quotes = self.quotes.read().await;
        let mut all = quotes.values().map(|q| q.quote.clone()).collect::<Vec<_>>();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    async fn create_with_items(&self, aggregate: QuoteWithItems) -> Result<(), RepositoryError> {
        let mut quotes = self.quotes.write().await;
        if quotes.values().any(|existing| existing.quote.code == aggregate.quote.code) {
            return Err(RepositoryError::UniqueViolation(format!(
                "quote code `{}` already exists",
                aggregate.quote.code
            )));
        }
        quotes.insert(aggregate.quote.id, aggregate);
        Ok(())
    }

    async fn update_status(
        &self,
        id: &QuoteId,
        expected: QuoteStatus,
        next: QuoteStatus,
    ) -> Result<bool, RepositoryError> {
        let mut quotes = self.quotes.write().await;
        match quotes.get_mut(id) {
            Some(stored) if stored.quote.status == expected => {
                stored.quote.status = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_draft(&self, id: &QuoteId) -> Result<bool, RepositoryError> {
        let mut quotes = self.quotes.write().await;
        match quotes.get(id) {
            Some(stored) if stored.quote.status == QuoteStatus::Draft => {
                quotes.remove(id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn code_exists(&self, code: &str) -> Result<bool, RepositoryError> {
        let quotes = self.quotes.read().await;
        Ok(quotes.values().any(|stored| stored.quote.code == code))
    }

    async fn expire_sent_before(&self, cutoff: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let mut quotes = self.quotes.write().await;
        let mut expired = 0;
        for stored in quotes.values_mut() {
            if stored.quote.status == QuoteStatus::Sent && stored.quote.created_at < cutoff {
                stored.quote.status = QuoteStatus::Expired;
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn item_reference_count(&self, item_id: &ItemId) -> Result<u64, RepositoryError> {
        let quotes = self.quotes.read().await;
        let count = quotes
            .values()
            .flat_map(|stored| stored.items.iter())
            .filter(|item| &item.item_id == item_id)
            .count();
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use cotiza_core::domain::catalog::ItemId;
    use cotiza_core::domain::partner::PartnerId;
    use cotiza_core::domain::quote::{
        LineItemId, Quote, QuoteId, QuoteLineItem, QuoteStatus, QuoteWithItems,
    };

    use crate::repositories::{InMemoryQuoteRepository, QuoteRepository, RepositoryError};

    fn aggregate(code: &str, status: QuoteStatus, age_days: i64) -> QuoteWithItems {
        let quote_id = QuoteId::generate();
        QuoteWithItems {
            quote: Quote {
                id: quote_id,
                code: code.to_string(),
                partner_id: PartnerId::generate(),
                client_name: "Laura Mendoza".to_string(),
                client_email: "laura@example.com".to_string(),
                client_phone: "555-0100".to_string(),
                event_date: None,
                venue: "Hacienda San Pedro".to_string(),
                subtotal: Decimal::new(12_000, 2),
                tax: Decimal::new(1_920, 2),
                total: Decimal::new(13_920, 2),
                status,
                terms: String::new(),
                created_at: Utc::now() - Duration::days(age_days),
            },
            items: vec![QuoteLineItem {
                id: LineItemId::generate(),
                quote_id,
                item_id: ItemId::generate(),
                item_name: "Terrace dinner".to_string(),
                item_description: "Three-course plated dinner".to_string(),
                base_price: Decimal::new(10_000, 2),
                margin: 20,
                margin_amount: Decimal::new(2_000, 2),
                total_price: Decimal::new(12_000, 2),
            }],
        }
    }

    #[tokio::test]
    async fn quote_aggregate_round_trip() {
        let repo = InMemoryQuoteRepository::default();
        let stored = aggregate("ER-LM-0001", QuoteStatus::Draft, 0);

        repo.create_with_items(stored.clone()).await.expect("create quote");
        let found = repo.find_by_id(&stored.quote.id).await.expect("find quote");
        assert_eq!(found, Some(stored));
    }

    #[tokio::test]
    async fn duplicate_code_is_a_unique_violation() {
        let repo = InMemoryQuoteRepository::default();
        repo.create_with_items(aggregate("ER-LM-0001", QuoteStatus::Draft, 0))
            .await
            .expect("first create");

        let error = repo
            .create_with_items(aggregate("ER-LM-0001", QuoteStatus::Draft, 0))
            .await
            .expect_err("same code must be refused");
        assert!(matches!(error, RepositoryError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn status_update_is_compare_and_set() {
        let repo = InMemoryQuoteRepository::default();
        let stored = aggregate("ER-LM-0002", QuoteStatus::Sent, 0);
        repo.create_with_items(stored.clone()).await.expect("create quote");

        let first = repo
            .update_status(&stored.quote.id, QuoteStatus::Sent, QuoteStatus::Accepted)
            .await
            .expect("first update");
        assert!(first);

        // Second caller raced off the same Sent read and must lose.
        let second = repo
            .update_status(&stored.quote.id, QuoteStatus::Sent, QuoteStatus::Rejected)
            .await
            .expect("second update");
        assert!(!second);

        let found = repo.find_by_id(&stored.quote.id).await.expect("find quote");
        assert_eq!(found.map(|q| q.quote.status), Some(QuoteStatus::Accepted));
    }

    #[tokio::test]
    async fn delete_only_removes_drafts() {
        let repo = InMemoryQuoteRepository::default();
        let draft = aggregate("ER-LM-0003", QuoteStatus::Draft, 0);
        let sent = aggregate("ER-LM-0004", QuoteStatus::Sent, 0);
        repo.create_with_items(draft.clone()).await.expect("create draft");
        repo.create_with_items(sent.clone()).await.expect("create sent");

        assert!(repo.delete_draft(&draft.quote.id).await.expect("delete draft"));
        assert!(!repo.delete_draft(&sent.quote.id).await.expect("refuse sent"));

        assert_eq!(repo.find_by_id(&draft.quote.id).await.expect("lookup"), None);
        assert!(repo.find_by_id(&sent.quote.id).await.expect("lookup").is_some());
    }

    #[tokio::test]
    async fn expiry_sweep_only_touches_old_sent_quotes() {
        let repo = InMemoryQuoteRepository::default();
        let stale = aggregate("ER-LM-0005", QuoteStatus::Sent, 31);
        let fresh = aggregate("ER-LM-0006", QuoteStatus::Sent, 29);
        let accepted = aggregate("ER-LM-0007", QuoteStatus::Accepted, 45);
        for stored in [&stale, &fresh, &accepted] {
            repo.create_with_items(stored.clone()).await.expect("create");
        }

        let cutoff = Utc::now() - Duration::days(30);
        assert_eq!(repo.expire_sent_before(cutoff).await.expect("sweep"), 1);
        // Idempotent: a second sweep finds nothing left.
        assert_eq!(repo.expire_sent_before(cutoff).await.expect("second sweep"), 0);

        async fn statuses(
            repo: &InMemoryQuoteRepository,
            id: &QuoteId,
        ) -> Option<QuoteStatus> {
            repo.find_by_id(id).await.expect("lookup").map(|q| q.quote.status)
        }
        assert_eq!(statuses(&repo, &stale.quote.id).await, Some(QuoteStatus::Expired));
        assert_eq!(statuses(&repo, &fresh.quote.id).await, Some(QuoteStatus::Sent));
        assert_eq!(statuses(&repo, &accepted.quote.id).await, Some(QuoteStatus::Accepted));
    }

    #[tokio::test]
    async fn reference_count_spans_all_quotes() {
        let repo = InMemoryQuoteRepository::default();
        let first = aggregate("ER-LM-0008", QuoteStatus::Draft, 0);
        let shared_item = first.items[0].item_id;
        let mut second = aggregate("ER-LM-0009", QuoteStatus::Sent, 0);
        second.items[0].item_id = shared_item;

        repo.create_with_items(first).await.expect("create first");
        repo.create_with_items(second).await.expect("create second");

        assert_eq!(repo.item_reference_count(&shared_item).await.expect("count"), 2);
        assert_eq!(repo.item_reference_count(&ItemId::generate()).await.expect("count"), 0);
    }
}
