use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use cotiza_core::clock::Clock;
use cotiza_core::codegen::{generate_code, FolioSource};
use cotiza_core::config::QuotingConfig;
use cotiza_core::domain::catalog::{CatalogItem, ItemDraft, ItemId, ItemPatch};
use cotiza_core::domain::identity::Caller;
use cotiza_core::domain::quote::{
    LineItemDraft, LineItemId, Quote, QuoteDraft, QuoteId, QuoteLineItem, QuoteStatus,
    QuoteWithItems,
};
use cotiza_core::errors::DomainError;
use cotiza_core::expiry::ExpiryPolicy;
use cotiza_core::lifecycle;
use cotiza_core::pricing;
use cotiza_db::repositories::{
    CatalogRepository, PartnerRepository, QuoteRepository, RepositoryError,
};

use crate::stats::{self, QuoteStats};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("storage failure: {0}")]
    Storage(#[from] RepositoryError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceSettings {
    pub tax_rate: Decimal,
    pub validity_days: i64,
    pub code_attempts: u32,
}

impl From<&QuotingConfig> for ServiceSettings {
    fn from(config: &QuotingConfig) -> Self {
        Self {
            tax_rate: config.tax_rate(),
            validity_days: config.validity_days,
            code_attempts: config.code_attempts,
        }
    }
}

/// A quote as returned to readers: stored fields plus the computed expiry
/// view. `is_expired` may disagree with the stored status until the sweep
/// persists the demotion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteView {
    pub quote: Quote,
    pub items: Vec<QuoteLineItem>,
    pub is_expired: bool,
    pub valid_until: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub expired_count: u64,
}

/// Application service over the §3 collaborators: storage, caller identity,
/// clock, folio source. Stateless between calls; every request reads fresh.
pub struct QuoteService {
    catalog: Arc<dyn CatalogRepository>,
    partners: Arc<dyn PartnerRepository>,
    quotes: Arc<dyn QuoteRepository>,
    clock: Arc<dyn Clock>,
    folios: Arc<dyn FolioSource>,
    tax_rate: Decimal,
    expiry: ExpiryPolicy,
    code_attempts: u32,
}

impl QuoteService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        partners: Arc<dyn PartnerRepository>,
        quotes: Arc<dyn QuoteRepository>,
        clock: Arc<dyn Clock>,
        folios: Arc<dyn FolioSource>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            catalog,
            partners,
            quotes,
            clock,
            folios,
            tax_rate: settings.tax_rate,
            expiry: ExpiryPolicy::new(settings.validity_days),
            code_attempts: settings.code_attempts.max(1),
        }
    }

    // Catalog operations. Mutations are admin-only; items are never touched
    // by quote creation.

    pub async fn list_items(&self) -> Result<Vec<CatalogItem>, ServiceError> {
        Ok(self.catalog.list().await?)
    }

    pub async fn get_item(&self, id: &ItemId) -> Result<CatalogItem, ServiceError> {
        self.catalog
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("catalog item", id.0).into())
    }

    pub async fn create_item(
        &self,
        draft: ItemDraft,
        caller: &Caller,
    ) -> Result<CatalogItem, ServiceError> {
        require_admin(caller, "create catalog items")?;
        let item = draft.into_item(ItemId::generate())?;
        self.catalog.save(item.clone()).await?;
        info!(event_name = "catalog.item_created", item_id = %item.id.0, name = %item.name, "catalog item created");
        Ok(item)
    }

    pub async fn update_item(
        &self,
        id: &ItemId,
        patch: ItemPatch,
        caller: &Caller,
    ) -> Result<CatalogItem, ServiceError> {
        require_admin(caller, "edit catalog items")?;
        let current = self.get_item(id).await?;
        let updated = current.apply_patch(patch)?;
        self.catalog.save(updated.clone()).await?;
        Ok(updated)
    }

    pub async fn delete_item(&self, id: &ItemId, caller: &Caller) -> Result<(), ServiceError> {
        require_admin(caller, "delete catalog items")?;
        let references = self.quotes.item_reference_count(id).await?;
        if references > 0 {
            return Err(DomainError::conflict(format!(
                "catalog item {} is referenced by {references} quote line item(s)",
                id.0
            ))
            .into());
        }
        if !self.catalog.delete(id).await? {
            return Err(DomainError::not_found("catalog item", id.0).into());
        }
        Ok(())
    }

    // Quote operations.

    /// Assembles and persists a draft quote with its line items as one
    /// atomic unit: resolve items, validate margins, snapshot, price,
    /// stamp a unique code.
    pub async fn create_quote(
        &self,
        draft: QuoteDraft,
        line_drafts: Vec<LineItemDraft>,
        caller: &Caller,
    ) -> Result<QuoteView, ServiceError> {
        if let Caller::Partner(id) = caller {
            if *id != draft.partner_id {
                return Err(DomainError::forbidden(
                    "partners may only author quotes for themselves",
                )
                .into());
            }
        }
        if draft.client_name.trim().is_empty() {
            return Err(DomainError::validation("client_name", "client name is required").into());
        }
        if line_drafts.is_empty() {
            return Err(DomainError::validation(
                "line_items",
                "a quote needs at least one line item",
            )
            .into());
        }

        let partner = self
            .partners
            .find_by_id(&draft.partner_id)
            .await?
            .ok_or_else(|| DomainError::not_found("partner", draft.partner_id.0))?;
        if !partner.active {
            return Err(DomainError::forbidden(format!(
                "partner {} is deactivated and cannot author quotes",
                partner.name
            ))
            .into());
        }

        let quote_id = QuoteId::generate();
        let mut items = Vec::with_capacity(line_drafts.len());
        for line in &line_drafts {
            let item = self
                .catalog
                .find_by_id(&line.item_id)
                .await?
                .ok_or_else(|| DomainError::not_found("catalog item", line.item_id.0))?;
            if !item.active {
                return Err(DomainError::validation(
                    "item_id",
                    format!("catalog item `{}` is inactive", item.name),
                )
                .into());
            }
            let priced = pricing::price_line_for_item(&item, line.margin)?;
            items.push(QuoteLineItem {
                id: LineItemId::generate(),
                quote_id,
                item_id: item.id,
                item_name: item.name,
                item_description: item.description,
                base_price: item.base_price,
                margin: line.margin,
                margin_amount: priced.margin_amount,
                total_price: priced.total_price,
            });
        }

        let line_totals = items.iter().map(|item| item.total_price).collect::<Vec<_>>();
        let totals = pricing::aggregate(&line_totals, self.tax_rate)?;
        let created_at = self.clock.now();

        for _ in 0..self.code_attempts {
            let code = generate_code(&partner.name, &draft.client_name, self.folios.next_folio());
            if self.quotes.code_exists(&code).await? {
                continue;
            }
            let aggregate = QuoteWithItems {
                quote: Quote {
                    id: quote_id,
                    code: code.clone(),
                    partner_id: draft.partner_id,
                    client_name: draft.client_name.clone(),
                    client_email: draft.client_email.clone(),
                    client_phone: draft.client_phone.clone(),
                    event_date: draft.event_date,
                    venue: draft.venue.clone(),
                    subtotal: totals.subtotal,
                    tax: totals.tax,
                    total: totals.total,
                    status: QuoteStatus::Draft,
                    terms: draft.terms.clone(),
                    created_at,
                },
                items: items.clone(),
            };
            match self.quotes.create_with_items(aggregate.clone()).await {
                Ok(()) => {
                    info!(
                        event_name = "quote.created",
                        quote_id = %quote_id.0,
                        code = %code,
                        total = %totals.total,
                        "quote created"
                    );
                    return Ok(self.view(aggregate, created_at));
                }
                // Lost the folio race to a concurrent writer; try a fresh one.
                Err(RepositoryError::UniqueViolation(_)) => continue,
                Err(error) => return Err(error.into()),
            }
        }

        Err(DomainError::conflict(format!(
            "could not allocate a unique quote code after {} attempts",
            self.code_attempts
        ))
        .into())
    }

    pub async fn get_quote(&self, id: &QuoteId) -> Result<QuoteView, ServiceError> {
        let stored = self
            .quotes
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("quote", id.0))?;
        Ok(self.view(stored, self.clock.now()))
    }

    /// Applies a lifecycle transition with an optimistic compare-and-set.
    /// The transition table is consulted against the effective status, so a
    /// display-expired quote can no longer be accepted or rejected.
    pub async fn request_transition(
        &self,
        id: &QuoteId,
        to: QuoteStatus,
        caller: &Caller,
    ) -> Result<Quote, ServiceError> {
        let stored = self
            .quotes
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("quote", id.0))?;
        let mut quote = stored.quote;

        let effective = self.expiry.effective_status(&quote, self.clock.now());
        lifecycle::authorize_transition(&quote, effective, to, caller)?;

        if !self.quotes.update_status(id, quote.status, to).await? {
            return Err(DomainError::conflict(format!(
                "quote {} was modified concurrently; re-read and retry",
                quote.code
            ))
            .into());
        }
        info!(
            event_name = "quote.transition_applied",
            quote_id = %id.0,
            from = quote.status.as_str(),
            to = to.as_str(),
            "quote status transition applied"
        );
        quote.status = to;
        Ok(quote)
    }

    /// Hard invariant: only drafts are deletable, whoever asks.
    pub async fn delete_quote(&self, id: &QuoteId, caller: &Caller) -> Result<(), ServiceError> {
        let stored = self
            .quotes
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("quote", id.0))?;
        if !caller.may_act_on(&stored.quote.partner_id) {
            return Err(DomainError::forbidden(format!(
                "quote {} belongs to another partner",
                stored.quote.code
            ))
            .into());
        }
        if stored.quote.status != QuoteStatus::Draft {
            return Err(DomainError::forbidden(format!(
                "quote {} is {} and can no longer be deleted",
                stored.quote.code,
                stored.quote.status.as_str()
            ))
            .into());
        }
        if !self.quotes.delete_draft(id).await? {
            return Err(DomainError::conflict(format!(
                "quote {} left draft concurrently",
                stored.quote.code
            ))
            .into());
        }
        info!(event_name = "quote.deleted", quote_id = %id.0, code = %stored.quote.code, "draft quote deleted");
        Ok(())
    }

    /// Persists `sent -> expired` for every quote past its validity window.
    /// Idempotent; triggered externally (scheduler or admin action).
    pub async fn sweep_expired_quotes(&self) -> Result<SweepReport, ServiceError> {
        let cutoff = self.expiry.sweep_cutoff(self.clock.now());
        let expired_count = self.quotes.expire_sent_before(cutoff).await?;
        info!(
            event_name = "expiry.sweep_completed",
            expired_count,
            %cutoff,
            "expiry sweep completed"
        );
        Ok(SweepReport { expired_count })
    }

    pub async fn quote_stats(&self) -> Result<QuoteStats, ServiceError> {
        let quotes = self.quotes.list().await?;
        Ok(stats::compute(&quotes, self.clock.now()))
    }

    fn view(&self, stored: QuoteWithItems, now: DateTime<Utc>) -> QuoteView {
        let is_expired = self.expiry.is_expired(&stored.quote, now);
        let valid_until = self.expiry.valid_until(stored.quote.created_at);
        QuoteView { quote: stored.quote, items: stored.items, is_expired, valid_until }
    }
}

fn require_admin(caller: &Caller, action: &str) -> Result<(), DomainError> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(DomainError::forbidden(format!("only administrators may {action}")))
    }
}
