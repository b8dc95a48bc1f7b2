use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::catalog::ItemId;
use crate::domain::partner::PartnerId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuoteId(pub Uuid);

impl QuoteId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineItemId(pub Uuid);

impl LineItemId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
    Executed,
    Expired,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Executed => "executed",
            Self::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "sent" => Some(Self::Sent),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "executed" => Some(Self::Executed),
            "expired" => Some(Self::Expired),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        crate::lifecycle::allowed_transitions(*self).is_empty()
    }
}

/// Aggregate root. Totals are denormalized from the line items and must be
/// recomputed whenever the items change; past `Draft` the items are frozen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub code: String,
    pub partner_id: PartnerId,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub event_date: Option<NaiveDate>,
    pub venue: String,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub status: QuoteStatus,
    pub terms: String,
    pub created_at: DateTime<Utc>,
}

/// One catalog item applied to a quote, carrying a snapshot of the item's
/// name, description, and base price as of quoting time. Later catalog edits
/// never reach back into issued quotes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteLineItem {
    pub id: LineItemId,
    pub quote_id: QuoteId,
    pub item_id: ItemId,
    pub item_name: String,
    pub item_description: String,
    pub base_price: Decimal,
    pub margin: u8,
    pub margin_amount: Decimal,
    pub total_price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteWithItems {
    pub quote: Quote,
    pub items: Vec<QuoteLineItem>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteDraft {
    pub partner_id: PartnerId,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: String,
    pub event_date: Option<NaiveDate>,
    pub venue: String,
    pub terms: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemDraft {
    pub item_id: ItemId,
    pub margin: u8,
}
