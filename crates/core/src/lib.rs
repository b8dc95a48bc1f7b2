pub mod clock;
pub mod codegen;
pub mod config;
pub mod domain;
pub mod errors;
pub mod expiry;
pub mod lifecycle;
pub mod pricing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use codegen::{generate_code, FolioSource, RandomFolioSource};
pub use domain::catalog::{
    Ambience, CatalogItem, ItemCategory, ItemDraft, ItemId, ItemPatch, MarginRange, QualityTier,
};
pub use domain::identity::Caller;
pub use domain::partner::{Partner, PartnerId};
pub use domain::quote::{
    LineItemDraft, LineItemId, Quote, QuoteDraft, QuoteId, QuoteLineItem, QuoteStatus,
    QuoteWithItems,
};
pub use errors::DomainError;
pub use expiry::ExpiryPolicy;
pub use pricing::{aggregate, price_line, price_line_for_item, round2, LinePricing, QuoteTotals};
