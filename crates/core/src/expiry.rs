use chrono::{DateTime, Duration, Utc};

use crate::domain::quote::{Quote, QuoteStatus};

/// Time-based demotion rule: a `Sent` quote past its validity window is
/// expired for every read, whether or not the sweep has persisted it yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpiryPolicy {
    validity: Duration,
}

impl ExpiryPolicy {
    pub fn new(validity_days: i64) -> Self {
        Self { validity: Duration::days(validity_days) }
    }

    pub fn valid_until(&self, created_at: DateTime<Utc>) -> DateTime<Utc> {
        created_at + self.validity
    }

    /// Status a reader should act on: stored status, except that a `Sent`
    /// quote past its window reads as `Expired` even before the sweep runs.
    pub fn effective_status(&self, quote: &Quote, now: DateTime<Utc>) -> QuoteStatus {
        if quote.status == QuoteStatus::Sent && now > self.valid_until(quote.created_at) {
            QuoteStatus::Expired
        } else {
            quote.status
        }
    }

    pub fn is_expired(&self, quote: &Quote, now: DateTime<Utc>) -> bool {
        self.effective_status(quote, now) == QuoteStatus::Expired
    }

    /// Creation-time cutoff for the persisted sweep: `Sent` quotes created
    /// strictly before this instant are eligible for `Sent -> Expired`.
    pub fn sweep_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - self.validity
    }
}
