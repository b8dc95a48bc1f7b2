use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use cotiza_core::domain::quote::{Quote, QuoteStatus};
use cotiza_core::pricing::round2;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteStats {
    pub total_quotes: u64,
    pub by_status: BTreeMap<String, u64>,
    pub this_month_count: u64,
    pub accepted_value: Decimal,
    /// accepted / sent * 100 over stored statuses; 0 when nothing is sent.
    pub conversion_rate: Decimal,
}

const ALL_STATUSES: &[QuoteStatus] = &[
    QuoteStatus::Draft,
    QuoteStatus::Sent,
    QuoteStatus::Accepted,
    QuoteStatus::Rejected,
    QuoteStatus::Executed,
    QuoteStatus::Expired,
];

pub fn compute(quotes: &[Quote], now: DateTime<Utc>) -> QuoteStats {
    let mut by_status: BTreeMap<String, u64> =
        ALL_STATUSES.iter().map(|status| (status.as_str().to_string(), 0)).collect();
    let mut this_month_count = 0;
    let mut accepted_value = Decimal::ZERO;

    for quote in quotes {
        *by_status.entry(quote.status.as_str().to_string()).or_insert(0) += 1;
        if quote.created_at.year() == now.year() && quote.created_at.month() == now.month() {
            this_month_count += 1;
        }
        if quote.status == QuoteStatus::Accepted {
            accepted_value += quote.total;
        }
    }

    let accepted = by_status[QuoteStatus::Accepted.as_str()];
    let sent = by_status[QuoteStatus::Sent.as_str()];
    let conversion_rate = if sent > 0 {
        round2(Decimal::from(accepted) * Decimal::ONE_HUNDRED / Decimal::from(sent))
    } else {
        Decimal::ZERO
    };

    QuoteStats {
        total_quotes: quotes.len() as u64,
        by_status,
        this_month_count,
        accepted_value,
        conversion_rate,
    }
}
