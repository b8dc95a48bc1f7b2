pub mod service;
pub mod stats;

pub use service::{QuoteService, QuoteView, ServiceError, ServiceSettings, SweepReport};
pub use stats::QuoteStats;
