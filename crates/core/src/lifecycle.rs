use crate::domain::identity::Caller;
use crate::domain::quote::{Quote, QuoteStatus};
use crate::errors::DomainError;

/// The one authoritative transition table. Adding a state means extending
/// exactly this function.
pub fn allowed_transitions(from: QuoteStatus) -> &'static [QuoteStatus] {
    match from {
        QuoteStatus::Draft => &[QuoteStatus::Sent],
        QuoteStatus::Sent => &[QuoteStatus::Accepted, QuoteStatus::Rejected],
        QuoteStatus::Accepted => &[QuoteStatus::Executed],
        QuoteStatus::Rejected | QuoteStatus::Executed | QuoteStatus::Expired => &[],
    }
}

pub fn is_allowed(from: QuoteStatus, to: QuoteStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

/// Checks ownership and the transition table for a requested transition,
/// evaluated against `effective_from` (stored status, or `Expired` when the
/// validity window has lapsed). Does not persist anything.
pub fn authorize_transition(
    quote: &Quote,
    effective_from: QuoteStatus,
    to: QuoteStatus,
    caller: &Caller,
) -> Result<(), DomainError> {
    if !caller.may_act_on(&quote.partner_id) {
        return Err(DomainError::forbidden(format!(
            "quote {} belongs to another partner",
            quote.code
        )));
    }
    if !is_allowed(effective_from, to) {
        return Err(DomainError::InvalidTransition {
            from: effective_from,
            to,
            allowed: allowed_transitions(effective_from).to_vec(),
        });
    }
    Ok(())
}
