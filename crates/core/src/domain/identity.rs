use serde::{Deserialize, Serialize};

use crate::domain::partner::PartnerId;

/// Authenticated caller as supplied by the session collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Caller {
    Admin,
    Partner(PartnerId),
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Admins act on any quote; partners only on quotes they own.
    pub fn may_act_on(&self, owner: &PartnerId) -> bool {
        match self {
            Self::Admin => true,
            Self::Partner(id) => id == owner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Caller;
    use crate::domain::partner::PartnerId;

    #[test]
    fn admin_may_act_on_any_partner() {
        assert!(Caller::Admin.may_act_on(&PartnerId::generate()));
    }

    #[test]
    fn partner_may_act_only_on_own_records() {
        let own = PartnerId::generate();
        let other = PartnerId::generate();
        assert!(Caller::Partner(own).may_act_on(&own));
        assert!(!Caller::Partner(own).may_act_on(&other));
    }
}
