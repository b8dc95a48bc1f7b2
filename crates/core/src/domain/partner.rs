use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartnerId(pub Uuid);

impl PartnerId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Commercial actor who authors quotes. Deactivating a partner blocks new
/// quotes but leaves already-issued ones untouched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub id: PartnerId,
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub active: bool,
}
