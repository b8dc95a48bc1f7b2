use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub Uuid);

impl ItemId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Venue,
    Catering,
    Music,
    Decoration,
    Photography,
    Staffing,
}

impl ItemCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Venue => "venue",
            Self::Catering => "catering",
            Self::Music => "music",
            Self::Decoration => "decoration",
            Self::Photography => "photography",
            Self::Staffing => "staffing",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "venue" => Some(Self::Venue),
            "catering" => Some(Self::Catering),
            "music" => Some(Self::Music),
            "decoration" => Some(Self::Decoration),
            "photography" => Some(Self::Photography),
            "staffing" => Some(Self::Staffing),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Silver,
    Gold,
    Platinum,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "silver" => Some(Self::Silver),
            "gold" => Some(Self::Gold),
            "platinum" => Some(Self::Platinum),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ambience {
    Indoor,
    Outdoor,
    Garden,
    Beach,
}

impl Ambience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Indoor => "indoor",
            Self::Outdoor => "outdoor",
            Self::Garden => "garden",
            Self::Beach => "beach",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "indoor" => Some(Self::Indoor),
            "outdoor" => Some(Self::Outdoor),
            "garden" => Some(Self::Garden),
            "beach" => Some(Self::Beach),
            _ => None,
        }
    }
}

/// Inclusive markup bounds a partner must stay within when quoting an item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginRange {
    pub min: u8,
    pub max: u8,
}

impl MarginRange {
    pub fn new(min: u8, max: u8) -> Result<Self, DomainError> {
        if max > 100 {
            return Err(DomainError::validation(
                "max_margin",
                format!("margin bound {max} exceeds 100"),
            ));
        }
        if min > max {
            return Err(DomainError::validation(
                "min_margin",
                format!("minimum margin {min} exceeds maximum {max}"),
            ));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, margin: u8) -> bool {
        margin >= self.min && margin <= self.max
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub category: ItemCategory,
    pub tier: QualityTier,
    pub ambience: Ambience,
    pub base_price: Decimal,
    pub margins: MarginRange,
    pub active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub name: String,
    pub description: String,
    pub category: ItemCategory,
    pub tier: QualityTier,
    pub ambience: Ambience,
    pub base_price: Decimal,
    pub min_margin: u8,
    pub max_margin: u8,
}

impl ItemDraft {
    /// Validates the draft and mints a full catalog item under a fresh id.
    pub fn into_item(self, id: ItemId) -> Result<CatalogItem, DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name", "item name must not be empty"));
        }
        if self.base_price < Decimal::ZERO {
            return Err(DomainError::validation(
                "base_price",
                format!("base price {} is negative", self.base_price),
            ));
        }
        let margins = MarginRange::new(self.min_margin, self.max_margin)?;

        Ok(CatalogItem {
            id,
            name: self.name,
            description: self.description,
            category: self.category,
            tier: self.tier,
            ambience: self.ambience,
            base_price: self.base_price,
            margins,
            active: true,
        })
    }
}

/// Partial update applied to an existing item; unset fields keep their value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ItemCategory>,
    pub tier: Option<QualityTier>,
    pub ambience: Option<Ambience>,
    pub base_price: Option<Decimal>,
    pub min_margin: Option<u8>,
    pub max_margin: Option<u8>,
    pub active: Option<bool>,
}

impl CatalogItem {
    pub fn apply_patch(&self, patch: ItemPatch) -> Result<CatalogItem, DomainError> {
        let mut updated = self.clone();
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(DomainError::validation("name", "item name must not be empty"));
            }
            updated.name = name;
        }
        if let Some(description) = patch.description {
            updated.description = description;
        }
        if let Some(category) = patch.category {
            updated.category = category;
        }
        if let Some(tier) = patch.tier {
            updated.tier = tier;
        }
        if let Some(ambience) = patch.ambience {
            updated.ambience = ambience;
        }
        if let Some(base_price) = patch.base_price {
            if base_price < Decimal::ZERO {
                return Err(DomainError::validation(
                    "base_price",
                    format!("base price {base_price} is negative"),
                ));
            }
            updated.base_price = base_price;
        }
        let min = patch.min_margin.unwrap_or(updated.margins.min);
        let max = patch.max_margin.unwrap_or(updated.margins.max);
        updated.margins = MarginRange::new(min, max)?;
        if let Some(active) = patch.active {
            updated.active = active;
        }
        Ok(updated)
    }
}
