use serde::{Deserialize, Serialize};

/// Quality tier of an equipment item, lowest first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EquipmentRank {
    /// No rank token was recognized
    #[default]
    Unknown,
    Normal,
    Good,
    Rare,
    Heroic,
    Epic,
    Legendary,
}

impl EquipmentRank {
    /// Every recognizable rank, excluding `Unknown`.
    pub const NAMED: [EquipmentRank; 6] = [
        EquipmentRank::Normal,
        EquipmentRank::Good,
        EquipmentRank::Rare,
        EquipmentRank::Heroic,
        EquipmentRank::Epic,
        EquipmentRank::Legendary,
    ];

    /// Lowercase token as printed on the item.
    pub fn token(&self) -> &'static str {
        match self {
            EquipmentRank::Unknown => "unknown",
            EquipmentRank::Normal => "normal",
            EquipmentRank::Good => "good",
            EquipmentRank::Rare => "rare",
            EquipmentRank::Heroic => "heroic",
            EquipmentRank::Epic => "epic",
            EquipmentRank::Legendary => "legendary",
        }
    }
}

impl std::fmt::Display for EquipmentRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EquipmentRank::Unknown => write!(f, "Unknown"),
            EquipmentRank::Normal => write!(f, "Normal"),
            EquipmentRank::Good => write!(f, "Good"),
            EquipmentRank::Rare => write!(f, "Rare"),
            EquipmentRank::Heroic => write!(f, "Heroic"),
            EquipmentRank::Epic => write!(f, "Epic"),
            EquipmentRank::Legendary => write!(f, "Legendary"),
        }
    }
}
