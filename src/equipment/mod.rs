//! Equipment model: rank, stats, text parsing, and gear scoring.

pub mod parser;
pub mod rank;
pub mod score;
pub mod stat;

use serde::Serialize;

pub use parser::parse_equipment;
pub use score::{Classification, GearScoreEvaluator, GearScoreResult};

use rank::EquipmentRank;
use stat::StatRecord;

/// One scanned item. `stats[0]` is the main stat when present, followed by
/// at most four sub stats.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Equipment {
    pub rank: EquipmentRank,
    pub stats: Vec<StatRecord>,
}

impl Equipment {
    pub fn main_stat(&self) -> Option<&StatRecord> {
        self.stats.first()
    }

    pub fn sub_stats(&self) -> &[StatRecord] {
        self.stats.get(1..).unwrap_or(&[])
    }
}

impl std::fmt::Display for Equipment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.rank)?;
        if let Some(main) = self.main_stat() {
            write!(f, " | main {}", main)?;
        }
        for stat in self.sub_stats() {
            write!(f, " | {}", stat)?;
        }
        Ok(())
    }
}
