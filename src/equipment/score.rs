//! Gear score aggregation and rank-banded classification.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Equipment;
use super::rank::EquipmentRank;
use super::stat::StatMultiplierTable;

/// Number of stat slots that contribute to the gear score.
/// Slots are filled from `Equipment::stats` in order, main stat first, so with
/// a main stat and four sub stats the fourth sub stat is not scored.
pub const GEAR_SCORE_SLOTS: usize = 4;

/// Value the lowest-scoring stat is replaced with in the adjusted total.
/// Also the lowest score assumed when an item has no stats.
pub const LOWEST_STAT_REPLACEMENT: f64 = 8.0;

/// Score band of one rank.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreBand {
    pub min: f64,
    pub max: f64,
}

/// Score bands keyed by equipment rank.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankThresholdTable(HashMap<EquipmentRank, ScoreBand>);

impl RankThresholdTable {
    pub fn new(entries: impl IntoIterator<Item = (EquipmentRank, ScoreBand)>) -> Self {
        Self(entries.into_iter().collect())
    }

    pub fn get(&self, rank: EquipmentRank) -> Option<ScoreBand> {
        self.0.get(&rank).copied()
    }
}

impl Default for RankThresholdTable {
    fn default() -> Self {
        Self::new([
            (EquipmentRank::Rare, ScoreBand { min: 45.0, max: 55.0 }),
            (EquipmentRank::Heroic, ScoreBand { min: 50.0, max: 60.0 }),
            (EquipmentRank::Epic, ScoreBand { min: 55.0, max: 65.0 }),
            (EquipmentRank::Legendary, ScoreBand { min: 60.0, max: 70.0 }),
        ])
    }
}

/// Where a score falls relative to its rank's band.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Classification {
    /// Score is below the band minimum
    Below,
    /// Score is inside the band
    Within,
    /// Score reaches the band maximum
    Above,
    /// The rank has no band
    Unclassified,
}

impl Classification {
    /// Classifies a score against an optional band. `max` is inclusive for `Above`.
    pub fn of(score: f64, band: Option<ScoreBand>) -> Self {
        match band {
            None => Classification::Unclassified,
            Some(band) if score < band.min => Classification::Below,
            Some(band) if score >= band.max => Classification::Above,
            Some(_) => Classification::Within,
        }
    }
}

/// Scores of one scanned item.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GearScoreResult {
    /// Score of each of the first four stats, 0 for empty slots
    pub per_stat: [f64; GEAR_SCORE_SLOTS],
    pub total: f64,
    /// Total with the lowest stat replaced by `LOWEST_STAT_REPLACEMENT`
    pub adjusted_total: f64,
    pub total_class: Classification,
    pub adjusted_class: Classification,
}

/// Computes gear scores from the configured tables.
#[derive(Clone, Debug, Default)]
pub struct GearScoreEvaluator {
    multipliers: StatMultiplierTable,
    thresholds: RankThresholdTable,
}

impl GearScoreEvaluator {
    pub fn new(multipliers: StatMultiplierTable, thresholds: RankThresholdTable) -> Self {
        Self {
            multipliers,
            thresholds,
        }
    }

    pub fn evaluate(&self, equipment: &Equipment) -> GearScoreResult {
        let mut per_stat = [0.0; GEAR_SCORE_SLOTS];
        let mut total = 0.0;
        let mut lowest: Option<f64> = None;

        for (slot, stat) in equipment.stats.iter().take(GEAR_SCORE_SLOTS).enumerate() {
            let score = stat.gear_score(&self.multipliers);
            per_stat[slot] = score;
            total += score;
            lowest = Some(lowest.map_or(score, |low| low.min(score)));
        }

        // The weakest stat is assumed to be an average roll instead
        let lowest = lowest.unwrap_or(LOWEST_STAT_REPLACEMENT);
        let adjusted_total = total - lowest + LOWEST_STAT_REPLACEMENT;

        let band = self.thresholds.get(equipment.rank);
        GearScoreResult {
            per_stat,
            total,
            adjusted_total,
            total_class: Classification::of(total, band),
            adjusted_class: Classification::of(adjusted_total, band),
        }
    }
}
