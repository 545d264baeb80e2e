//! Typed stat rolls and their gear score multipliers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of stat printed on an equipment line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatType {
    #[default]
    Null,
    Attack,
    AttackPercent,
    Defense,
    DefensePercent,
    Health,
    HealthPercent,
    Speed,
    EffectivenessPercent,
    EffectResistancePercent,
    CriticalHitChancePercent,
    CriticalHitDamagePercent,
}

impl StatType {
    /// True for stats whose value is a percentage.
    pub fn is_percent(&self) -> bool {
        matches!(
            self,
            StatType::AttackPercent
                | StatType::DefensePercent
                | StatType::HealthPercent
                | StatType::EffectivenessPercent
                | StatType::EffectResistancePercent
                | StatType::CriticalHitChancePercent
                | StatType::CriticalHitDamagePercent
        )
    }

    /// Percent variant of a flat stat. Other stats map to themselves.
    pub fn with_percent(self) -> StatType {
        match self {
            StatType::Attack => StatType::AttackPercent,
            StatType::Defense => StatType::DefensePercent,
            StatType::Health => StatType::HealthPercent,
            other => other,
        }
    }
}

/// One parsed stat line: type, magnitude, and how many times it was upgraded.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StatRecord {
    pub stat_type: StatType,
    pub value: f64,
    pub roll_count: u32,
}

impl StatRecord {
    pub fn new(stat_type: StatType, value: f64, roll_count: u32) -> Self {
        Self {
            stat_type,
            value,
            roll_count,
        }
    }

    /// Gear score of this stat. Types missing from the table score exactly 0.
    pub fn gear_score(&self, multipliers: &StatMultiplierTable) -> f64 {
        match multipliers.get(self.stat_type) {
            Some(mul) => self.value * mul,
            None => 0.0,
        }
    }
}

impl std::fmt::Display for StatRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unit = if self.stat_type.is_percent() { "%" } else { "" };
        write!(f, "{:?}({}): {}{}", self.stat_type, self.roll_count, self.value, unit)
    }
}

/// Multiplier applied to each stat type when computing gear score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatMultiplierTable(HashMap<StatType, f64>);

impl StatMultiplierTable {
    pub fn new(entries: impl IntoIterator<Item = (StatType, f64)>) -> Self {
        Self(entries.into_iter().collect())
    }

    pub fn get(&self, stat_type: StatType) -> Option<f64> {
        self.0.get(&stat_type).copied()
    }
}

impl Default for StatMultiplierTable {
    /// Flat stats are scaled to the average percent roll; speed and crit stats
    /// are weighted by their roll range.
    fn default() -> Self {
        Self::new([
            (StatType::Attack, 3.46 / 39.0),
            (StatType::AttackPercent, 1.0),
            (StatType::Defense, 4.99 / 31.0),
            (StatType::DefensePercent, 1.0),
            (StatType::Health, 3.09 / 174.0),
            (StatType::HealthPercent, 1.0),
            (StatType::Speed, 2.0),
            (StatType::EffectivenessPercent, 1.0),
            (StatType::EffectResistancePercent, 1.0),
            (StatType::CriticalHitChancePercent, 1.6),
            (StatType::CriticalHitDamagePercent, 1.14),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gear_score_uses_multiplier() {
        let table = StatMultiplierTable::new([(StatType::Speed, 2.0)]);
        let stat = StatRecord::new(StatType::Speed, 4.0, 1);
        assert_eq!(stat.gear_score(&table), 8.0);
    }

    #[test]
    fn test_unmapped_type_scores_zero() {
        let table = StatMultiplierTable::new([(StatType::Speed, 2.0)]);
        let stat = StatRecord::new(StatType::Attack, 500.0, 3);
        assert_eq!(stat.gear_score(&table), 0.0);

        let null = StatRecord::new(StatType::Null, 12.0, 0);
        assert_eq!(null.gear_score(&StatMultiplierTable::default()), 0.0);
    }

    #[test]
    fn test_default_table_percent_stats() {
        let table = StatMultiplierTable::default();
        let stat = StatRecord::new(StatType::CriticalHitChancePercent, 5.0, 0);
        assert!((stat.gear_score(&table) - 8.0).abs() < 1e-9);

        let stat = StatRecord::new(StatType::Attack, 39.0, 0);
        assert!((stat.gear_score(&table) - 3.46).abs() < 1e-9);
    }

    #[test]
    fn test_with_percent() {
        assert_eq!(StatType::Attack.with_percent(), StatType::AttackPercent);
        assert_eq!(StatType::Health.with_percent(), StatType::HealthPercent);
        assert_eq!(StatType::Speed.with_percent(), StatType::Speed);
        assert!(StatType::EffectResistancePercent.is_percent());
        assert!(!StatType::Defense.is_percent());
    }
}
