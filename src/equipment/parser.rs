use regex::Regex;
use std::sync::LazyLock;
use strsim::jaro_winkler;

use super::rank::EquipmentRank;
use super::stat::{StatRecord, StatType};
use super::Equipment;
use crate::log;

/// Roll count used when a stat line carries no readable annotation.
pub const DEFAULT_ROLL_COUNT: u32 = 0;

/// Sub stats kept after the main stat. Further stat lines are dropped.
pub const MAX_SUB_STATS: usize = 4;

/// Minimum Jaro-Winkler similarity for a fuzzy label or rank match.
const SIMILARITY_THRESHOLD: f64 = 0.9;

/// Labels shorter than this only match exactly.
const MIN_FUZZY_LEN: usize = 5;

/// Magnitude of a stat line, with optional thousands separators, decimals,
/// and a percent sign. Digits glued to letters are part of the label.
const VALUE_PATTERN: &str = r"\b(?P<value>\d[\d,]*(?:\.\d+)?)\s*(?P<percent>%)?";

/// 1-2 digit roll count in (), [] or {} right after the value. The closing
/// delimiter and anything after it are ignored.
const ROLL_PATTERN: &str = r"^\s*[(\[{]\s*(?P<rolls>\d{1,2})";

static VALUE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(VALUE_PATTERN).expect("value pattern is valid"));

static ROLL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ROLL_PATTERN).expect("roll pattern is valid"));

/// Normalized label spellings and the stat they name.
/// Attack, Defense, and Health resolve to their percent variant when the
/// line carries a percent sign.
const STAT_ALIASES: &[(&str, StatType)] = &[
    ("attack", StatType::Attack),
    ("atk", StatType::Attack),
    ("defense", StatType::Defense),
    ("defence", StatType::Defense),
    ("def", StatType::Defense),
    ("health", StatType::Health),
    ("hp", StatType::Health),
    ("speed", StatType::Speed),
    ("spd", StatType::Speed),
    ("effectiveness", StatType::EffectivenessPercent),
    ("eff", StatType::EffectivenessPercent),
    ("effectresistance", StatType::EffectResistancePercent),
    ("effectresist", StatType::EffectResistancePercent),
    ("resistance", StatType::EffectResistancePercent),
    ("criticalhitchance", StatType::CriticalHitChancePercent),
    ("criticalchance", StatType::CriticalHitChancePercent),
    ("critchance", StatType::CriticalHitChancePercent),
    ("critrate", StatType::CriticalHitChancePercent),
    ("criticalhitdamage", StatType::CriticalHitDamagePercent),
    ("criticaldamage", StatType::CriticalHitDamagePercent),
    ("critdamage", StatType::CriticalHitDamagePercent),
    ("critdmg", StatType::CriticalHitDamagePercent),
];

/// Maps characters OCR commonly confuses with letters back to the letter.
fn ocr_letter(c: char) -> char {
    match c {
        '0' => 'o',
        '1' | '|' | '!' => 'l',
        '5' | '$' => 's',
        '8' => 'b',
        other => other,
    }
}

/// Lowercases, undoes OCR substitutions, and keeps ASCII letters only.
pub fn normalize_label(text: &str) -> String {
    text.chars()
        .map(ocr_letter)
        .filter(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_lowercase()
}

/// Resolves a raw label to a stat type: exact alias first, then the most
/// similar alias above the threshold. The bool is true when the label itself
/// spells out "percent".
pub fn match_stat_label(label: &str) -> Option<(StatType, bool)> {
    let mut normalized = normalize_label(label);
    let mut spelled_percent = label.contains('%');
    if let Some(stripped) = normalized.strip_suffix("percent") {
        normalized = stripped.to_string();
        spelled_percent = true;
    }

    if normalized.is_empty() {
        return None;
    }

    if let Some((_, stat_type)) = STAT_ALIASES.iter().find(|(alias, _)| *alias == normalized) {
        return Some((*stat_type, spelled_percent));
    }

    if normalized.len() < MIN_FUZZY_LEN {
        return None;
    }

    let mut best: Option<(StatType, f64)> = None;
    for (alias, stat_type) in STAT_ALIASES {
        if alias.len() < MIN_FUZZY_LEN {
            continue;
        }
        let similarity = jaro_winkler(&normalized, alias);
        if similarity >= SIMILARITY_THRESHOLD
            && best.map_or(true, |(_, s)| similarity > s)
        {
            best = Some((*stat_type, similarity));
        }
    }

    best.map(|(stat_type, _)| (stat_type, spelled_percent))
}

/// Classifies a single word as a rank token.
pub fn match_rank(word: &str) -> Option<EquipmentRank> {
    let normalized = normalize_label(word);
    if normalized.is_empty() {
        return None;
    }

    if let Some(rank) = EquipmentRank::NAMED
        .iter()
        .find(|rank| rank.token() == normalized)
    {
        return Some(*rank);
    }

    if normalized.len() < MIN_FUZZY_LEN {
        return None;
    }

    EquipmentRank::NAMED
        .iter()
        .filter(|rank| rank.token().len() >= MIN_FUZZY_LEN)
        .map(|rank| (*rank, jaro_winkler(&normalized, rank.token())))
        .filter(|(_, similarity)| *similarity >= SIMILARITY_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(rank, _)| rank)
}

/// Finds the first rank token in the text and returns the rank together with
/// the lines, the token removed from its line.
fn extract_rank(text: &str) -> (EquipmentRank, Vec<String>) {
    let mut rank = None;
    let mut lines = Vec::new();

    for line in text.lines() {
        if rank.is_some() {
            lines.push(line.to_string());
            continue;
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        match words.iter().position(|w| match_rank(w).is_some()) {
            Some(idx) => {
                rank = match_rank(words[idx]);
                let rest: Vec<&str> = words
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != idx)
                    .map(|(_, w)| *w)
                    .collect();
                lines.push(rest.join(" "));
            }
            None => lines.push(line.to_string()),
        }
    }

    (rank.unwrap_or_default(), lines)
}

/// Parses one candidate line into a stat record.
///
/// Returns `None` when no magnitude follows a known stat label. A missing or
/// unreadable roll annotation yields `DEFAULT_ROLL_COUNT`.
pub fn parse_stat_line(line: &str) -> Option<StatRecord> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    // First magnitude whose preceding text names a known stat
    let (caps, stat_type, spelled_percent) = VALUE_REGEX.captures_iter(line).find_map(|caps| {
        let start = caps.name("value")?.start();
        let (stat_type, spelled_percent) = match_stat_label(&line[..start])?;
        Some((caps, stat_type, spelled_percent))
    })?;
    let value_match = caps.name("value")?;

    let value = value_match
        .as_str()
        .chars()
        .filter(|c| *c != ',')
        .collect::<String>()
        .parse::<f64>()
        .ok()?;

    let has_percent = spelled_percent || caps.name("percent").is_some();
    let stat_type = if has_percent {
        stat_type.with_percent()
    } else {
        stat_type
    };

    // An unreadable annotation keeps the stat with the default count
    let rest = &line[caps.get(0).map_or(line.len(), |m| m.end())..];
    let roll_count = ROLL_REGEX
        .captures(rest)
        .and_then(|c| c.name("rolls"))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .unwrap_or(DEFAULT_ROLL_COUNT);

    Some(StatRecord::new(stat_type, value, roll_count))
}

/// Parses the concatenated OCR text of both regions into an equipment record.
///
/// Never fails: unrecognized lines are skipped, a missing rank yields
/// `EquipmentRank::Unknown`, and text without stat lines yields no stats.
pub fn parse_equipment(text: &str) -> Equipment {
    let (rank, lines) = extract_rank(text);

    let mut stats: Vec<StatRecord> = Vec::with_capacity(1 + MAX_SUB_STATS);
    let mut dropped = 0;

    for line in &lines {
        let Some(stat) = parse_stat_line(line) else {
            continue;
        };
        if stats.len() > MAX_SUB_STATS {
            dropped += 1;
            continue;
        }
        stats.push(stat);
    }

    if dropped > 0 {
        log(&format!(
            "Parser: dropped {} stat line(s) beyond {} sub stats",
            dropped, MAX_SUB_STATS
        ));
    }

    Equipment { rank, stats }
}
