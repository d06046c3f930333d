//! Moderation policy: the reason→score table, the ban threshold and the
//! feature flags the command layer consults around a citation.
//!
//! The store itself never evaluates policy — after a cite the collaborator
//! layer compares the dossier score against [`PolicySettings`] and performs
//! (or skips) the enforcement side effect. This module only answers
//! questions.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lower clamp for the configured ban threshold.
pub const MIN_BAN_THRESHOLD: u32 = 1;

/// Upper clamp for the configured ban threshold.
pub const MAX_BAN_THRESHOLD: u32 = 20;

/// Errors from loading policy configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PolicyError {
    /// The configuration file could not be read.
    #[error("failed to read policy file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration was not valid TOML for this schema.
    #[error("failed to parse policy: {0}")]
    Parse(#[from] toml::de::Error),
}

/// One severity level: a score and the reasons that map to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonLevel {
    /// The score every reason at this level carries.
    pub score: u32,
    /// The reason strings operators may cite.
    pub reasons: Vec<String>,
}

/// Server moderation policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySettings {
    /// Whether reaching the threshold bans at all.
    #[serde(default = "default_true")]
    pub ban: bool,

    /// Whether a citation kicks the player even below the threshold.
    #[serde(default)]
    pub kick_on_cite: bool,

    /// Whether a citation must carry a proof URL.
    #[serde(default)]
    pub require_proof: bool,

    /// Configured ban threshold; clamped to the
    /// [`MIN_BAN_THRESHOLD`]..=[`MAX_BAN_THRESHOLD`] range when read.
    #[serde(default = "default_ban_at_score")]
    pub ban_at_score: u32,

    /// The reason→score table.
    #[serde(default = "default_reason_levels")]
    pub reasons: Vec<ReasonLevel>,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            ban: true,
            kick_on_cite: false,
            require_proof: false,
            ban_at_score: default_ban_at_score(),
            reasons: default_reason_levels(),
        }
    }
}

impl PolicySettings {
    /// Loads policy from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError`] when the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses policy from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Parse`] when the TOML does not match this
    /// schema.
    pub fn from_toml(content: &str) -> Result<Self, PolicyError> {
        Ok(toml::from_str(content)?)
    }

    /// Score for a reason string, case-insensitively; `None` for reasons
    /// the table does not know, which the command layer rejects.
    #[must_use]
    pub fn score_for_reason(&self, reason: &str) -> Option<u32> {
        self.reasons.iter().find_map(|level| {
            level
                .reasons
                .iter()
                .any(|known| known.eq_ignore_ascii_case(reason))
                .then_some(level.score)
        })
    }

    /// The reasons carrying the given score.
    #[must_use]
    pub fn reasons_at_level(&self, score: u32) -> Vec<String> {
        self.reasons
            .iter()
            .filter(|level| level.score == score)
            .flat_map(|level| level.reasons.iter().cloned())
            .collect()
    }

    /// Every valid reason string. Feeds operator tab-completion.
    #[must_use]
    pub fn all_reasons(&self) -> Vec<String> {
        self.reasons
            .iter()
            .flat_map(|level| level.reasons.iter().cloned())
            .collect()
    }

    /// The threshold a player actually bans at: the configured value
    /// clamped to [`MIN_BAN_THRESHOLD`]..=[`MAX_BAN_THRESHOLD`], unless a
    /// permission tier overrides it (tiers outside the clamp range are
    /// ignored).
    #[must_use]
    pub fn effective_ban_threshold(&self, tier_override: Option<u32>) -> u32 {
        match tier_override {
            Some(tier) if (MIN_BAN_THRESHOLD..=MAX_BAN_THRESHOLD).contains(&tier) => tier,
            _ => self
                .ban_at_score
                .clamp(MIN_BAN_THRESHOLD, MAX_BAN_THRESHOLD),
        }
    }
}

/// Whether a score meets the ban threshold. The enforcement side effect
/// stays with the caller.
#[must_use]
pub const fn ban_decision(score: u32, threshold: u32) -> bool {
    score >= threshold
}

const fn default_true() -> bool {
    true
}

const fn default_ban_at_score() -> u32 {
    5
}

fn default_reason_levels() -> Vec<ReasonLevel> {
    let level = |score: u32, reasons: &[&str]| ReasonLevel {
        score,
        reasons: reasons.iter().map(ToString::to_string).collect(),
    };
    vec![
        level(1, &["spam", "caps"]),
        level(2, &["disrespect", "trolling"]),
        level(3, &["griefing", "advertising"]),
        level(4, &["harassment", "ban evasion"]),
        level(5, &["hacking", "exploiting"]),
    ]
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn default_table_maps_reasons_to_scores() {
        let policy = PolicySettings::default();
        assert_eq!(policy.score_for_reason("griefing"), Some(3));
        assert_eq!(policy.score_for_reason("GRIEFING"), Some(3));
        assert_eq!(policy.score_for_reason("spam"), Some(1));
        assert_eq!(policy.score_for_reason("being rude"), None);
    }

    #[test]
    fn threshold_clamps_to_bounds() {
        let mut policy = PolicySettings::default();

        policy.ban_at_score = 0;
        assert_eq!(policy.effective_ban_threshold(None), MIN_BAN_THRESHOLD);

        policy.ban_at_score = 99;
        assert_eq!(policy.effective_ban_threshold(None), MAX_BAN_THRESHOLD);

        policy.ban_at_score = 7;
        assert_eq!(policy.effective_ban_threshold(None), 7);
    }

    #[test]
    fn tier_override_wins_within_bounds() {
        let policy = PolicySettings::default();
        assert_eq!(policy.effective_ban_threshold(Some(2)), 2);
        assert_eq!(policy.effective_ban_threshold(Some(20)), 20);
        // Out-of-range tiers fall back to the configured value.
        assert_eq!(policy.effective_ban_threshold(Some(0)), 5);
        assert_eq!(policy.effective_ban_threshold(Some(21)), 5);
    }

    #[test]
    fn ban_decision_is_at_or_above_threshold() {
        assert!(ban_decision(4, 4));
        assert!(ban_decision(5, 4));
        assert!(!ban_decision(3, 4));
    }

    #[test]
    fn parses_toml_with_defaults() {
        let policy = PolicySettings::from_toml(
            r#"
            ban_at_score = 4
            require_proof = true

            [[reasons]]
            score = 1
            reasons = ["spam"]
            "#,
        )
        .unwrap();

        assert!(policy.ban);
        assert!(!policy.kick_on_cite);
        assert!(policy.require_proof);
        assert_eq!(policy.ban_at_score, 4);
        assert_eq!(policy.all_reasons(), vec!["spam".to_string()]);
        assert_eq!(policy.reasons_at_level(1), vec!["spam".to_string()]);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            PolicySettings::from_toml("ban_at_score = \"many\""),
            Err(PolicyError::Parse(_))
        ));
    }
}
