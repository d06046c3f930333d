//! Citation records.
//!
//! An [`Infraction`] is immutable once issued, with two exceptions: it can
//! be removed from its dossier (acquittal), and its owning identity can be
//! re-pointed exactly once by the store's identity repair when the record
//! turns out to have been filed under a stale identity.
//!
//! Infractions are shared as `Arc<Infraction>`; set membership inside a
//! dossier is by pointer identity, not by citation key, so two infractions
//! issued in the same millisecond stay distinct records.

use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::evidence::{Evidence, Issuer};
use crate::identity::PlayerId;
use crate::timefmt;

/// A single moderation citation.
#[derive(Debug)]
pub struct Infraction {
    /// Owning identity. Interior-mutable so identity repair can re-point it
    /// without tearing down the record; nothing else writes it.
    player_id: RwLock<PlayerId>,
    created_at_ms: u64,
    reason: String,
    score: u32,
    issuer: Issuer,
    evidence: Vec<Evidence>,
}

impl Infraction {
    /// Creates a citation record.
    #[must_use]
    pub fn new(
        player_id: PlayerId,
        created_at_ms: u64,
        reason: impl Into<String>,
        score: u32,
        issuer: Issuer,
        evidence: Vec<Evidence>,
    ) -> Self {
        Self {
            player_id: RwLock::new(player_id),
            created_at_ms,
            reason: reason.into(),
            score,
            issuer,
            evidence,
        }
    }

    /// The identity this infraction is filed under.
    #[must_use]
    pub fn player_id(&self) -> PlayerId {
        *self.player_id.read().expect("lock poisoned")
    }

    /// Re-points the owning identity. Identity repair only.
    pub(crate) fn reassign_player(&self, id: PlayerId) {
        *self.player_id.write().expect("lock poisoned") = id;
    }

    /// Issue time, milliseconds since the Unix epoch.
    #[must_use]
    pub const fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    /// Issue time as a UTC timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(i64::try_from(self.created_at_ms).unwrap_or(i64::MAX))
            .unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// The validated reason string this citation was issued for.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Severity contributed to the dossier score.
    #[must_use]
    pub const fn score(&self) -> u32 {
        self.score
    }

    /// Who issued the citation.
    #[must_use]
    pub const fn issuer(&self) -> &Issuer {
        &self.issuer
    }

    /// Attached proof, possibly empty.
    #[must_use]
    pub fn evidence(&self) -> &[Evidence] {
        &self.evidence
    }

    /// The human-typable key operators use to remove this citation.
    ///
    /// Derived from the decimal digits of the issue timestamp through a
    /// fixed substitution alphabet, so it is stable for the lifetime of the
    /// record and survives persistence round-trips.
    #[must_use]
    pub fn citation_key(&self) -> String {
        citation_key(self.created_at_ms)
    }

    /// Coarse age string for operator-facing history output.
    #[must_use]
    pub fn pretty_age(&self, now_ms: u64) -> String {
        timefmt::pretty_age(self.created_at_ms, now_ms)
    }
}

/// Maps an issue timestamp to its citation key, one letter per decimal
/// digit.
#[must_use]
pub fn citation_key(created_at_ms: u64) -> String {
    created_at_ms
        .to_string()
        .bytes()
        .map(key_letter)
        .collect()
}

/// The digit→letter substitution alphabet. Injective over `0-9`; the exact
/// letters are load-bearing because keys printed by earlier releases must
/// keep resolving.
const fn key_letter(digit: u8) -> char {
    match digit {
        b'1' => 'F',
        b'2' => 'Z',
        b'3' => 'c',
        b'4' => 'A',
        b'5' => 'Q',
        b'6' => 'u',
        b'7' => 'p',
        b'8' => 'W',
        b'9' => 'j',
        _ => 'b', // 0
    }
}
