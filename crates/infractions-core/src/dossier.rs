//! The per-player aggregate: infraction history plus identity metadata.
//!
//! A dossier starts *partial* — the identity is known but the player's
//! profile has not been resolved yet — and is promoted to *complete* once a
//! display name is attached. Promotion is terminal: there is no demotion,
//! and completing an already-complete dossier is a no-op. The two states
//! are one type with an optional inner [`Profile`] rather than a trait
//! hierarchy, so "needs a name" operations return a typed absence instead
//! of requiring a downcast.
//!
//! Dossiers are shared (`Arc<Dossier>`) and internally synchronized; all
//! collection accessors return snapshots, so iterating a history while
//! another thread cites or acquits never observes a half-applied mutation.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::{Arc, RwLock};

use crate::evidence::Evidence;
use crate::identity::{PlayerId, ProfileResolver};
use crate::infraction::Infraction;

/// Resolved-profile metadata, present only on complete dossiers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Profile {
    /// The display name the player was last seen under.
    pub last_known_name: String,
    /// Every network address the player has connected from.
    pub addresses: BTreeSet<IpAddr>,
}

#[derive(Debug, Default)]
struct Inner {
    infractions: Vec<Arc<Infraction>>,
    profile: Option<Profile>,
}

/// Per-player infraction record.
#[derive(Debug)]
pub struct Dossier {
    id: PlayerId,
    inner: RwLock<Inner>,
}

impl Dossier {
    /// Creates an empty partial dossier for an identity.
    #[must_use]
    pub fn partial(id: PlayerId) -> Self {
        Self {
            id,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Creates an empty complete dossier with a known display name.
    #[must_use]
    pub fn complete_with(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            inner: RwLock::new(Inner {
                infractions: Vec::new(),
                profile: Some(Profile {
                    last_known_name: name.into(),
                    addresses: BTreeSet::new(),
                }),
            }),
        }
    }

    /// The identity this dossier is keyed under.
    #[must_use]
    pub const fn id(&self) -> PlayerId {
        self.id
    }

    /// Adds an infraction to the set. Citing the same record twice (pointer
    /// identity) is a no-op; two records with equal citation keys are still
    /// two records.
    pub fn cite(&self, infraction: Arc<Infraction>) {
        let mut inner = self.inner.write().expect("lock poisoned");
        if inner
            .infractions
            .iter()
            .any(|existing| Arc::ptr_eq(existing, &infraction))
        {
            return;
        }
        inner.infractions.push(infraction);
    }

    /// Removes an infraction by pointer identity. Returns `false` when the
    /// record was not (or no longer) present.
    pub fn acquit(&self, infraction: &Arc<Infraction>) -> bool {
        let mut inner = self.inner.write().expect("lock poisoned");
        let before = inner.infractions.len();
        inner
            .infractions
            .retain(|existing| !Arc::ptr_eq(existing, infraction));
        inner.infractions.len() != before
    }

    /// Removes the first infraction matching an operator-supplied citation
    /// key, returning it. `None` when no live infraction matches.
    pub fn acquit_by_key(&self, key: &str) -> Option<Arc<Infraction>> {
        let mut inner = self.inner.write().expect("lock poisoned");
        let index = inner
            .infractions
            .iter()
            .position(|infraction| infraction.citation_key() == key)?;
        Some(inner.infractions.remove(index))
    }

    /// Looks up a live infraction by citation key without removing it.
    #[must_use]
    pub fn find_by_key(&self, key: &str) -> Option<Arc<Infraction>> {
        self.inner
            .read()
            .expect("lock poisoned")
            .infractions
            .iter()
            .find(|infraction| infraction.citation_key() == key)
            .cloned()
    }

    /// Sum of all live infraction scores.
    #[must_use]
    pub fn score(&self) -> u32 {
        self.inner
            .read()
            .expect("lock poisoned")
            .infractions
            .iter()
            .map(|infraction| infraction.score())
            .sum()
    }

    /// Snapshot of the live infractions.
    #[must_use]
    pub fn infractions(&self) -> Vec<Arc<Infraction>> {
        self.inner.read().expect("lock poisoned").infractions.clone()
    }

    /// Snapshot of all attached evidence, flattened across infractions.
    #[must_use]
    pub fn evidence(&self) -> Vec<Evidence> {
        self.inner
            .read()
            .expect("lock poisoned")
            .infractions
            .iter()
            .flat_map(|infraction| infraction.evidence().to_vec())
            .collect()
    }

    /// Citation keys of the live infractions, for operator tab-completion.
    #[must_use]
    pub fn citation_keys(&self) -> Vec<String> {
        self.inner
            .read()
            .expect("lock poisoned")
            .infractions
            .iter()
            .map(|infraction| infraction.citation_key())
            .collect()
    }

    /// Whether the player's profile has been resolved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.inner.read().expect("lock poisoned").profile.is_some()
    }

    /// Promotes a partial dossier with a resolved display name. Idempotent:
    /// an already-complete dossier keeps its existing profile (name updates
    /// go through [`Dossier::rename`]).
    pub fn complete(&self, name: impl Into<String>) {
        let mut inner = self.inner.write().expect("lock poisoned");
        if inner.profile.is_none() {
            inner.profile = Some(Profile {
                last_known_name: name.into(),
                addresses: BTreeSet::new(),
            });
        }
    }

    /// Promotes a partial dossier by asking the resolver for the current
    /// display name. Returns whether the dossier is complete afterwards.
    pub fn complete_via(&self, resolver: &dyn ProfileResolver) -> bool {
        if self.is_complete() {
            return true;
        }
        match resolver.resolve_id(self.id) {
            Some(name) => {
                self.complete(name);
                true
            }
            None => false,
        }
    }

    /// Updates the last-known display name on a complete dossier. No-op on
    /// a partial one.
    pub fn rename(&self, name: impl Into<String>) {
        let mut inner = self.inner.write().expect("lock poisoned");
        if let Some(profile) = inner.profile.as_mut() {
            profile.last_known_name = name.into();
        }
    }

    /// The display name the player was last seen under; `None` while
    /// partial.
    #[must_use]
    pub fn last_known_name(&self) -> Option<String> {
        self.inner
            .read()
            .expect("lock poisoned")
            .profile
            .as_ref()
            .map(|profile| profile.last_known_name.clone())
    }

    /// Network addresses associated with this player. Empty while partial.
    #[must_use]
    pub fn associated_addresses(&self) -> BTreeSet<IpAddr> {
        self.inner
            .read()
            .expect("lock poisoned")
            .profile
            .as_ref()
            .map(|profile| profile.addresses.clone())
            .unwrap_or_default()
    }

    /// Records a connecting address. Returns `false` (and records nothing)
    /// while the dossier is partial.
    pub fn record_address(&self, address: IpAddr) -> bool {
        let mut inner = self.inner.write().expect("lock poisoned");
        match inner.profile.as_mut() {
            Some(profile) => {
                profile.addresses.insert(address);
                true
            }
            None => false,
        }
    }

    /// Detaches every infraction, leaving the dossier empty. Identity
    /// repair only.
    pub(crate) fn drain_infractions(&self) -> Vec<Arc<Infraction>> {
        let mut inner = self.inner.write().expect("lock poisoned");
        std::mem::take(&mut inner.infractions)
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::evidence::Issuer;
    use crate::identity::StaticResolver;

    fn infraction(score: u32, created_at_ms: u64) -> Arc<Infraction> {
        Arc::new(Infraction::new(
            PlayerId::random(),
            created_at_ms,
            "spam",
            score,
            Issuer::external("console"),
            Vec::new(),
        ))
    }

    #[test]
    fn cite_then_acquit_restores_score() {
        let dossier = Dossier::partial(PlayerId::random());
        let a = infraction(3, 1);
        let b = infraction(1, 2);

        dossier.cite(a.clone());
        dossier.cite(b);
        assert_eq!(dossier.score(), 4);

        assert!(dossier.acquit(&a));
        assert_eq!(dossier.score(), 1);

        // Repeated acquittal of a removed record is a reported no-op.
        assert!(!dossier.acquit(&a));
        assert_eq!(dossier.score(), 1);
    }

    #[test]
    fn double_cite_is_a_noop() {
        let dossier = Dossier::partial(PlayerId::random());
        let a = infraction(2, 1);
        dossier.cite(a.clone());
        dossier.cite(a);
        assert_eq!(dossier.infractions().len(), 1);
        assert_eq!(dossier.score(), 2);
    }

    #[test]
    fn same_key_records_stay_distinct() {
        let dossier = Dossier::partial(PlayerId::random());
        // Same creation millisecond, therefore equal citation keys.
        dossier.cite(infraction(1, 42));
        dossier.cite(infraction(2, 42));
        assert_eq!(dossier.score(), 3);

        let removed = dossier.acquit_by_key(&crate::infraction::citation_key(42));
        assert!(removed.is_some());
        assert_eq!(dossier.infractions().len(), 1);
    }

    #[test]
    fn acquit_by_key_reports_missing() {
        let dossier = Dossier::partial(PlayerId::random());
        assert!(dossier.acquit_by_key("bbbb").is_none());
    }

    #[test]
    fn completion_is_terminal_and_idempotent() {
        let dossier = Dossier::partial(PlayerId::random());
        assert!(!dossier.is_complete());
        assert_eq!(dossier.last_known_name(), None);

        dossier.complete("Alice");
        assert!(dossier.is_complete());
        assert_eq!(dossier.last_known_name(), Some("Alice".to_string()));

        // Second completion keeps the original profile.
        dossier.complete("Mallory");
        assert_eq!(dossier.last_known_name(), Some("Alice".to_string()));

        dossier.rename("Alice2");
        assert_eq!(dossier.last_known_name(), Some("Alice2".to_string()));
    }

    #[test]
    fn complete_via_resolver() {
        let id = PlayerId::random();
        let resolver = StaticResolver::new();
        let dossier = Dossier::partial(id);

        assert!(!dossier.complete_via(&resolver));
        assert!(!dossier.is_complete());

        resolver.insert("Alice", id);
        assert!(dossier.complete_via(&resolver));
        assert_eq!(dossier.last_known_name(), Some("Alice".to_string()));
    }

    #[test]
    fn addresses_require_completion() {
        let dossier = Dossier::partial(PlayerId::random());
        let address: IpAddr = "10.0.0.7".parse().unwrap();

        assert!(!dossier.record_address(address));
        assert!(dossier.associated_addresses().is_empty());

        dossier.complete("Alice");
        assert!(dossier.record_address(address));
        assert!(dossier.record_address(address));
        assert_eq!(dossier.associated_addresses().len(), 1);
    }

    #[test]
    fn snapshots_are_detached_from_live_state() {
        let dossier = Dossier::partial(PlayerId::random());
        dossier.cite(infraction(1, 1));
        let snapshot = dossier.infractions();
        dossier.cite(infraction(1, 2));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(dossier.infractions().len(), 2);
    }
}
