//! The concurrent identity→dossier registry.
//!
//! One [`InfractionStore`] holds every dossier the server knows about. It is
//! the exclusive owner of all [`Dossier`] instances: callers get shared
//! handles (`Arc<Dossier>`) and mutate through them, and the store
//! guarantees at most one live dossier per identity even under concurrent
//! first-reference races (insert-if-absent under a single write-lock
//! acquisition, never check-then-insert).
//!
//! # Identity repair
//!
//! Name-keyed lookups performed before a player's UUID was knowable can file
//! a record under the wrong identity — the profile authority's answer for a
//! name and the identity the live server session carries may disagree. The
//! first complete-dossier access for a live player detects this and
//! migrates the record: detach the infractions, re-point them at the
//! authoritative identity, drop the stale entry and rebuild a complete
//! dossier under the authoritative identity (merging whatever was already
//! stored there). The repair is best-effort: any failure is logged and
//! swallowed, leaving the stale record authoritative until the next
//! attempt. Availability beats strict correctness here because the fallback
//! is simply "the next lookup retries".
//!
//! # Locking
//!
//! Lock order is store map before dossier, never the reverse. The resolver
//! is a network call and is never invoked under the map lock, so a slow
//! profile service cannot stall access to unrelated identities.


use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::warn;

use crate::dossier::Dossier;
use crate::evidence::Evidence;
use crate::identity::{PlayerId, ProfileResolver};
use crate::infraction::Infraction;

/// Recoverable lookup failures surfaced to the command layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Name resolution failed: unknown player or unreachable resolver.
    #[error("no player found for name: {name}")]
    IdentityNotFound {
        /// The name that failed to resolve.
        name: String,
    },

    /// A complete dossier was required but only a partial one exists.
    #[error("dossier for {player_id} is incomplete: player profile not yet resolved")]
    IncompleteDossier {
        /// The identity whose dossier is still partial.
        player_id: PlayerId,
    },

    /// No live infraction matches the given citation key.
    #[error("no infraction matches key: {key}")]
    InfractionNotFound {
        /// The citation key that matched nothing.
        key: String,
    },
}

/// Identity-repair failures. Logged for the operator, never surfaced to
/// callers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MigrationError {
    /// The stale dossier carries no display name to audit the repair under.
    #[error("stale dossier {player_id} has no resolved profile")]
    StaleDossierIncomplete {
        /// The stale identity.
        player_id: PlayerId,
    },

    /// The stale entry disappeared between lookup and repair (concurrent
    /// reset or competing repair).
    #[error("stale dossier {player_id} vanished during repair")]
    StaleRecordVanished {
        /// The stale identity.
        player_id: PlayerId,
    },
}

/// A live, authenticated player session: the authoritative identity plus
/// what the server currently observes about them.
#[derive(Debug, Clone)]
pub struct LivePlayer {
    /// The authoritative identity carried by the session.
    pub id: PlayerId,
    /// The current display name.
    pub name: String,
    /// The connecting address, when the transport exposes one.
    pub address: Option<IpAddr>,
}

/// The registry of all dossiers, safe for concurrent use.
pub struct InfractionStore {
    dossiers: RwLock<HashMap<PlayerId, Arc<Dossier>>>,
    resolver: Arc<dyn ProfileResolver>,
}

impl InfractionStore {
    /// Creates an empty store wired to a profile resolver.
    #[must_use]
    pub fn new(resolver: Arc<dyn ProfileResolver>) -> Self {
        Self {
            dossiers: RwLock::new(HashMap::new()),
            resolver,
        }
    }

    /// Returns the dossier for an identity, creating and registering an
    /// empty partial one on first reference. Exactly one dossier instance
    /// per identity is ever live, even when concurrent callers race on the
    /// first reference.
    #[must_use]
    pub fn dossier(&self, id: PlayerId) -> Arc<Dossier> {
        self.dossiers
            .write()
            .expect("lock poisoned")
            .entry(id)
            .or_insert_with(|| Arc::new(Dossier::partial(id)))
            .clone()
    }

    /// Resolves a display name and returns the dossier for the resolved
    /// identity.
    ///
    /// # Errors
    ///
    /// [`StoreError::IdentityNotFound`] when resolution fails.
    pub fn dossier_by_name(&self, name: &str) -> Result<Arc<Dossier>, StoreError> {
        // Resolver runs outside the map lock.
        let id = self
            .resolver
            .resolve_name(name)
            .ok_or_else(|| StoreError::IdentityNotFound {
                name: name.to_string(),
            })?;
        Ok(self.dossier(id))
    }

    /// Returns the dossier for an identity, requiring it to be complete.
    ///
    /// # Errors
    ///
    /// [`StoreError::IncompleteDossier`] when the player's profile has not
    /// been resolved yet.
    pub fn complete_dossier(&self, id: PlayerId) -> Result<Arc<Dossier>, StoreError> {
        let dossier = self.dossier(id);
        if dossier.is_complete() {
            Ok(dossier)
        } else {
            Err(StoreError::IncompleteDossier { player_id: id })
        }
    }

    /// Resolves a display name and returns a complete dossier, promoting a
    /// partial record with the resolved name on the way.
    ///
    /// # Errors
    ///
    /// [`StoreError::IdentityNotFound`] when resolution fails.
    pub fn complete_dossier_by_name(&self, name: &str) -> Result<Arc<Dossier>, StoreError> {
        let dossier = self.dossier_by_name(name)?;
        dossier.complete(name);
        Ok(dossier)
    }

    /// Returns the complete dossier for a live player session, repairing
    /// records filed under a stale identity.
    ///
    /// When the name-resolved dossier's identity disagrees with the
    /// session's authoritative identity, the record is migrated (see the
    /// module docs). Repair failures are logged and swallowed; the stale
    /// dossier is returned and stays authoritative until the next attempt.
    ///
    /// # Errors
    ///
    /// [`StoreError::IdentityNotFound`] when name resolution fails.
    pub fn complete_dossier_for(&self, live: &LivePlayer) -> Result<Arc<Dossier>, StoreError> {
        let dossier = self.complete_dossier_by_name(&live.name)?;
        if dossier.id() == live.id {
            dossier.rename(live.name.as_str());
            if let Some(address) = live.address {
                dossier.record_address(address);
            }
            return Ok(dossier);
        }

        match self.repair_identity(&dossier, live) {
            Ok(repaired) => Ok(repaired),
            Err(err) => {
                warn!(
                    stale_id = %dossier.id(),
                    live_id = %live.id,
                    name = %live.name,
                    error = %err,
                    "identity repair failed; stale dossier stays authoritative"
                );
                Ok(dossier)
            }
        }
    }

    /// Migrates a dossier filed under a stale identity onto the live
    /// session's authoritative identity.
    fn repair_identity(
        &self,
        stale: &Arc<Dossier>,
        live: &LivePlayer,
    ) -> Result<Arc<Dossier>, MigrationError> {
        let display_name =
            stale
                .last_known_name()
                .ok_or(MigrationError::StaleDossierIncomplete {
                    player_id: stale.id(),
                })?;

        let detached = stale.drain_infractions();
        for infraction in &detached {
            infraction.reassign_player(live.id);
        }

        let mut dossiers = self.dossiers.write().expect("lock poisoned");
        if dossiers.remove(&stale.id()).is_none() {
            // Lost a race with a reset or a competing repair. Undo the
            // detachment so no infraction is orphaned.
            drop(dossiers);
            for infraction in detached {
                infraction.reassign_player(stale.id());
                stale.cite(infraction);
            }
            return Err(MigrationError::StaleRecordVanished {
                player_id: stale.id(),
            });
        }

        // Any record previously persisted under the authoritative identity
        // seeds the replacement instead of being clobbered.
        let replacement = match dossiers.remove(&live.id) {
            Some(existing) => {
                existing.complete(live.name.as_str());
                existing.rename(live.name.as_str());
                existing
            }
            None => Arc::new(Dossier::complete_with(live.id, live.name.clone())),
        };
        for address in stale.associated_addresses() {
            replacement.record_address(address);
        }
        if let Some(address) = live.address {
            replacement.record_address(address);
        }
        for infraction in detached {
            replacement.cite(infraction);
        }
        dossiers.insert(live.id, Arc::clone(&replacement));
        drop(dossiers);

        warn!(
            name = %display_name,
            stale_id = %stale.id(),
            live_id = %live.id,
            "repaired dossier filed under stale identity"
        );
        Ok(replacement)
    }

    /// Every complete dossier associated with the given address. Linear
    /// scan; used to surface alt-account relationships.
    #[must_use]
    pub fn complete_dossiers_by_address(&self, address: IpAddr) -> Vec<Arc<Dossier>> {
        self.all_dossiers()
            .into_iter()
            .filter(|dossier| dossier.associated_addresses().contains(&address))
            .collect()
    }

    /// First complete dossier whose last known name starts with the prefix,
    /// case-insensitively.
    #[must_use]
    pub fn find_name_by_prefix(&self, prefix: &str) -> Option<String> {
        self.names_with_prefix(prefix).into_iter().next()
    }

    /// All last known names starting with the prefix, case-insensitively.
    /// Feeds operator tab-completion.
    #[must_use]
    pub fn names_with_prefix(&self, prefix: &str) -> Vec<String> {
        let prefix = prefix.to_lowercase();
        self.all_dossiers()
            .into_iter()
            .filter_map(|dossier| dossier.last_known_name())
            .filter(|name| name.to_lowercase().starts_with(&prefix))
            .collect()
    }

    /// Registers a dossier directly, replacing any existing entry for its
    /// identity. Used by persistence load and history resets.
    pub fn add_dossier(&self, dossier: Arc<Dossier>) {
        self.dossiers
            .write()
            .expect("lock poisoned")
            .insert(dossier.id(), dossier);
    }

    /// Removes the dossier for an identity, returning it if present. A
    /// following lookup starts a fresh history.
    pub fn remove_dossier(&self, id: PlayerId) -> Option<Arc<Dossier>> {
        self.dossiers.write().expect("lock poisoned").remove(&id)
    }

    /// Acquits an infraction on an existing dossier by citation key.
    ///
    /// # Errors
    ///
    /// [`StoreError::InfractionNotFound`] when the identity has no dossier
    /// or the key matches no live infraction.
    pub fn acquit_by_key(&self, id: PlayerId, key: &str) -> Result<Arc<Infraction>, StoreError> {
        let dossier = self
            .dossiers
            .read()
            .expect("lock poisoned")
            .get(&id)
            .cloned();
        dossier
            .and_then(|dossier| dossier.acquit_by_key(key))
            .ok_or_else(|| StoreError::InfractionNotFound {
                key: key.to_string(),
            })
    }

    /// Current score for an identity; zero when no dossier exists. Does not
    /// create a record.
    #[must_use]
    pub fn score_of(&self, id: PlayerId) -> u32 {
        self.dossiers
            .read()
            .expect("lock poisoned")
            .get(&id)
            .map_or(0, |dossier| dossier.score())
    }

    /// Snapshot of every dossier. Weakly consistent: entries added or
    /// removed during the copy may or may not appear, but no entry is ever
    /// observed half-written.
    #[must_use]
    pub fn all_dossiers(&self) -> Vec<Arc<Dossier>> {
        self.dossiers
            .read()
            .expect("lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Snapshot of every live infraction across all dossiers.
    #[must_use]
    pub fn all_infractions(&self) -> Vec<Arc<Infraction>> {
        self.all_dossiers()
            .into_iter()
            .flat_map(|dossier| dossier.infractions())
            .collect()
    }

    /// Snapshot of every piece of evidence across all infractions.
    #[must_use]
    pub fn all_evidence(&self) -> Vec<Evidence> {
        self.all_dossiers()
            .into_iter()
            .flat_map(|dossier| dossier.evidence())
            .collect()
    }

    /// Number of registered dossiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dossiers.read().expect("lock poisoned").len()
    }

    /// Whether the store holds no dossiers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dossiers.read().expect("lock poisoned").is_empty()
    }
}

impl std::fmt::Debug for InfractionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfractionStore")
            .field("dossiers", &self.len())
            .finish_non_exhaustive()
    }
}
