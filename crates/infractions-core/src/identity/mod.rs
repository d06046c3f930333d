//! Stable player identities and name→identity resolution.
//!
//! A [`PlayerId`] is a 128-bit identifier that survives display-name changes.
//! It is always the map key in the store; once resolved it is never derived
//! from a name again.
//!
//! Resolution goes through the [`ProfileResolver`] trait so the store can be
//! wired against the real network-backed profile service
//! ([`HttpResolver`]) or a fixed table ([`StaticResolver`]) in tests and on
//! servers that run without the external service. Resolution is a pure
//! lookup: an unreachable service yields `None`, never a panic or an error
//! the caller has to unwind from.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Request timeout applied to every outbound profile lookup.
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Stable 128-bit player identifier.
///
/// Wraps a [`Uuid`]; the newtype keeps identity values from being confused
/// with the many other UUIDs a game server handles.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(Uuid);

impl PlayerId {
    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Generates a fresh random identity.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PlayerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Name↔identity lookup against a profile authority.
///
/// Both directions are read-only and side-effect free. Implementations must
/// absorb transport failures: "service unreachable" and "no such player"
/// both come back as `None`.
pub trait ProfileResolver: Send + Sync {
    /// Resolves a display name to its stable identity.
    fn resolve_name(&self, name: &str) -> Option<PlayerId>;

    /// Resolves an identity back to its current display name.
    fn resolve_id(&self, id: PlayerId) -> Option<String>;
}

/// Fixed in-memory resolver.
///
/// Used by tests and by deployments that maintain their own name table
/// instead of calling out to a profile service. Name matching is
/// case-insensitive, matching how players type each other's names.
#[derive(Debug, Default)]
pub struct StaticResolver {
    entries: RwLock<HashMap<String, PlayerId>>,
}

impl StaticResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or overwrites) a name→identity mapping.
    pub fn insert(&self, name: impl Into<String>, id: PlayerId) {
        self.entries
            .write()
            .expect("lock poisoned")
            .insert(name.into(), id);
    }
}

impl ProfileResolver for StaticResolver {
    fn resolve_name(&self, name: &str) -> Option<PlayerId> {
        self.entries
            .read()
            .expect("lock poisoned")
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|(_, id)| *id)
    }

    fn resolve_id(&self, id: PlayerId) -> Option<String> {
        self.entries
            .read()
            .expect("lock poisoned")
            .iter()
            .find(|(_, known)| **known == id)
            .map(|(name, _)| name.clone())
    }
}

/// JSON shape returned by Mojang-compatible profile endpoints.
#[derive(Debug, Deserialize)]
struct ProfilePayload {
    id: String,
    name: String,
}

/// Network-backed resolver for Mojang-compatible profile APIs.
///
/// `resolve_name` queries `{name_base}/{name}`, `resolve_id` queries
/// `{profile_base}/{uuid}`; both expect a JSON body carrying `id` and
/// `name`. Every transport, parse or format failure is logged at `warn`
/// and surfaces as `None` — callers treat a degraded profile service the
/// same as an unknown player.
pub struct HttpResolver {
    agent: ureq::Agent,
    name_base: String,
    profile_base: String,
}

impl HttpResolver {
    /// Creates a resolver against custom endpoints.
    #[must_use]
    pub fn new(name_base: impl Into<String>, profile_base: impl Into<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(RESOLVE_TIMEOUT).build(),
            name_base: name_base.into(),
            profile_base: profile_base.into(),
        }
    }

    /// Creates a resolver against the public Mojang profile API.
    #[must_use]
    pub fn mojang() -> Self {
        Self::new(
            "https://api.mojang.com/users/profiles/minecraft",
            "https://sessionserver.mojang.com/session/minecraft/profile",
        )
    }

    fn fetch(&self, url: &str) -> Option<ProfilePayload> {
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(err) => {
                warn!(%url, error = %err, "profile lookup failed");
                return None;
            }
        };
        match response.into_json::<ProfilePayload>() {
            Ok(payload) => Some(payload),
            Err(err) => {
                warn!(%url, error = %err, "profile response was not decodable");
                None
            }
        }
    }
}

impl ProfileResolver for HttpResolver {
    fn resolve_name(&self, name: &str) -> Option<PlayerId> {
        let payload = self.fetch(&format!("{}/{name}", self.name_base))?;
        match Uuid::parse_str(&payload.id) {
            Ok(id) => Some(PlayerId::from_uuid(id)),
            Err(err) => {
                warn!(%name, id = %payload.id, error = %err, "profile id was not a UUID");
                None
            }
        }
    }

    fn resolve_id(&self, id: PlayerId) -> Option<String> {
        self.fetch(&format!("{}/{}", self.profile_base, id.as_uuid().simple()))
            .map(|payload| payload.name)
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn player_id_round_trips_through_display() {
        let id = PlayerId::random();
        let parsed: PlayerId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn player_id_parses_undashed_form() {
        let id: PlayerId = "069a79f444e94726a5befca90e38aaf5".parse().unwrap();
        assert_eq!(id.to_string(), "069a79f4-44e9-4726-a5be-fca90e38aaf5");
    }

    #[test]
    fn static_resolver_is_case_insensitive() {
        let resolver = StaticResolver::new();
        let id = PlayerId::random();
        resolver.insert("Alice", id);

        assert_eq!(resolver.resolve_name("alice"), Some(id));
        assert_eq!(resolver.resolve_name("ALICE"), Some(id));
        assert_eq!(resolver.resolve_name("bob"), None);
    }

    #[test]
    fn static_resolver_reverse_lookup() {
        let resolver = StaticResolver::new();
        let id = PlayerId::random();
        resolver.insert("Alice", id);

        assert_eq!(resolver.resolve_id(id), Some("Alice".to_string()));
        assert_eq!(resolver.resolve_id(PlayerId::random()), None);
    }
}
