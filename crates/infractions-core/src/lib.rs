//! infractions-core - per-player moderation records for a multiplayer game
//! server.
//!
//! This crate is the data store behind an infractions ("citation") system:
//! it maps a stable player identity to a mutable, concurrently-accessed
//! dossier of infractions and evidence, reconciles legacy name-keyed records
//! with UUID-keyed ones, computes aggregate severity scores, and persists the
//! whole record set across restarts.
//!
//! Enforcement (kicks, bans, chat output) and command dispatch live in the
//! host server; this crate only supplies the records and the score.
//!
//! # Modules
//!
//! - [`identity`]: stable player identifiers and name→identity resolution
//! - [`evidence`]: immutable proof attachments and their issuers
//! - [`infraction`]: citation records and operator-facing citation keys
//! - [`dossier`]: the per-player aggregate (partial or complete)
//! - [`store`]: the concurrent identity→dossier registry, including
//!   identity repair for records created under a stale identity
//! - [`persist`]: load-at-startup / save-at-shutdown gateway over an
//!   abstract key-value backend (`SQLite` or in-memory)
//! - [`policy`]: reason→score table, ban threshold and feature flags
//! - [`timefmt`]: coarse human-readable record ages
//!
//! # Concurrency
//!
//! The store holds one `RwLock` around the identity→dossier map and each
//! dossier holds one `RwLock` around its own state. Lock order is always
//! map before dossier; enumeration hands out snapshots, never live views.
//! No network or disk I/O runs under either lock.

pub mod dossier;
pub mod evidence;
pub mod identity;
pub mod infraction;
pub mod persist;
pub mod policy;
pub mod store;
pub mod timefmt;

pub use dossier::{Dossier, Profile};
pub use evidence::{Evidence, EvidenceKind, Issuer, IssuerKind, ProofProbe};
pub use identity::{PlayerId, ProfileResolver};
pub use infraction::Infraction;
pub use persist::{PersistError, PersistenceGateway, StorageBackend};
pub use policy::PolicySettings;
pub use store::{InfractionStore, LivePlayer, StoreError};
