//! Serde DTOs for the durable dossier format.
//!
//! The live types carry locks and shared ownership, so the durable format
//! is a plain mirror of their data. Unknown fields are ignored on decode
//! and absent collections default to empty, which keeps records written by
//! older releases loadable.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dossier::Dossier;
use crate::evidence::{Evidence, Issuer};
use crate::identity::PlayerId;
use crate::infraction::Infraction;

/// Durable form of one infraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfractionRecord {
    /// Owning identity at save time.
    pub player_id: PlayerId,
    /// Issue time, milliseconds since the Unix epoch.
    pub created_at_ms: u64,
    /// The validated reason string.
    pub reason: String,
    /// Severity score.
    pub score: u32,
    /// Who issued the citation.
    pub issuer: Issuer,
    /// Attached proof.
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

impl InfractionRecord {
    fn from_infraction(infraction: &Infraction) -> Self {
        Self {
            player_id: infraction.player_id(),
            created_at_ms: infraction.created_at_ms(),
            reason: infraction.reason().to_string(),
            score: infraction.score(),
            issuer: infraction.issuer().clone(),
            evidence: infraction.evidence().to_vec(),
        }
    }

    fn into_infraction(self) -> Arc<Infraction> {
        Arc::new(Infraction::new(
            self.player_id,
            self.created_at_ms,
            self.reason,
            self.score,
            self.issuer,
            self.evidence,
        ))
    }
}

/// Durable form of one dossier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DossierRecord {
    /// The identity this record is keyed under.
    pub player_id: PlayerId,
    /// Present only for complete dossiers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_known_name: Option<String>,
    /// Associated network addresses (complete dossiers only).
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub addresses: BTreeSet<IpAddr>,
    /// The live infractions at save time.
    #[serde(default)]
    pub infractions: Vec<InfractionRecord>,
}

impl DossierRecord {
    /// Captures the durable form of a live dossier.
    #[must_use]
    pub fn from_dossier(dossier: &Dossier) -> Self {
        Self {
            player_id: dossier.id(),
            last_known_name: dossier.last_known_name(),
            addresses: dossier.associated_addresses(),
            infractions: dossier
                .infractions()
                .iter()
                .map(|infraction| InfractionRecord::from_infraction(infraction))
                .collect(),
        }
    }

    /// Rebuilds a live dossier from its durable form.
    #[must_use]
    pub fn into_dossier(self) -> Arc<Dossier> {
        let dossier = match self.last_known_name {
            Some(name) => Dossier::complete_with(self.player_id, name),
            None => Dossier::partial(self.player_id),
        };
        for address in self.addresses {
            dossier.record_address(address);
        }
        for infraction in self.infractions {
            dossier.cite(infraction.into_infraction());
        }
        Arc::new(dossier)
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::evidence::{EvidenceKind, IssuerKind};

    #[test]
    fn dossier_round_trips_through_record() {
        let id = PlayerId::random();
        let dossier = Dossier::complete_with(id, "Alice");
        dossier.record_address("10.0.0.7".parse().unwrap());
        dossier.cite(Arc::new(Infraction::new(
            id,
            1_700_000_000_000,
            "griefing",
            3,
            Issuer::external("console"),
            vec![Evidence::new(
                Issuer::external("console"),
                EvidenceKind::ImageUrl,
                1_700_000_000_000,
                "https://example.test/shot.png",
            )],
        )));

        let record = DossierRecord::from_dossier(&dossier);
        let json = serde_json::to_string(&record).unwrap();
        let decoded: DossierRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, decoded);

        let rebuilt = decoded.into_dossier();
        assert_eq!(rebuilt.id(), id);
        assert_eq!(rebuilt.last_known_name(), Some("Alice".to_string()));
        assert_eq!(rebuilt.associated_addresses().len(), 1);
        assert_eq!(rebuilt.score(), 3);
        assert_eq!(
            rebuilt.infractions()[0].evidence()[0].issuer.kind,
            IssuerKind::Unknown
        );
    }

    #[test]
    fn partial_dossier_record_has_no_profile() {
        let dossier = Dossier::partial(PlayerId::random());
        let record = DossierRecord::from_dossier(&dossier);
        assert!(record.last_known_name.is_none());

        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("last_known_name"));

        let rebuilt: DossierRecord = serde_json::from_str(&json).unwrap();
        assert!(!rebuilt.into_dossier().is_complete());
    }

    #[test]
    fn minimal_record_decodes_with_defaults() {
        let id = PlayerId::random();
        let json = format!("{{\"player_id\":\"{id}\"}}");
        let record: DossierRecord = serde_json::from_str(&json).unwrap();
        assert!(record.infractions.is_empty());
        assert!(record.addresses.is_empty());
    }
}
