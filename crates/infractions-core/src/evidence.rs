//! Immutable proof attachments and the actors who submit them.
//!
//! Evidence is attached to an infraction at citation time and never changes
//! afterwards. The only classification performed is a best-effort "does this
//! proof URL point at an image" probe; everything that is not provably an
//! image is filed as [`EvidenceKind::OtherUrl`].
//!
//! The probe fetches attacker-supplied URLs, so it is deliberately bounded:
//! a hard request timeout and a fixed-size read of the leading bytes, which
//! is all signature sniffing needs. It never downloads or decodes a full
//! image.

use std::io::Read;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::identity::PlayerId;

/// Request timeout for the image probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Number of leading bytes fetched by the probe. Covers every magic number
/// we recognize (WebP needs 12).
const PROBE_SNIFF_BYTES: usize = 16;

/// Who submitted a piece of evidence (or issued an infraction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssuerKind {
    /// A known staff member; the issuer id is their player identity.
    Staff,
    /// Anything else — the console, an external system, an import job. The
    /// issuer id is an opaque label.
    Unknown,
}

/// The citing actor attached to infractions and evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuer {
    /// Whether this issuer is a known staff member.
    pub kind: IssuerKind,
    /// Staff identity, or an opaque label such as `"console"`.
    pub id: String,
}

impl Issuer {
    /// Issuer for a known staff member.
    #[must_use]
    pub fn staff(id: PlayerId) -> Self {
        Self {
            kind: IssuerKind::Staff,
            id: id.to_string(),
        }
    }

    /// Issuer for a non-player actor.
    #[must_use]
    pub fn external(label: impl Into<String>) -> Self {
        Self {
            kind: IssuerKind::Unknown,
            id: label.into(),
        }
    }
}

/// How a piece of evidence was classified at submission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    /// The proof URL decoded as an image.
    ImageUrl,
    /// Everything else, including unreachable or non-image URLs.
    OtherUrl,
}

/// An immutable proof attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Who submitted the proof.
    pub issuer: Issuer,
    /// Classification decided at construction; never re-probed.
    pub kind: EvidenceKind,
    /// Submission time, milliseconds since the Unix epoch.
    pub created_at_ms: u64,
    /// The raw proof string, typically a URL.
    pub raw_data: String,
}

impl Evidence {
    /// Constructs evidence with an explicit kind.
    #[must_use]
    pub fn new(
        issuer: Issuer,
        kind: EvidenceKind,
        created_at_ms: u64,
        raw_data: impl Into<String>,
    ) -> Self {
        Self {
            issuer,
            kind,
            created_at_ms,
            raw_data: raw_data.into(),
        }
    }

    /// Constructs evidence from a raw proof string, classifying it through
    /// the given probe. Probe failure of any kind classifies as
    /// [`EvidenceKind::OtherUrl`].
    #[must_use]
    pub fn from_proof(
        issuer: Issuer,
        proof: impl Into<String>,
        probe: &dyn ProofProbe,
        created_at_ms: u64,
    ) -> Self {
        let raw_data = proof.into();
        let kind = if probe.is_image_url(&raw_data) {
            EvidenceKind::ImageUrl
        } else {
            EvidenceKind::OtherUrl
        };
        Self {
            issuer,
            kind,
            created_at_ms,
            raw_data,
        }
    }
}

/// Best-effort "is this proof URL an image" check.
///
/// A trait so citation flows can run with the real bounded HTTP probe in
/// production and a canned answer in tests.
pub trait ProofProbe: Send + Sync {
    /// Returns `true` only when the URL demonstrably serves an image.
    fn is_image_url(&self, url: &str) -> bool;
}

/// Probe with a fixed answer. Test double, also usable to disable probing.
#[derive(Debug, Clone, Copy)]
pub struct FixedProbe(pub bool);

impl ProofProbe for FixedProbe {
    fn is_image_url(&self, _url: &str) -> bool {
        self.0
    }
}

/// HTTP probe that fetches the first few bytes of the URL and sniffs image
/// magic numbers (PNG, JPEG, GIF, BMP, WebP).
pub struct HttpProofProbe {
    agent: ureq::Agent,
}

impl Default for HttpProofProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpProofProbe {
    /// Creates a probe with the default timeout.
    #[must_use]
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(PROBE_TIMEOUT).build(),
        }
    }
}

impl ProofProbe for HttpProofProbe {
    fn is_image_url(&self, url: &str) -> bool {
        let response = match self.agent.get(url).call() {
            Ok(response) => response,
            Err(err) => {
                warn!(%url, error = %err, "evidence probe fetch failed");
                return false;
            }
        };
        let mut head = Vec::with_capacity(PROBE_SNIFF_BYTES);
        if let Err(err) = response
            .into_reader()
            .take(PROBE_SNIFF_BYTES as u64)
            .read_to_end(&mut head)
        {
            warn!(%url, error = %err, "evidence probe read failed");
            return false;
        }
        sniff_image(&head)
    }
}

/// Recognizes the magic numbers of the image formats players actually post.
fn sniff_image(head: &[u8]) -> bool {
    head.starts_with(b"\x89PNG\r\n\x1a\n")
        || head.starts_with(b"\xff\xd8\xff")
        || head.starts_with(b"GIF87a")
        || head.starts_with(b"GIF89a")
        || head.starts_with(b"BM")
        || (head.len() >= 12 && head.starts_with(b"RIFF") && &head[8..12] == b"WEBP")
}
