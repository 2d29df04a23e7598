//! Messages on the grind progress channel.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

use crate::crypto::Keypair;

/// A message emitted while grinding.
///
/// Zero or more `Progress` events are followed by exactly one terminal event.
/// Serializes to its wire shape, e.g. `{"kind":"progress","attemptsSoFar":1000}`;
/// the `result` form carries the secret material, so only send it to the keypair's owner.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GrindEvent {
    /// Attempts made so far.
    Progress {
        #[serde(rename = "attemptsSoFar")]
        attempts_so_far: u64,
    },
    /// A matching keypair was found.
    Result {
        #[serde(flatten, serialize_with = "keypair_fields")]
        keypair: Keypair,
        attempts: u64,
    },
    /// The search was cancelled before a match.
    Cancelled { attempts: u64 },
    /// The attempt bound was reached without a match.
    Exhausted { attempts: u64 },
}

/// Writes a keypair as `publicIdentifier` plus the 64-byte `secretMaterial` array.
fn keypair_fields<S: Serializer>(keypair: &Keypair, serializer: S) -> Result<S::Ok, S::Error> {
    let secret = keypair.secret_material();
    let mut map = serializer.serialize_map(Some(2))?;
    map.serialize_entry("publicIdentifier", keypair.public_identifier())?;
    map.serialize_entry("secretMaterial", secret.as_slice())?;
    map.end()
}

impl GrindEvent {
    /// Returns true for `Result`, `Cancelled` and `Exhausted`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GrindEvent::Progress { .. })
    }

    /// Renders the event as a JSON value.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}
